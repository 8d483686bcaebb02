//! Lifecycle of a pod's ordinary containers.
//!
//! Each container joins the network, IPC and PID namespaces of its pod's
//! sandbox. Containers are addressed by their identity labels, never by
//! engine name or ID.

use std::sync::Arc;

use minik8s_api::quantity::{cpu_to_nano, memory_to_bytes};
use minik8s_api::{Container, Pod};
use minik8s_common::error::{Minik8sError, Result};
use minik8s_common::types::ContainerId;
use tokio_util::sync::CancellationToken;

use crate::cancel::guarded;
use crate::engine::{ContainerConfig, ContainerDetails, ContainerEngine, ContainerSummary, HostConfig};
use crate::image::ImageResolver;
use crate::labels::{self, SandboxToken};
use crate::volume::bind_volumes;

/// Creates, starts, and removes pod containers.
#[derive(Clone)]
pub struct ContainerController {
    engine: Arc<dyn ContainerEngine>,
    images: ImageResolver,
}

impl ContainerController {
    /// Creates a controller over `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>, images: ImageResolver) -> Self {
        Self { engine, images }
    }

    /// Builds the creation config of `container` without touching the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::VolumeNotFound`] for a dangling mount and
    /// [`Minik8sError::InvalidQuantity`] for a malformed resource limit.
    pub fn generate_container_config(
        &self,
        pod: &Pod,
        container: &Container,
        token: &SandboxToken,
    ) -> Result<ContainerConfig> {
        let binds = bind_volumes(pod, container)?;
        let limits = &container.resources.limits;
        let nano_cpus = limits.cpu.as_deref().map(cpu_to_nano).transpose()?;
        let memory_bytes = limits.memory.as_deref().map(memory_to_bytes).transpose()?;
        let namespace = token.namespace_mode();

        Ok(ContainerConfig {
            image: container.image.clone(),
            entrypoint: container.command.clone(),
            cmd: container.args.clone(),
            working_dir: container.working_dir.clone(),
            env: container
                .env
                .iter()
                .map(|e| format!("{}={}", e.name, e.value))
                .collect(),
            labels: labels::container_labels(pod, &container.name),
            tty: true,
            host: HostConfig {
                binds,
                network_mode: Some(namespace.clone()),
                ipc_mode: Some(namespace.clone()),
                pid_mode: Some(namespace),
                nano_cpus,
                memory_bytes,
            },
            ..ContainerConfig::default()
        })
    }

    /// Creates (but does not start) `container` inside the sandbox `token`.
    ///
    /// The config is built before the image is resolved, so an invalid
    /// container never reaches the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the image cannot be
    /// resolved, or the engine rejects the create.
    pub async fn create_container(
        &self,
        pod: &Pod,
        container: &Container,
        token: &SandboxToken,
        cancel: &CancellationToken,
    ) -> Result<ContainerId> {
        let config = self.generate_container_config(pod, container, token)?;
        self.images
            .resolve(container.image_pull_policy, &container.image, cancel)
            .await?;
        let name = token.container_name(&container.name);
        let id = guarded(
            cancel,
            "container create",
            self.engine.create_container(&name, &config),
        )
        .await?;
        tracing::info!(
            pod = %pod.name(),
            container = %container.name,
            id = %id.short(),
            image = %container.image,
            "container created"
        );
        Ok(id)
    }

    /// Starts every engine container carrying the identity of `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::ContainerNotFound`] if none exists, or the
    /// first engine error.
    pub async fn start_container(
        &self,
        pod: &Pod,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for target in self.find(pod, container, cancel).await? {
            guarded(cancel, "container start", self.engine.start_container(&target.id)).await?;
            tracing::info!(pod = %pod.name(), container, id = %target.id.short(), "container started");
        }
        Ok(())
    }

    /// Restarts every engine container carrying the identity of `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::ContainerNotFound`] if none exists, or the
    /// first engine error.
    pub async fn restart_container(
        &self,
        pod: &Pod,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for target in self.find(pod, container, cancel).await? {
            guarded(cancel, "container restart", self.engine.restart_container(&target.id)).await?;
            tracing::info!(pod = %pod.name(), container, id = %target.id.short(), "container restarted");
        }
        Ok(())
    }

    /// Stops and force-removes every engine container carrying the identity
    /// of `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::ContainerNotFound`] if none exists, or the
    /// first engine error.
    pub async fn remove_container(
        &self,
        pod: &Pod,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for target in self.find(pod, container, cancel).await? {
            guarded(cancel, "container stop", self.engine.stop_container(&target.id)).await?;
            guarded(cancel, "container remove", self.engine.remove_container(&target.id, true)).await?;
            tracing::info!(pod = %pod.name(), container, id = %target.id.short(), "container removed");
        }
        Ok(())
    }

    /// Returns the captured output of `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::ContainerNotFound`] if none exists, or an
    /// engine error.
    pub async fn logs(&self, pod: &Pod, container: &str, cancel: &CancellationToken) -> Result<String> {
        let target = self.find_one(pod, container, cancel).await?;
        guarded(cancel, "container logs", self.engine.container_logs(&target.id)).await
    }

    /// Returns the engine state of `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::ContainerNotFound`] if none exists, or an
    /// engine error.
    pub async fn inspect(
        &self,
        pod: &Pod,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<ContainerDetails> {
        let target = self.find_one(pod, container, cancel).await?;
        guarded(cancel, "container inspect", self.engine.inspect_container(&target.id)).await
    }

    async fn find(
        &self,
        pod: &Pod,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContainerSummary>> {
        let matches = guarded(
            cancel,
            "container lookup",
            self.engine
                .list_containers(&labels::container_selector(pod, container)),
        )
        .await?;
        if matches.is_empty() {
            return Err(Minik8sError::ContainerNotFound {
                pod: pod.name().to_string(),
                container: container.to_string(),
            });
        }
        if matches.len() > 1 {
            tracing::warn!(pod = %pod.name(), container, count = matches.len(), "identity matches several containers");
        }
        Ok(matches)
    }

    async fn find_one(
        &self,
        pod: &Pod,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<ContainerSummary> {
        let mut matches = self.find(pod, container, cancel).await?;
        matches.sort_by_key(|c| std::cmp::Reverse(c.created));
        Ok(matches.swap_remove(0))
    }
}
