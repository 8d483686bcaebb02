//! Sandbox (pause container) lifecycle.
//!
//! The sandbox holds the network, IPC and PID namespaces of a pod. It
//! exposes the union of every container's ports, since the other
//! containers join its network namespace and cannot publish their own.

use std::collections::BTreeSet;
use std::sync::Arc;

use minik8s_api::{ContainerPort, Pod};
use minik8s_common::constants::{IPC_MODE_SHAREABLE, LOOPBACK_HOST_IP};
use minik8s_common::error::Result;
use minik8s_common::types::ImagePullPolicy;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cancel::guarded;
use crate::engine::{ContainerConfig, ContainerEngine, ExposedPort, HostConfig};
use crate::image::ImageResolver;
use crate::labels::{self, Labels, SandboxToken};

/// A container port after defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPort {
    /// Container declaring the port.
    pub container: String,
    /// Port name, if any.
    pub name: Option<String>,
    /// Port and protocol exposed by the sandbox.
    pub port: ExposedPort,
    /// Host IP, loopback unless declared.
    pub host_ip: String,
    /// Host port, if declared.
    pub host_port: Option<u16>,
}

/// Applies the port defaults: TCP when no protocol is given, loopback when
/// no host IP is given.
///
/// # Errors
///
/// Returns [`minik8s_common::error::Minik8sError::InvalidPortSpec`] for a
/// malformed port number or protocol.
pub fn resolve_port(container: &str, port: &ContainerPort) -> Result<ResolvedPort> {
    let protocol = port
        .protocol
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or("TCP");
    let host_ip = port
        .host_ip
        .as_deref()
        .filter(|ip| !ip.trim().is_empty())
        .unwrap_or(LOOPBACK_HOST_IP);
    Ok(ResolvedPort {
        container: container.to_string(),
        name: port.name.clone(),
        port: ExposedPort::parse(&port.container_port, protocol)?,
        host_ip: host_ip.to_string(),
        host_port: port.host_port,
    })
}

/// Creation config of a pod's sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxConfig {
    /// Engine name of the sandbox and namespace-join target.
    pub token: SandboxToken,
    /// Engine creation request.
    pub container: ContainerConfig,
    /// Every declared port after defaulting, in declaration order.
    pub ports: Vec<ResolvedPort>,
    /// Pod annotations.
    pub annotations: Labels,
}

/// Creates and removes pod sandboxes.
#[derive(Clone)]
pub struct SandboxController {
    engine: Arc<dyn ContainerEngine>,
    images: ImageResolver,
    image: String,
}

impl SandboxController {
    /// Creates a controller that runs `image` as the pause container.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>, images: ImageResolver, image: impl Into<String>) -> Self {
        Self {
            engine,
            images,
            image: image.into(),
        }
    }

    /// Returns the pause image.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Builds the sandbox creation config of `pod` without touching the engine.
    ///
    /// # Errors
    ///
    /// Returns [`minik8s_common::error::Minik8sError::InvalidPortSpec`] if
    /// any container declares a malformed port.
    pub fn generate_sandbox_config(&self, pod: &Pod) -> Result<SandboxConfig> {
        let mut ports = Vec::new();
        for container in pod.spec.all_containers() {
            for port in &container.ports {
                ports.push(resolve_port(&container.name, port)?);
            }
        }
        let exposed_ports: BTreeSet<ExposedPort> = ports.iter().map(|p| p.port).collect();
        Ok(SandboxConfig {
            token: SandboxToken::for_pod(pod),
            container: ContainerConfig {
                image: self.image.clone(),
                labels: labels::sandbox_labels(pod),
                exposed_ports,
                host: HostConfig {
                    ipc_mode: Some(IPC_MODE_SHAREABLE.to_string()),
                    ..HostConfig::default()
                },
                ..ContainerConfig::default()
            },
            ports,
            annotations: pod.metadata.annotations.clone(),
        })
    }

    /// Creates and starts the sandbox of `pod`, returning its token.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the pause image cannot be
    /// resolved, or the engine rejects the create or start.
    pub async fn create_sandbox(&self, pod: &Pod, cancel: &CancellationToken) -> Result<SandboxToken> {
        let config = self.generate_sandbox_config(pod)?;
        self.images
            .resolve(ImagePullPolicy::IfNotPresent, &self.image, cancel)
            .await?;
        let id = guarded(
            cancel,
            "sandbox create",
            self.engine.create_container(config.token.as_str(), &config.container),
        )
        .await?;
        tracing::debug!(pod = %pod.name(), id = %id.short(), "sandbox created");
        guarded(cancel, "sandbox start", self.engine.start_container(&id)).await?;
        tracing::info!(
            pod = %pod.name(),
            sandbox = %config.token,
            ports = config.ports.len(),
            "sandbox started"
        );
        Ok(config.token)
    }

    /// Stops and removes every sandbox of `pod`. Finding none is success.
    ///
    /// # Errors
    ///
    /// Returns the first engine error.
    pub async fn remove_sandbox(&self, pod: &Pod, cancel: &CancellationToken) -> Result<()> {
        let matches = guarded(
            cancel,
            "sandbox lookup",
            self.engine.list_containers(&labels::sandbox_selector(pod)),
        )
        .await?;
        if matches.is_empty() {
            tracing::debug!(pod = %pod.name(), "no sandbox to remove");
            return Ok(());
        }
        for sandbox in matches {
            guarded(cancel, "sandbox stop", self.engine.stop_container(&sandbox.id)).await?;
            guarded(cancel, "sandbox remove", self.engine.remove_container(&sandbox.id, true)).await?;
            tracing::info!(pod = %pod.name(), sandbox = %sandbox.name, "sandbox removed");
        }
        Ok(())
    }
}
