//! Docker Engine API client.
//!
//! Talks to the local daemon over its Unix socket via `bollard`. Server
//! responses with a status code become [`Minik8sError::EngineRejected`];
//! transport failures become [`Minik8sError::EngineUnavailable`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StatsOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::{CreateImageOptions, RemoveImageOptions};
use bollard::models::HostConfig as DockerHostConfig;
use futures::{StreamExt, TryStreamExt};
use minik8s_common::config::EngineConfig;
use minik8s_common::error::{Minik8sError, Result};
use minik8s_common::types::ContainerId;

use super::{ContainerConfig, ContainerDetails, ContainerEngine, ContainerSummary};
use crate::labels::{LabelSelector, Labels};
use crate::stats::ContainerStats;

const NOT_MODIFIED: u16 = 304;
const NOT_FOUND: u16 = 404;

/// [`ContainerEngine`] backed by a Docker daemon.
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects to the daemon described by `config`.
    ///
    /// Connecting is lazy: no request is sent until the first call.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::EngineUnavailable`] if the client cannot be built.
    pub fn connect(config: &EngineConfig) -> Result<Self> {
        let docker = match &config.socket {
            Some(socket) => {
                Docker::connect_with_socket(socket, config.timeout_secs, bollard::API_DEFAULT_VERSION)
            }
            None => Docker::connect_with_local_defaults()
                .map(|d| d.with_timeout(Duration::from_secs(config.timeout_secs))),
        }
        .map_err(|e| Minik8sError::EngineUnavailable {
            message: e.to_string(),
        })?;
        tracing::debug!(socket = ?config.socket, "docker client ready");
        Ok(Self { docker })
    }
}

fn map_err(operation: &'static str, err: DockerError) -> Minik8sError {
    match err {
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } => Minik8sError::EngineRejected {
            operation,
            status: status_code,
            message,
        },
        other => Minik8sError::EngineUnavailable {
            message: format!("{operation}: {other}"),
        },
    }
}

fn status_of(err: &DockerError) -> Option<u16> {
    match err {
        DockerError::DockerResponseServerError { status_code, .. } => Some(*status_code),
        _ => None,
    }
}

fn to_labels(labels: Option<HashMap<String, String>>) -> Labels {
    labels.unwrap_or_default().into_iter().collect()
}

/// Splits `image[:tag]` into the pair the create-image endpoint expects.
///
/// Digest references are passed through whole; a missing tag means `latest`.
fn split_reference(reference: &str) -> (&str, &str) {
    if reference.contains('@') {
        return (reference, "");
    }
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[name_start..].rfind(':') {
        Some(i) => (&reference[..name_start + i], &reference[name_start + i + 1..]),
        None => (reference, "latest"),
    }
}

fn to_docker_config(config: &ContainerConfig) -> Config<String> {
    let non_empty = |v: &Vec<String>| (!v.is_empty()).then(|| v.clone());
    let exposed_ports: HashMap<String, HashMap<(), ()>> = config
        .exposed_ports
        .iter()
        .map(|p| (p.to_string(), HashMap::new()))
        .collect();
    Config {
        image: Some(config.image.clone()),
        entrypoint: non_empty(&config.entrypoint),
        cmd: non_empty(&config.cmd),
        working_dir: config.working_dir.clone(),
        env: non_empty(&config.env),
        labels: Some(config.labels.clone().into_iter().collect()),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        tty: Some(config.tty),
        host_config: Some(DockerHostConfig {
            binds: non_empty(&config.host.binds),
            network_mode: config.host.network_mode.clone(),
            ipc_mode: config.host.ipc_mode.clone(),
            pid_mode: config.host.pid_mode.clone(),
            nano_cpus: config.host.nano_cpus,
            memory: config.host.memory_bytes,
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn create_container(&self, name: &str, config: &ContainerConfig) -> Result<ContainerId> {
        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };
        let response = self
            .docker
            .create_container(Some(options), to_docker_config(config))
            .await
            .map_err(|e| map_err("create container", e))?;
        for warning in &response.warnings {
            tracing::warn!(container = name, warning = %warning, "engine warning on create");
        }
        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        self.docker
            .start_container(id.as_str(), None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_err("start container", e))
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<()> {
        match self.docker.stop_container(id.as_str(), None).await {
            Err(e) if status_of(&e) == Some(NOT_MODIFIED) => Ok(()),
            other => other.map_err(|e| map_err("stop container", e)),
        }
    }

    async fn restart_container(&self, id: &ContainerId) -> Result<()> {
        self.docker
            .restart_container(id.as_str(), None)
            .await
            .map_err(|e| map_err("restart container", e))
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.docker
            .remove_container(id.as_str(), Some(options))
            .await
            .map_err(|e| map_err("remove container", e))
    }

    async fn list_containers(&self, selector: &LabelSelector) -> Result<Vec<ContainerSummary>> {
        let mut filters = HashMap::new();
        let _ = filters.insert("label".to_string(), selector.filters());
        let options = ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| map_err("list containers", e))?;
        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: ContainerId::new(c.id.unwrap_or_default()),
                name: c
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c.state.unwrap_or_default(),
                labels: to_labels(c.labels),
                created: c.created,
            })
            .collect())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerDetails> {
        let info = self
            .docker
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_err("inspect container", e))?;
        let config = info.config.unwrap_or_default();
        let state = info.state.unwrap_or_default();
        Ok(ContainerDetails {
            id: ContainerId::new(info.id.unwrap_or_default()),
            name: info
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_default(),
            image: config.image.unwrap_or_default(),
            state: state.status.map(|s| s.to_string()).unwrap_or_default(),
            running: state.running.unwrap_or(false),
            exit_code: state.exit_code,
            started_at: state.started_at,
            labels: to_labels(config.labels),
        })
    }

    async fn container_stats(&self, id: &ContainerId) -> Result<ContainerStats> {
        let options = StatsOptions {
            stream: false,
            one_shot: false,
        };
        let mut stream = std::pin::pin!(self.docker.stats(id.as_str(), Some(options)));
        let stats = stream
            .next()
            .await
            .ok_or_else(|| Minik8sError::EngineRejected {
                operation: "container stats",
                status: NOT_FOUND,
                message: format!("no stats sample for {id}"),
            })?
            .map_err(|e| map_err("container stats", e))?;
        Ok(ContainerStats {
            container_id: id.clone(),
            cpu_total_ns: stats.cpu_stats.cpu_usage.total_usage,
            precpu_total_ns: stats.precpu_stats.cpu_usage.total_usage,
            system_cpu_ns: stats.cpu_stats.system_cpu_usage.unwrap_or(0),
            presystem_cpu_ns: stats.precpu_stats.system_cpu_usage.unwrap_or(0),
            online_cpus: stats.cpu_stats.online_cpus.unwrap_or(1),
            memory_usage_bytes: stats.memory_stats.usage.unwrap_or(0),
            memory_limit_bytes: stats.memory_stats.limit.unwrap_or(0),
        })
    }

    async fn container_logs(&self, id: &ContainerId) -> Result<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };
        let chunks: Vec<_> = self
            .docker
            .logs(id.as_str(), Some(options))
            .try_collect()
            .await
            .map_err(|e| map_err("container logs", e))?;
        let mut out = String::new();
        for chunk in chunks {
            out.push_str(&String::from_utf8_lossy(&chunk.into_bytes()));
        }
        Ok(out)
    }

    async fn image_exists(&self, reference: &str) -> Result<bool> {
        match self.docker.inspect_image(reference).await {
            Ok(_) => Ok(true),
            Err(e) if status_of(&e) == Some(NOT_FOUND) => Ok(false),
            Err(e) => Err(map_err("inspect image", e)),
        }
    }

    async fn pull_image(&self, reference: &str) -> Result<()> {
        let (image, tag) = split_reference(reference);
        let options = CreateImageOptions {
            from_image: image.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };
        let mut progress = std::pin::pin!(self.docker.create_image(Some(options), None, None));
        while let Some(item) = progress.next().await {
            match item {
                Ok(info) => {
                    if let Some(status) = info.status {
                        tracing::trace!(image = reference, %status, "pull progress");
                    }
                }
                Err(e) if status_of(&e) == Some(NOT_FOUND) => {
                    return Err(Minik8sError::ImageNotFound {
                        reference: reference.to_string(),
                    });
                }
                Err(DockerError::DockerStreamError { error }) if error.contains("not found") => {
                    return Err(Minik8sError::ImageNotFound {
                        reference: reference.to_string(),
                    });
                }
                Err(e) => return Err(map_err("pull image", e)),
            }
        }
        Ok(())
    }

    async fn remove_image(&self, reference: &str) -> Result<()> {
        let _ = self
            .docker
            .remove_image(reference, None::<RemoveImageOptions>, None)
            .await
            .map_err(|e| map_err("remove image", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::engine::{ExposedPort, HostConfig};

    #[test]
    fn split_reference_defaults_to_latest() {
        assert_eq!(split_reference("nginx"), ("nginx", "latest"));
        assert_eq!(split_reference("nginx:1.25"), ("nginx", "1.25"));
        assert_eq!(
            split_reference("localhost:5000/app"),
            ("localhost:5000/app", "latest")
        );
        assert_eq!(
            split_reference("localhost:5000/app:v2"),
            ("localhost:5000/app", "v2")
        );
        assert_eq!(split_reference("k8s.gcr.io/pause:3.1"), ("k8s.gcr.io/pause", "3.1"));
    }

    #[test]
    fn split_reference_keeps_digests_whole() {
        let digest = "nginx@sha256:abc";
        assert_eq!(split_reference(digest), (digest, ""));
    }

    #[test]
    fn server_errors_keep_status() {
        let err = map_err(
            "start container",
            DockerError::DockerResponseServerError {
                status_code: 409,
                message: "conflict".into(),
            },
        );
        assert!(matches!(
            err,
            Minik8sError::EngineRejected {
                operation: "start container",
                status: 409,
                ..
            }
        ));
    }

    #[test]
    fn config_translation_maps_every_field() {
        let mut exposed = BTreeSet::new();
        let _ = exposed.insert(ExposedPort::parse("80", "tcp").unwrap());
        let config = ContainerConfig {
            image: "nginx".into(),
            cmd: vec!["nginx".into()],
            env: vec!["A=1".into()],
            exposed_ports: exposed,
            tty: true,
            host: HostConfig {
                binds: vec!["/srv:/data:ro".into()],
                network_mode: Some("container:web-u1".into()),
                nano_cpus: Some(500_000_000),
                memory_bytes: Some(134_217_728),
                ..HostConfig::default()
            },
            ..ContainerConfig::default()
        };
        let docker = to_docker_config(&config);
        assert_eq!(docker.image.as_deref(), Some("nginx"));
        assert!(docker.entrypoint.is_none());
        assert!(docker.exposed_ports.unwrap().contains_key("80/tcp"));
        assert_eq!(docker.tty, Some(true));
        let host = docker.host_config.unwrap();
        assert_eq!(host.binds.unwrap(), vec!["/srv:/data:ro".to_string()]);
        assert_eq!(host.network_mode.as_deref(), Some("container:web-u1"));
        assert_eq!(host.nano_cpus, Some(500_000_000));
        assert_eq!(host.memory, Some(134_217_728));
        assert!(host.ipc_mode.is_none());
    }
}
