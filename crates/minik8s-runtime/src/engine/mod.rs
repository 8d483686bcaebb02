//! Container engine abstraction.
//!
//! The orchestration core talks to the engine only through
//! [`ContainerEngine`]. One instance is shared by every controller and
//! every concurrent task, so implementations must be safe for concurrent
//! use. No implementation retries.

pub mod docker;
#[cfg(any(test, feature = "testing"))]
pub mod fake;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use minik8s_common::error::{Minik8sError, Result};
use minik8s_common::types::ContainerId;
use serde::{Deserialize, Serialize};

use crate::labels::{LabelSelector, Labels};
use crate::stats::ContainerStats;

/// Transport protocol of an exposed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP.
    Tcp,
    /// UDP.
    Udp,
    /// SCTP.
    Sctp,
}

impl Protocol {
    /// Returns the lowercase engine spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Sctp => "sctp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Minik8sError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "sctp" => Ok(Self::Sctp),
            _ => Err(Minik8sError::InvalidPortSpec {
                spec: s.to_string(),
                reason: "protocol must be TCP, UDP, or SCTP".into(),
            }),
        }
    }
}

/// A container port exposed by the sandbox, keyed as `port/protocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExposedPort {
    /// Port number inside the pod.
    pub port: u16,
    /// Transport protocol.
    pub protocol: Protocol,
}

impl ExposedPort {
    /// Parses a port number and protocol as declared on a container.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::InvalidPortSpec`] if the port is not an
    /// integer in `1..=65535` or the protocol is unknown.
    pub fn parse(port: &str, protocol: &str) -> Result<Self> {
        let spec = format!("{}/{}", port.trim(), protocol.trim());
        let number: u16 = port.trim().parse().map_err(|_| Minik8sError::InvalidPortSpec {
            spec: spec.clone(),
            reason: "port must be an integer between 1 and 65535".into(),
        })?;
        if number == 0 {
            return Err(Minik8sError::InvalidPortSpec {
                spec,
                reason: "port must be an integer between 1 and 65535".into(),
            });
        }
        let protocol = protocol.parse::<Protocol>().map_err(|_| Minik8sError::InvalidPortSpec {
            spec,
            reason: "protocol must be TCP, UDP, or SCTP".into(),
        })?;
        Ok(Self {
            port: number,
            protocol,
        })
    }
}

impl fmt::Display for ExposedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// Creation request for one engine container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfig {
    /// Image reference.
    pub image: String,
    /// Entrypoint override.
    pub entrypoint: Vec<String>,
    /// Command arguments.
    pub cmd: Vec<String>,
    /// Working directory.
    pub working_dir: Option<String>,
    /// `KEY=VALUE` entries, in declaration order.
    pub env: Vec<String>,
    /// Labels, including the identity set.
    pub labels: Labels,
    /// Ports exposed by the container.
    pub exposed_ports: BTreeSet<ExposedPort>,
    /// Allocate a TTY.
    pub tty: bool,
    /// Host-side configuration.
    pub host: HostConfig,
}

/// Host-side part of a creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// `hostPath:containerPath[:ro]` bind mounts.
    pub binds: Vec<String>,
    /// Network namespace mode, e.g. `container:<name>`.
    pub network_mode: Option<String>,
    /// IPC namespace mode.
    pub ipc_mode: Option<String>,
    /// PID namespace mode.
    pub pid_mode: Option<String>,
    /// CPU limit in units of 10^-9 cores.
    pub nano_cpus: Option<i64>,
    /// Memory limit in bytes.
    pub memory_bytes: Option<i64>,
}

/// One row of an engine container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    /// Engine ID.
    pub id: ContainerId,
    /// Engine name, without the leading slash.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Engine state (`created`, `running`, `exited`, ...).
    pub state: String,
    /// Labels.
    pub labels: Labels,
    /// Creation time, seconds since the epoch.
    pub created: Option<i64>,
}

/// Detailed state of one engine container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerDetails {
    /// Engine ID.
    pub id: ContainerId,
    /// Engine name, without the leading slash.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Engine state.
    pub state: String,
    /// Whether the main process is running.
    pub running: bool,
    /// Exit code of the last run, if any.
    pub exit_code: Option<i64>,
    /// Start time as reported by the engine.
    pub started_at: Option<String>,
    /// Labels.
    pub labels: Labels,
}

/// Container engine primitives used by the orchestration core.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Short name of the engine, for logs.
    fn name(&self) -> &'static str;

    /// Creates (but does not start) a container named `name`.
    async fn create_container(&self, name: &str, config: &ContainerConfig) -> Result<ContainerId>;

    /// Starts a created container.
    async fn start_container(&self, id: &ContainerId) -> Result<()>;

    /// Stops a container. Stopping a container that is not running succeeds.
    async fn stop_container(&self, id: &ContainerId) -> Result<()>;

    /// Stops a container if it runs, then starts it again.
    async fn restart_container(&self, id: &ContainerId) -> Result<()>;

    /// Removes a container.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()>;

    /// Lists every container, running or not, carrying all labels of `selector`.
    async fn list_containers(&self, selector: &LabelSelector) -> Result<Vec<ContainerSummary>>;

    /// Returns the detailed state of a container.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerDetails>;

    /// Returns a one-shot resource usage sample.
    async fn container_stats(&self, id: &ContainerId) -> Result<ContainerStats>;

    /// Returns the stdout and stderr captured so far.
    async fn container_logs(&self, id: &ContainerId) -> Result<String>;

    /// Reports whether the local image index holds `reference`.
    async fn image_exists(&self, reference: &str) -> Result<bool>;

    /// Pulls `reference` from its registry.
    async fn pull_image(&self, reference: &str) -> Result<()>;

    /// Removes a local image.
    async fn remove_image(&self, reference: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposed_port_displays_engine_key() {
        let port = ExposedPort::parse("80", "TCP").unwrap();
        assert_eq!(port.to_string(), "80/tcp");
    }

    #[test]
    fn exposed_port_accepts_lowercase_protocols() {
        assert_eq!(ExposedPort::parse("53", "udp").unwrap().protocol, Protocol::Udp);
        assert_eq!(ExposedPort::parse(" 9000 ", "sctp").unwrap().port, 9000);
    }

    #[test]
    fn exposed_port_rejects_bad_numbers() {
        for bad in ["", "http", "0", "65536", "-1", "80-90"] {
            let err = ExposedPort::parse(bad, "tcp").unwrap_err();
            assert!(matches!(err, Minik8sError::InvalidPortSpec { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn exposed_port_rejects_unknown_protocol() {
        let err = ExposedPort::parse("80", "icmp").unwrap_err();
        assert!(err.to_string().contains("80/icmp"), "got: {err}");
    }

    #[test]
    fn exposed_ports_order_by_number_then_protocol() {
        let mut set = BTreeSet::new();
        let _ = set.insert(ExposedPort::parse("443", "tcp").unwrap());
        let _ = set.insert(ExposedPort::parse("80", "udp").unwrap());
        let _ = set.insert(ExposedPort::parse("80", "tcp").unwrap());
        let keys: Vec<_> = set.iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["80/tcp", "80/udp", "443/tcp"]);
    }
}
