//! Observed pod state.
//!
//! These types are written by the status reporter, never by the
//! orchestration core.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse lifecycle phase of a pod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    /// Accepted, but not every container has started.
    #[default]
    Pending,
    /// Every container has started and at least one is still running.
    Running,
    /// Every container exited with code 0.
    Succeeded,
    /// Every container exited and at least one failed.
    Failed,
    /// State could not be obtained.
    Unknown,
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Engine-level state of one container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Created but never started.
    #[default]
    Created,
    /// Running.
    Running,
    /// Exited.
    Exited,
    /// Any other engine state.
    Unknown,
}

impl ContainerState {
    /// Maps an engine state string (`running`, `exited`, ...) to a state.
    #[must_use]
    pub fn from_engine(state: &str) -> Self {
        match state {
            "created" => Self::Created,
            "running" | "restarting" | "paused" => Self::Running,
            "exited" | "dead" | "removing" => Self::Exited,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Exited => write!(f, "exited"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Status of one container of a pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    /// Logical container name.
    pub name: String,
    /// Engine container ID, once created.
    #[serde(default)]
    pub container_id: Option<String>,
    /// Engine state.
    pub state: ContainerState,
    /// Readiness flag.
    #[serde(default)]
    pub ready: bool,
    /// Startup flag.
    #[serde(default)]
    pub started: bool,
    /// Exit code, once exited.
    #[serde(default)]
    pub exit_code: Option<i64>,
}

/// Observed state of a pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    /// Lifecycle phase.
    #[serde(default)]
    pub phase: PodPhase,
    /// IP shared by every container of the pod.
    #[serde(default, rename = "podIP")]
    pub pod_ip: Option<String>,
    /// Per-container status.
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
    /// Last time the status was written.
    #[serde(default, rename = "lastUpdateTime")]
    pub update_time: Option<DateTime<Utc>>,
    /// CPU usage of the pod in percent of the host.
    #[serde(default)]
    pub cpu_percent: f64,
    /// Memory usage of the pod in percent of its limit.
    #[serde(default)]
    pub mem_percent: f64,
}

impl PodStatus {
    /// Returns `true` if nothing has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns the status of a container by name.
    #[must_use]
    pub fn container(&self, name: &str) -> Option<&ContainerStatus> {
        self.container_statuses.iter().find(|c| c.name == name)
    }

    /// Returns the status of a container by name, inserting an empty one if absent.
    pub fn container_mut(&mut self, name: &str) -> &mut ContainerStatus {
        let idx = match self.container_statuses.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                self.container_statuses.push(ContainerStatus {
                    name: name.to_string(),
                    ..ContainerStatus::default()
                });
                self.container_statuses.len() - 1
            }
        };
        &mut self.container_statuses[idx]
    }
}
