//! Resource usage samples.
//!
//! The engine reports cumulative CPU counters together with the previous
//! sample's counters, so a single one-shot read is enough to derive a
//! usage percentage.

use minik8s_common::types::ContainerId;
use serde::{Deserialize, Serialize};

/// One resource usage sample of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStats {
    /// Container this sample belongs to.
    pub container_id: ContainerId,
    /// Cumulative CPU time of the container, in nanoseconds.
    pub cpu_total_ns: u64,
    /// Same counter at the previous sample.
    pub precpu_total_ns: u64,
    /// Cumulative CPU time of the host, in nanoseconds.
    pub system_cpu_ns: u64,
    /// Same counter at the previous sample.
    pub presystem_cpu_ns: u64,
    /// Number of CPUs visible to the container.
    pub online_cpus: u64,
    /// Memory usage in bytes.
    pub memory_usage_bytes: u64,
    /// Memory limit in bytes.
    pub memory_limit_bytes: u64,
}

impl ContainerStats {
    /// CPU usage since the previous sample, in percent of one CPU.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cpu_percent(&self) -> f64 {
        let cpu_delta = self.cpu_total_ns.saturating_sub(self.precpu_total_ns);
        let system_delta = self.system_cpu_ns.saturating_sub(self.presystem_cpu_ns);
        if cpu_delta == 0 || system_delta == 0 {
            return 0.0;
        }
        let cpus = self.online_cpus.max(1);
        cpu_delta as f64 / system_delta as f64 * cpus as f64 * 100.0
    }

    /// Memory usage in percent of the limit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn memory_percent(&self) -> f64 {
        if self.memory_limit_bytes == 0 {
            return 0.0;
        }
        self.memory_usage_bytes as f64 / self.memory_limit_bytes as f64 * 100.0
    }
}

/// A container's sample, tagged with its logical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedStats {
    /// Logical container name, or the sandbox token for the sandbox.
    pub container: String,
    /// The sample.
    pub stats: ContainerStats,
}

/// Resource usage of every engine container of a pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStats {
    /// Pod name.
    pub pod: String,
    /// Per-container samples.
    pub containers: Vec<NamedStats>,
}

impl PodStats {
    /// Sum of the containers' CPU usage.
    #[must_use]
    pub fn cpu_percent(&self) -> f64 {
        self.containers.iter().map(|c| c.stats.cpu_percent()).sum()
    }

    /// Sum of the containers' memory usage, in bytes.
    #[must_use]
    pub fn memory_usage_bytes(&self) -> u64 {
        self.containers
            .iter()
            .map(|c| c.stats.memory_usage_bytes)
            .sum()
    }

    /// Memory usage in percent of the largest container limit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn memory_percent(&self) -> f64 {
        let limit = self
            .containers
            .iter()
            .map(|c| c.stats.memory_limit_bytes)
            .max()
            .unwrap_or(0);
        if limit == 0 {
            return 0.0;
        }
        self.memory_usage_bytes() as f64 / limit as f64 * 100.0
    }
}
