//! Pod status bookkeeping.
//!
//! The orchestration core never writes status. A reporter polls the
//! engine after orchestration calls return and records what it sees here,
//! keyed by pod UID.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use minik8s_api::{ContainerState, Pod, PodPhase, PodStatus};
use minik8s_common::constants::CONTAINER_NAME_LABEL;

use crate::engine::ContainerSummary;
use crate::stats::PodStats;

/// Read and write access to observed pod status.
pub trait StatusReporter: Send + Sync {
    /// Returns the last recorded status of the pod with `uid`.
    fn pod_status(&self, uid: &str) -> Option<PodStatus>;

    /// Replaces the status of `pod`, stamping the update time.
    fn set_pod_status(&self, pod: &Pod, status: PodStatus);

    /// Sets the readiness flag of one container.
    fn set_container_readiness(&self, uid: &str, container: &str, ready: bool);

    /// Sets the startup flag of one container.
    fn set_container_startup(&self, uid: &str, container: &str, started: bool);

    /// Marks every container of `pod` exited and the pod failed, unless it
    /// already finished.
    fn terminate_pod(&self, pod: &Pod);

    /// Drops the status of every pod whose UID is not in `live`.
    fn remove_orphaned_statuses(&self, live: &HashSet<String>);
}

/// In-memory [`StatusReporter`].
#[derive(Debug, Default)]
pub struct StatusCache {
    statuses: RwLock<HashMap<String, PodStatus>>,
}

impl StatusCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pods tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no pod is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records the engine state of every container listed for `pod`.
    ///
    /// The sandbox carries no container name and is skipped.
    pub fn observe_containers(&self, pod: &Pod, containers: &[ContainerSummary]) {
        self.update(pod.uid(), |status| {
            for summary in containers {
                let Some(name) = summary.labels.get(CONTAINER_NAME_LABEL) else {
                    continue;
                };
                let entry = status.container_mut(name);
                entry.container_id = Some(summary.id.to_string());
                entry.state = ContainerState::from_engine(&summary.state);
            }
        });
    }

    /// Records the resource usage of `pod`.
    pub fn observe_stats(&self, pod: &Pod, stats: &PodStats) {
        self.update(pod.uid(), |status| {
            status.cpu_percent = stats.cpu_percent();
            status.mem_percent = stats.memory_percent();
        });
    }

    fn update(&self, uid: &str, apply: impl FnOnce(&mut PodStatus)) {
        let mut statuses = self.statuses.write().unwrap_or_else(PoisonError::into_inner);
        let status = statuses.entry(uid.to_string()).or_default();
        apply(status);
        status.update_time = Some(Utc::now());
    }
}

impl StatusReporter for StatusCache {
    fn pod_status(&self, uid: &str) -> Option<PodStatus> {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uid)
            .cloned()
    }

    fn set_pod_status(&self, pod: &Pod, status: PodStatus) {
        tracing::debug!(pod = %pod.name(), phase = %status.phase, "pod status set");
        self.update(pod.uid(), |current| *current = status);
    }

    fn set_container_readiness(&self, uid: &str, container: &str, ready: bool) {
        self.update(uid, |status| status.container_mut(container).ready = ready);
    }

    fn set_container_startup(&self, uid: &str, container: &str, started: bool) {
        self.update(uid, |status| status.container_mut(container).started = started);
    }

    fn terminate_pod(&self, pod: &Pod) {
        tracing::debug!(pod = %pod.name(), "terminating pod status");
        self.update(pod.uid(), |status| {
            for container in pod.spec.all_containers() {
                let entry = status.container_mut(&container.name);
                entry.state = ContainerState::Exited;
                entry.ready = false;
            }
            if !matches!(status.phase, PodPhase::Succeeded | PodPhase::Failed) {
                status.phase = PodPhase::Failed;
            }
        });
    }

    fn remove_orphaned_statuses(&self, live: &HashSet<String>) {
        let mut statuses = self.statuses.write().unwrap_or_else(PoisonError::into_inner);
        let before = statuses.len();
        statuses.retain(|uid, _| live.contains(uid));
        if statuses.len() < before {
            tracing::debug!(removed = before - statuses.len(), "orphaned pod statuses dropped");
        }
    }
}
