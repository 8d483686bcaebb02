//! In-memory container engine.
//!
//! Keeps containers and images in a mutex-guarded table and records every
//! call in a journal, so tests can assert on ordering and on what was (or
//! was not) sent to the engine. Failures can be injected per operation
//! and target, `stop` can be gated on a barrier to observe concurrency,
//! and `create` can be stalled to cancel a pod mid-creation.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use minik8s_common::error::{Minik8sError, Result};
use minik8s_common::types::ContainerId;
use tokio::sync::Barrier;

use super::{ContainerConfig, ContainerDetails, ContainerEngine, ContainerSummary};
use crate::labels::LabelSelector;
use crate::stats::ContainerStats;

/// Engine primitive, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `create_container`.
    Create,
    /// `start_container`.
    Start,
    /// `stop_container`.
    Stop,
    /// `restart_container`.
    Restart,
    /// `remove_container`.
    Remove,
    /// `list_containers`.
    List,
    /// `inspect_container`.
    Inspect,
    /// `container_stats`.
    Stats,
    /// `container_logs`.
    Logs,
    /// `image_exists`.
    ImageExists,
    /// `pull_image`.
    Pull,
    /// `remove_image`.
    RemoveImage,
}

impl Operation {
    /// Returns the operation name used in engine errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create container",
            Self::Start => "start container",
            Self::Stop => "stop container",
            Self::Restart => "restart container",
            Self::Remove => "remove container",
            Self::List => "list containers",
            Self::Inspect => "inspect container",
            Self::Stats => "container stats",
            Self::Logs => "container logs",
            Self::ImageExists => "inspect image",
            Self::Pull => "pull image",
            Self::RemoveImage => "remove image",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded engine call. Container calls carry the engine name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCall {
    /// Primitive invoked.
    pub operation: Operation,
    /// Container engine name or image reference, empty for listings.
    pub target: String,
}

/// A container held by the fake engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeContainer {
    /// Engine ID.
    pub id: ContainerId,
    /// Engine name.
    pub name: String,
    /// Creation request as received.
    pub config: ContainerConfig,
    /// `created`, `running`, or `exited`.
    pub state: String,
    /// Creation sequence number.
    pub created: i64,
    /// Captured output.
    pub logs: String,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: Operation,
    target: Option<String>,
}

#[derive(Default)]
struct FakeState {
    containers: Vec<FakeContainer>,
    images: BTreeSet<String>,
    registry_missing: BTreeSet<String>,
    calls: Vec<EngineCall>,
    failures: Vec<InjectedFailure>,
    unavailable: bool,
    stop_gate: Option<Arc<Barrier>>,
    stalled_creates: BTreeSet<String>,
    next_seq: i64,
}

impl FakeState {
    fn by_id(&self, id: &ContainerId) -> Option<&FakeContainer> {
        self.containers.iter().find(|c| &c.id == id)
    }

    fn by_id_mut(&mut self, id: &ContainerId) -> Option<&mut FakeContainer> {
        self.containers.iter_mut().find(|c| &c.id == id)
    }

    fn name_of(&self, id: &ContainerId) -> String {
        self.by_id(id)
            .map_or_else(|| id.to_string(), |c| c.name.clone())
    }

    fn record(&mut self, operation: Operation, target: &str) -> Result<()> {
        self.calls.push(EngineCall {
            operation,
            target: target.to_string(),
        });
        if self.unavailable {
            return Err(Minik8sError::EngineUnavailable {
                message: "fake engine is down".into(),
            });
        }
        let injected = self.failures.iter().any(|f| {
            f.operation == operation && f.target.as_deref().is_none_or(|t| t == target)
        });
        if injected {
            return Err(rejected(operation, 500, format!("injected failure for {target:?}")));
        }
        Ok(())
    }
}

fn rejected(operation: Operation, status: u16, message: String) -> Minik8sError {
    Minik8sError::EngineRejected {
        operation: operation.as_str(),
        status,
        message,
    }
}

fn no_such_container(operation: Operation, id: &ContainerId) -> Minik8sError {
    rejected(operation, 404, format!("no such container: {id}"))
}

/// In-memory [`ContainerEngine`].
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    /// Creates an empty engine with no local images.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `reference` to the local image index.
    pub fn add_image(&self, reference: &str) {
        let _ = self.lock().images.insert(reference.to_string());
    }

    /// Makes pulls of `reference` fail with [`Minik8sError::ImageNotFound`].
    pub fn remove_from_registry(&self, reference: &str) {
        let _ = self.lock().registry_missing.insert(reference.to_string());
    }

    /// Fails every `operation` call whose target is `target`, or every
    /// call of that operation if `target` is `None`.
    pub fn fail(&self, operation: Operation, target: Option<&str>) {
        self.lock().failures.push(InjectedFailure {
            operation,
            target: target.map(str::to_string),
        });
    }

    /// Makes every call fail as if the engine daemon were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Makes `create_container` calls for `name` hang after being recorded.
    /// Only a dropped call future (e.g. on cancellation) ends them.
    pub fn stall_creates(&self, name: &str) {
        let _ = self.lock().stalled_creates.insert(name.to_string());
    }

    /// Makes every `stop_container` call wait on `barrier` before stopping.
    pub fn gate_stops(&self, barrier: Arc<Barrier>) {
        self.lock().stop_gate = Some(barrier);
    }

    /// Lets `stop_container` calls through again.
    pub fn ungate_stops(&self) {
        self.lock().stop_gate = None;
    }

    /// Sets the captured output of the container named `name`.
    pub fn set_logs(&self, name: &str, logs: &str) {
        if let Some(container) = self.lock().containers.iter_mut().find(|c| c.name == name) {
            container.logs = logs.to_string();
        }
    }

    /// Returns the call journal.
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Returns the calls of one operation, as targets, in call order.
    #[must_use]
    pub fn calls_of(&self, operation: Operation) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .map(|c| c.target.clone())
            .collect()
    }

    /// Returns every container, in creation order.
    #[must_use]
    pub fn containers(&self) -> Vec<FakeContainer> {
        self.lock().containers.clone()
    }

    /// Returns the container named `name`.
    #[must_use]
    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.lock().containers.iter().find(|c| c.name == name).cloned()
    }

    /// Reports whether `reference` is in the local image index.
    #[must_use]
    pub fn has_image(&self, reference: &str) -> bool {
        self.lock().images.contains(reference)
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn create_container(&self, name: &str, config: &ContainerConfig) -> Result<ContainerId> {
        let stalled = {
            let mut state = self.lock();
            state.record(Operation::Create, name)?;
            state.stalled_creates.contains(name)
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        let mut state = self.lock();
        if state.containers.iter().any(|c| c.name == name) {
            return Err(rejected(
                Operation::Create,
                409,
                format!("container name {name:?} is already in use"),
            ));
        }
        if !state.images.contains(&config.image) {
            return Err(rejected(
                Operation::Create,
                404,
                format!("no such image: {}", config.image),
            ));
        }
        state.next_seq += 1;
        let container = FakeContainer {
            id: ContainerId::generate(),
            name: name.to_string(),
            config: config.clone(),
            state: "created".into(),
            created: state.next_seq,
            logs: String::new(),
        };
        let id = container.id.clone();
        state.containers.push(container);
        Ok(id)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        let mut state = self.lock();
        let name = state.name_of(id);
        state.record(Operation::Start, &name)?;
        let container = state
            .by_id_mut(id)
            .ok_or_else(|| no_such_container(Operation::Start, id))?;
        container.state = "running".into();
        Ok(())
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<()> {
        let gate = {
            let mut state = self.lock();
            let name = state.name_of(id);
            state.record(Operation::Stop, &name)?;
            if state.by_id(id).is_none() {
                return Err(no_such_container(Operation::Stop, id));
            }
            state.stop_gate.clone()
        };
        if let Some(barrier) = gate {
            let _ = barrier.wait().await;
        }
        if let Some(container) = self.lock().by_id_mut(id) {
            container.state = "exited".into();
        }
        Ok(())
    }

    async fn restart_container(&self, id: &ContainerId) -> Result<()> {
        let mut state = self.lock();
        let name = state.name_of(id);
        state.record(Operation::Restart, &name)?;
        let container = state
            .by_id_mut(id)
            .ok_or_else(|| no_such_container(Operation::Restart, id))?;
        container.state = "running".into();
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()> {
        let mut state = self.lock();
        let name = state.name_of(id);
        state.record(Operation::Remove, &name)?;
        let container = state
            .by_id(id)
            .ok_or_else(|| no_such_container(Operation::Remove, id))?;
        if container.state == "running" && !force {
            return Err(rejected(
                Operation::Remove,
                409,
                format!("container {name:?} is running"),
            ));
        }
        state.containers.retain(|c| &c.id != id);
        Ok(())
    }

    async fn list_containers(&self, selector: &LabelSelector) -> Result<Vec<ContainerSummary>> {
        let mut state = self.lock();
        state.record(Operation::List, "")?;
        Ok(state
            .containers
            .iter()
            .filter(|c| selector.matches(&c.config.labels))
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                image: c.config.image.clone(),
                state: c.state.clone(),
                labels: c.config.labels.clone(),
                created: Some(c.created),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerDetails> {
        let mut state = self.lock();
        let name = state.name_of(id);
        state.record(Operation::Inspect, &name)?;
        let c = state
            .by_id(id)
            .ok_or_else(|| no_such_container(Operation::Inspect, id))?;
        Ok(ContainerDetails {
            id: c.id.clone(),
            name: c.name.clone(),
            image: c.config.image.clone(),
            state: c.state.clone(),
            running: c.state == "running",
            exit_code: (c.state == "exited").then_some(0),
            started_at: None,
            labels: c.config.labels.clone(),
        })
    }

    async fn container_stats(&self, id: &ContainerId) -> Result<ContainerStats> {
        let mut state = self.lock();
        let name = state.name_of(id);
        state.record(Operation::Stats, &name)?;
        let c = state
            .by_id(id)
            .ok_or_else(|| no_such_container(Operation::Stats, id))?;
        let limit = c
            .config
            .host
            .memory_bytes
            .and_then(|m| u64::try_from(m).ok())
            .unwrap_or(0);
        Ok(ContainerStats {
            container_id: c.id.clone(),
            online_cpus: 1,
            memory_limit_bytes: limit,
            ..ContainerStats::default()
        })
    }

    async fn container_logs(&self, id: &ContainerId) -> Result<String> {
        let mut state = self.lock();
        let name = state.name_of(id);
        state.record(Operation::Logs, &name)?;
        state
            .by_id(id)
            .map(|c| c.logs.clone())
            .ok_or_else(|| no_such_container(Operation::Logs, id))
    }

    async fn image_exists(&self, reference: &str) -> Result<bool> {
        let mut state = self.lock();
        state.record(Operation::ImageExists, reference)?;
        Ok(state.images.contains(reference))
    }

    async fn pull_image(&self, reference: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Operation::Pull, reference)?;
        if state.registry_missing.contains(reference) {
            return Err(Minik8sError::ImageNotFound {
                reference: reference.to_string(),
            });
        }
        let _ = state.images.insert(reference.to_string());
        Ok(())
    }

    async fn remove_image(&self, reference: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Operation::RemoveImage, reference)?;
        if !state.images.remove(reference) {
            return Err(rejected(
                Operation::RemoveImage,
                404,
                format!("no such image: {reference}"),
            ));
        }
        Ok(())
    }
}
