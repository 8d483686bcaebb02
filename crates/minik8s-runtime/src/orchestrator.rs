//! Pod-level orchestration.
//!
//! Composes the sandbox and container controllers into whole-pod
//! creation and teardown. Nothing is persisted between calls: every
//! operation rediscovers engine containers through their labels.

use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use minik8s_api::Pod;
use minik8s_common::config::KubeletConfig;
use minik8s_common::constants::{CONTAINER_NAME_LABEL, POD_TYPE_GENERIC, POD_TYPE_LABEL};
use minik8s_common::error::{Minik8sError, Result, TeardownFailure};
use tokio_util::sync::CancellationToken;

use crate::cancel::guarded;
use crate::container::ContainerController;
use crate::engine::{ContainerDetails, ContainerEngine, ContainerSummary};
use crate::image::ImageResolver;
use crate::labels::{self, SandboxToken};
use crate::sandbox::SandboxController;
use crate::stats::{NamedStats, PodStats};

/// Creates and kills pods on one container engine.
pub struct PodOrchestrator {
    engine: Arc<dyn ContainerEngine>,
    images: ImageResolver,
    sandboxes: SandboxController,
    containers: ContainerController,
}

impl PodOrchestrator {
    /// Creates an orchestrator using the sandbox image from `config`.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>, config: &KubeletConfig) -> Self {
        Self::with_sandbox_image(engine, &config.sandbox_image)
    }

    /// Creates an orchestrator running `sandbox_image` as the pause container.
    #[must_use]
    pub fn with_sandbox_image(engine: Arc<dyn ContainerEngine>, sandbox_image: &str) -> Self {
        let images = ImageResolver::new(Arc::clone(&engine));
        Self {
            sandboxes: SandboxController::new(Arc::clone(&engine), images.clone(), sandbox_image),
            containers: ContainerController::new(Arc::clone(&engine), images.clone()),
            images,
            engine,
        }
    }

    /// Returns the image resolver.
    #[must_use]
    pub const fn images(&self) -> &ImageResolver {
        &self.images
    }

    /// Returns the sandbox controller.
    #[must_use]
    pub const fn sandboxes(&self) -> &SandboxController {
        &self.sandboxes
    }

    /// Returns the container controller.
    #[must_use]
    pub const fn containers(&self) -> &ContainerController {
        &self.containers
    }

    /// Creates the sandbox of `pod`, then creates and starts each of its
    /// containers, init containers first, in declaration order.
    ///
    /// Stops at the first failure without rolling back: whatever was
    /// created stays addressable by label and is cleaned up by
    /// [`Self::kill_pod`].
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub async fn create_pod(&self, pod: &Pod, cancel: &CancellationToken) -> Result<SandboxToken> {
        tracing::info!(pod = %pod.name(), uid = %pod.uid(), engine = self.engine.name(), "creating pod");
        let token = self.sandboxes.create_sandbox(pod, cancel).await?;
        for container in pod.spec.all_containers() {
            let _ = self
                .containers
                .create_container(pod, container, &token, cancel)
                .await?;
            self.containers
                .start_container(pod, &container.name, cancel)
                .await?;
        }
        tracing::info!(pod = %pod.name(), sandbox = %token, "pod created");
        Ok(token)
    }

    /// Removes every container of `pod` concurrently, then its sandbox.
    ///
    /// The containers to remove are discovered through their labels, so a
    /// pod whose creation failed or was cancelled part way is cleaned up
    /// just the same. Every removal runs to completion; the sandbox is
    /// removed only if all of them succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::Teardown`] carrying every failed removal, or
    /// the listing or sandbox removal error.
    pub async fn kill_pod(&self, pod: &Pod, cancel: &CancellationToken) -> Result<()> {
        let mut names: Vec<String> = self
            .pod_containers(pod, cancel)
            .await?
            .into_iter()
            .filter(|c| c.labels.get(POD_TYPE_LABEL).map(String::as_str) == Some(POD_TYPE_GENERIC))
            .filter_map(|c| c.labels.get(CONTAINER_NAME_LABEL).cloned())
            .collect();
        names.sort_unstable();
        names.dedup();
        tracing::info!(pod = %pod.name(), containers = names.len(), "killing pod");

        let shared = Arc::new(pod.clone());
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let containers = self.containers.clone();
                let pod = Arc::clone(&shared);
                let name = name.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { containers.remove_container(&pod, &name, &cancel).await })
            })
            .collect();
        let results = join_all(handles).await;

        let failures: Vec<TeardownFailure> = names
            .into_iter()
            .zip(results)
            .filter_map(|(container, joined)| {
                let error = match joined {
                    Ok(Ok(())) => return None,
                    Ok(Err(e)) => e,
                    Err(e) => Minik8sError::TaskFailed {
                        message: e.to_string(),
                    },
                };
                tracing::warn!(pod = %pod.name(), container = %container, error = %error, "container removal failed");
                Some(TeardownFailure { container, error })
            })
            .collect();
        if !failures.is_empty() {
            return Err(Minik8sError::Teardown {
                pod: pod.name().to_string(),
                failures,
            });
        }

        self.sandboxes.remove_sandbox(pod, cancel).await?;
        tracing::info!(pod = %pod.name(), "pod killed");
        Ok(())
    }

    /// Lists every engine container managed by minik8s.
    ///
    /// # Errors
    ///
    /// Returns an engine error.
    pub async fn list_managed(&self, cancel: &CancellationToken) -> Result<Vec<ContainerSummary>> {
        guarded(
            cancel,
            "container listing",
            self.engine.list_containers(&labels::managed_selector()),
        )
        .await
    }

    /// Lists the engine containers of `pod`, sandbox included.
    ///
    /// # Errors
    ///
    /// Returns an engine error.
    pub async fn pod_containers(
        &self,
        pod: &Pod,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContainerSummary>> {
        guarded(
            cancel,
            "container listing",
            self.engine.list_containers(&labels::pod_selector(pod)),
        )
        .await
    }

    /// Returns the captured output of one container of `pod`.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::ContainerNotFound`] or an engine error.
    pub async fn container_logs(
        &self,
        pod: &Pod,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.containers.logs(pod, container, cancel).await
    }

    /// Returns the engine state of one container of `pod`.
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::ContainerNotFound`] or an engine error.
    pub async fn inspect_container(
        &self,
        pod: &Pod,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<ContainerDetails> {
        self.containers.inspect(pod, container, cancel).await
    }

    /// Samples the resource usage of every engine container of `pod`.
    ///
    /// # Errors
    ///
    /// Returns the first engine error.
    pub async fn pod_stats(&self, pod: &Pod, cancel: &CancellationToken) -> Result<PodStats> {
        let targets = self.pod_containers(pod, cancel).await?;
        let sandbox = SandboxToken::for_pod(pod);
        let sandbox = sandbox.as_str();
        let samples = try_join_all(targets.iter().map(|target| async move {
            let stats = guarded(cancel, "container stats", self.engine.container_stats(&target.id)).await?;
            let container = target
                .labels
                .get(CONTAINER_NAME_LABEL)
                .cloned()
                .unwrap_or_else(|| sandbox.to_string());
            Ok::<_, Minik8sError>(NamedStats { container, stats })
        }))
        .await?;
        Ok(PodStats {
            pod: pod.name().to_string(),
            containers: samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use minik8s_api::{Container, ObjectMeta, PodSpec};
    use minik8s_common::constants::DEFAULT_SANDBOX_IMAGE;

    use super::*;
    use crate::engine::fake::{FakeEngine, Operation};

    fn pod() -> Pod {
        let container = |name: &str, image: &str| Container {
            name: name.into(),
            image: image.into(),
            ..Container::default()
        };
        Pod {
            metadata: ObjectMeta {
                name: "web".into(),
                uid: "u1".into(),
                ..ObjectMeta::default()
            },
            spec: PodSpec {
                init_containers: vec![container("setup", "busybox")],
                containers: vec![container("nginx", "nginx"), container("redis", "redis")],
                ..PodSpec::default()
            },
            ..Pod::default()
        }
    }

    fn orchestrator() -> (Arc<FakeEngine>, PodOrchestrator) {
        let engine = Arc::new(FakeEngine::new());
        let pods = PodOrchestrator::with_sandbox_image(engine.clone(), DEFAULT_SANDBOX_IMAGE);
        (engine, pods)
    }

    #[tokio::test]
    async fn create_runs_init_containers_first() {
        let (engine, pods) = orchestrator();
        let token = pods.create_pod(&pod(), &CancellationToken::new()).await.unwrap();
        assert_eq!(token.as_str(), "web-u1");
        assert_eq!(
            engine.calls_of(Operation::Create),
            vec!["web-u1", "web-u1-setup", "web-u1-nginx", "web-u1-redis"]
        );
        assert_eq!(
            engine.calls_of(Operation::Start),
            vec!["web-u1", "web-u1-setup", "web-u1-nginx", "web-u1-redis"]
        );
    }

    #[tokio::test]
    async fn create_stops_at_first_failure_without_rollback() {
        let (engine, pods) = orchestrator();
        engine.fail(Operation::Create, Some("web-u1-nginx"));
        let err = pods.create_pod(&pod(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Minik8sError::EngineRejected { .. }));
        let names: Vec<_> = engine.containers().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["web-u1", "web-u1-setup"]);
        assert!(engine.calls_of(Operation::Remove).is_empty());
    }

    #[tokio::test]
    async fn kill_removes_everything() {
        let (engine, pods) = orchestrator();
        let cancel = CancellationToken::new();
        let _ = pods.create_pod(&pod(), &cancel).await.unwrap();
        pods.kill_pod(&pod(), &cancel).await.unwrap();
        assert!(engine.containers().is_empty());
        assert_eq!(engine.calls_of(Operation::Remove).last().map(String::as_str), Some("web-u1"));
    }

    #[tokio::test]
    async fn kill_cleans_up_partial_pod() {
        let (engine, pods) = orchestrator();
        let cancel = CancellationToken::new();
        engine.fail(Operation::Create, Some("web-u1-redis"));
        assert!(pods.create_pod(&pod(), &cancel).await.is_err());

        pods.kill_pod(&pod(), &cancel).await.unwrap();
        assert!(engine.containers().is_empty());
    }

    #[tokio::test]
    async fn kill_of_unknown_pod_is_a_no_op() {
        let (engine, pods) = orchestrator();
        pods.kill_pod(&pod(), &CancellationToken::new()).await.unwrap();
        assert!(engine.calls_of(Operation::Remove).is_empty());
    }

    #[tokio::test]
    async fn listings_are_scoped() {
        let (_, pods) = orchestrator();
        let cancel = CancellationToken::new();
        let _ = pods.create_pod(&pod(), &cancel).await.unwrap();
        let mut other = pod();
        other.metadata.uid = "u2".into();
        let _ = pods.create_pod(&other, &cancel).await.unwrap();

        assert_eq!(pods.list_managed(&cancel).await.unwrap().len(), 8);
        assert_eq!(pods.pod_containers(&pod(), &cancel).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn stats_name_each_container() {
        let (_, pods) = orchestrator();
        let cancel = CancellationToken::new();
        let _ = pods.create_pod(&pod(), &cancel).await.unwrap();
        let stats = pods.pod_stats(&pod(), &cancel).await.unwrap();
        let mut names: Vec<_> = stats.containers.iter().map(|c| c.container.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["nginx", "redis", "setup", "web-u1"]);
    }
}
