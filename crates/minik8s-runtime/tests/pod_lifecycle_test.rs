//! End-to-end tests of pod creation and teardown against the in-memory engine.
//!
//! Covers:
//! 1. Sandbox-before-containers ordering
//! 2. Port, label, and namespace-join translation
//! 3. Volume binding failures
//! 4. Resource limit translation
//! 5. Idempotent sandbox removal
//! 6. Concurrent teardown with aggregated failures
//! 7. Cancellation before, during, and after creation, with cleanup

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use minik8s_api::{
    Container, ContainerPort, HostVolume, ObjectMeta, Pod, PodSpec, ResourceList,
    ResourceRequirements, VolumeMount,
};
use minik8s_common::constants::{
    DEFAULT_SANDBOX_IMAGE, POD_NAME_LABEL, POD_TYPE_LABEL, POD_UID_LABEL,
};
use minik8s_common::error::Minik8sError;
use minik8s_runtime::engine::fake::{FakeEngine, Operation};
use minik8s_runtime::PodOrchestrator;
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

fn container(name: &str, image: &str) -> Container {
    Container {
        name: name.into(),
        image: image.into(),
        ..Container::default()
    }
}

fn pod(name: &str, uid: &str, containers: Vec<Container>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: name.into(),
            uid: uid.into(),
            ..ObjectMeta::default()
        },
        spec: PodSpec {
            containers,
            ..PodSpec::default()
        },
        ..Pod::default()
    }
}

fn web_pod() -> Pod {
    let mut nginx = container("nginx", "nginx:latest");
    nginx.ports.push(ContainerPort {
        container_port: "80".into(),
        ..ContainerPort::default()
    });
    pod("web", "u1", vec![nginx])
}

fn three_container_pod() -> Pod {
    pod(
        "trio",
        "u3",
        vec![
            container("a", "busybox"),
            container("b", "busybox"),
            container("c", "busybox"),
        ],
    )
}

fn setup() -> (Arc<FakeEngine>, PodOrchestrator) {
    let engine = Arc::new(FakeEngine::new());
    let pods = PodOrchestrator::with_sandbox_image(engine.clone(), DEFAULT_SANDBOX_IMAGE);
    (engine, pods)
}

// ── Creation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn sandbox_is_created_before_any_container() {
    let (engine, pods) = setup();
    let _ = pods
        .create_pod(&three_container_pod(), &CancellationToken::new())
        .await
        .unwrap();

    let creates = engine.calls_of(Operation::Create);
    assert_eq!(creates.first().map(String::as_str), Some("trio-u3"));
    assert_eq!(creates.len(), 4);

    let calls = engine.calls();
    let sandbox_start = calls
        .iter()
        .position(|c| c.operation == Operation::Start && c.target == "trio-u3")
        .unwrap();
    let first_container_create = calls
        .iter()
        .position(|c| c.operation == Operation::Create && c.target != "trio-u3")
        .unwrap();
    assert!(sandbox_start < first_container_create);
}

#[tokio::test]
async fn web_scenario_translates_identity_ports_and_namespaces() {
    let (engine, pods) = setup();
    let token = pods
        .create_pod(&web_pod(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(token.as_str(), "web-u1");

    let sandbox = engine.container("web-u1").unwrap();
    assert_eq!(sandbox.config.labels[POD_NAME_LABEL], "web");
    assert_eq!(sandbox.config.labels[POD_UID_LABEL], "u1");
    assert_eq!(sandbox.config.labels[POD_TYPE_LABEL], "pause");
    let exposed: Vec<_> = sandbox
        .config
        .exposed_ports
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(exposed, vec!["80/tcp"]);

    let nginx = engine.container("web-u1-nginx").unwrap();
    assert_eq!(nginx.state, "running");
    assert_eq!(nginx.config.host.network_mode.as_deref(), Some("container:web-u1"));
    assert!(nginx.config.host.binds.is_empty());
    assert_eq!(nginx.config.labels[POD_TYPE_LABEL], "generic");
}

#[test]
fn port_without_protocol_or_host_ip_gets_defaults() {
    let (_, pods) = setup();
    let config = pods.sandboxes().generate_sandbox_config(&web_pod()).unwrap();
    assert_eq!(config.ports.len(), 1);
    assert_eq!(config.ports[0].port.to_string(), "80/tcp");
    assert_eq!(config.ports[0].host_ip, "127.0.0.1");
}

#[tokio::test]
async fn invalid_port_aborts_before_anything_is_created() {
    let (engine, pods) = setup();
    let mut p = web_pod();
    p.spec.containers[0].ports[0].protocol = Some("http".into());
    let err = pods
        .create_pod(&p, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Minik8sError::InvalidPortSpec { .. }));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn dangling_mount_fails_without_engine_create() {
    let (engine, pods) = setup();
    let mut p = web_pod();
    p.spec.volumes.push(HostVolume {
        name: "html".into(),
        kind: "HostPath".into(),
        path: "/srv/html".into(),
    });
    p.spec.containers[0].volume_mounts.push(VolumeMount {
        name: "logs".into(),
        mount_path: "/var/log/nginx".into(),
        read_only: false,
    });
    let err = pods
        .create_pod(&p, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Minik8sError::VolumeNotFound { ref volume, .. } if volume == "logs"));
    assert_eq!(engine.calls_of(Operation::Create), vec!["web-u1"]);
}

#[tokio::test]
async fn resource_limits_reach_the_engine() {
    let (engine, pods) = setup();
    let mut app = container("app", "busybox");
    app.resources = ResourceRequirements {
        limits: ResourceList {
            cpu: Some("2".into()),
            memory: Some("134217728".into()),
        },
        ..ResourceRequirements::default()
    };
    let _ = pods
        .create_pod(&pod("res", "u9", vec![app]), &CancellationToken::new())
        .await
        .unwrap();
    let created = engine.container("res-u9-app").unwrap();
    assert_eq!(created.config.host.nano_cpus, Some(2_000_000_000));
    assert_eq!(created.config.host.memory_bytes, Some(134_217_728));
}

#[tokio::test]
async fn unavailable_engine_aborts_creation() {
    let (engine, pods) = setup();
    engine.set_unavailable(true);
    let err = pods
        .create_pod(&web_pod(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_engine_unavailable());
    assert!(engine.calls_of(Operation::Create).is_empty());
}

// ── Sandbox removal ──────────────────────────────────────────────────

#[tokio::test]
async fn remove_sandbox_twice_succeeds() {
    let (engine, pods) = setup();
    let p = web_pod();
    let cancel = CancellationToken::new();
    let _ = pods.sandboxes().create_sandbox(&p, &cancel).await.unwrap();

    pods.sandboxes().remove_sandbox(&p, &cancel).await.unwrap();
    pods.sandboxes().remove_sandbox(&p, &cancel).await.unwrap();
    assert!(engine.containers().is_empty());
}

// ── Teardown ─────────────────────────────────────────────────────────

#[tokio::test]
async fn kill_pod_attempts_all_removals_concurrently_and_reports_every_failure() {
    let (engine, pods) = setup();
    let p = three_container_pod();
    let cancel = CancellationToken::new();
    let _ = pods.create_pod(&p, &cancel).await.unwrap();

    // Each stop waits until all three are in flight at once.
    engine.gate_stops(Arc::new(Barrier::new(3)));
    engine.fail(Operation::Remove, Some("trio-u3-b"));
    engine.fail(Operation::Remove, Some("trio-u3-c"));

    let err = tokio::time::timeout(Duration::from_secs(5), pods.kill_pod(&p, &cancel))
        .await
        .expect("removals did not run concurrently")
        .unwrap_err();

    let Minik8sError::Teardown { pod, failures } = err else {
        panic!("expected teardown error, got {err}");
    };
    assert_eq!(pod, "trio");
    let mut failed: Vec<_> = failures.iter().map(|f| f.container.as_str()).collect();
    failed.sort_unstable();
    assert_eq!(failed, vec!["b", "c"]);

    let mut attempted = engine.calls_of(Operation::Remove);
    attempted.sort();
    assert_eq!(attempted, vec!["trio-u3-a", "trio-u3-b", "trio-u3-c"]);

    assert!(engine.container("trio-u3").is_some(), "sandbox must survive");
    assert!(engine.container("trio-u3-a").is_none());
}

#[tokio::test]
async fn kill_pod_removes_sandbox_last() {
    let (engine, pods) = setup();
    let p = three_container_pod();
    let cancel = CancellationToken::new();
    let _ = pods.create_pod(&p, &cancel).await.unwrap();

    pods.kill_pod(&p, &cancel).await.unwrap();
    let removed = engine.calls_of(Operation::Remove);
    assert_eq!(removed.len(), 4);
    assert_eq!(removed.last().map(String::as_str), Some("trio-u3"));
    assert!(engine.containers().is_empty());
}

#[tokio::test]
async fn teardown_error_lists_every_container() {
    let (engine, pods) = setup();
    let p = three_container_pod();
    let cancel = CancellationToken::new();
    let _ = pods.create_pod(&p, &cancel).await.unwrap();
    engine.fail(Operation::Stop, None);

    let err = pods.kill_pod(&p, &cancel).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("3 container(s)"), "got: {message}");
    for name in ["a", "b", "c"] {
        assert!(message.contains(name), "{name} missing from: {message}");
    }
}

// ── Cancellation ─────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_token_stops_creation_before_engine_work() {
    let (engine, pods) = setup();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = pods.create_pod(&web_pod(), &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn cancellation_mid_creation_leaves_a_killable_pod() {
    let (engine, pods) = setup();
    let p = three_container_pod();
    engine.stall_creates("trio-u3-b");
    let cancel = CancellationToken::new();

    let cancel_once_b_is_requested = async {
        while !engine
            .calls_of(Operation::Create)
            .iter()
            .any(|name| name == "trio-u3-b")
        {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
    };
    let (created, ()) = tokio::time::timeout(
        Duration::from_secs(5),
        async { tokio::join!(pods.create_pod(&p, &cancel), cancel_once_b_is_requested) },
    )
    .await
    .expect("creation did not observe cancellation");

    let err = created.unwrap_err();
    assert!(err.is_cancelled(), "got: {err}");
    assert_eq!(engine.container("trio-u3").unwrap().state, "running");
    assert_eq!(engine.container("trio-u3-a").unwrap().state, "running");
    assert!(engine.container("trio-u3-b").is_none());
    assert!(engine.container("trio-u3-c").is_none());

    pods.kill_pod(&p, &CancellationToken::new()).await.unwrap();
    assert!(engine.containers().is_empty());
}

#[tokio::test]
async fn cancelled_teardown_can_be_retried() {
    let (engine, pods) = setup();
    let p = three_container_pod();
    let _ = pods.create_pod(&p, &CancellationToken::new()).await.unwrap();

    // Four parties, three stops: every stop blocks until cancelled.
    engine.gate_stops(Arc::new(Barrier::new(4)));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let _ = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let err = pods.kill_pod(&p, &cancel).await.unwrap_err();
    let Minik8sError::Teardown { failures, .. } = err else {
        panic!("expected teardown error, got {err}");
    };
    assert_eq!(failures.len(), 3);
    assert!(failures.iter().all(|f| f.error.is_cancelled()));
    assert!(engine.container("trio-u3").is_some());

    engine.ungate_stops();
    pods.kill_pod(&p, &CancellationToken::new()).await.unwrap();
    assert!(engine.containers().is_empty());
}

#[tokio::test]
async fn partially_created_pod_can_be_killed() {
    let (engine, pods) = setup();
    let p = three_container_pod();
    engine.fail(Operation::Start, Some("trio-u3-b"));
    assert!(pods.create_pod(&p, &CancellationToken::new()).await.is_err());
    assert!(engine.container("trio-u3-c").is_none());

    pods.kill_pod(&p, &CancellationToken::new()).await.unwrap();
    assert!(engine.containers().is_empty());
}

// ── Manifests ────────────────────────────────────────────────────────

#[tokio::test]
async fn manifest_file_drives_a_full_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pod.yaml");
    std::fs::write(
        &path,
        r"
metadata:
  name: cache
  uid: u7
  labels:
    tier: backend
spec:
  volumes:
    - name: data
      type: HostPath
      path: /srv/redis
  containers:
    - name: redis
      image: redis:7
      volumeMounts:
        - name: data
          mountPath: /data
      ports:
        - containerPort: 6379
",
    )
    .unwrap();
    let p = minik8s_api::manifest::load(&path).unwrap();

    let (engine, pods) = setup();
    let cancel = CancellationToken::new();
    let _ = pods.create_pod(&p, &cancel).await.unwrap();
    let redis = engine.container("cache-u7-redis").unwrap();
    assert_eq!(redis.config.host.binds, vec!["/srv/redis:/data"]);
    assert_eq!(redis.config.labels["tier"], "backend");
    assert_eq!(pods.pod_containers(&p, &cancel).await.unwrap().len(), 2);

    pods.kill_pod(&p, &cancel).await.unwrap();
    assert!(pods.list_managed(&cancel).await.unwrap().is_empty());
}
