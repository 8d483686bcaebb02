//! Label namespace, well-known images, and engine string formats.
//!
//! The label keys must match exactly: the status reporter and any other
//! tool sharing the host address minik8s containers through them.

/// Label carrying the owning pod's name.
pub const POD_NAME_LABEL: &str = "io.minik8s.pod.name";

/// Label carrying the owning pod's namespace.
pub const POD_NAMESPACE_LABEL: &str = "io.minik8s.pod.namespace";

/// Label carrying the owning pod's UID.
pub const POD_UID_LABEL: &str = "io.minik8s.pod.uid";

/// Label distinguishing sandbox containers from generic ones.
pub const POD_TYPE_LABEL: &str = "io.minik8s.pod.type";

/// `POD_TYPE_LABEL` value of the pause (sandbox) container.
pub const POD_TYPE_SANDBOX: &str = "pause";

/// `POD_TYPE_LABEL` value of an ordinary pod container.
pub const POD_TYPE_GENERIC: &str = "generic";

/// Label carrying the logical container name inside the pod.
pub const CONTAINER_NAME_LABEL: &str = "containerName";

/// Marker label key set on every container created by minik8s.
pub const MANAGED_LABEL: &str = "minik8s";

/// Value of [`MANAGED_LABEL`].
pub const MANAGED_LABEL_VALUE: &str = "_true";

/// Default image of the pause container.
pub const DEFAULT_SANDBOX_IMAGE: &str = "k8s.gcr.io/pause:3.1";

/// Namespace used when a pod does not declare one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Prefix of a namespace mode that joins another container's namespace.
pub const NS_MODE_CONTAINER_PREFIX: &str = "container:";

/// IPC mode of the sandbox, allowing other containers to join it.
pub const IPC_MODE_SHAREABLE: &str = "shareable";

/// Host IP used for a port declaration without one.
pub const LOOPBACK_HOST_IP: &str = "127.0.0.1";

/// Nano-CPU units per CPU core.
pub const NANO_CPUS_PER_CORE: i64 = 1_000_000_000;

/// Default engine request timeout in seconds.
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 120;

/// Default tracing filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "kubelet";
