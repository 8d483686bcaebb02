//! Container declarations inside a pod spec.

use minik8s_common::types::ImagePullPolicy;
use serde::{Deserialize, Deserializer, Serialize};

/// A single container of a pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Name, unique within the pod.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Entrypoint override.
    #[serde(default)]
    pub command: Vec<String>,
    /// Arguments to the entrypoint.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory inside the container.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Ports the container listens on.
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    /// Environment variables, in declaration order.
    #[serde(default)]
    pub env: Vec<EnvVar>,
    /// Resource requests and limits.
    #[serde(default)]
    pub resources: ResourceRequirements,
    /// Pod volumes mounted into this container.
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
    /// Liveness probe. Not executed by the runtime.
    #[serde(default)]
    pub liveness_probe: Option<Probe>,
    /// Readiness probe. Not executed by the runtime.
    #[serde(default)]
    pub readiness_probe: Option<Probe>,
    /// Startup probe. Not executed by the runtime.
    #[serde(default)]
    pub startup_probe: Option<Probe>,
    /// Lifecycle hooks. Not executed by the runtime.
    #[serde(default)]
    pub lifecycle: Option<Lifecycle>,
    /// When to pull the image.
    #[serde(default)]
    pub image_pull_policy: ImagePullPolicy,
}

/// A port the container listens on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Optional port name.
    #[serde(default)]
    pub name: Option<String>,
    /// Host port, if the port is published.
    #[serde(default)]
    pub host_port: Option<u16>,
    /// Port inside the container, kept as text and parsed when the sandbox is built.
    #[serde(deserialize_with = "number_or_string")]
    pub container_port: String,
    /// `TCP`, `UDP`, or `SCTP`. Defaults to TCP.
    #[serde(default)]
    pub protocol: Option<String>,
    /// Host IP to bind. Defaults to loopback.
    #[serde(default, rename = "hostIP", alias = "hostIp")]
    pub host_ip: Option<String>,
}

/// An environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Variable value.
    #[serde(default)]
    pub value: String,
}

impl EnvVar {
    /// Creates an environment variable.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A reference from a container to a pod volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    /// Name of a volume in `PodSpec::volumes`.
    pub name: String,
    /// Mount point inside the container.
    pub mount_path: String,
    /// Mount read-only.
    #[serde(default)]
    pub read_only: bool,
}

/// Resource requests and limits of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Hard limits enforced by the engine.
    #[serde(default)]
    pub limits: ResourceList,
    /// Requests, informational only.
    #[serde(default)]
    pub requests: ResourceList,
}

/// CPU and memory quantities, see [`crate::quantity`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceList {
    /// CPU in cores (`"2"`, `"0.5"`) or millicores (`"500m"`).
    #[serde(default, deserialize_with = "optional_number_or_string")]
    pub cpu: Option<String>,
    /// Memory in bytes, optionally suffixed (`"128Mi"`).
    #[serde(default, deserialize_with = "optional_number_or_string")]
    pub memory: Option<String>,
}

/// A health probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    /// Action performed by the probe.
    #[serde(flatten)]
    pub handler: Handler,
    /// Seconds after start before the first probe.
    #[serde(default)]
    pub initial_delay_seconds: i32,
    /// Seconds before a probe times out.
    #[serde(default)]
    pub timeout_seconds: i32,
    /// Seconds between probes.
    #[serde(default)]
    pub period_seconds: i32,
    /// Consecutive successes to be considered healthy.
    #[serde(default)]
    pub success_threshold: i32,
    /// Consecutive failures to be considered unhealthy.
    #[serde(default)]
    pub failure_threshold: i32,
}

/// Probe or hook action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handler {
    /// HTTP GET action.
    #[serde(default)]
    pub http_get: Option<HttpGetAction>,
}

/// HTTP GET performed against the container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpGetAction {
    /// Request path.
    #[serde(default)]
    pub path: String,
    /// Target port.
    pub port: u16,
    /// `HTTP` or `HTTPS`.
    #[serde(default)]
    pub scheme: String,
    /// Host, defaults to the pod IP.
    #[serde(default)]
    pub host: String,
}

/// Lifecycle hooks of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifecycle {
    /// Run after the container starts.
    #[serde(default)]
    pub post_start: Option<Handler>,
    /// Run before the container stops.
    #[serde(default)]
    pub pre_stop: Option<Handler>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Float(f64),
    Text(String),
}

impl NumberOrString {
    fn into_text(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s,
        }
    }
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    NumberOrString::deserialize(deserializer).map(NumberOrString::into_text)
}

fn optional_number_or_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<NumberOrString>::deserialize(deserializer).map(|v| v.map(NumberOrString::into_text))
}
