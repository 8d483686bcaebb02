//! Pod metadata and spec.

use std::collections::BTreeMap;

use minik8s_common::types::RestartPolicy;
use serde::{Deserialize, Serialize};

use crate::container::Container;
use crate::status::PodStatus;

/// A group of containers sharing one network, IPC, and process namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    /// Object kind, `Pod` when read from a manifest.
    #[serde(default)]
    pub kind: String,
    /// Identity of the pod.
    pub metadata: ObjectMeta,
    /// Desired state.
    pub spec: PodSpec,
    /// Observed state, written by the status reporter.
    #[serde(default, skip_serializing_if = "PodStatus::is_empty")]
    pub status: PodStatus,
}

/// Identity of a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Pod name.
    pub name: String,
    /// Unique ID of this pod incarnation.
    #[serde(default)]
    pub uid: String,
    /// Namespace the pod lives in.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// User labels, copied onto every engine container of the pod.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// User annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl Default for ObjectMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            uid: String::new(),
            namespace: default_namespace(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }
}

fn default_namespace() -> String {
    minik8s_common::constants::DEFAULT_NAMESPACE.to_string()
}

/// Desired state of a pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Host volumes containers may mount by name.
    #[serde(default)]
    pub volumes: Vec<HostVolume>,
    /// Containers, in start order.
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Containers created and started before `containers`.
    #[serde(default)]
    pub init_containers: Vec<Container>,
    /// Restart policy, interpreted by the status reporter.
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

impl PodSpec {
    /// Iterates init containers then main containers, in declaration order.
    pub fn all_containers(&self) -> impl Iterator<Item = &Container> {
        self.init_containers.iter().chain(self.containers.iter())
    }

    /// Finds a container (init or main) by name.
    #[must_use]
    pub fn container(&self, name: &str) -> Option<&Container> {
        self.all_containers().find(|c| c.name == name)
    }
}

/// A directory of the host exposed to the pod under a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostVolume {
    /// Name referenced by container volume mounts.
    pub name: String,
    /// Volume type, e.g. `HostPath`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Path on the host.
    pub path: String,
}

impl Pod {
    /// Returns the pod name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns the pod UID.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.metadata.uid
    }

    /// Returns the pod namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Assigns a fresh UID if the pod has none, returning the UID in effect.
    pub fn ensure_uid(&mut self) -> &str {
        if self.metadata.uid.is_empty() {
            self.metadata.uid = uuid::Uuid::new_v4().to_string();
            tracing::debug!(pod = %self.metadata.name, uid = %self.metadata.uid, "generated pod uid");
        }
        &self.metadata.uid
    }
}
