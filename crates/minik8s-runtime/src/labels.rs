//! Identity labels and label selectors.
//!
//! Every engine container minik8s creates is tagged with the pod's name,
//! namespace and UID, its pod type, and (for ordinary containers) the
//! logical container name. These labels are the only link between a pod
//! and its engine containers: lookups never go through the engine name.

use std::collections::BTreeMap;
use std::fmt;

use minik8s_api::Pod;
use minik8s_common::constants::{
    CONTAINER_NAME_LABEL, MANAGED_LABEL, MANAGED_LABEL_VALUE, NS_MODE_CONTAINER_PREFIX,
    POD_NAME_LABEL, POD_NAMESPACE_LABEL, POD_TYPE_LABEL, POD_UID_LABEL,
};
use minik8s_common::types::PodType;
use serde::Serialize;

/// Label set of an engine container.
pub type Labels = BTreeMap<String, String>;

/// Name of a pod's sandbox: `{pod name}-{pod uid}`.
///
/// Every other container of the pod joins the sandbox's namespaces
/// through [`SandboxToken::namespace_mode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SandboxToken(String);

impl SandboxToken {
    /// Derives the token of a pod.
    #[must_use]
    pub fn for_pod(pod: &Pod) -> Self {
        Self(format!("{}-{}", pod.name(), pod.uid()))
    }

    /// Returns the token as the sandbox's engine name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `container:<token>` namespace mode.
    #[must_use]
    pub fn namespace_mode(&self) -> String {
        format!("{NS_MODE_CONTAINER_PREFIX}{}", self.0)
    }

    /// Returns the engine name of one of the pod's containers.
    #[must_use]
    pub fn container_name(&self, container: &str) -> String {
        format!("{}-{container}", self.0)
    }
}

impl fmt::Display for SandboxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A conjunction of `key=value` label requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    required: Labels,
}

impl LabelSelector {
    /// Creates a selector requiring every label in `required`.
    #[must_use]
    pub const fn new(required: Labels) -> Self {
        Self { required }
    }

    /// Adds one requirement.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        let _ = self.required.insert(key.to_string(), value.to_string());
        self
    }

    /// Returns `true` if `labels` carries every required label.
    #[must_use]
    pub fn matches(&self, labels: &Labels) -> bool {
        self.required
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }

    /// Renders the requirements as engine `label` filters.
    #[must_use]
    pub fn filters(&self) -> Vec<String> {
        self.required
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }
}

/// Builds the identity labels of one engine container of `pod`.
#[must_use]
pub fn identity(pod: &Pod, pod_type: PodType, container: Option<&str>) -> Labels {
    let mut labels = Labels::new();
    let _ = labels.insert(POD_NAME_LABEL.into(), pod.name().to_string());
    let _ = labels.insert(POD_NAMESPACE_LABEL.into(), pod.namespace().to_string());
    let _ = labels.insert(POD_UID_LABEL.into(), pod.uid().to_string());
    let _ = labels.insert(POD_TYPE_LABEL.into(), pod_type.label_value().into());
    if let Some(name) = container {
        let _ = labels.insert(CONTAINER_NAME_LABEL.into(), name.to_string());
    }
    let _ = labels.insert(MANAGED_LABEL.into(), MANAGED_LABEL_VALUE.into());
    labels
}

/// Labels of a pod's sandbox: the pod's own labels overlaid with its identity.
#[must_use]
pub fn sandbox_labels(pod: &Pod) -> Labels {
    let mut labels = pod.metadata.labels.clone();
    labels.extend(identity(pod, PodType::Sandbox, None));
    labels
}

/// Labels of one ordinary container of a pod, overlaid the same way.
#[must_use]
pub fn container_labels(pod: &Pod, container: &str) -> Labels {
    let mut labels = pod.metadata.labels.clone();
    labels.extend(identity(pod, PodType::Generic, Some(container)));
    labels
}

/// Selects a pod's sandbox.
#[must_use]
pub fn sandbox_selector(pod: &Pod) -> LabelSelector {
    LabelSelector::new(identity(pod, PodType::Sandbox, None))
}

/// Selects one ordinary container of a pod.
#[must_use]
pub fn container_selector(pod: &Pod, container: &str) -> LabelSelector {
    LabelSelector::new(identity(pod, PodType::Generic, Some(container)))
}

/// Selects every engine container of a pod, sandbox included.
#[must_use]
pub fn pod_selector(pod: &Pod) -> LabelSelector {
    managed_selector()
        .with(POD_NAME_LABEL, pod.name())
        .with(POD_NAMESPACE_LABEL, pod.namespace())
        .with(POD_UID_LABEL, pod.uid())
}

/// Selects every engine container managed by minik8s.
#[must_use]
pub fn managed_selector() -> LabelSelector {
    LabelSelector::default().with(MANAGED_LABEL, MANAGED_LABEL_VALUE)
}
