//! Domain primitive types used across the minik8s workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Minik8sError;

/// Engine-assigned identifier of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 12-character prefix engines print in listings.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Governs whether a locally cached image is trusted before container creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImagePullPolicy {
    /// Pull unconditionally.
    Always,
    /// Pull only when the image is absent locally.
    #[default]
    IfNotPresent,
    /// Never pull; fail if the image is absent.
    Never,
}

impl fmt::Display for ImagePullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::IfNotPresent => write!(f, "IfNotPresent"),
            Self::Never => write!(f, "Never"),
        }
    }
}

impl FromStr for ImagePullPolicy {
    type Err = Minik8sError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "ifnotpresent" => Ok(Self::IfNotPresent),
            "never" => Ok(Self::Never),
            _ => Err(Minik8sError::Config {
                message: format!("unknown image pull policy: {s}"),
            }),
        }
    }
}

/// Restart policy declared by a pod. Carried for the status reporter only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestartPolicy {
    /// Always restart.
    #[default]
    Always,
    /// Restart only on non-zero exit.
    OnFailure,
    /// Never restart.
    Never,
}

/// Whether an engine container is a pod's sandbox or one of its containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodType {
    /// The pause container holding the shared namespaces.
    Sandbox,
    /// An ordinary pod container.
    Generic,
}

impl PodType {
    /// Returns the label value used for this type.
    #[must_use]
    pub const fn label_value(self) -> &'static str {
        match self {
            Self::Sandbox => crate::constants::POD_TYPE_SANDBOX,
            Self::Generic => crate::constants::POD_TYPE_GENERIC,
        }
    }
}

impl fmt::Display for PodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label_value())
    }
}
