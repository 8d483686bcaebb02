//! Unified error types for the minik8s workspace.
//!
//! Every fallible operation of the runtime surfaces one of these variants
//! to its immediate caller. Nothing is retried internally.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum Minik8sError {
    /// The container engine could not be reached.
    #[error("container engine unavailable: {message}")]
    EngineUnavailable {
        /// Transport-level failure description.
        message: String,
    },

    /// The container engine answered with an error status.
    #[error("engine rejected {operation} (status {status}): {message}")]
    EngineRejected {
        /// Engine operation that failed.
        operation: &'static str,
        /// Status code returned by the engine.
        status: u16,
        /// Message returned by the engine.
        message: String,
    },

    /// An image is not present locally and the pull policy forbids pulling.
    #[error("image not found: {reference}")]
    ImageNotFound {
        /// Image reference that could not be resolved.
        reference: String,
    },

    /// A container port declaration could not be parsed.
    #[error("invalid port spec {spec:?}: {reason}")]
    InvalidPortSpec {
        /// Offending `port/protocol` text.
        spec: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A volume mount references a volume the pod does not declare.
    #[error("volume {volume:?} referenced by container {container:?} is not declared by the pod")]
    VolumeNotFound {
        /// Missing volume name.
        volume: String,
        /// Container declaring the mount.
        container: String,
    },

    /// No engine container matched a generic container's identity.
    #[error("container {container:?} of pod {pod:?} not found")]
    ContainerNotFound {
        /// Pod name.
        pod: String,
        /// Logical container name.
        container: String,
    },

    /// One or more concurrent container removals failed.
    #[error(
        "failed to remove {} container(s) of pod {pod:?}: {}",
        .failures.len(),
        join_failures(.failures)
    )]
    Teardown {
        /// Pod being torn down.
        pod: String,
        /// Every failed removal.
        failures: Vec<TeardownFailure>,
    },

    /// The operation was cancelled before the engine call completed.
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that observed the cancellation.
        operation: &'static str,
    },

    /// A resource quantity (CPU, memory) could not be parsed.
    #[error("invalid {resource} quantity {value:?}")]
    InvalidQuantity {
        /// Resource name.
        resource: &'static str,
        /// Offending text.
        value: String,
    },

    /// A pod manifest is semantically invalid.
    #[error("invalid manifest: {message}")]
    Manifest {
        /// Description of the problem.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A spawned worker task panicked or was aborted.
    #[error("worker task failed: {message}")]
    TaskFailed {
        /// Join error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML deserialization failed.
    #[error("yaml error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl Minik8sError {
    /// Returns `true` for transport failures of the container engine.
    #[must_use]
    pub const fn is_engine_unavailable(&self) -> bool {
        matches!(self, Self::EngineUnavailable { .. })
    }

    /// Returns `true` if the error came from a fired cancellation token.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// A single failed container removal collected during pod teardown.
#[derive(Debug)]
pub struct TeardownFailure {
    /// Logical name of the container whose removal failed.
    pub container: String,
    /// Why it failed.
    pub error: Minik8sError,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.container, self.error)
    }
}

fn join_failures(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Minik8sError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_error_lists_every_failure() {
        let err = Minik8sError::Teardown {
            pod: "web".into(),
            failures: vec![
                TeardownFailure {
                    container: "nginx".into(),
                    error: Minik8sError::EngineUnavailable {
                        message: "connection refused".into(),
                    },
                },
                TeardownFailure {
                    container: "redis".into(),
                    error: Minik8sError::ContainerNotFound {
                        pod: "web".into(),
                        container: "redis".into(),
                    },
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to remove 2 container(s)"), "got: {msg}");
        assert!(msg.contains("nginx: container engine unavailable"));
        assert!(msg.contains("redis: container \"redis\" of pod \"web\" not found"));
    }

    #[test]
    fn volume_not_found_names_volume_and_container() {
        let err = Minik8sError::VolumeNotFound {
            volume: "data".into(),
            container: "db".into(),
        };
        assert_eq!(
            err.to_string(),
            "volume \"data\" referenced by container \"db\" is not declared by the pod"
        );
    }

    #[test]
    fn classification_helpers() {
        assert!(
            Minik8sError::EngineUnavailable {
                message: String::new()
            }
            .is_engine_unavailable()
        );
        assert!(Minik8sError::Cancelled { operation: "pull" }.is_cancelled());
        assert!(
            !Minik8sError::ImageNotFound {
                reference: "x".into()
            }
            .is_cancelled()
        );
    }
}
