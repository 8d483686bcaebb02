//! Kubelet configuration model.
//!
//! Loaded from a YAML file; every key is optional and falls back to the
//! defaults in [`crate::constants`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Minik8sError, Result};

/// Root configuration of the pod runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KubeletConfig {
    /// How to reach the container engine.
    pub engine: EngineConfig,
    /// Image of the pause container anchoring each pod's namespaces.
    pub sandbox_image: String,
    /// Tracing filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for KubeletConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            sandbox_image: crate::constants::DEFAULT_SANDBOX_IMAGE.to_string(),
            log_filter: crate::constants::DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Connection settings of the container engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Unix socket of the engine. `None` uses the engine's local defaults.
    pub socket: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            socket: None,
            timeout_secs: crate::constants::DEFAULT_ENGINE_TIMEOUT_SECS,
        }
    }
}

impl KubeletConfig {
    /// Loads the configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML,
    /// or holds an invalid value.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading kubelet config");
        let content = std::fs::read_to_string(path).map_err(|e| Minik8sError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from `path` if given, or returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a given file cannot be loaded.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    fn validate(&self) -> Result<()> {
        if self.sandbox_image.trim().is_empty() {
            return Err(Minik8sError::Config {
                message: "sandboxImage must not be empty".into(),
            });
        }
        if self.engine.timeout_secs == 0 {
            return Err(Minik8sError::Config {
                message: "engine.timeoutSecs must be positive".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_pause_image() {
        let config = KubeletConfig::default();
        assert_eq!(config.sandbox_image, "k8s.gcr.io/pause:3.1");
        assert_eq!(config.engine.timeout_secs, 120);
        assert!(config.engine.socket.is_none());
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("kubelet.yaml");
        std::fs::write(&path, "engine:\n  socket: /run/docker.sock\n").expect("write");

        let config = KubeletConfig::load(&path).expect("load");
        assert_eq!(config.engine.socket.as_deref(), Some("/run/docker.sock"));
        assert_eq!(config.engine.timeout_secs, 120);
        assert_eq!(config.sandbox_image, "k8s.gcr.io/pause:3.1");
    }

    #[test]
    fn load_rejects_empty_sandbox_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("kubelet.yaml");
        std::fs::write(&path, "sandboxImage: \"\"\n").expect("write");
        assert!(KubeletConfig::load(&path).is_err());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = KubeletConfig::load(Path::new("/nonexistent/kubelet.yaml")).unwrap_err();
        assert!(matches!(err, Minik8sError::Io { .. }));
    }

    #[test]
    fn load_or_default_without_path() {
        let config = KubeletConfig::load_or_default(None).expect("defaults");
        assert_eq!(config, KubeletConfig::default());
    }
}
