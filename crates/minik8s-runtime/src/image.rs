//! Image presence checks and pulls.

use std::sync::Arc;

use minik8s_common::error::{Minik8sError, Result};
use minik8s_common::types::ImagePullPolicy;
use tokio_util::sync::CancellationToken;

use crate::cancel::guarded;
use crate::engine::ContainerEngine;

/// Makes images available locally according to a pull policy.
#[derive(Clone)]
pub struct ImageResolver {
    engine: Arc<dyn ContainerEngine>,
}

impl ImageResolver {
    /// Creates a resolver over `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// Ensures `reference` is usable under `policy`.
    ///
    /// | policy         | present locally | absent locally      |
    /// |----------------|-----------------|---------------------|
    /// | `Always`       | pull            | pull                |
    /// | `IfNotPresent` | nothing         | pull                |
    /// | `Never`        | nothing         | `ImageNotFound`     |
    ///
    /// # Errors
    ///
    /// Returns [`Minik8sError::ImageNotFound`] if the image is absent and
    /// may not be pulled, or if the registry does not know it; any engine
    /// error otherwise.
    pub async fn resolve(
        &self,
        policy: ImagePullPolicy,
        reference: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if policy == ImagePullPolicy::Always {
            return self.pull(reference, cancel).await;
        }
        let present = guarded(cancel, "image lookup", self.engine.image_exists(reference)).await?;
        if present {
            tracing::debug!(image = reference, %policy, "image present locally");
            return Ok(());
        }
        match policy {
            ImagePullPolicy::Never => Err(Minik8sError::ImageNotFound {
                reference: reference.to_string(),
            }),
            _ => self.pull(reference, cancel).await,
        }
    }

    /// Removes a local image.
    ///
    /// # Errors
    ///
    /// Returns any engine error.
    pub async fn remove(&self, reference: &str, cancel: &CancellationToken) -> Result<()> {
        tracing::info!(image = reference, "removing image");
        guarded(cancel, "image removal", self.engine.remove_image(reference)).await
    }

    async fn pull(&self, reference: &str, cancel: &CancellationToken) -> Result<()> {
        tracing::info!(image = reference, engine = self.engine.name(), "pulling image");
        guarded(cancel, "image pull", self.engine.pull_image(reference)).await
    }
}
