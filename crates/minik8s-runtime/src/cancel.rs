//! Cancellation of in-flight engine calls.

use std::future::Future;

use minik8s_common::error::{Minik8sError, Result};
use tokio_util::sync::CancellationToken;

/// Runs `call` unless `cancel` fires first.
///
/// A token that is already cancelled wins over a ready call, so no new
/// engine work starts after cancellation.
///
/// # Errors
///
/// Returns [`Minik8sError::Cancelled`] if the token fires first, or the
/// error of `call`.
pub async fn guarded<T, F>(cancel: &CancellationToken, operation: &'static str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!(operation, "engine call cancelled");
            Err(Minik8sError::Cancelled { operation })
        }
        result = call => result,
    }
}
