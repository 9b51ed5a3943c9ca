// src/cluster/poll.rs
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::error::DeploymentError;

/// Polls `check_fn` every `poll_interval` until it returns `Ok(true)`.
///
/// An `Err` from the check aborts immediately. Past `timeout` the call
/// fails with [`DeploymentError::Timeout`] naming `stage`.
pub async fn poll_until<F, Fut>(
    timeout: Duration,
    poll_interval: Duration,
    stage: &str,
    mut check_fn: F,
) -> Result<(), DeploymentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, DeploymentError>>,
{
    let start = Instant::now();

    loop {
        if check_fn().await? {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(DeploymentError::Timeout {
                stage: stage.to_string(),
                waited: start.elapsed(),
            });
        }
        trace!(stage, "Polling condition not yet met, retrying...");
        tokio::time::sleep(poll_interval).await;
    }
}
