//! Periodic background job runner (spec §4.2): fires immediately, then
//! sleeps for `interval` between runs, never overlapping a slow run with
//! the next tick and never trying to "catch up" on missed ticks — the next
//! run is always `interval` after the previous run *finished*. Cancellation
//! is by process exit only, matching the teacher's fire-and-forget
//! `tokio::spawn` background tasks (no `JoinHandle` is retained anywhere
//! for graceful per-task cancellation).

use std::future::Future;
use std::time::Duration;

use tracing::{error, info};

/// Spawns a task that runs `job` immediately and then every `interval`
/// after each run completes. Returns the `JoinHandle` so the caller can
/// await it at shutdown if desired, but dropping it does not stop the task.
pub fn schedule<F, Fut>(name: &'static str, interval: Duration, mut job: F) -> tokio::task::JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        loop {
            info!(name, "running scheduled job");
            job().await;
            tokio::time::sleep(interval).await;
        }
    })
}
