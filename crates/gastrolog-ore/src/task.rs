//! Named task spawning.
//!
//! Plain `tokio::spawn` loses the task's identity the moment it panics: the
//! panic surfaces as an anonymous "task ... panicked" with no clue which
//! subsystem died. `spawn_named` wraps the future so a panic is logged with
//! the task's name before the `JoinError` propagates to whoever is awaiting
//! the handle.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinHandle;

/// Spawns `fut` as a new task, logging `name` if the task panics.
pub fn spawn_named<Name, Fut>(name: Name, fut: Fut) -> JoinHandle<Fut::Output>
where
    Name: FnOnce() -> &'static str,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    let name = name();
    tokio::spawn(async move {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(output) => output,
            Err(panic) => {
                tracing::error!(task = name, "task panicked");
                std::panic::resume_unwind(panic)
            }
        }
    })
}
