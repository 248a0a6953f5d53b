//! The in-flight request counter and drain flag shared by the tracking
//! middleware and the `Shutdown` RPC (design §4.2 tracking middleware,
//! §4.9 Shutdown, §5 shared-resource policy).
//!
//! `draining` transitions false -> true exactly once per server instance
//! (design §3 invariant); `request_shutdown` enforces that with a
//! `compare_exchange`.

use std::sync::atomic::{AtomicI64, AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Tracks in-flight request count and the draining flag. Cloned cheaply
/// (all state behind `Arc`) so every middleware layer and the lifecycle
/// service handler share one instance.
#[derive(Clone)]
pub struct DrainController {
    inner: Arc<Inner>,
}

struct Inner {
    draining: AtomicBool,
    in_flight: AtomicI64,
    drained: Notify,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl Default for DrainController {
    fn default() -> DrainController {
        DrainController::new()
    }
}

impl DrainController {
    pub fn new() -> DrainController {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        DrainController {
            inner: Arc::new(Inner {
                draining: AtomicBool::new(false),
                in_flight: AtomicI64::new(0),
                drained: Notify::new(),
                shutdown,
            }),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    /// A guard that decrements the in-flight counter on drop, so every exit
    /// path (including panics unwound through the task) balances its `+1`
    /// (design §3 invariant: the in-flight counter is monotonically
    /// balanced). Returns `None` if the server is already draining, so the
    /// tracking middleware can reject with 503 without ever incrementing.
    pub fn enter(&self) -> Option<InFlightGuard> {
        if self.is_draining() {
            return None;
        }
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(InFlightGuard {
            inner: self.inner.clone(),
        })
    }

    /// Requests drain. Idempotent: a second call while already draining is a
    /// no-op and returns immediately (design §4.9 "subsequent drain attempts
    /// are no-ops"). On the first call, spawns a background task that waits
    /// for in-flight to reach zero and then closes the shutdown channel.
    pub fn request_shutdown(&self, drain: bool) {
        if !drain {
            let _ = self.inner.shutdown.send(true);
            return;
        }
        if self
            .inner
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let inner = self.inner.clone();
        gastrolog_ore::task::spawn_named(
            || "drain-waiter",
            async move {
                loop {
                    // Register-then-check: the `Notified` future snapshots the
                    // notify epoch at creation, before we read `in_flight`, so
                    // a last guard dropping (and calling `notify_waiters()`)
                    // between the load and the await is still observed instead
                    // of parking forever (design §3 drain-safety invariant).
                    let notified = inner.drained.notified();
                    if inner.in_flight.load(Ordering::SeqCst) <= 0 {
                        break;
                    }
                    notified.await;
                }
                let _ = inner.shutdown.send(true);
            },
        );
    }

    pub fn shutdown_signal(&self) -> tokio::sync::watch::Receiver<bool> {
        self.inner.shutdown.subscribe()
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> i64 {
        self.inner.in_flight.load(Ordering::SeqCst)
    }
}

pub struct InFlightGuard {
    inner: Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let prev = self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        if prev <= 1 {
            self.inner.drained.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn drain_waits_for_in_flight_to_reach_zero() {
        let ctrl = DrainController::new();
        let guard = ctrl.enter().unwrap();
        ctrl.request_shutdown(true);

        let mut rx = ctrl.shutdown_signal();
        let timed_out = tokio::time::timeout(Duration::from_millis(50), rx.changed())
            .await
            .is_err();
        assert!(timed_out, "shutdown signaled before in-flight request finished");

        drop(guard);
        tokio::time::timeout(Duration::from_millis(200), rx.changed())
            .await
            .expect("shutdown never signaled")
            .unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn new_requests_rejected_once_draining() {
        let ctrl = DrainController::new();
        ctrl.request_shutdown(true);
        assert!(ctrl.enter().is_none());
    }

    #[tokio::test]
    async fn second_drain_request_is_a_no_op() {
        let ctrl = DrainController::new();
        ctrl.request_shutdown(true);
        ctrl.request_shutdown(true);
        assert!(ctrl.is_draining());
    }

    #[tokio::test]
    async fn no_drain_closes_shutdown_immediately() {
        let ctrl = DrainController::new();
        let mut rx = ctrl.shutdown_signal();
        ctrl.request_shutdown(false);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
        assert!(!ctrl.is_draining());
    }
}
