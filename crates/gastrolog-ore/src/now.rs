//! Clock indirection.
//!
//! Handlers that stamp records with an ingest or write timestamp take a
//! `NowFn` rather than calling `chrono::Utc::now()` directly, so tests can
//! supply a fixed or monotonically-advancing clock instead of relying on
//! wall-clock time.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// A source of the current time, boxed so it can be swapped out in tests.
#[derive(Clone)]
pub struct NowFn(Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>);

impl NowFn {
    pub fn new(f: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> NowFn {
        NowFn(Arc::new(f))
    }

    pub fn call(&self) -> DateTime<Utc> {
        (self.0)()
    }
}

impl Default for NowFn {
    fn default() -> NowFn {
        NowFn::new(Utc::now)
    }
}

impl std::fmt::Debug for NowFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NowFn(..)")
    }
}
