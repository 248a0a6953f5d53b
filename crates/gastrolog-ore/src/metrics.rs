//! A thin newtype over [`prometheus::Registry`].
//!
//! Every service-specific metric is registered against one of these at
//! startup; `gastrolog_http_util::handle_prometheus` renders whatever has
//! accumulated in it on each `/metrics` scrape.

use prometheus::{Encoder, Registry, TextEncoder};

#[derive(Clone, Debug, Default)]
pub struct MetricsRegistry(Registry);

impl MetricsRegistry {
    pub fn new() -> MetricsRegistry {
        MetricsRegistry(Registry::new())
    }

    pub fn inner(&self) -> &Registry {
        &self.0
    }

    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.0.gather()
    }

    /// Renders the current metric set in Prometheus text exposition format.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        Ok(buf)
    }
}
