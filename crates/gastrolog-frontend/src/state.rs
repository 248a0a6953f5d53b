//! The shared application state threaded through every middleware layer and
//! RPC handler (design §4.1-§4.9 "external collaborators").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gastrolog_auth::TokenService;
use gastrolog_config_api::ConfigStore;
use gastrolog_orchestrator_api::OrchestratorApi;
use gastrolog_ore::metrics::MetricsRegistry;
use gastrolog_service::{ForwardingClient, PeerResolver};

use crate::auth_interceptor::AuthInterceptorState;
use crate::config::FrontendConfig;
use crate::drain::DrainController;
use crate::rate_limit::RateLimiter;

/// Resolves forwarding targets from the static `--peer` list (design §4.8;
/// cluster membership discovery is an explicit Non-goal).
pub struct StaticPeerResolver {
    peers: HashMap<String, String>,
}

impl StaticPeerResolver {
    pub fn new(peers: &[crate::config::PeerMapping]) -> StaticPeerResolver {
        StaticPeerResolver {
            peers: peers
                .iter()
                .map(|p| (p.node_id.clone(), p.endpoint.clone()))
                .collect(),
        }
    }
}

impl PeerResolver for StaticPeerResolver {
    fn endpoint_for(&self, node_id: &str) -> Option<String> {
        self.peers.get(node_id).cloned()
    }
}

/// Everything an RPC handler or middleware layer needs, cloned cheaply
/// (`Arc`-backed throughout) into every request's extractor state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<dyn OrchestratorApi>,
    pub config_store: Arc<dyn ConfigStore>,
    pub tokens: Arc<TokenService>,
    pub forwarding: Arc<ForwardingClient<StaticPeerResolver>>,
    pub drain: DrainController,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: MetricsRegistry,
    pub node_id: String,
    /// Node ids of the statically configured peers (design §4.7 "merges
    /// local jobs with peer-reported jobs (when configured)"). `JobService`
    /// fans `ListJobs`/`WatchJobs` out to each of these through
    /// `forwarding`, the same client vault-admin forwarding uses.
    pub peer_node_ids: Vec<String>,
    pub no_auth: bool,
    pub started_at: Instant,
    pub query_timeout: Option<Duration>,
    pub max_follow_duration: Duration,
}

impl AppState {
    pub fn new(
        config: &FrontendConfig,
        orchestrator: Arc<dyn OrchestratorApi>,
        config_store: Arc<dyn ConfigStore>,
        tokens: Arc<TokenService>,
    ) -> AppState {
        let resolver = StaticPeerResolver::new(&config.peers);
        AppState {
            orchestrator,
            config_store,
            tokens,
            forwarding: Arc::new(ForwardingClient::new(
                resolver,
                gastrolog_build_info::BUILD_INFO.version,
            )),
            drain: DrainController::new(),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit_stale_after)),
            metrics: MetricsRegistry::new(),
            node_id: config.node_id.clone(),
            peer_node_ids: config.peers.iter().map(|p| p.node_id.clone()).collect(),
            no_auth: config.no_auth,
            started_at: Instant::now(),
            query_timeout: config.query_timeout,
            max_follow_duration: config.max_follow_duration,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn auth_interceptor_state(&self) -> AuthInterceptorState {
        AuthInterceptorState {
            tokens: self.tokens.clone(),
            store: self.config_store.clone(),
            no_auth: self.no_auth,
        }
    }
}
