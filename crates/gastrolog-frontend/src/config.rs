//! The frontend's CLI surface (design §0 ambient stack: clap-derived
//! configuration, matching the teacher's `clap` usage elsewhere in the
//! workspace).

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

fn parse_duration_secs(s: &str) -> Result<Duration, String> {
    s.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| e.to_string())
}

/// A `node_id=host:port` peer mapping for remote-vault forwarding (design
/// §4.8). Cluster membership discovery itself is an explicit Non-goal; this
/// is the static-peer-list fallback.
#[derive(Debug, Clone)]
pub struct PeerMapping {
    pub node_id: String,
    pub endpoint: String,
}

fn parse_peer_mapping(s: &str) -> Result<PeerMapping, String> {
    let (node_id, endpoint) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NODE_ID=HOST:PORT, got {s:?}"))?;
    Ok(PeerMapping {
        node_id: node_id.to_string(),
        endpoint: endpoint.to_string(),
    })
}

#[derive(Debug, Parser, Clone)]
#[command(name = "gastrolog-frontend", about = "GastroLog RPC frontend")]
pub struct FrontendConfig {
    /// Address the plain-text listener binds to; also serves h2c
    /// prior-knowledge HTTP/2 for streaming clients without TLS.
    #[arg(long, env = "GASTROLOG_LISTEN_ADDR", default_value = "0.0.0.0:7070")]
    pub listen_addr: SocketAddr,

    /// Address the HTTPS listener binds to when TLS is enabled. Defaults to
    /// the plain port plus one, matching most co-located HTTP/HTTPS setups.
    #[arg(long, env = "GASTROLOG_HTTPS_LISTEN_ADDR")]
    pub https_listen_addr: Option<SocketAddr>,

    /// Redirects plain-HTTP GET/HEAD requests to HTTPS once TLS is enabled.
    #[arg(long, env = "GASTROLOG_REDIRECT_TO_HTTPS", default_value_t = false)]
    pub redirect_to_https: bool,

    /// This node's id, used for vault ownership checks and forwarding
    /// (design §4.5, §4.8).
    #[arg(long, env = "GASTROLOG_NODE_ID", default_value = "local")]
    pub node_id: String,

    /// Static peer list for remote-vault forwarding, `node_id=host:port`,
    /// repeatable.
    #[arg(long = "peer", env = "GASTROLOG_PEERS", value_delimiter = ',', value_parser = parse_peer_mapping)]
    pub peers: Vec<PeerMapping>,

    /// HMAC secret for bearer tokens. Required unless `--no-auth` is set.
    #[arg(long, env = "GASTROLOG_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Bearer token lifetime.
    #[arg(long, env = "GASTROLOG_TOKEN_TTL_SECS", default_value = "86400", value_parser = parse_duration_secs)]
    pub token_ttl: Duration,

    /// Replaces the auth interceptor with a stub granting synthetic admin
    /// claims to every request (design §4.3 "No-auth mode"). Development
    /// only.
    #[arg(long, env = "GASTROLOG_NO_AUTH", default_value_t = false)]
    pub no_auth: bool,

    /// Rate-limit bucket idle eviction threshold.
    #[arg(long, env = "GASTROLOG_RATE_LIMIT_STALE_AFTER_SECS", default_value = "300", value_parser = parse_duration_secs)]
    pub rate_limit_stale_after: Duration,

    /// Rate-limit cleanup sweep interval.
    #[arg(long, env = "GASTROLOG_RATE_LIMIT_CLEANUP_INTERVAL_SECS", default_value = "180", value_parser = parse_duration_secs)]
    pub rate_limit_cleanup_interval: Duration,

    /// CORS allow-list beyond same-origin and loopback (design §4.2); unused
    /// by the custom CORS middleware today but retained for config-store
    /// driven allow-lists layered on top later.
    #[arg(long, env = "GASTROLOG_CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub cors_allowed_origins: Vec<String>,

    /// Maximum time to wait for in-flight requests to finish during a
    /// graceful drain before forcing shutdown (design §8 drain timeout).
    #[arg(long, env = "GASTROLOG_DRAIN_TIMEOUT_SECS", default_value = "30", value_parser = parse_duration_secs)]
    pub drain_timeout: Duration,

    /// Log output format: "pretty" for local development, "json" for
    /// production log aggregation.
    #[arg(long, env = "GASTROLOG_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Soft deadline for a single `Search` call (design §4.4): on expiry the
    /// iterator is canceled and partial results are returned with
    /// `has_more = false`. Unset means no deadline.
    #[arg(long, env = "GASTROLOG_QUERY_TIMEOUT_SECS", value_parser = parse_duration_secs)]
    pub query_timeout: Option<Duration>,

    /// Maximum total lifetime of a single `Follow` stream (design §4.4),
    /// after which the server ends the stream cleanly.
    #[arg(long, env = "GASTROLOG_MAX_FOLLOW_DURATION_SECS", default_value = "3600", value_parser = parse_duration_secs)]
    pub max_follow_duration: Duration,

    /// TLS certificate PEM path. Overridden at runtime by `PutTlsConfig`
    /// (design §4.1, §4.6); this is only the bootstrap default.
    #[arg(long, env = "GASTROLOG_TLS_CERT_PATH")]
    pub tls_cert_path: Option<std::path::PathBuf>,

    /// TLS private key PEM path, paired with `--tls-cert-path`.
    #[arg(long, env = "GASTROLOG_TLS_KEY_PATH")]
    pub tls_key_path: Option<std::path::PathBuf>,
}

impl FrontendConfig {
    pub fn https_listen_addr(&self) -> SocketAddr {
        self.https_listen_addr.unwrap_or_else(|| {
            let mut addr = self.listen_addr;
            addr.set_port(addr.port() + 1);
            addr
        })
    }
}
