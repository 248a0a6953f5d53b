//! Binary entry point: parses [`gastrolog_frontend::config::FrontendConfig`],
//! wires up the in-memory orchestrator and config-store reference
//! implementations, and runs the listener manager until SIGINT/SIGTERM
//! (design §0, §6).

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use clap::Parser;
use gastrolog_auth::TokenService;
use gastrolog_config_api::memory::InMemoryConfigStore;
use gastrolog_config_api::{ConfigStore, TlsSettings};
use gastrolog_frontend::config::FrontendConfig;
use gastrolog_frontend::state::AppState;
use gastrolog_frontend::transport::ListenerManager;
use gastrolog_orchestrator_api::memory::InMemoryOrchestrator;
use tokio::net::TcpListener;

fn init_tracing(log_format: &str) {
    let subscriber = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    );
    if log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Seeds the config store with the bootstrap TLS cert/key from the CLI
/// flags, if given, so TLS can come up on first `serve()` without requiring
/// an operator to call `PutTlsConfig` first (design §4.1, §4.6).
async fn bootstrap_tls(config: &FrontendConfig, store: &dyn ConfigStore) -> anyhow::Result<()> {
    let (Some(cert_path), Some(key_path)) = (&config.tls_cert_path, &config.tls_key_path) else {
        return Ok(());
    };
    let cert_pem = tokio::fs::read_to_string(cert_path).await?;
    let key_pem = tokio::fs::read_to_string(key_path).await?;
    store
        .put_tls_settings(TlsSettings {
            enabled: true,
            cert_pem,
            key_pem,
            sni_hosts: Vec::new(),
        })
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, draining"),
        _ = terminate => tracing::info!("received SIGTERM, draining"),
    }
}

async fn run(config: FrontendConfig) -> anyhow::Result<()> {
    if config.jwt_secret.is_none() && !config.no_auth {
        anyhow::bail!("--jwt-secret is required unless --no-auth is set");
    }

    let listener = TcpListener::bind(config.listen_addr).await?;

    let orchestrator = Arc::new(InMemoryOrchestrator::new(config.node_id.clone()));
    let config_store = Arc::new(InMemoryConfigStore::new());
    bootstrap_tls(&config, config_store.as_ref()).await?;

    let secret = config
        .jwt_secret
        .clone()
        .unwrap_or_else(|| "no-auth-unused-secret".to_string());
    let token_ttl = ChronoDuration::from_std(config.token_ttl)
        .map_err(|e| anyhow::anyhow!("invalid --token-ttl-secs: {e}"))?;
    let tokens = Arc::new(TokenService::new(secret.as_bytes(), token_ttl));

    let state = AppState::new(&config, orchestrator, config_store, tokens);
    let manager = Arc::new(ListenerManager::new(config.clone(), state.clone()));
    manager.spawn_tls_watcher();

    let drain = state.drain.clone();
    let drain_timeout = config.drain_timeout;
    let manager_for_signal = manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        drain.request_shutdown(true);
        manager_for_signal.stop(drain_timeout).await;
    });

    manager.serve(listener).await
}

#[tokio::main]
async fn main() {
    let config = FrontendConfig::parse();
    init_tracing(&config.log_format);
    if let Err(err) = run(config).await {
        tracing::error!(error = %err, "gastrolog-frontend exited with an error");
        eprintln!("gastrolog-frontend: fatal: {err:#}");
        std::process::exit(1);
    }
}
