//! Transport & listener manager (design §4.1): owns the primary plain-text
//! listener (which also accepts h2c prior-knowledge HTTP/2 for streaming
//! clients with no TLS) and, optionally, a secondary TLS listener built from
//! config-store settings that can be enabled, disabled, or re-keyed at
//! runtime without restarting the process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use gastrolog_config_api::ConfigNotification;
use gastrolog_ore::task::spawn_named;
use gastrolog_proto::gen::auth_service_server::AuthServiceServer;
use gastrolog_proto::gen::config_service_server::ConfigServiceServer;
use gastrolog_proto::gen::forwarding_service_server::ForwardingServiceServer;
use gastrolog_proto::gen::job_service_server::JobServiceServer;
use gastrolog_proto::gen::lifecycle_service_server::LifecycleServiceServer;
use gastrolog_proto::gen::query_service_server::QueryServiceServer;
use gastrolog_proto::gen::vault_service_server::VaultServiceServer;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoConnBuilder;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tonic::service::Routes;
use tower::Service;

use crate::auth_interceptor::auth_interceptor_middleware;
use crate::config::FrontendConfig;
use crate::middleware::redirect::{ConnectionKind, RedirectPolicy};
use crate::middleware::{
    compression_middleware, cors_middleware, rate_limit_middleware, redirect_middleware,
    security_headers_middleware, tracking_middleware,
};
use crate::rate_limit::spawn_cleanup_task;
use crate::service::auth::AuthServiceImpl;
use crate::service::config::ConfigServiceImpl;
use crate::service::forwarding::ForwardingServiceImpl;
use crate::service::job::JobServiceImpl;
use crate::service::lifecycle::LifecycleServiceImpl;
use crate::service::query::QueryServiceImpl;
use crate::service::vault::VaultServiceImpl;
use crate::state::AppState;

/// Only procedure paths under this prefix are ever dispatched to the gRPC
/// routes; anything else (a typo'd path, a scanner probing for admin URLs)
/// gets a plain 404 rather than a tonic "unimplemented" status, matching
/// design §6 "everything else that does not match a service path returns
/// 404".
const RPC_PREFIX: &str = "/gastrolog.";

/// Assembles the handler shared by every listener (design §4.1 "Serve":
/// "builds the core handler ... and invokes reconfigureTLS"). The ordering
/// is outermost-to-innermost exactly as design §4.2 specifies: tracking ->
/// CORS -> security-headers -> rate-limit -> compression -> service mux.
pub fn build_handler(state: AppState) -> Router {
    let grpc_routes = Routes::builder()
        .add_service(QueryServiceServer::new(QueryServiceImpl { state: state.clone() }))
        .add_service(VaultServiceServer::new(VaultServiceImpl { state: state.clone() }))
        .add_service(ConfigServiceServer::new(ConfigServiceImpl { state: state.clone() }))
        .add_service(LifecycleServiceServer::new(LifecycleServiceImpl { state: state.clone() }))
        .add_service(JobServiceServer::new(JobServiceImpl { state: state.clone() }))
        .add_service(AuthServiceServer::new(AuthServiceImpl { state: state.clone() }))
        .add_service(ForwardingServiceServer::new(ForwardingServiceImpl { state: state.clone() }))
        .routes();

    let mux = Router::new()
        .route("/healthz", get(gastrolog_http_util::handle_liveness_check))
        .route("/readyz", get(handle_readiness(state.clone())))
        .route("/metrics", get(handle_metrics(state.clone())))
        .fallback(rpc_fallback(grpc_routes));

    mux.layer(middleware::from_fn(compression_middleware))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.auth_interceptor_state(),
            auth_interceptor_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn_with_state(state.drain.clone(), tracking_middleware))
}

fn handle_readiness(state: AppState) -> impl Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>> + Clone {
    move || {
        let state = state.clone();
        Box::pin(async move {
            let ready = state.orchestrator.running() && !state.drain.is_draining();
            if ready {
                (StatusCode::OK, "ready").into_response()
            } else {
                (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
            }
        })
    }
}

fn handle_metrics(state: AppState) -> impl Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>> + Clone {
    move || {
        let state = state.clone();
        Box::pin(async move {
            match gastrolog_http_util::encode_prometheus(&state.metrics) {
                Ok(body) => (
                    StatusCode::OK,
                    [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                    body,
                )
                    .into_response(),
                Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
            }
        })
    }
}

/// Dispatches to the gRPC [`Routes`] service for paths under the RPC
/// namespace, and returns a bare 404 for everything else (design §6).
fn rpc_fallback(
    routes: Routes,
) -> impl Fn(Request) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>> + Clone {
    move |req: Request| {
        let mut routes = routes.clone();
        Box::pin(async move {
            if !req.uri().path().starts_with(RPC_PREFIX) {
                return (StatusCode::NOT_FOUND, "not found").into_response();
            }
            match Service::<Request<Body>>::call(&mut routes, req).await {
                Ok(resp) => resp.into_response(),
                Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response(),
            }
        })
    }
}

/// State for the dynamically-reconfigurable HTTPS listener: the task handle
/// that's currently serving, a shutdown trigger for it, and a fingerprint of
/// the TLS settings it was built from so `reconfigure_tls` can tell apart a
/// genuine change from a redundant re-entry (design §4.1: "idempotent:
/// re-entry while HTTPS is already running is a no-op unless configuration
/// has changed").
struct HttpsHandle {
    fingerprint: u64,
    shutdown: tokio::sync::watch::Sender<bool>,
}

/// Owns the primary listener and, optionally, the secondary TLS listener,
/// and can reconfigure TLS on demand (design §4.1).
pub struct ListenerManager {
    config: FrontendConfig,
    state: AppState,
    /// The one core handler shared by the plain and TLS listeners alike
    /// (design §4.1 "Serve": "builds the core handler ... and starts a
    /// second HTTP server using the SAME core handler"). `Router` clones are
    /// cheap (`Arc`-backed internally), so both listeners hand out clones of
    /// this single instance rather than each building their own.
    handler: Router,
    https: ArcSwapOption<HttpsHandle>,
    rate_limit_cleanup: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ListenerManager {
    pub fn new(config: FrontendConfig, state: AppState) -> ListenerManager {
        let handler = build_handler(state.clone());
        ListenerManager {
            config,
            state,
            handler,
            https: ArcSwapOption::empty(),
            rate_limit_cleanup: std::sync::Mutex::new(None),
        }
    }

    /// Binds and serves the primary listener (design §4.1 "Serve"), then
    /// reconfigures TLS. Runs until the drain controller's shutdown channel
    /// fires. `listener` is the already-bound plain-text TCP listener.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        let cleanup = spawn_cleanup_task(
            self.state.rate_limiter.clone(),
            self.config.rate_limit_cleanup_interval,
            self.state.drain.shutdown_signal(),
        );
        *self.rate_limit_cleanup.lock().unwrap() = Some(cleanup);

        let redirect_policy = RedirectPolicy {
            enabled: self.config.redirect_to_https,
        };
        let https_addr = self.config.https_listen_addr();
        let redirected = self.handler.clone().layer(middleware::from_fn_with_state(
            redirect_policy,
            redirect_middleware,
        ));
        let plain_app = redirected.layer(middleware::from_fn(move |mut req: Request, next: axum::middleware::Next| {
            req.extensions_mut().insert(ConnectionKind::Plain);
            next.run(req)
        }));

        self.reconfigure_tls().await;

        tracing::info!(
            listen_addr = %listener.local_addr()?,
            https_port = https_addr.port(),
            redirect_to_https = self.config.redirect_to_https,
            "gastrolog-frontend serving"
        );

        let mut shutdown_rx = self.state.drain.shutdown_signal();
        axum::serve(
            listener,
            plain_app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

        Ok(())
    }

    /// Loads TLS settings from the config store and brings the HTTPS
    /// listener in line with them: starts it if enabled and not already
    /// running with the same settings, restarts it if the settings changed,
    /// or tears it down if TLS was disabled (design §4.1 "reconfigureTLS").
    /// Safe to call repeatedly -- e.g. after a `PutTlsConfig` notification.
    pub async fn reconfigure_tls(&self) {
        let settings = self.state.config_store.get_tls_settings().await;
        if !settings.enabled || settings.cert_pem.is_empty() || settings.key_pem.is_empty() {
            self.stop_https().await;
            if settings.enabled {
                tracing::warn!("TLS enabled but no certificate configured; HTTPS left disabled");
            }
            return;
        }

        let fingerprint = fingerprint_tls(&settings);
        if let Some(current) = self.https.load_full() {
            if current.fingerprint == fingerprint {
                return;
            }
        }

        let server_config = match build_rustls_config(&settings) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::error!(error = %err, "failed to build TLS server config; leaving HTTPS as-is");
                return;
            }
        };

        self.stop_https().await;

        let https_addr = self.config.https_listen_addr();
        let listener = match TcpListener::bind(https_addr).await {
            Ok(l) => l,
            Err(err) => {
                tracing::error!(error = %err, %https_addr, "failed to bind HTTPS listener");
                return;
            }
        };

        let acceptor = TlsAcceptor::from(Arc::new(server_config));
        let handler = self.handler.clone();
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        spawn_named(
            || "https-listener",
            serve_tls(listener, acceptor, handler, shutdown_rx),
        );

        self.https.store(Some(Arc::new(HttpsHandle {
            fingerprint,
            shutdown: shutdown_tx,
        })));
        tracing::info!(%https_addr, "HTTPS listener (re)started");
    }

    async fn stop_https(&self) {
        if let Some(handle) = self.https.swap(None) {
            let _ = handle.shutdown.send(true);
        }
    }

    /// Stops the rate-limit cleanup task and shuts down both listeners,
    /// respecting `deadline` (design §4.1 "Stop").
    pub async fn stop(&self, deadline: Duration) {
        if let Some(cleanup) = self.rate_limit_cleanup.lock().unwrap().take() {
            cleanup.abort();
        }
        self.stop_https().await;
        // The plain listener's graceful shutdown is driven by
        // `axum::serve(..).with_graceful_shutdown` inside `serve()`, which
        // already observes the drain controller's shutdown channel; `stop`
        // only needs to bound how long we wait for that to unwind.
        tokio::time::sleep(deadline.min(Duration::from_millis(50))).await;
    }

    /// Watches for `TlsChanged` config-store notifications and reconfigures
    /// TLS accordingly, so `PutTlsConfig` takes effect without a restart
    /// (design §4.1, §4.6).
    pub fn spawn_tls_watcher(self: &Arc<Self>) {
        let mut rx = self.state.config_store.subscribe();
        let this = self.clone();
        let mut shutdown = this.state.drain.shutdown_signal();
        spawn_named(|| "tls-config-watcher", async move {
            loop {
                tokio::select! {
                    notification = rx.recv() => {
                        match notification {
                            Ok(ConfigNotification::TlsChanged) => this.reconfigure_tls().await,
                            Ok(_) => {}
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                                this.reconfigure_tls().await;
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        });
    }
}

fn fingerprint_tls(settings: &gastrolog_config_api::TlsSettings) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    settings.cert_pem.hash(&mut hasher);
    settings.key_pem.hash(&mut hasher);
    settings.sni_hosts.hash(&mut hasher);
    hasher.finish()
}

fn build_rustls_config(
    settings: &gastrolog_config_api::TlsSettings,
) -> anyhow::Result<rustls::ServerConfig> {
    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut settings.cert_pem.as_bytes()).collect::<Result<_, _>>()?;
    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut settings.key_pem.as_bytes())?
        .ok_or_else(|| anyhow::anyhow!("no private key found in configured TLS key PEM"))?;

    // Minimum TLS 1.2, curves restricted to {X25519, P-256} (design §4.1).
    let mut provider = rustls::crypto::ring::default_provider();
    provider.kx_groups = vec![
        rustls::crypto::ring::kx_group::X25519,
        rustls::crypto::ring::kx_group::SECP256R1,
    ];
    let mut config = rustls::ServerConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS12, &rustls::version::TLS13])?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}

/// Accept loop for the TLS listener (design §4.1): each connection is TLS
/// handshaken then served with the same `handler` the plain listener uses,
/// tagged [`ConnectionKind::Tls`] so downstream middleware (redirect,
/// HSTS) can tell the two apart.
async fn serve_tls(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    handler: Router,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to accept TLS connection");
                        continue;
                    }
                };
                let acceptor = acceptor.clone();
                let handler = handler.clone();
                spawn_named(|| "https-connection", async move {
                    if let Err(err) = handle_tls_connection(stream, acceptor, handler, peer_addr).await {
                        tracing::debug!(error = %err, "TLS connection ended with error");
                    }
                });
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

async fn handle_tls_connection(
    stream: TcpStream,
    acceptor: TlsAcceptor,
    handler: Router,
    peer_addr: SocketAddr,
) -> anyhow::Result<()> {
    let tls_stream = acceptor.accept(stream).await?;
    let mut req_handler = handler;
    req_handler = req_handler.layer(middleware::from_fn(move |mut req: Request, next: axum::middleware::Next| {
        req.extensions_mut().insert(ConnectionKind::Tls);
        req.extensions_mut().insert(axum::extract::ConnectInfo(peer_addr));
        next.run(req)
    }));
    let service = tower::util::BoxCloneSyncService::new(req_handler);
    let hyper_service = hyper::service::service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
        let mut service = service.clone();
        async move {
            let req = req.map(Body::new);
            Service::<Request<Body>>::call(&mut service, req).await
        }
    });
    AutoConnBuilder::new(TokioExecutor::new())
        .serve_connection_with_upgrades(TokioIo::new(tls_stream), hyper_service)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}
