//! The GastroLog RPC frontend (design §0-§9): the axum/tonic HTTP surface
//! binding the orchestrator and config-store collaborators to the wire.
//! `main.rs` is the only binary entry point; everything else here is a
//! library so integration tests can construct and drive a server in-process.

pub mod auth_interceptor;
pub mod config;
pub mod drain;
pub mod middleware;
pub mod rate_limit;
pub mod service;
pub mod state;
pub mod transport;
pub mod vault_lookup;
