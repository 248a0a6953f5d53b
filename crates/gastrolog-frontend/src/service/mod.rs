//! RPC service handlers (design §4.4-§4.10). Each submodule implements one
//! tonic-generated `*Server` trait over the shared [`crate::state::AppState`].

pub mod auth;
pub mod config;
pub mod forwarding;
pub mod job;
pub mod lifecycle;
pub mod query;
pub mod vault;
