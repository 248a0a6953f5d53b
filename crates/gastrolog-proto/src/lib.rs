//! Wire protocol for the GastroLog RPC frontend (design §6).
//!
//! `gen` holds the `tonic-build`-generated message and service types. The
//! `convert` module is the only place that knows how to turn those wire
//! messages into `gastrolog_repr` types and back, so every RPC handler in
//! `gastrolog-frontend` works in plain Rust types end to end.

pub mod convert;
pub mod status;

pub mod gen {
    tonic::include_proto!("gastrolog");
}

pub use gen::*;
