//! Small grab-bag of runtime utilities shared by every other GastroLog crate.
//!
//! Kept deliberately tiny: a named-task spawner, a metrics registry newtype,
//! and a clock indirection. Anything crate-specific belongs in that crate.

pub mod metrics;
pub mod now;
pub mod task;
