//! The data model of the GastroLog RPC frontend (see design §3).
//!
//! Types here are plain Rust: no wire encoding lives in this crate. Wire
//! conversions live in `gastrolog-proto`, which depends on this crate rather
//! than the other way around, so this crate stays usable from tests and from
//! the orchestrator/config-store trait contracts without pulling in prost.

mod chunk;
mod error;
mod job;
mod query;
mod record;
mod resume_token;
mod user;
mod vault;

pub use chunk::{ChunkMeta, ChunkValidation};
pub use error::FrontendError;
pub use job::{JobInfo, JobProgress, JobSchedule, JobStatus};
pub use query::{ChunkPlan, ExplainPlan, PipelineStep, Query};
pub use record::Record;
pub use resume_token::{RecordRef, ResumeToken};
pub use user::{Claims, Role, User};
pub use vault::{RetentionRule, VaultConfig};
