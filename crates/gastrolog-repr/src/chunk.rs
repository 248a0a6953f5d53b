//! Chunk metadata and validation results (design §3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata describing one append-only segment of a vault.
///
/// A sealed chunk's `record_count`, `logical_bytes` and `on_disk_bytes` are
/// immutable (design §3 invariant); `sealed` only ever flips false -> true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub chunk_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sealed: bool,
    pub record_count: u64,
    pub logical_bytes: u64,
    pub on_disk_bytes: u64,
    pub compressed: bool,
}

/// The outcome of validating one chunk against its own metadata and index
/// completeness, as produced by `VaultService::Validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkValidation {
    pub chunk_id: Uuid,
    pub valid: bool,
    pub issues: Vec<String>,
}
