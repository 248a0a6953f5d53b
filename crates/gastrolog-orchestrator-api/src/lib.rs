//! The orchestrator external collaborator named in design §1: vault/store
//! registry, ingestion control, query engines, and job scheduling. This
//! crate only defines the contract and an in-memory reference
//! implementation; `gastrolog-frontend` is the only caller.

pub mod memory;
pub mod query_engine;
pub mod scheduler;
pub mod vault_runtime;

use async_trait::async_trait;
use gastrolog_repr::{ChunkMeta, ChunkValidation, FrontendError, Record, VaultConfig};
use uuid::Uuid;

pub use query_engine::{QueryBatch, QueryEngine};
pub use scheduler::{JobFn, JobHandle, JobProgressSink, Scheduler};
pub use vault_runtime::VaultRuntime;

/// Aggregate record/byte counters returned by `GetStats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VaultStats {
    pub record_count: u64,
    pub logical_bytes: u64,
    pub on_disk_bytes: u64,
    pub oldest: Option<chrono::DateTime<chrono::Utc>>,
    pub newest: Option<chrono::DateTime<chrono::Utc>>,
}

/// The full orchestrator contract. Vault-admin handlers in
/// `gastrolog-frontend` call this directly when the target vault is owned by
/// the local node (design §4.5); when it isn't, they go through the
/// remote-forwarding client in `gastrolog-service` instead, which ultimately
/// invokes this same trait on the owning node.
#[async_trait]
pub trait OrchestratorApi: Send + Sync {
    /// Whether the orchestrator is accepting work; backs `Health` and
    /// `/readyz` (design §4.9).
    fn running(&self) -> bool;

    fn local_node_id(&self) -> &str;

    // -- runtime lifecycle, mirroring config-store vault CRUD --

    async fn register_vault(&self, cfg: &VaultConfig) -> Result<(), FrontendError>;
    async fn remove_vault(&self, id: Uuid) -> Result<(), FrontendError>;
    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<(), FrontendError>;

    // -- data operations --

    async fn append_records(&self, id: Uuid, records: Vec<Record>) -> Result<u64, FrontendError>;
    async fn seal_active_chunk(&self, id: Uuid) -> Result<(), FrontendError>;
    async fn list_chunks(&self, id: Uuid) -> Result<Vec<ChunkMeta>, FrontendError>;
    async fn get_chunk(&self, id: Uuid, chunk_id: Uuid) -> Result<ChunkMeta, FrontendError>;
    async fn get_indexes(&self, id: Uuid, chunk_id: Uuid) -> Result<Vec<String>, FrontendError>;
    async fn delete_index(&self, id: Uuid, chunk_id: Uuid) -> Result<(), FrontendError>;
    async fn build_index(&self, id: Uuid, chunk_id: Uuid) -> Result<(), FrontendError>;
    async fn validate_vault(&self, id: Uuid) -> Result<Vec<ChunkValidation>, FrontendError>;
    async fn export_chunk(&self, id: Uuid, chunk_id: Uuid) -> Result<Vec<Record>, FrontendError>;
    async fn stats(&self, id: Option<Uuid>) -> Result<VaultStats, FrontendError>;

    /// Moves all chunks of `src` into `dst` verbatim (both backends must
    /// support chunk-move), preserving write timestamps. Returns `false` if
    /// either backend doesn't support the move so the caller falls back to
    /// copy-with-rewritten-timestamps.
    async fn move_chunks(&self, src: Uuid, dst: Uuid) -> Result<bool, FrontendError>;

    /// Copies every sealed chunk's records from `src` into `dst`, stamping a
    /// fresh write timestamp on each (design §4.5 Migrate/Merge phase 3).
    async fn copy_records(&self, src: Uuid, dst: Uuid) -> Result<u64, FrontendError>;

    /// Removes the on-disk directory of a file-backed vault, if any. A no-op
    /// for memory-backed vaults.
    async fn remove_directory(&self, id: Uuid) -> Result<(), FrontendError>;

    async fn query_engine(&self, vault_id: &str) -> Option<std::sync::Arc<dyn QueryEngine>>;

    fn scheduler(&self) -> &dyn Scheduler;

    /// Ingest queue depth/capacity for `/metrics` (design §0 ambient metrics
    /// supplement).
    fn ingest_queue_depth(&self) -> u64;
    fn ingest_queue_capacity(&self) -> u64;
}
