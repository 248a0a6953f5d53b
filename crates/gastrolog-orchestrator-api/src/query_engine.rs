//! The query engine contract driven by `QueryService` (design §4.4).

use async_trait::async_trait;
use gastrolog_repr::{ExplainPlan, FrontendError, Query, Record, RecordRef};

/// One page of results from a search or follow cursor.
#[derive(Debug, Clone)]
pub struct QueryBatch {
    pub records: Vec<Record>,
    /// The cursor to resume from if the caller wants more; `None` once
    /// exhausted.
    pub next: Option<RecordRef>,
    pub has_more: bool,
}

/// A per-vault query engine. One instance is looked up per `Search`/`Follow`/
/// `Explain` call via `OrchestratorApi::query_engine`.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Returns up to `batch_size` records matching `query`, resuming after
    /// `resume` if given. Used by `Search` (design §4.4): the final batch
    /// carries `has_more = false` and the resume token for a subsequent call.
    async fn next_batch(
        &self,
        query: &Query,
        resume: Option<RecordRef>,
        batch_size: usize,
    ) -> Result<QueryBatch, FrontendError>;

    /// Returns whatever records have arrived since `resume` (or since the
    /// beginning, if `None`), without bound on total lifetime -- `Follow`
    /// (design §4.4) calls this in a loop and the server-configured maximum
    /// follow duration is enforced by the caller, not the engine. An empty,
    /// `has_more = true` batch means "nothing new yet, keep following".
    async fn follow_batch(
        &self,
        query: &Query,
        resume: Option<RecordRef>,
    ) -> Result<QueryBatch, FrontendError>;

    /// Produces the nested plan consumed by `Explain`.
    async fn explain(&self, query: &Query) -> Result<ExplainPlan, FrontendError>;
}
