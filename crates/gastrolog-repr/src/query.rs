//! Query predicates and the explain plan shape (design §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A search predicate: free-text/attribute tokens plus an optional time
/// window, result limit, and surrounding-context window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub tokens: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub context_before: Option<u32>,
    pub context_after: Option<u32>,
}

/// One step of a query engine's execution plan for a single chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub name: String,
    pub detail: String,
}

/// The nested plan returned by `QueryService::Explain`: one entry per chunk
/// the engine would visit, each carrying the pipeline it would run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainPlan {
    pub chunk_plans: Vec<ChunkPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub chunk_id: Uuid,
    pub steps: Vec<PipelineStep>,
}
