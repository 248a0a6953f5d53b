//! The job scheduler contract driven by `VaultService`'s async admin
//! operations and `JobService` (design §4.5, §4.7).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use gastrolog_repr::JobInfo;

/// A boxed async job body. Receives a [`JobHandle`] to report progress.
pub type JobFn =
    Box<dyn FnOnce(JobHandle) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + 'static>;

/// The progress-reporting half of one submitted job's state, handed to the
/// job body without exposing the scheduler's `submit`/`get_job`/`list_jobs`
/// surface to running jobs.
#[async_trait]
pub trait JobProgressSink: Send + Sync {
    async fn mark_running(&self, chunks_total: u64);
    async fn advance_progress(&self, chunks_done: u64, records_done: u64);
    async fn record_error(&self, detail: String);
    async fn mark_completed(&self);
    async fn mark_failed(&self, summary: String);
}

/// Handed to a running job so it can update its own `JobProgress` as it
/// iterates chunks (design §3 `JobInfo` lifecycle).
#[derive(Clone)]
pub struct JobHandle {
    id: String,
    sink: Arc<dyn JobProgressSink>,
}

impl JobHandle {
    pub fn new(id: String, sink: Arc<dyn JobProgressSink>) -> JobHandle {
        JobHandle { id, sink }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn set_running(&self, chunks_total: u64) {
        self.sink.mark_running(chunks_total).await;
    }

    pub async fn advance(&self, chunks_done: u64, records_done: u64) {
        self.sink.advance_progress(chunks_done, records_done).await;
    }

    pub async fn record_error(&self, detail: String) {
        self.sink.record_error(detail).await;
    }

    pub async fn complete(&self) {
        self.sink.mark_completed().await;
    }

    pub async fn fail(&self, summary: String) {
        self.sink.mark_failed(summary).await;
    }
}

/// Submits and tracks background jobs (design §4.5 Reindex/Migrate/Merge,
/// §4.7 GetJob/ListJobs/WatchJobs).
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Submits `job` to run in the background under a freshly generated job
    /// id, returning that id immediately (design §1 "async job
    /// orchestration").
    async fn submit(&self, name: &str, description: Option<String>, job: JobFn) -> String;

    async fn get_job(&self, id: &str) -> Option<JobInfo>;
    async fn list_jobs(&self) -> Vec<JobInfo>;
}
