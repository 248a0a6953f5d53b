//! The in-memory reference `OrchestratorApi`, used by tests and by
//! `--orchestrator=memory` development mode (design §1 "out of scope ...
//! consumed through the interface").

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gastrolog_ore::task::spawn_named;
use gastrolog_repr::{
    ChunkMeta, ChunkValidation, FrontendError, JobInfo, JobProgress, JobSchedule, JobStatus,
    Query, Record, RecordRef, VaultConfig,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::query_engine::{QueryBatch, QueryEngine};
use crate::scheduler::{JobFn, JobHandle, JobProgressSink, Scheduler};
use crate::vault_runtime::VaultRuntime;
use crate::{OrchestratorApi, VaultStats};

/// An in-process query engine over one vault's [`VaultRuntime`].
struct MemoryQueryEngine {
    runtime: Arc<VaultRuntime>,
}

fn matches(query: &Query, record: &Record) -> bool {
    if let Some(start) = query.start {
        if record.write_ts < start {
            return false;
        }
    }
    if let Some(end) = query.end {
        if record.write_ts > end {
            return false;
        }
    }
    if query.tokens.is_empty() {
        return true;
    }
    let payload = String::from_utf8_lossy(&record.payload);
    query
        .tokens
        .iter()
        .all(|tok| payload.contains(tok.as_str()) || record.attributes.values().any(|v| v.contains(tok.as_str())))
}

#[async_trait]
impl QueryEngine for MemoryQueryEngine {
    async fn next_batch(
        &self,
        query: &Query,
        resume: Option<RecordRef>,
        batch_size: usize,
    ) -> Result<QueryBatch, FrontendError> {
        let all = self.runtime.all_records_with_refs();
        let start_pos = match resume {
            None => 0,
            Some(cursor) => all
                .iter()
                .position(|(r, _)| *r == cursor)
                .map(|p| p + 1)
                .unwrap_or(all.len()),
        };
        let mut records = Vec::new();
        let mut next = None;
        let mut has_more = false;
        let limit = query.limit.map(|l| l as usize);
        for (cursor, record) in all.into_iter().skip(start_pos) {
            if !matches(query, &record) {
                continue;
            }
            if let Some(limit) = limit {
                if records.len() >= limit {
                    has_more = false;
                    break;
                }
            }
            if records.len() >= batch_size {
                has_more = true;
                break;
            }
            records.push(record);
            next = Some(cursor);
        }
        Ok(QueryBatch {
            records,
            next,
            has_more,
        })
    }

    async fn follow_batch(
        &self,
        query: &Query,
        resume: Option<RecordRef>,
    ) -> Result<QueryBatch, FrontendError> {
        let batch = self.next_batch(query, resume, usize::MAX).await?;
        Ok(QueryBatch {
            records: batch.records,
            next: batch.next.or(resume),
            has_more: true,
        })
    }

    async fn explain(&self, query: &Query) -> Result<gastrolog_repr::ExplainPlan, FrontendError> {
        let chunk_plans = self
            .runtime
            .list_chunks()
            .into_iter()
            .map(|c| gastrolog_repr::ChunkPlan {
                chunk_id: c.chunk_id,
                steps: vec![
                    gastrolog_repr::PipelineStep {
                        name: "scan".to_string(),
                        detail: format!("{} records", c.record_count),
                    },
                    gastrolog_repr::PipelineStep {
                        name: "filter".to_string(),
                        detail: format!("{} tokens", query.tokens.len()),
                    },
                ],
            })
            .collect();
        Ok(gastrolog_repr::ExplainPlan { chunk_plans })
    }
}

struct JobState {
    info: Mutex<JobInfo>,
}

#[async_trait]
impl JobProgressSink for JobState {
    async fn mark_running(&self, chunks_total: u64) {
        let mut info = self.info.lock().unwrap();
        let progress = info.progress.get_or_insert_with(JobProgress::pending);
        progress.status = JobStatus::Running;
        progress.chunks_total = chunks_total;
        progress.started_at = Some(chrono::Utc::now());
    }

    async fn advance_progress(&self, chunks_done: u64, records_done: u64) {
        let mut info = self.info.lock().unwrap();
        let progress = info.progress.get_or_insert_with(JobProgress::pending);
        progress.chunks_done = chunks_done;
        progress.records_done = records_done;
    }

    async fn record_error(&self, detail: String) {
        let mut info = self.info.lock().unwrap();
        let progress = info.progress.get_or_insert_with(JobProgress::pending);
        progress.error_details.push(detail);
    }

    async fn mark_completed(&self) {
        let mut info = self.info.lock().unwrap();
        let progress = info.progress.get_or_insert_with(JobProgress::pending);
        progress.status = JobStatus::Completed;
        progress.completed_at = Some(chrono::Utc::now());
    }

    async fn mark_failed(&self, summary: String) {
        let mut info = self.info.lock().unwrap();
        let progress = info.progress.get_or_insert_with(JobProgress::pending);
        progress.status = JobStatus::Failed;
        progress.completed_at = Some(chrono::Utc::now());
        progress.error_summary = Some(summary);
    }
}

/// A single-node job scheduler: jobs run as spawned tasks, state tracked in
/// a map keyed by job id. Durable persistence across restarts is an explicit
/// Non-goal (design §1); jobs vanish with the process.
pub struct InMemoryScheduler {
    node_id: String,
    jobs: Mutex<HashMap<String, Arc<JobState>>>,
}

impl InMemoryScheduler {
    pub fn new(node_id: impl Into<String>) -> InMemoryScheduler {
        InMemoryScheduler {
            node_id: node_id.into(),
            jobs: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Scheduler for InMemoryScheduler {
    async fn submit(&self, name: &str, description: Option<String>, job: JobFn) -> String {
        let id = Uuid::now_v7().to_string();
        let info = JobInfo {
            id: id.clone(),
            name: name.to_string(),
            description,
            schedule: JobSchedule::Once,
            last_run: Some(chrono::Utc::now()),
            next_run: None,
            progress: Some(JobProgress::pending()),
            node_id: self.node_id.clone(),
        };
        let state = Arc::new(JobState {
            info: Mutex::new(info),
        });
        self.jobs.lock().unwrap().insert(id.clone(), state.clone());
        let handle = JobHandle::new(id.clone(), state as Arc<dyn JobProgressSink>);
        spawn_named(|| "scheduler-job", job(handle));
        id
    }

    async fn get_job(&self, id: &str) -> Option<JobInfo> {
        self.jobs
            .lock()
            .unwrap()
            .get(id)
            .map(|s| s.info.lock().unwrap().clone())
    }

    async fn list_jobs(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<JobInfo> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .map(|s| s.info.lock().unwrap().clone())
            .collect();
        jobs.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        jobs
    }
}

struct VaultEntry {
    config: Mutex<VaultConfig>,
    runtime: Arc<VaultRuntime>,
}

/// The in-memory reference implementation of the orchestrator contract.
pub struct InMemoryOrchestrator {
    node_id: String,
    running: std::sync::atomic::AtomicBool,
    vaults: RwLock<HashMap<Uuid, VaultEntry>>,
    scheduler: Arc<InMemoryScheduler>,
    ingest_queue_capacity: u64,
    ingest_queue_depth: AtomicU64,
}

impl InMemoryOrchestrator {
    pub fn new(node_id: impl Into<String>) -> InMemoryOrchestrator {
        let node_id = node_id.into();
        InMemoryOrchestrator {
            scheduler: Arc::new(InMemoryScheduler::new(node_id.clone())),
            node_id,
            running: std::sync::atomic::AtomicBool::new(true),
            vaults: RwLock::new(HashMap::new()),
            ingest_queue_capacity: 10_000,
            ingest_queue_depth: AtomicU64::new(0),
        }
    }

    async fn runtime_for(&self, id: Uuid) -> Result<Arc<VaultRuntime>, FrontendError> {
        self.vaults
            .read()
            .await
            .get(&id)
            .map(|e| e.runtime.clone())
            .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))
    }
}

#[async_trait]
impl OrchestratorApi for InMemoryOrchestrator {
    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn local_node_id(&self) -> &str {
        &self.node_id
    }

    async fn register_vault(&self, cfg: &VaultConfig) -> Result<(), FrontendError> {
        let runtime = Arc::new(VaultRuntime::new(cfg.backend.clone()));
        runtime.set_enabled(cfg.enabled);
        self.vaults.write().await.insert(
            cfg.id,
            VaultEntry {
                config: Mutex::new(cfg.clone()),
                runtime,
            },
        );
        Ok(())
    }

    async fn remove_vault(&self, id: Uuid) -> Result<(), FrontendError> {
        self.vaults.write().await.remove(&id);
        Ok(())
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<(), FrontendError> {
        let vaults = self.vaults.read().await;
        let entry = vaults
            .get(&id)
            .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))?;
        entry.runtime.set_enabled(enabled);
        entry.config.lock().unwrap().enabled = enabled;
        Ok(())
    }

    async fn append_records(&self, id: Uuid, records: Vec<Record>) -> Result<u64, FrontendError> {
        let runtime = self.runtime_for(id).await?;
        Ok(runtime.append(records))
    }

    async fn seal_active_chunk(&self, id: Uuid) -> Result<(), FrontendError> {
        let runtime = self.runtime_for(id).await?;
        runtime.seal_active();
        Ok(())
    }

    async fn list_chunks(&self, id: Uuid) -> Result<Vec<ChunkMeta>, FrontendError> {
        Ok(self.runtime_for(id).await?.list_chunks())
    }

    async fn get_chunk(&self, id: Uuid, chunk_id: Uuid) -> Result<ChunkMeta, FrontendError> {
        self.runtime_for(id).await?.get_chunk(chunk_id)
    }

    async fn get_indexes(&self, id: Uuid, chunk_id: Uuid) -> Result<Vec<String>, FrontendError> {
        self.runtime_for(id).await?.get_indexes(chunk_id)
    }

    async fn delete_index(&self, id: Uuid, chunk_id: Uuid) -> Result<(), FrontendError> {
        self.runtime_for(id).await?.delete_index(chunk_id)
    }

    async fn build_index(&self, id: Uuid, chunk_id: Uuid) -> Result<(), FrontendError> {
        self.runtime_for(id).await?.build_index(chunk_id)
    }

    async fn validate_vault(&self, id: Uuid) -> Result<Vec<ChunkValidation>, FrontendError> {
        Ok(self.runtime_for(id).await?.validate())
    }

    async fn export_chunk(&self, id: Uuid, chunk_id: Uuid) -> Result<Vec<Record>, FrontendError> {
        self.runtime_for(id).await?.export_chunk(chunk_id)
    }

    async fn stats(&self, id: Option<Uuid>) -> Result<VaultStats, FrontendError> {
        let vaults = self.vaults.read().await;
        let runtimes: Vec<Arc<VaultRuntime>> = match id {
            Some(id) => vec![vaults
                .get(&id)
                .map(|e| e.runtime.clone())
                .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))?],
            None => vaults.values().map(|e| e.runtime.clone()).collect(),
        };
        let mut stats = VaultStats::default();
        for runtime in runtimes {
            let (rc, lb, ob, oldest, newest) = runtime.stats();
            stats.record_count += rc;
            stats.logical_bytes += lb;
            stats.on_disk_bytes += ob;
            stats.oldest = match (stats.oldest, oldest) {
                (None, x) => x,
                (x, None) => x,
                (Some(a), Some(b)) => Some(a.min(b)),
            };
            stats.newest = match (stats.newest, newest) {
                (None, x) => x,
                (x, None) => x,
                (Some(a), Some(b)) => Some(a.max(b)),
            };
        }
        Ok(stats)
    }

    async fn move_chunks(&self, src: Uuid, dst: Uuid) -> Result<bool, FrontendError> {
        let src_runtime = self.runtime_for(src).await?;
        let dst_runtime = self.runtime_for(dst).await?;
        for (meta, records) in src_runtime.take_all_sealed_chunks() {
            dst_runtime.ingest_sealed_chunk(meta, records);
        }
        Ok(true)
    }

    async fn copy_records(&self, src: Uuid, dst: Uuid) -> Result<u64, FrontendError> {
        let src_runtime = self.runtime_for(src).await?;
        let dst_runtime = self.runtime_for(dst).await?;
        let now = chrono::Utc::now();
        let mut copied = 0u64;
        for (_, record) in src_runtime.all_records_with_refs() {
            let mut rewritten = record;
            rewritten.write_ts = now;
            dst_runtime.append(vec![rewritten]);
            copied += 1;
        }
        Ok(copied)
    }

    async fn remove_directory(&self, _id: Uuid) -> Result<(), FrontendError> {
        // The in-memory backend owns no directory; file-backed deployments
        // override this through their own orchestrator.
        Ok(())
    }

    async fn query_engine(&self, vault_id: &str) -> Option<Arc<dyn QueryEngine>> {
        let id = Uuid::parse_str(vault_id).ok()?;
        let runtime = self.vaults.read().await.get(&id).map(|e| e.runtime.clone())?;
        Some(Arc::new(MemoryQueryEngine { runtime }) as Arc<dyn QueryEngine>)
    }

    fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    fn ingest_queue_depth(&self) -> u64 {
        self.ingest_queue_depth.load(Ordering::SeqCst)
    }

    fn ingest_queue_capacity(&self) -> u64 {
        self.ingest_queue_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gastrolog_repr::Record;

    fn record(payload: &str) -> Record {
        let now = chrono::Utc::now();
        Record::new(payload.as_bytes().to_vec(), now, now)
    }

    fn vault_config(id: Uuid) -> VaultConfig {
        VaultConfig {
            id,
            name: "v1".into(),
            backend: "memory".into(),
            params: Default::default(),
            enabled: true,
            node_id: "local".into(),
            filter_id: None,
            policy_id: None,
            retention: Vec::new(),
            ingester_id: None,
        }
    }

    #[tokio::test]
    async fn append_then_search_all_returns_every_record() {
        let orch = InMemoryOrchestrator::new("local");
        let id = Uuid::now_v7();
        orch.register_vault(&vault_config(id)).await.unwrap();
        orch.append_records(id, vec![record("a"), record("b"), record("c")])
            .await
            .unwrap();

        let engine = orch.query_engine(&id.to_string()).await.unwrap();
        let batch = engine
            .next_batch(&Query::default(), None, 100)
            .await
            .unwrap();
        assert_eq!(batch.records.len(), 3);
        assert!(!batch.has_more);
    }

    #[tokio::test]
    async fn search_batches_respect_batch_size() {
        let orch = InMemoryOrchestrator::new("local");
        let id = Uuid::now_v7();
        orch.register_vault(&vault_config(id)).await.unwrap();
        orch.append_records(
            id,
            (0..5).map(|i| record(&format!("r{i}"))).collect(),
        )
        .await
        .unwrap();

        let engine = orch.query_engine(&id.to_string()).await.unwrap();
        let first = engine.next_batch(&Query::default(), None, 2).await.unwrap();
        assert_eq!(first.records.len(), 2);
        assert!(first.has_more);

        let second = engine
            .next_batch(&Query::default(), first.next, 2)
            .await
            .unwrap();
        assert_eq!(second.records.len(), 2);
        assert!(second.has_more);

        let third = engine
            .next_batch(&Query::default(), second.next, 2)
            .await
            .unwrap();
        assert_eq!(third.records.len(), 1);
        assert!(!third.has_more);
    }

    #[tokio::test]
    async fn job_submission_tracks_progress_to_completion() {
        let orch = InMemoryOrchestrator::new("local");
        let job_id = orch
            .scheduler()
            .submit(
                "reindex",
                Some("reindex vault v1".into()),
                Box::new(|handle| {
                    Box::pin(async move {
                        handle.set_running(1).await;
                        handle.advance(1, 10).await;
                        handle.complete().await;
                    })
                }),
            )
            .await;

        for _ in 0..50 {
            if let Some(info) = orch.scheduler().get_job(&job_id).await {
                if matches!(
                    info.progress.as_ref().map(|p| p.status),
                    Some(JobStatus::Completed)
                ) {
                    return;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("job never completed");
    }
}
