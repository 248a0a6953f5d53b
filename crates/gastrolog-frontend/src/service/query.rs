//! `QueryService`: `Search`, `Follow`, `Explain` (design §4.4).

use std::pin::Pin;

use async_stream::try_stream;
use futures::Stream;
use gastrolog_proto::convert::{explain_plan_to_proto, query_from_proto, record_to_proto, resume_token_from_bytes, resume_token_to_bytes};
use gastrolog_proto::gen::query_service_server::QueryService;
use gastrolog_proto::gen::{
    ExplainRequest, ExplainResponse, FollowRequest, FollowResponse, SearchRequest, SearchResponse,
};
use gastrolog_repr::FrontendError;
use tonic::{Request, Response, Status};

use crate::state::AppState;
use crate::vault_lookup::resolve_vault;

pub struct QueryServiceImpl {
    pub state: AppState,
}

/// Records batched per streamed message (design §4.4 Search/Follow).
const BATCH_SIZE: usize = 100;

#[tonic::async_trait]
impl QueryService for QueryServiceImpl {
    type SearchStream = Pin<Box<dyn Stream<Item = Result<SearchResponse, Status>> + Send>>;

    async fn search(&self, request: Request<SearchRequest>) -> Result<Response<Self::SearchStream>, Status> {
        let req = request.into_inner();
        let store = self.state.config_store.clone();
        let orchestrator = self.state.orchestrator.clone();
        let timeout = self.state.query_timeout;

        let vault = resolve_vault(store.as_ref(), req.vault_id.as_deref()).await?;
        let engine = orchestrator
            .query_engine(&vault.id.to_string())
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {} not found", vault.id)))?;
        let mut query = query_from_proto(req.query)?;
        let mut resume = resume_token_from_bytes(&req.resume_token)?;

        let stream = try_stream! {
            let deadline = timeout.map(|d| tokio::time::Instant::now() + d);
            loop {
                if let Some(deadline) = deadline {
                    if tokio::time::Instant::now() >= deadline {
                        yield SearchResponse {
                            records: Vec::new(),
                            has_more: false,
                            resume_token: resume_token_to_bytes(resume),
                        };
                        return;
                    }
                }
                // `query.limit` is the *remaining* count across the whole stream,
                // not a per-batch cap -- decremented below so a limit greater
                // than `BATCH_SIZE` still stops the stream at the right total
                // instead of being silently re-applied (and trivially
                // satisfied) on every resumed batch.
                let batch_cap = query.limit.map(|l| (l as usize).min(BATCH_SIZE)).unwrap_or(BATCH_SIZE);
                let batch = engine.next_batch(&query, resume, batch_cap).await?;
                let has_more = batch.has_more;
                if let Some(next) = batch.next {
                    resume = Some(next);
                }
                if let Some(limit) = query.limit.as_mut() {
                    *limit = limit.saturating_sub(batch.records.len() as u64);
                }
                let has_more = has_more && query.limit.map(|l| l > 0).unwrap_or(true);
                yield SearchResponse {
                    records: batch.records.iter().map(record_to_proto).collect(),
                    has_more,
                    resume_token: if has_more { Vec::new() } else { resume_token_to_bytes(resume) },
                };
                if !has_more {
                    break;
                }
            }
        };

        Ok(Response::new(Box::pin(stream)))
    }

    type FollowStream = Pin<Box<dyn Stream<Item = Result<FollowResponse, Status>> + Send>>;

    /// Unbounded "search then follow" (design §4.4): context cancellation is
    /// a clean stream close, not an error, so this never yields a `Status`
    /// for cancellation -- it simply stops being polled when the client or
    /// server drops the stream.
    async fn follow(&self, request: Request<FollowRequest>) -> Result<Response<Self::FollowStream>, Status> {
        let req = request.into_inner();
        let store = self.state.config_store.clone();
        let orchestrator = self.state.orchestrator.clone();
        let max_duration = self.state.max_follow_duration;
        let mut shutdown = self.state.drain.shutdown_signal();

        let vault = resolve_vault(store.as_ref(), req.vault_id.as_deref()).await?;
        let engine = orchestrator
            .query_engine(&vault.id.to_string())
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {} not found", vault.id)))?;
        let query = query_from_proto(req.query)?;

        let stream = try_stream! {
            let deadline = tokio::time::Instant::now() + max_duration;
            let mut resume = None;
            loop {
                if tokio::time::Instant::now() >= deadline {
                    break;
                }
                tokio::select! {
                    batch = engine.follow_batch(&query, resume) => {
                        let batch = batch?;
                        resume = batch.next.or(resume);
                        if !batch.records.is_empty() {
                            yield FollowResponse {
                                records: batch.records.iter().map(record_to_proto).collect(),
                            };
                        } else {
                            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        };

        Ok(Response::new(Box::pin(stream)))
    }

    async fn explain(&self, request: Request<ExplainRequest>) -> Result<Response<ExplainResponse>, Status> {
        let req = request.into_inner();
        let vault = resolve_vault(self.state.config_store.as_ref(), req.vault_id.as_deref()).await?;
        let engine = self
            .state
            .orchestrator
            .query_engine(&vault.id.to_string())
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {} not found", vault.id)))?;
        let query = query_from_proto(req.query)?;
        let plan = engine.explain(&query).await?;
        Ok(Response::new(ExplainResponse {
            plan: Some(explain_plan_to_proto(&plan)),
        }))
    }
}
