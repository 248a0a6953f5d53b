//! `JobService`: `GetJob`, `ListJobs`, `WatchJobs` (design §4.7).

use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use futures::Stream;
use gastrolog_proto::convert::job_info_to_proto;
use gastrolog_proto::gen::job_service_server::JobService;
use gastrolog_proto::gen::{
    GetJobRequest, GetJobResponse, JobInfo as ProtoJobInfo, ListJobsRequest, ListJobsResponse,
    WatchJobsRequest, WatchJobsResponse,
};
use gastrolog_repr::{Claims, FrontendError};
use prost::Message;
use tonic::{Request, Response, Status};

use crate::state::AppState;

pub struct JobServiceImpl {
    pub state: AppState,
}

/// `WatchJobs` re-polls the scheduler on this interval and pushes the full
/// job list whenever it changes; the scheduler has no native
/// change-notification channel, so polling is the grounded approach here.
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Mirrors `JobInfo::sort_key` (design §4.7) over the wire representation, so
/// a peer's already-encoded `JobInfo`s can be merged with local ones and
/// sorted without a proto-to-domain round trip.
fn proto_sort_key(j: &ProtoJobInfo) -> (bool, String, String) {
    let is_once = j.schedule == "once";
    let label = j.description.clone().unwrap_or_else(|| j.name.clone());
    (is_once, label, j.node_id.clone())
}

fn claims_of<T>(request: &Request<T>) -> Option<Claims> {
    request.extensions().get::<Claims>().cloned()
}

impl JobServiceImpl {
    /// This node's own jobs only, sorted -- used both by the public
    /// `ListJobs`/`WatchJobs` RPCs (merged with peer results) and by
    /// [`crate::service::forwarding`] as the target of a peer's forwarded
    /// `ListJobs` call. Forwarding never recurses (design §4.8, §9): this
    /// never itself fans out to peers, unlike `aggregated_jobs`/`list_jobs`.
    pub(crate) async fn local_jobs(&self) -> Vec<ProtoJobInfo> {
        let mut jobs = self.state.orchestrator.scheduler().list_jobs().await;
        jobs.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        jobs.iter().map(job_info_to_proto).collect()
    }

    /// Local jobs plus every configured peer's jobs (design §4.7 "merges
    /// local jobs with peer-reported jobs (when configured), tagged with
    /// `node_id`"), re-sorted over the combined set. A peer that can't be
    /// reached is skipped rather than failing the whole call -- a job
    /// listing degrades to partial results instead of an outage.
    async fn aggregated_jobs(&self, claims: Option<&Claims>) -> Vec<ProtoJobInfo> {
        let mut jobs = self.local_jobs().await;
        for node_id in &self.state.peer_node_ids {
            let request = ListJobsRequest {};
            match self
                .state
                .forwarding
                .forward(node_id, "/gastrolog.JobService/ListJobs", claims, request.encode_to_vec())
                .await
                .and_then(|bytes| {
                    ListJobsResponse::decode(bytes.as_slice()).map_err(FrontendError::internal)
                }) {
                Ok(response) => jobs.extend(response.jobs),
                Err(err) => {
                    tracing::warn!(%node_id, error = %err, "skipping unreachable peer in job listing")
                }
            }
        }
        jobs.sort_by(|a, b| proto_sort_key(a).cmp(&proto_sort_key(b)));
        jobs
    }
}

#[tonic::async_trait]
impl JobService for JobServiceImpl {
    async fn get_job(&self, request: Request<GetJobRequest>) -> Result<Response<GetJobResponse>, Status> {
        let id = request.into_inner().id;
        let job = self
            .state
            .orchestrator
            .scheduler()
            .get_job(&id)
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("job {id} not found")))?;
        Ok(Response::new(GetJobResponse {
            job: Some(job_info_to_proto(&job)),
        }))
    }

    async fn list_jobs(&self, request: Request<ListJobsRequest>) -> Result<Response<ListJobsResponse>, Status> {
        let claims = claims_of(&request);
        Ok(Response::new(ListJobsResponse {
            jobs: self.aggregated_jobs(claims.as_ref()).await,
        }))
    }

    type WatchJobsStream = Pin<Box<dyn Stream<Item = Result<WatchJobsResponse, Status>> + Send>>;

    async fn watch_jobs(
        &self,
        request: Request<WatchJobsRequest>,
    ) -> Result<Response<Self::WatchJobsStream>, Status> {
        let state = self.state.clone();
        let claims = claims_of(&request);
        let mut shutdown = state.drain.shutdown_signal();

        let stream = try_stream! {
            let mut last: Option<Vec<u8>> = None;
            loop {
                let job = JobServiceImpl { state: state.clone() };
                let protos = job.aggregated_jobs(claims.as_ref()).await;
                // Fingerprint the marshaled form of the whole list (design §4.7)
                // so any field change -- progress counters, next_run, not just
                // status -- triggers a re-emit, not just a status flip.
                let mut fingerprint = Vec::new();
                for job in &protos {
                    job.encode_length_delimited(&mut fingerprint)
                        .expect("encoding to a Vec<u8> is infallible");
                }
                if last.as_ref() != Some(&fingerprint) {
                    last = Some(fingerprint);
                    yield WatchJobsResponse { jobs: protos };
                }

                tokio::select! {
                    _ = tokio::time::sleep(WATCH_POLL_INTERVAL) => {}
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
}
