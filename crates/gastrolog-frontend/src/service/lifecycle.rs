//! `LifecycleService`: `Health` and `Shutdown` (design §4.9).

use gastrolog_proto::gen::lifecycle_service_server::LifecycleService;
use gastrolog_proto::gen::{HealthRequest, HealthResponse, ShutdownRequest, ShutdownResponse};
use tonic::{Request, Response, Status};

use crate::state::AppState;

pub struct LifecycleServiceImpl {
    pub state: AppState,
}

#[tonic::async_trait]
impl LifecycleService for LifecycleServiceImpl {
    async fn health(&self, _request: Request<HealthRequest>) -> Result<Response<HealthResponse>, Status> {
        let running = self.state.orchestrator.running();
        Ok(Response::new(HealthResponse {
            status: if running { "healthy" } else { "unhealthy" }.to_string(),
            version: gastrolog_build_info::BUILD_INFO.version.to_string(),
            uptime_secs: self.state.uptime_secs(),
        }))
    }

    /// Requests drain (design §4.9, §8): sets the draining flag synchronously
    /// and returns immediately; the server keeps serving in-flight requests
    /// until the background drain-waiter closes the shutdown channel.
    async fn shutdown(&self, request: Request<ShutdownRequest>) -> Result<Response<ShutdownResponse>, Status> {
        let drain = request.into_inner().drain;
        self.state.drain.request_shutdown(drain);
        Ok(Response::new(ShutdownResponse {}))
    }
}
