//! `ForwardingService` (design §4.8): the receiving side of remote-vault
//! forwarding. Decodes the envelope, dispatches `procedure_path` to the
//! matching local `VaultService` method, and re-encodes the response.
//!
//! Forwarding never recurses (design §4.8, §9 "Cross-node administration"):
//! every arm below calls the local `VaultServiceImpl` method directly rather
//! than going back through [`AppState::forwarding`], so a peer that itself
//! doesn't own the vault fails with `NotFound`/`FailedPrecondition` instead
//! of bouncing the request onward.

use gastrolog_proto::gen::forwarding_service_server::ForwardingService;
use gastrolog_proto::gen::vault_service_server::VaultService as _;
use gastrolog_proto::gen::{
    AnalyzeChunkRequest, ExportVaultRequest, ExportVaultResponse, ForwardedRequest, ForwardedResponse,
    GetChunkRequest, GetIndexesRequest, GetStatsRequest, ImportRecordsRequest, ListChunksRequest,
    ListJobsRequest, ListJobsResponse, MergeVaultsRequest, MigrateVaultRequest, ReindexVaultRequest,
    SealVaultRequest, ValidateVaultRequest,
};
use gastrolog_repr::Claims;
use gastrolog_service::unwrap_forwarded;
use prost::Message;
use tonic::{Request, Response, Status};

use crate::service::job::JobServiceImpl;
use crate::service::vault::VaultServiceImpl;
use crate::state::AppState;

pub struct ForwardingServiceImpl {
    pub state: AppState,
}

/// Builds a local `Request<T>` from the decoded envelope body, carrying the
/// forwarded caller's claims (design §9 "must preserve the caller's claims
/// where policy allows").
fn local_request<T: Message + Default>(body: &[u8], claims: Option<Claims>) -> Result<Request<T>, Status> {
    let inner = T::decode(body).map_err(|e| Status::invalid_argument(format!("malformed forwarded body: {e}")))?;
    let mut request = Request::new(inner);
    if let Some(claims) = claims {
        request.extensions_mut().insert(claims);
    }
    Ok(request)
}

async fn dispatch(
    vault: &VaultServiceImpl,
    job: &JobServiceImpl,
    procedure_path: &str,
    body: Vec<u8>,
    claims: Option<Claims>,
) -> Result<Vec<u8>, Status> {
    macro_rules! call {
        ($method:ident, $req_ty:ty) => {{
            let request: Request<$req_ty> = local_request(&body, claims)?;
            vault.$method(request).await?.into_inner().encode_to_vec()
        }};
    }

    let encoded = match procedure_path {
        // `JobService::ListJobs` is the one non-vault procedure forwarded
        // here: `JobService::list_jobs` (design §4.7) calls this on every
        // configured peer to aggregate locally-owned jobs. Dispatches to
        // `local_jobs`, not the `list_jobs` trait method, so a peer serving
        // a forwarded request never itself fans out to its own peers --
        // forwarding must not recurse (design §4.8, §9).
        "/gastrolog.JobService/ListJobs" => {
            let _: Request<ListJobsRequest> = local_request(&body, claims)?;
            ListJobsResponse {
                jobs: job.local_jobs().await,
            }
            .encode_to_vec()
        }
        "/gastrolog.VaultService/Seal" => call!(seal, SealVaultRequest),
        "/gastrolog.VaultService/Reindex" => call!(reindex, ReindexVaultRequest),
        "/gastrolog.VaultService/Migrate" => call!(migrate, MigrateVaultRequest),
        "/gastrolog.VaultService/Merge" => call!(merge, MergeVaultsRequest),
        "/gastrolog.VaultService/Import" => call!(import, ImportRecordsRequest),
        "/gastrolog.VaultService/GetStats" => call!(get_stats, GetStatsRequest),
        "/gastrolog.VaultService/ListChunks" => call!(list_chunks, ListChunksRequest),
        "/gastrolog.VaultService/GetChunk" => call!(get_chunk, GetChunkRequest),
        "/gastrolog.VaultService/GetIndexes" => call!(get_indexes, GetIndexesRequest),
        "/gastrolog.VaultService/AnalyzeChunk" => call!(analyze_chunk, AnalyzeChunkRequest),
        "/gastrolog.VaultService/Validate" => call!(validate, ValidateVaultRequest),
        "/gastrolog.VaultService/Export" => {
            // The forwarding envelope only carries one response message, so
            // a streamed Export is collapsed into a single reply carrying
            // every batch's records concatenated (design §4.8); the caller
            // sees `has_more: false` since there's nothing left to paginate.
            let request: Request<ExportVaultRequest> = local_request(&body, claims)?;
            let mut stream = vault.export(request).await?.into_inner();
            let mut records = Vec::new();
            while let Some(item) = futures::StreamExt::next(&mut stream).await {
                records.extend(item?.records);
            }
            ExportVaultResponse { records, has_more: false }.encode_to_vec()
        }
        other => {
            return Err(Status::unimplemented(format!(
                "forwarding does not support procedure {other}"
            )))
        }
    };
    Ok(encoded)
}

#[tonic::async_trait]
impl ForwardingService for ForwardingServiceImpl {
    async fn forward(&self, request: Request<ForwardedRequest>) -> Result<Response<ForwardedResponse>, Status> {
        let (procedure_path, claims, body) =
            unwrap_forwarded(request.into_inner()).map_err(Status::from)?;
        let vault = VaultServiceImpl {
            state: self.state.clone(),
        };
        let job = JobServiceImpl {
            state: self.state.clone(),
        };
        let body = dispatch(&vault, &job, &procedure_path, body, claims).await?;
        Ok(Response::new(gastrolog_service::wrap_response(body)))
    }
}
