//! `VaultService` (design §4.5): vault/store CRUD, pause/resume, seal,
//! reindex, migrate, merge, export/import, and inspection.
//!
//! **Forwarding policy (design §4.5, §4.8 — resolving an Open Question left
//! by the distilled spec).** `PutVault`/`Pause`/`Resume`/`DeleteVault` write
//! through the (cluster-shared) config store and rely on the post-commit
//! `VaultPut`/`VaultDeleted` notification for every node's runtime to catch
//! up, matching the spec's own wording for `PutVault` ("emits a notification
//! so runtime catches up"); they are never forwarded. Every operation that
//! touches actual chunk/record data that only exists on the owning node's
//! runtime -- `Seal`, `Reindex`, `Migrate`, `Merge`, `Export`, `Import`, and
//! the inspection RPCs -- is forwarded through [`ForwardingClient`] when the
//! vault's `node_id` is not local.

use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_stream::try_stream;
use futures::Stream;
use gastrolog_proto::convert::{
    chunk_meta_to_proto, chunk_validation_to_proto, record_from_proto, record_to_proto,
    uuid_from_bytes, uuid_from_str, vault_from_proto, vault_to_proto,
};
use gastrolog_proto::gen::vault_service_server::VaultService;
use gastrolog_proto::gen::{
    AnalyzeChunkRequest, AnalyzeChunkResponse, DeleteVaultRequest, DeleteVaultResponse,
    ExportVaultRequest, ExportVaultResponse, GetChunkRequest, GetChunkResponse, GetIndexesRequest,
    GetIndexesResponse, GetStatsRequest, GetStatsResponse, GetVaultRequest, GetVaultResponse,
    ImportRecordsRequest, ImportRecordsResponse, ListChunksRequest, ListChunksResponse,
    ListVaultsRequest, ListVaultsResponse, MergeVaultsRequest, MergeVaultsResponse,
    MigrateVaultRequest, MigrateVaultResponse, PauseVaultRequest, PauseVaultResponse,
    PutVaultRequest, PutVaultResponse, ReindexVaultRequest, ReindexVaultResponse,
    ResumeVaultRequest, ResumeVaultResponse, SealVaultRequest, SealVaultResponse,
    ValidateVaultRequest, ValidateVaultResponse,
};
use gastrolog_repr::{FrontendError, VaultConfig};
use prost::Message;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::state::AppState;

const EXPORT_BATCH_SIZE: usize = 100;

pub struct VaultServiceImpl {
    pub state: AppState,
}

/// Normalizes a directory path the way the nested-dir check compares them
/// (design §6): absolute, with a trailing separator appended so that `/a`
/// and `/ab` don't collide on a naive string-prefix check.
fn normalize_dir(raw: &str) -> PathBuf {
    let mut s = raw.trim_end_matches('/').to_string();
    s.push('/');
    PathBuf::from(s)
}

fn is_nested(a: &Path, b: &Path) -> bool {
    a == b || a.starts_with(b) || b.starts_with(a)
}

/// Rejects a file-vault `dir` that equals, contains, or is nested inside any
/// other file vault's directory. The vault being updated is exempt from
/// self-comparison (design §4.5 PutVault, §8 "nested-dir validation").
async fn validate_no_nested_dir(
    existing: &[VaultConfig],
    self_id: Uuid,
    dir: &str,
) -> Result<(), FrontendError> {
    let candidate = normalize_dir(dir);
    for other in existing {
        if other.id == self_id || !other.is_file_backend() {
            continue;
        }
        if let Some(other_dir) = other.dir_param() {
            if is_nested(&candidate, &normalize_dir(other_dir)) {
                return Err(FrontendError::InvalidArgument(format!(
                    "directory {dir} conflicts with file vault {} at {other_dir}",
                    other.id
                )));
            }
        }
    }
    Ok(())
}

fn is_local(state: &AppState, vault: &VaultConfig) -> bool {
    vault.node_id == state.node_id
}

/// Forwards `body` (the raw proto bytes of `req`) to the node owning
/// `vault`, decoding the peer's response as `Resp`. Used by every
/// data/inspection RPC when the target vault isn't local (design §4.8).
async fn forward<Resp: Message + Default>(
    state: &AppState,
    vault: &VaultConfig,
    procedure_path: &str,
    body: Vec<u8>,
    claims: Option<&gastrolog_repr::Claims>,
) -> Result<Resp, Status> {
    let bytes = state
        .forwarding
        .forward(&vault.node_id, procedure_path, claims, body)
        .await?;
    Resp::decode(bytes.as_slice())
        .map_err(|e| Status::internal(format!("malformed forwarded response: {e}")))
}

fn claims_of<T>(request: &Request<T>) -> Option<gastrolog_repr::Claims> {
    request.extensions().get::<gastrolog_repr::Claims>().cloned()
}

#[tonic::async_trait]
impl VaultService for VaultServiceImpl {
    async fn list(&self, _request: Request<ListVaultsRequest>) -> Result<Response<ListVaultsResponse>, Status> {
        let vaults = self.state.config_store.list_vaults().await;
        Ok(Response::new(ListVaultsResponse {
            vaults: vaults.iter().map(vault_to_proto).collect(),
        }))
    }

    async fn get(&self, request: Request<GetVaultRequest>) -> Result<Response<GetVaultResponse>, Status> {
        let id = uuid_from_str(&request.into_inner().id)?;
        let vault = self
            .state
            .config_store
            .get_vault(id)
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))?;
        Ok(Response::new(GetVaultResponse {
            vault: Some(vault_to_proto(&vault)),
        }))
    }

    /// Never forwarded: the config store is cluster-shared, and every
    /// node's runtime catches up from the post-commit `VaultPut`
    /// notification (module doc).
    async fn put(&self, request: Request<PutVaultRequest>) -> Result<Response<PutVaultResponse>, Status> {
        let req = request.into_inner();
        let proto = req.vault.ok_or_else(|| FrontendError::InvalidArgument("missing vault".to_string()))?;
        let mut vault = vault_from_proto(proto)?;
        if vault.id.is_nil() {
            vault.id = Uuid::now_v7();
        }
        if vault.node_id.is_empty() {
            vault.node_id = self.state.node_id.clone();
        }

        if vault.is_file_backend() {
            let dir = vault
                .dir_param()
                .ok_or_else(|| FrontendError::InvalidArgument("file vault requires params.dir".to_string()))?
                .to_string();
            let existing = self.state.config_store.list_vaults().await;
            validate_no_nested_dir(&existing, vault.id, &dir).await?;
        }

        self.state.config_store.put_vault(vault.clone()).await?;
        if is_local(&self.state, &vault) {
            self.state.orchestrator.register_vault(&vault).await?;
        }
        Ok(Response::new(PutVaultResponse {
            vault: Some(vault_to_proto(&vault)),
        }))
    }

    async fn delete(&self, request: Request<DeleteVaultRequest>) -> Result<Response<DeleteVaultResponse>, Status> {
        let req = request.into_inner();
        let id = uuid_from_str(&req.id)?;
        let vault = self
            .state
            .config_store
            .get_vault(id)
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))?;

        if !req.force {
            let stats = self.state.orchestrator.stats(Some(id)).await.unwrap_or_default();
            if stats.record_count > 0 {
                return Err(FrontendError::FailedPrecondition(format!(
                    "vault {id} is not empty; pass force=true to delete anyway"
                ))
                .into());
            }
        }

        if is_local(&self.state, &vault) {
            self.state.orchestrator.remove_vault(id).await?;
            if vault.is_file_backend() {
                self.state.orchestrator.remove_directory(id).await?;
            }
        }
        self.state.config_store.delete_vault(id).await?;
        Ok(Response::new(DeleteVaultResponse {}))
    }

    async fn pause(&self, request: Request<PauseVaultRequest>) -> Result<Response<PauseVaultResponse>, Status> {
        set_enabled(&self.state, &request.into_inner().id, false).await?;
        Ok(Response::new(PauseVaultResponse {}))
    }

    async fn resume(&self, request: Request<ResumeVaultRequest>) -> Result<Response<ResumeVaultResponse>, Status> {
        set_enabled(&self.state, &request.into_inner().id, true).await?;
        Ok(Response::new(ResumeVaultResponse {}))
    }

    async fn seal(&self, request: Request<SealVaultRequest>) -> Result<Response<SealVaultResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let id = uuid_from_str(&req.id)?;
        let vault = self
            .state
            .config_store
            .get_vault(id)
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))?;

        if !is_local(&self.state, &vault) {
            return forward(
                &self.state,
                &vault,
                "/gastrolog.VaultService/Seal",
                req.encode_to_vec(),
                claims.as_ref(),
            )
            .await
            .map(Response::new);
        }
        self.state.orchestrator.seal_active_chunk(id).await?;
        Ok(Response::new(SealVaultResponse {}))
    }

    async fn reindex(&self, request: Request<ReindexVaultRequest>) -> Result<Response<ReindexVaultResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let id = uuid_from_str(&req.id)?;
        let vault = self
            .state
            .config_store
            .get_vault(id)
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))?;

        if !is_local(&self.state, &vault) {
            return forward(
                &self.state,
                &vault,
                "/gastrolog.VaultService/Reindex",
                req.encode_to_vec(),
                claims.as_ref(),
            )
            .await
            .map(Response::new);
        }

        let orchestrator = self.state.orchestrator.clone();
        let scheduler = self.state.orchestrator.scheduler();
        let job_id = scheduler
            .submit(
                "reindex",
                Some(format!("reindex vault {id}")),
                Box::new(move |handle| {
                    Box::pin(async move {
                        let chunks = match orchestrator.list_chunks(id).await {
                            Ok(c) => c,
                            Err(e) => {
                                handle.fail(e.to_string()).await;
                                return;
                            }
                        };
                        let sealed: Vec<_> = chunks.into_iter().filter(|c| c.sealed).collect();
                        handle.set_running(sealed.len() as u64).await;
                        let mut done = 0u64;
                        for chunk in sealed {
                            if let Err(e) = orchestrator.delete_index(id, chunk.chunk_id).await {
                                handle.record_error(format!("{}: {e}", chunk.chunk_id)).await;
                                continue;
                            }
                            if let Err(e) = orchestrator.build_index(id, chunk.chunk_id).await {
                                handle.record_error(format!("{}: {e}", chunk.chunk_id)).await;
                                continue;
                            }
                            done += 1;
                            handle.advance(done, chunk.record_count).await;
                        }
                        handle.complete().await;
                    })
                }),
            )
            .await;
        Ok(Response::new(ReindexVaultResponse { job_id }))
    }

    async fn migrate(&self, request: Request<MigrateVaultRequest>) -> Result<Response<MigrateVaultResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let source_id = uuid_from_str(&req.source_id)?;
        let source = self
            .state
            .config_store
            .get_vault(source_id)
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {source_id} not found")))?;

        if !is_local(&self.state, &source) {
            return forward(
                &self.state,
                &source,
                "/gastrolog.VaultService/Migrate",
                req.encode_to_vec(),
                claims.as_ref(),
            )
            .await
            .map(Response::new);
        }

        let backend = req
            .destination_backend
            .clone()
            .unwrap_or_else(|| source.backend.clone());
        let destination = VaultConfig {
            id: Uuid::now_v7(),
            name: req.destination_name.clone(),
            backend,
            params: req.destination_params.clone().into_iter().collect(),
            enabled: true,
            node_id: self.state.node_id.clone(),
            filter_id: source.filter_id,
            policy_id: source.policy_id,
            retention: source.retention.clone(),
            ingester_id: None,
        };
        if destination.is_file_backend() && destination.dir_param().is_none() {
            return Err(FrontendError::InvalidArgument(
                "destination_params.dir is required for a file destination".to_string(),
            )
            .into());
        }
        if destination.is_file_backend() {
            let existing = self.state.config_store.list_vaults().await;
            validate_no_nested_dir(&existing, destination.id, destination.dir_param().unwrap()).await?;
        }
        self.state.config_store.put_vault(destination.clone()).await?;
        self.state.orchestrator.register_vault(&destination).await?;

        // Phase 2: freeze the source -- disable ingestion, then seal its
        // active chunk, so no further writes land after the snapshot the
        // job is about to copy.
        self.state.orchestrator.set_enabled(source_id, false).await?;
        let mut source_cfg = source.clone();
        source_cfg.enabled = false;
        self.state.config_store.put_vault(source_cfg).await?;
        self.state.orchestrator.seal_active_chunk(source_id).await?;

        let orchestrator = self.state.orchestrator.clone();
        let config_store = self.state.config_store.clone();
        let scheduler = self.state.orchestrator.scheduler();
        let dest_id = destination.id;
        let source_was_file = source.is_file_backend();
        let job_id = scheduler
            .submit(
                "migrate",
                Some(format!("migrate vault {source_id} to {dest_id}")),
                Box::new(move |handle| {
                    Box::pin(async move {
                        run_move_or_copy_job(&orchestrator, &handle, source_id, dest_id).await;
                        let _ = orchestrator.remove_vault(source_id).await;
                        if source_was_file {
                            let _ = orchestrator.remove_directory(source_id).await;
                        }
                        let _ = config_store.delete_vault(source_id).await;
                        handle.complete().await;
                    })
                }),
            )
            .await;
        Ok(Response::new(MigrateVaultResponse { job_id }))
    }

    async fn merge(&self, request: Request<MergeVaultsRequest>) -> Result<Response<MergeVaultsResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let source_id = uuid_from_str(&req.source_id)?;
        let dest_id = uuid_from_str(&req.destination_id)?;
        if source_id == dest_id {
            return Err(FrontendError::InvalidArgument("source and destination must differ".to_string()).into());
        }
        let source = self
            .state
            .config_store
            .get_vault(source_id)
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {source_id} not found")))?;
        self.state
            .config_store
            .get_vault(dest_id)
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {dest_id} not found")))?;

        if !is_local(&self.state, &source) {
            return forward(
                &self.state,
                &source,
                "/gastrolog.VaultService/Merge",
                req.encode_to_vec(),
                claims.as_ref(),
            )
            .await
            .map(Response::new);
        }

        self.state.orchestrator.set_enabled(source_id, false).await?;
        let mut source_cfg = source.clone();
        source_cfg.enabled = false;
        self.state.config_store.put_vault(source_cfg).await?;
        self.state.orchestrator.seal_active_chunk(source_id).await?;

        let orchestrator = self.state.orchestrator.clone();
        let config_store = self.state.config_store.clone();
        let scheduler = self.state.orchestrator.scheduler();
        let source_was_file = source.is_file_backend();
        let job_id = scheduler
            .submit(
                "merge",
                Some(format!("merge vault {source_id} into {dest_id}")),
                Box::new(move |handle| {
                    Box::pin(async move {
                        run_move_or_copy_job(&orchestrator, &handle, source_id, dest_id).await;
                        let _ = orchestrator.remove_vault(source_id).await;
                        if source_was_file {
                            let _ = orchestrator.remove_directory(source_id).await;
                        }
                        let _ = config_store.delete_vault(source_id).await;
                        handle.complete().await;
                    })
                }),
            )
            .await;
        Ok(Response::new(MergeVaultsResponse { job_id }))
    }

    type ExportStream = Pin<Box<dyn Stream<Item = Result<ExportVaultResponse, Status>> + Send>>;

    async fn export(&self, request: Request<ExportVaultRequest>) -> Result<Response<Self::ExportStream>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let id = uuid_from_str(&req.id)?;
        let vault = self
            .state
            .config_store
            .get_vault(id)
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))?;

        if !is_local(&self.state, &vault) {
            let resp: ExportVaultResponse = forward(
                &self.state,
                &vault,
                "/gastrolog.VaultService/Export",
                req.encode_to_vec(),
                claims.as_ref(),
            )
            .await?;
            let stream = futures::stream::once(async move { Ok(resp) });
            return Ok(Response::new(Box::pin(stream)));
        }

        let orchestrator = self.state.orchestrator.clone();
        let stream = try_stream! {
            let chunks = orchestrator.list_chunks(id).await?;
            let chunk_ids: Vec<_> = chunks.iter().map(|c| c.chunk_id).collect();
            for (i, chunk_id) in chunk_ids.iter().enumerate() {
                let records = orchestrator.export_chunk(id, *chunk_id).await?;
                for batch in records.chunks(EXPORT_BATCH_SIZE) {
                    yield ExportVaultResponse {
                        records: batch.iter().map(record_to_proto).collect(),
                        has_more: true,
                    };
                }
                let _ = i;
            }
            yield ExportVaultResponse { records: Vec::new(), has_more: false };
        };
        Ok(Response::new(Box::pin(stream)))
    }

    async fn import(&self, request: Request<ImportRecordsRequest>) -> Result<Response<ImportRecordsResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let id = uuid_from_str(&req.id)?;
        let vault = self
            .state
            .config_store
            .get_vault(id)
            .await
            .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))?;

        if !is_local(&self.state, &vault) {
            return forward(
                &self.state,
                &vault,
                "/gastrolog.VaultService/Import",
                req.encode_to_vec(),
                claims.as_ref(),
            )
            .await
            .map(Response::new);
        }

        let records = req
            .records
            .into_iter()
            .map(record_from_proto)
            .collect::<Result<Vec<_>, _>>()?;
        let imported = self.state.orchestrator.append_records(id, records).await?;
        Ok(Response::new(ImportRecordsResponse { imported }))
    }

    async fn get_stats(&self, request: Request<GetStatsRequest>) -> Result<Response<GetStatsResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let id = req.id.as_deref().map(uuid_from_str).transpose()?;
        if let Some(id) = id {
            if let Some(vault) = self.state.config_store.get_vault(id).await {
                if !is_local(&self.state, &vault) {
                    return forward(
                        &self.state,
                        &vault,
                        "/gastrolog.VaultService/GetStats",
                        req.encode_to_vec(),
                        claims.as_ref(),
                    )
                    .await
                    .map(Response::new);
                }
            }
        }
        let stats = self.state.orchestrator.stats(id).await?;
        Ok(Response::new(GetStatsResponse {
            record_count: stats.record_count,
            logical_bytes: stats.logical_bytes,
            on_disk_bytes: stats.on_disk_bytes,
            oldest: stats.oldest.map(gastrolog_proto::convert::ts_to_proto),
            newest: stats.newest.map(gastrolog_proto::convert::ts_to_proto),
        }))
    }

    async fn list_chunks(&self, request: Request<ListChunksRequest>) -> Result<Response<ListChunksResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let id = uuid_from_str(&req.vault_id)?;
        if let Some(vault) = self.state.config_store.get_vault(id).await {
            if !is_local(&self.state, &vault) {
                return forward(
                    &self.state,
                    &vault,
                    "/gastrolog.VaultService/ListChunks",
                    req.encode_to_vec(),
                    claims.as_ref(),
                )
                .await
                .map(Response::new);
            }
        }
        let chunks = self.state.orchestrator.list_chunks(id).await?;
        Ok(Response::new(ListChunksResponse {
            chunks: chunks.iter().map(chunk_meta_to_proto).collect(),
        }))
    }

    async fn get_chunk(&self, request: Request<GetChunkRequest>) -> Result<Response<GetChunkResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let id = uuid_from_str(&req.vault_id)?;
        if let Some(vault) = self.state.config_store.get_vault(id).await {
            if !is_local(&self.state, &vault) {
                return forward(
                    &self.state,
                    &vault,
                    "/gastrolog.VaultService/GetChunk",
                    req.encode_to_vec(),
                    claims.as_ref(),
                )
                .await
                .map(Response::new);
            }
        }
        let chunk_id = uuid_from_bytes(&req.chunk_id)?;
        let chunk = self.state.orchestrator.get_chunk(id, chunk_id).await?;
        Ok(Response::new(GetChunkResponse {
            chunk: Some(chunk_meta_to_proto(&chunk)),
        }))
    }

    async fn get_indexes(&self, request: Request<GetIndexesRequest>) -> Result<Response<GetIndexesResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let id = uuid_from_str(&req.vault_id)?;
        if let Some(vault) = self.state.config_store.get_vault(id).await {
            if !is_local(&self.state, &vault) {
                return forward(
                    &self.state,
                    &vault,
                    "/gastrolog.VaultService/GetIndexes",
                    req.encode_to_vec(),
                    claims.as_ref(),
                )
                .await
                .map(Response::new);
            }
        }
        let chunk_id = uuid_from_bytes(&req.chunk_id)?;
        let indexes = self.state.orchestrator.get_indexes(id, chunk_id).await?;
        Ok(Response::new(GetIndexesResponse { indexes }))
    }

    async fn analyze_chunk(
        &self,
        request: Request<AnalyzeChunkRequest>,
    ) -> Result<Response<AnalyzeChunkResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let id = uuid_from_str(&req.vault_id)?;
        if let Some(vault) = self.state.config_store.get_vault(id).await {
            if !is_local(&self.state, &vault) {
                return forward(
                    &self.state,
                    &vault,
                    "/gastrolog.VaultService/AnalyzeChunk",
                    req.encode_to_vec(),
                    claims.as_ref(),
                )
                .await
                .map(Response::new);
            }
        }
        let chunk_id = uuid_from_bytes(&req.chunk_id)?;
        let chunk = self.state.orchestrator.get_chunk(id, chunk_id).await?;
        Ok(Response::new(AnalyzeChunkResponse {
            record_count: chunk.record_count,
            logical_bytes: chunk.logical_bytes,
            on_disk_bytes: chunk.on_disk_bytes,
        }))
    }

    async fn validate(&self, request: Request<ValidateVaultRequest>) -> Result<Response<ValidateVaultResponse>, Status> {
        let claims = claims_of(&request);
        let req = request.into_inner();
        let id = uuid_from_str(&req.vault_id)?;
        if let Some(vault) = self.state.config_store.get_vault(id).await {
            if !is_local(&self.state, &vault) {
                return forward(
                    &self.state,
                    &vault,
                    "/gastrolog.VaultService/Validate",
                    req.encode_to_vec(),
                    claims.as_ref(),
                )
                .await
                .map(Response::new);
            }
        }
        let chunks = self.state.orchestrator.validate_vault(id).await?;
        let valid = chunks.iter().all(|c| c.valid);
        Ok(Response::new(ValidateVaultResponse {
            valid,
            chunks: chunks.iter().map(chunk_validation_to_proto).collect(),
        }))
    }
}

async fn set_enabled(state: &AppState, raw_id: &str, enabled: bool) -> Result<(), FrontendError> {
    let id = uuid_from_str(raw_id)?;
    let mut vault = state
        .config_store
        .get_vault(id)
        .await
        .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))?;
    vault.enabled = enabled;
    state.config_store.put_vault(vault.clone()).await?;
    if is_local(state, &vault) {
        state.orchestrator.set_enabled(id, enabled).await?;
    }
    Ok(())
}

/// Phase 3 of Migrate/Merge (design §4.5): move chunks verbatim when both
/// backends support it, otherwise fall back to copying records with
/// rewritten write timestamps.
async fn run_move_or_copy_job(
    orchestrator: &std::sync::Arc<dyn gastrolog_orchestrator_api::OrchestratorApi>,
    handle: &gastrolog_orchestrator_api::JobHandle,
    source_id: Uuid,
    dest_id: Uuid,
) {
    handle.set_running(1).await;
    match orchestrator.move_chunks(source_id, dest_id).await {
        Ok(true) => {
            handle.advance(1, 0).await;
        }
        Ok(false) | Err(_) => match orchestrator.copy_records(source_id, dest_id).await {
            Ok(count) => handle.advance(1, count).await,
            Err(e) => handle.fail(e.to_string()).await,
        },
    }
}
