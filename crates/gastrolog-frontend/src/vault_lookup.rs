//! Resolves a vault/store identifier from an RPC request to a
//! [`VaultConfig`], shared by `QueryService` (design §4.4) and
//! `VaultService` (design §4.5) handlers.
//!
//! Every vault-facing RPC accepts either a UUID string or, when absent,
//! falls back to the vault named `"default"` (design §4.4 Search: "optional
//! vault/store id (default \"default\")").

use gastrolog_config_api::ConfigStore;
use gastrolog_repr::{FrontendError, VaultConfig};

pub const DEFAULT_VAULT_NAME: &str = "default";

pub async fn resolve_vault(
    store: &dyn ConfigStore,
    vault_id: Option<&str>,
) -> Result<VaultConfig, FrontendError> {
    match vault_id {
        Some(raw) if !raw.is_empty() => {
            if let Ok(id) = uuid::Uuid::parse_str(raw) {
                if let Some(cfg) = store.get_vault(id).await {
                    return Ok(cfg);
                }
            }
            store
                .list_vaults()
                .await
                .into_iter()
                .find(|v| v.name == raw)
                .ok_or_else(|| FrontendError::NotFound(format!("vault {raw} not found")))
        }
        _ => store
            .list_vaults()
            .await
            .into_iter()
            .find(|v| v.name == DEFAULT_VAULT_NAME)
            .ok_or_else(|| FrontendError::NotFound("no default vault configured".to_string())),
    }
}
