//! Vault/store configuration (design §3, §4.5, §4.6).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A retention rule attached to a vault (age- or size-based expiry; the exact
/// predicate shape is owned by the config store, the frontend only threads
/// it through unmodified).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionRule {
    pub max_age_secs: Option<u64>,
    pub max_bytes: Option<u64>,
}

/// The config-store record for one vault (the repo uses "vault" and "store"
/// interchangeably for this abstraction; see GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub id: Uuid,
    pub name: String,
    pub backend: String,
    pub params: BTreeMap<String, String>,
    pub enabled: bool,
    pub node_id: String,
    pub filter_id: Option<Uuid>,
    pub policy_id: Option<Uuid>,
    pub retention: Vec<RetentionRule>,
    pub ingester_id: Option<Uuid>,
}

impl VaultConfig {
    /// `params["dir"]` for file-backed vaults, if set.
    pub fn dir_param(&self) -> Option<&str> {
        self.params.get("dir").map(String::as_str)
    }

    pub fn is_file_backend(&self) -> bool {
        self.backend == "file"
    }
}
