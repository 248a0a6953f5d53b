//! The config-store external collaborator named in design §1: users,
//! vaults, filters, policies, settings, ingesters, TLS certs, per-user
//! preferences and saved queries. This crate defines the contract plus an
//! in-memory reference implementation with the FIFO-per-key and
//! post-commit-notification behavior required by design §5.

pub mod memory;
pub mod notify;

use async_trait::async_trait;
use gastrolog_repr::{User, VaultConfig};
use uuid::Uuid;

pub use notify::{ConfigNotification, NotificationReceiver};

/// A named filter expression, referenced by `VaultConfig::filter_id`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Filter {
    pub id: Uuid,
    pub name: String,
    pub expression: String,
}

/// A retention policy, referenced by `VaultConfig::policy_id`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub name: String,
    pub retention: Vec<gastrolog_repr::RetentionRule>,
}

/// An ingester configuration, referenced by `VaultConfig::ingester_id`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Ingester {
    pub id: Uuid,
    pub kind: String,
    pub params: std::collections::BTreeMap<String, String>,
}

/// Server-wide TLS configuration (design §4.1, §4.6).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TlsSettings {
    pub enabled: bool,
    pub cert_pem: String,
    pub key_pem: String,
    pub sni_hosts: Vec<String>,
}

/// The config-store contract. All writes go through here and emit a
/// [`ConfigNotification`] after the write commits (design §4.6, §5).
#[async_trait]
pub trait ConfigStore: Send + Sync {
    // -- users (design §4.10) --
    async fn create_user(&self, user: User) -> Result<(), gastrolog_repr::FrontendError>;
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_user_by_username(&self, username: &str) -> Option<User>;
    async fn list_users(&self) -> Vec<User>;
    async fn update_user(&self, user: User) -> Result<(), gastrolog_repr::FrontendError>;
    async fn delete_user(&self, id: Uuid) -> Result<(), gastrolog_repr::FrontendError>;
    async fn user_count(&self) -> usize;

    // -- vaults (design §4.5, §4.6) --
    async fn put_vault(&self, vault: VaultConfig) -> Result<(), gastrolog_repr::FrontendError>;
    async fn get_vault(&self, id: Uuid) -> Option<VaultConfig>;
    async fn list_vaults(&self) -> Vec<VaultConfig>;
    async fn delete_vault(&self, id: Uuid) -> Result<(), gastrolog_repr::FrontendError>;

    // -- filters / policies / ingesters (design §4.6) --
    async fn put_filter(&self, filter: Filter) -> Result<(), gastrolog_repr::FrontendError>;
    async fn list_filters(&self) -> Vec<Filter>;
    async fn delete_filter(&self, id: Uuid) -> Result<(), gastrolog_repr::FrontendError>;

    async fn put_policy(&self, policy: Policy) -> Result<(), gastrolog_repr::FrontendError>;
    async fn list_policies(&self) -> Vec<Policy>;
    async fn delete_policy(&self, id: Uuid) -> Result<(), gastrolog_repr::FrontendError>;

    async fn put_ingester(&self, ingester: Ingester) -> Result<(), gastrolog_repr::FrontendError>;
    async fn list_ingesters(&self) -> Vec<Ingester>;
    async fn get_ingester(&self, id: Uuid) -> Option<Ingester>;
    async fn delete_ingester(&self, id: Uuid) -> Result<(), gastrolog_repr::FrontendError>;

    // -- TLS (design §4.1, §4.6) --
    async fn get_tls_settings(&self) -> TlsSettings;
    async fn put_tls_settings(&self, settings: TlsSettings) -> Result<(), gastrolog_repr::FrontendError>;

    // -- per-user preferences / saved queries (design §4.6) --
    // Namespaced as `user:<uuid>:prefs` / `user:<uuid>:saved_queries`,
    // serialized as JSON blobs, per the distilled spec's settings-table
    // description; this trait exposes that as typed methods instead of a
    // raw key-value `get`/`put` so callers can't typo the namespace.
    async fn get_preferences(&self, user_id: Uuid) -> Option<String>;
    async fn put_preferences(&self, user_id: Uuid, json: String) -> Result<(), gastrolog_repr::FrontendError>;

    /// Returns `(id, name, query)` triples; the name and id are store
    /// metadata the bare `Query` type doesn't carry.
    async fn list_saved_queries(&self, user_id: Uuid) -> Vec<(Uuid, String, gastrolog_repr::Query)>;
    async fn put_saved_query(
        &self,
        user_id: Uuid,
        name: String,
        query: gastrolog_repr::Query,
    ) -> Result<Uuid, gastrolog_repr::FrontendError>;
    async fn delete_saved_query(&self, user_id: Uuid, id: Uuid) -> Result<(), gastrolog_repr::FrontendError>;

    /// Subscribes to post-commit notifications (design §5: "the `VaultPut`
    /// notification is delivered AFTER the write commits").
    fn subscribe(&self) -> NotificationReceiver;
}
