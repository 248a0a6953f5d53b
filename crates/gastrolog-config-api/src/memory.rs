//! In-memory reference `ConfigStore`. A single `RwLock` around all tables
//! gives the FIFO-per-key ordering design §5 requires for free, at the cost
//! of serializing unrelated writes -- acceptable for a reference/test
//! implementation that explicitly doesn't aim for production scale.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use gastrolog_repr::{FrontendError, Query, User, VaultConfig};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::{ConfigNotification, ConfigStore, Filter, Ingester, NotificationReceiver, Policy, TlsSettings};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    vaults: HashMap<Uuid, VaultConfig>,
    filters: HashMap<Uuid, Filter>,
    policies: HashMap<Uuid, Policy>,
    ingesters: HashMap<Uuid, Ingester>,
    tls: TlsSettings,
    preferences: HashMap<Uuid, String>,
    saved_queries: HashMap<Uuid, BTreeMap<Uuid, (String, Query)>>,
}

pub struct InMemoryConfigStore {
    state: RwLock<State>,
    notify: broadcast::Sender<ConfigNotification>,
}

impl Default for InMemoryConfigStore {
    fn default() -> InMemoryConfigStore {
        InMemoryConfigStore::new()
    }
}

impl InMemoryConfigStore {
    pub fn new() -> InMemoryConfigStore {
        let (notify, _) = broadcast::channel(256);
        InMemoryConfigStore {
            state: RwLock::new(State::default()),
            notify,
        }
    }

    fn emit(&self, n: ConfigNotification) {
        // A notification with no subscribers is not an error: the listener
        // side (runtime catch-up) is optional in single-node/test setups.
        let _ = self.notify.send(n);
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn create_user(&self, user: User) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(FrontendError::AlreadyExists(format!(
                "username {} already exists",
                user.username
            )));
        }
        let id = user.id;
        state.users.insert(id, user);
        drop(state);
        self.emit(ConfigNotification::UserChanged(id));
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.state.read().await.users.get(&id).cloned()
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.state
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    async fn list_users(&self) -> Vec<User> {
        self.state.read().await.users.values().cloned().collect()
    }

    async fn update_user(&self, user: User) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(FrontendError::NotFound(format!("user {} not found", user.id)));
        }
        let id = user.id;
        state.users.insert(id, user);
        drop(state);
        self.emit(ConfigNotification::UserChanged(id));
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        state
            .users
            .remove(&id)
            .ok_or_else(|| FrontendError::NotFound(format!("user {id} not found")))?;
        state.preferences.remove(&id);
        state.saved_queries.remove(&id);
        drop(state);
        self.emit(ConfigNotification::UserChanged(id));
        Ok(())
    }

    async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    async fn put_vault(&self, vault: VaultConfig) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        let id = vault.id;
        state.vaults.insert(id, vault);
        drop(state);
        self.emit(ConfigNotification::VaultPut(id));
        Ok(())
    }

    async fn get_vault(&self, id: Uuid) -> Option<VaultConfig> {
        self.state.read().await.vaults.get(&id).cloned()
    }

    async fn list_vaults(&self) -> Vec<VaultConfig> {
        self.state.read().await.vaults.values().cloned().collect()
    }

    async fn delete_vault(&self, id: Uuid) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        state
            .vaults
            .remove(&id)
            .ok_or_else(|| FrontendError::NotFound(format!("vault {id} not found")))?;
        drop(state);
        self.emit(ConfigNotification::VaultDeleted(id));
        Ok(())
    }

    async fn put_filter(&self, filter: Filter) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        let id = filter.id;
        state.filters.insert(id, filter);
        drop(state);
        self.emit(ConfigNotification::FilterChanged(id));
        Ok(())
    }

    async fn list_filters(&self) -> Vec<Filter> {
        self.state.read().await.filters.values().cloned().collect()
    }

    async fn delete_filter(&self, id: Uuid) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        state
            .filters
            .remove(&id)
            .ok_or_else(|| FrontendError::NotFound(format!("filter {id} not found")))?;
        drop(state);
        self.emit(ConfigNotification::FilterChanged(id));
        Ok(())
    }

    async fn put_policy(&self, policy: Policy) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        let id = policy.id;
        state.policies.insert(id, policy);
        drop(state);
        self.emit(ConfigNotification::PolicyChanged(id));
        Ok(())
    }

    async fn list_policies(&self) -> Vec<Policy> {
        self.state.read().await.policies.values().cloned().collect()
    }

    async fn delete_policy(&self, id: Uuid) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        state
            .policies
            .remove(&id)
            .ok_or_else(|| FrontendError::NotFound(format!("policy {id} not found")))?;
        drop(state);
        self.emit(ConfigNotification::PolicyChanged(id));
        Ok(())
    }

    async fn put_ingester(&self, ingester: Ingester) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        let id = ingester.id;
        state.ingesters.insert(id, ingester);
        drop(state);
        self.emit(ConfigNotification::IngesterChanged(id));
        Ok(())
    }

    async fn list_ingesters(&self) -> Vec<Ingester> {
        self.state.read().await.ingesters.values().cloned().collect()
    }

    async fn get_ingester(&self, id: Uuid) -> Option<Ingester> {
        self.state.read().await.ingesters.get(&id).cloned()
    }

    async fn delete_ingester(&self, id: Uuid) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        state
            .ingesters
            .remove(&id)
            .ok_or_else(|| FrontendError::NotFound(format!("ingester {id} not found")))?;
        drop(state);
        self.emit(ConfigNotification::IngesterChanged(id));
        Ok(())
    }

    async fn get_tls_settings(&self) -> TlsSettings {
        self.state.read().await.tls.clone()
    }

    async fn put_tls_settings(&self, settings: TlsSettings) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        state.tls = settings;
        drop(state);
        self.emit(ConfigNotification::TlsChanged);
        Ok(())
    }

    async fn get_preferences(&self, user_id: Uuid) -> Option<String> {
        self.state.read().await.preferences.get(&user_id).cloned()
    }

    async fn put_preferences(&self, user_id: Uuid, json: String) -> Result<(), FrontendError> {
        self.state.write().await.preferences.insert(user_id, json);
        Ok(())
    }

    async fn list_saved_queries(&self, user_id: Uuid) -> Vec<(Uuid, String, Query)> {
        self.state
            .read()
            .await
            .saved_queries
            .get(&user_id)
            .map(|m| m.iter().map(|(id, (name, q))| (*id, name.clone(), q.clone())).collect())
            .unwrap_or_default()
    }

    async fn put_saved_query(&self, user_id: Uuid, name: String, query: Query) -> Result<Uuid, FrontendError> {
        let mut state = self.state.write().await;
        let id = Uuid::now_v7();
        state
            .saved_queries
            .entry(user_id)
            .or_default()
            .insert(id, (name, query));
        Ok(id)
    }

    async fn delete_saved_query(&self, user_id: Uuid, id: Uuid) -> Result<(), FrontendError> {
        let mut state = self.state.write().await;
        let removed = state
            .saved_queries
            .get_mut(&user_id)
            .and_then(|m| m.remove(&id));
        if removed.is_none() {
            return Err(FrontendError::NotFound(format!("saved query {id} not found")));
        }
        Ok(())
    }

    fn subscribe(&self) -> NotificationReceiver {
        self.notify.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gastrolog_repr::Role;
    use chrono::Utc;

    fn user(username: &str) -> User {
        User {
            id: Uuid::now_v7(),
            username: username.to_string(),
            password_hash: "x".into(),
            role: Role::User,
            token_invalidated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let store = InMemoryConfigStore::new();
        store.create_user(user("alice")).await.unwrap();
        let err = store.create_user(user("alice")).await.unwrap_err();
        assert!(matches!(err, FrontendError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn put_vault_emits_notification_after_commit() {
        let store = InMemoryConfigStore::new();
        let mut rx = store.subscribe();
        let id = Uuid::now_v7();
        store
            .put_vault(VaultConfig {
                id,
                name: "v".into(),
                backend: "memory".into(),
                params: Default::default(),
                enabled: true,
                node_id: "n".into(),
                filter_id: None,
                policy_id: None,
                retention: Vec::new(),
                ingester_id: None,
            })
            .await
            .unwrap();
        assert!(store.get_vault(id).await.is_some());
        match rx.try_recv().unwrap() {
            ConfigNotification::VaultPut(got) => assert_eq!(got, id),
            other => panic!("unexpected notification: {other:?}"),
        }
    }
}
