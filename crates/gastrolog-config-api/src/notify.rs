//! Post-commit change notifications (design §4.6, §5).

use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum ConfigNotification {
    VaultPut(Uuid),
    VaultDeleted(Uuid),
    UserChanged(Uuid),
    TlsChanged,
    FilterChanged(Uuid),
    PolicyChanged(Uuid),
    IngesterChanged(Uuid),
}

pub type NotificationReceiver = tokio::sync::broadcast::Receiver<ConfigNotification>;
