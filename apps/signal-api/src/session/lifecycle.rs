//! Bridge between raw transport connect/disconnect events and the session
//! registry, plus the disconnect notification contract.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreError;

use super::registry::SessionRegistry;

/// Domain event emitted once per real disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDisconnected {
    pub user_id: i64,
}

/// A subsystem interested in disconnects (room cleanup, presence broadcast).
#[async_trait]
pub trait DisconnectListener: Send + Sync {
    async fn on_disconnect(&self, event: SessionDisconnected);
}

/// Explicit publish/subscribe hub for disconnect notifications.
///
/// Listeners are invoked inline at publish time, so they observe the session
/// state as it was *before* teardown. Subscription happens at startup.
#[derive(Clone, Default)]
pub struct DisconnectEvents {
    listeners: Arc<RwLock<Vec<Arc<dyn DisconnectListener>>>>,
}

impl DisconnectEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn DisconnectListener>) {
        self.listeners.write().push(listener);
    }

    pub async fn publish(&self, event: SessionDisconnected) {
        let listeners: Vec<_> = self.listeners.read().clone();
        for listener in listeners {
            listener.on_disconnect(event.clone()).await;
        }
    }
}

/// Bridges transport connect/disconnect events to the session registry.
#[derive(Clone)]
pub struct ConnectionLifecycle {
    registry: SessionRegistry,
    events: DisconnectEvents,
}

impl ConnectionLifecycle {
    pub fn new(registry: SessionRegistry, events: DisconnectEvents) -> Self {
        Self { registry, events }
    }

    /// Transport connected: register the session. Returns the session id a
    /// duplicate login evicted, if any, so the caller can close it.
    pub async fn add_session(
        &self,
        user_id: i64,
        display_name: &str,
        session_id: &str,
    ) -> Result<Option<String>, StoreError> {
        self.registry
            .register_session(user_id, display_name, session_id)
            .await
    }

    /// Transport disconnected.
    ///
    /// Publishes `SessionDisconnected` *before* tearing the session down so
    /// listeners can still read it, then terminates. Unknown or already
    /// cleaned-up sessions publish nothing — idempotent. Store failures are
    /// logged, never propagated: a disconnect must always attempt cleanup.
    pub async fn remove_session(&self, session_id: &str) {
        let user_id = match self.registry.user_id_by_session(session_id).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                tracing::debug!(session_id, "disconnect for unknown session, nothing to do");
                return;
            }
            Err(err) => {
                tracing::warn!(%err, session_id, "session lookup failed during disconnect");
                return;
            }
        };

        self.events.publish(SessionDisconnected { user_id }).await;

        if let Err(err) = self.registry.terminate_session(session_id).await {
            tracing::warn!(%err, session_id, user_id, "session teardown failed");
        }
    }

    /// Heartbeat from the transport layer.
    pub async fn update_last_activity(&self, user_id: i64) -> Result<(), StoreError> {
        self.registry.process_heartbeat(user_id).await
    }
}
