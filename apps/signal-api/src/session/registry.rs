//! Session registry: maps a user identity to exactly one live connection.

use crate::error::StoreError;
use crate::store::SessionData;

use super::info::SessionInfo;

/// Owns the lifecycle of a user's connection identity. All state lives in
/// the shared store; this struct is a cheap cloneable handle.
#[derive(Clone)]
pub struct SessionRegistry {
    data: SessionData,
}

impl SessionRegistry {
    pub fn new(data: SessionData) -> Self {
        Self { data }
    }

    /// Register a new session for `user_id`.
    ///
    /// If the user already has a session (duplicate login, e.g. a second
    /// browser tab), the old one is fully retired first — SessionInfo and
    /// reverse mapping both — before the new one becomes visible. Eviction
    /// is expected behavior, not a failure; the evicted session id is
    /// returned so the transport can close the superseded connection.
    pub async fn register_session(
        &self,
        user_id: i64,
        display_name: &str,
        session_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let evicted = match self.data.user_session(user_id).await? {
            Some(existing) => {
                self.terminate_session(&existing.session_id).await?;
                tracing::info!(
                    user_id,
                    evicted = %existing.session_id,
                    "evicted stale session in favor of new connection"
                );
                Some(existing.session_id)
            }
            None => None,
        };

        let info = SessionInfo::new(user_id, display_name, session_id);
        self.data.save_user_session(&info).await?;
        self.data.save_session_user(session_id, user_id).await?;
        self.data.incr_online_count().await?;

        tracing::info!(user_id, session_id, "session registered");
        Ok(evicted)
    }

    /// Terminate the session identified by `session_id`.
    ///
    /// Idempotent: disconnect events may arrive after cleanup already
    /// happened, in which case the reverse mapping is gone and this is a
    /// no-op.
    pub async fn terminate_session(&self, session_id: &str) -> Result<(), StoreError> {
        match self.data.user_id_by_session(session_id).await? {
            Some(user_id) => {
                self.data.delete_user_session(user_id).await?;
                self.data.delete_session_user(session_id).await?;
                self.data.decr_online_count().await?;
                tracing::info!(user_id, session_id, "session terminated");
            }
            None => {
                tracing::debug!(session_id, "terminate: no session found, nothing to do");
            }
        }
        Ok(())
    }

    /// Advance the session's `last_active_at`. No-op when the session is
    /// already gone; the caller is not told to reconnect from this alone.
    pub async fn process_heartbeat(&self, user_id: i64) -> Result<(), StoreError> {
        match self.data.user_session(user_id).await? {
            Some(info) => {
                self.data.save_user_session(&info.with_activity()).await?;
                tracing::debug!(user_id, "heartbeat processed");
            }
            None => {
                tracing::debug!(user_id, "heartbeat for unknown session ignored");
            }
        }
        Ok(())
    }

    pub async fn session_info(&self, user_id: i64) -> Result<Option<SessionInfo>, StoreError> {
        self.data.user_session(user_id).await
    }

    pub async fn user_id_by_session(&self, session_id: &str) -> Result<Option<i64>, StoreError> {
        self.data.user_id_by_session(session_id).await
    }

    pub async fn is_connected(&self, user_id: i64) -> Result<bool, StoreError> {
        self.data.has_user_session(user_id).await
    }

    pub async fn total_online_count(&self) -> Result<i64, StoreError> {
        self.data.total_online_count().await
    }
}
