//! Typed adapter over the raw store: key patterns, (de)serialization, and
//! member type conversion live here so the services above stay key-free.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::StoreError;
use crate::session::info::SessionInfo;

use super::SessionStore;

/// Key under which the global online-user counter is kept.
const ONLINE_COUNT_KEY: &str = "ws:online_count";

fn user_session_key(user_id: i64) -> String {
    format!("ws:user:{user_id}")
}

fn session_user_key(session_id: &str) -> String {
    format!("ws:session:{session_id}")
}

fn room_users_key(room_id: i64) -> String {
    format!("ws:room:{room_id}:users")
}

/// Cloneable handle to the shared session store. All typed reads and writes
/// from the registry and presence services go through this adapter.
#[derive(Clone)]
pub struct SessionData {
    store: Arc<dyn SessionStore>,
}

impl SessionData {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    // -- user session (user_id → SessionInfo) --------------------------------

    pub async fn save_user_session(&self, info: &SessionInfo) -> Result<(), StoreError> {
        let key = user_session_key(info.user_id);
        let value = serde_json::to_string(info).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.store.set(&key, &value).await
    }

    pub async fn user_session(&self, user_id: i64) -> Result<Option<SessionInfo>, StoreError> {
        let key = user_session_key(user_id);
        match self.store.get(&key).await? {
            Some(raw) => {
                let info = serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                    key,
                    reason: e.to_string(),
                })?;
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    pub async fn has_user_session(&self, user_id: i64) -> Result<bool, StoreError> {
        Ok(self.store.get(&user_session_key(user_id)).await?.is_some())
    }

    pub async fn delete_user_session(&self, user_id: i64) -> Result<(), StoreError> {
        self.store.del(&user_session_key(user_id)).await
    }

    // -- reverse mapping (session_id → user_id) ------------------------------

    pub async fn save_session_user(&self, session_id: &str, user_id: i64) -> Result<(), StoreError> {
        self.store
            .set(&session_user_key(session_id), &user_id.to_string())
            .await
    }

    pub async fn user_id_by_session(&self, session_id: &str) -> Result<Option<i64>, StoreError> {
        let key = session_user_key(session_id);
        match self.store.get(&key).await? {
            Some(raw) => {
                let user_id = raw.parse().map_err(|_| StoreError::Corrupt {
                    key,
                    reason: format!("not a user id: {raw}"),
                })?;
                Ok(Some(user_id))
            }
            None => Ok(None),
        }
    }

    pub async fn delete_session_user(&self, session_id: &str) -> Result<(), StoreError> {
        self.store.del(&session_user_key(session_id)).await
    }

    // -- room membership sets -------------------------------------------------

    pub async fn add_user_to_room(&self, room_id: i64, user_id: i64) -> Result<(), StoreError> {
        self.store
            .sadd(&room_users_key(room_id), &user_id.to_string())
            .await
    }

    pub async fn remove_user_from_room(&self, room_id: i64, user_id: i64) -> Result<(), StoreError> {
        self.store
            .srem(&room_users_key(room_id), &user_id.to_string())
            .await
    }

    pub async fn room_users(&self, room_id: i64) -> Result<HashSet<i64>, StoreError> {
        let members = self.store.smembers(&room_users_key(room_id)).await?;
        // Unparsable members are skipped rather than failing the whole query.
        Ok(members
            .into_iter()
            .filter_map(|m| match m.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(room_id, member = %m, "skipping non-numeric room member");
                    None
                }
            })
            .collect())
    }

    pub async fn room_user_count(&self, room_id: i64) -> Result<u64, StoreError> {
        self.store.scard(&room_users_key(room_id)).await
    }

    // -- online-user counter ---------------------------------------------------

    pub async fn incr_online_count(&self) -> Result<i64, StoreError> {
        self.store.incr(ONLINE_COUNT_KEY).await
    }

    pub async fn decr_online_count(&self) -> Result<i64, StoreError> {
        self.store.decr_floor(ONLINE_COUNT_KEY).await
    }

    pub async fn total_online_count(&self) -> Result<i64, StoreError> {
        self.store.counter(ONLINE_COUNT_KEY).await
    }
}
