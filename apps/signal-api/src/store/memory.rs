//! In-memory session store.
//!
//! Uses `DashMap` for shard-level concurrency; each method touches a single
//! entry, matching the atomic per-key contract of the trait.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StoreError;

use super::SessionStore;

#[derive(Default)]
pub struct MemoryStore {
    kv: DashMap<String, String>,
    sets: DashMap<String, HashSet<String>>,
    counters: DashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.kv.get(key).map(|v| v.clone()))
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.kv.remove(key);
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        if let Some(mut set) = self.sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>, StoreError> {
        Ok(self.sets.get(key).map(|s| s.clone()).unwrap_or_default())
    }

    async fn scard(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.sets.get(key).map(|s| s.len() as u64).unwrap_or(0))
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut entry = self.counters.entry(key.to_string()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn decr_floor(&self, key: &str) -> Result<i64, StoreError> {
        let mut entry = self.counters.entry(key.to_string()).or_insert(0);
        *entry = (*entry - 1).max(0);
        Ok(*entry)
    }

    async fn counter(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.counters.get(key).map(|c| *c).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_del_roundtrip() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        store.del("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_operations() {
        let store = MemoryStore::new();
        store.sadd("room", "1").await.unwrap();
        store.sadd("room", "2").await.unwrap();
        store.sadd("room", "2").await.unwrap();

        assert_eq!(store.scard("room").await.unwrap(), 2);
        assert!(store.smembers("room").await.unwrap().contains("1"));

        store.srem("room", "1").await.unwrap();
        assert_eq!(store.scard("room").await.unwrap(), 1);

        // Removing from a missing set is a no-op.
        store.srem("missing", "1").await.unwrap();
        assert!(store.smembers("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn counter_never_goes_negative() {
        let store = MemoryStore::new();
        assert_eq!(store.counter("online").await.unwrap(), 0);

        store.incr("online").await.unwrap();
        assert_eq!(store.counter("online").await.unwrap(), 1);

        store.decr_floor("online").await.unwrap();
        store.decr_floor("online").await.unwrap();
        assert_eq!(store.counter("online").await.unwrap(), 0);
    }
}
