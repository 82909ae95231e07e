//! Shared session store: the single source of truth across server instances.
//!
//! Components never cache store state between calls — every read goes back to
//! the store so that any replica sees the same sessions and room sets.

pub mod adapter;
pub mod memory;

pub use adapter::SessionData;
pub use memory::MemoryStore;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::StoreError;

/// Abstraction over the shared key/value store backing sessions and room
/// membership.
///
/// Each method is an atomic per-key operation; multi-step transitions
/// (evict-then-register, exit-then-enter) are composed sequentially by the
/// calling component without distributed locks. Backed by Redis in
/// production and an in-memory map in single-instance deployments and tests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn del(&self, key: &str) -> Result<(), StoreError>;

    /// Add a member to the set at `key`, creating the set if absent.
    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError>;
    /// Remove a member from the set at `key`; no-op when absent.
    async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn smembers(&self, key: &str) -> Result<HashSet<String>, StoreError>;
    async fn scard(&self, key: &str) -> Result<u64, StoreError>;

    /// Increment the counter at `key` and return the new value.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;
    /// Decrement the counter at `key`, clamped at zero.
    async fn decr_floor(&self, key: &str) -> Result<i64, StoreError>;
    async fn counter(&self, key: &str) -> Result<i64, StoreError>;
}
