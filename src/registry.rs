// src/registry.rs
//! Pool registry lookup. The registry of record lives elsewhere; this crate
//! only needs to resolve a unique id to a display name.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::PoolEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub unique_id: u32,
    pub name: String,
}

#[async_trait::async_trait]
pub trait PoolRegistry: Send + Sync {
    /// `Ok(None)` when the id is unknown.
    async fn pool_by_unique_id(&self, unique_id: u32) -> Result<Option<Pool>>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryPoolRegistry {
    pools: HashMap<u32, Pool>,
}

impl InMemoryPoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[PoolEntry]) -> Self {
        let mut reg = Self::new();
        for e in entries {
            reg.insert(e.unique_id, e.name.clone());
        }
        reg
    }

    pub fn insert(&mut self, unique_id: u32, name: impl Into<String>) {
        self.pools.insert(
            unique_id,
            Pool {
                unique_id,
                name: name.into(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[async_trait::async_trait]
impl PoolRegistry for InMemoryPoolRegistry {
    async fn pool_by_unique_id(&self, unique_id: u32) -> Result<Option<Pool>> {
        Ok(self.pools.get(&unique_id).cloned())
    }
}
