// src/db.rs
//! Key/value and sorted-set storage shared by polls and search history.
//!
//! Two backends sit behind [`Store`]: an in-process [`MemoryStore`] and a
//! Postgres-backed [`PgStore`]. Objects carry a version so callers can do
//! compare-and-swap updates with [`Store::replace_object`].
use std::time::Duration;

use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A stored object and the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub value: Value,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredMember {
    pub member: String,
    pub score: i64,
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl Store {
    /// Connects to Postgres when `DATABASE_URL` is set, otherwise keeps
    /// everything in memory.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let Some(database_url) = config.database_url.as_deref() else {
            warn!("DATABASE_URL not set, data will only live in memory");
            return Ok(Store::Memory(MemoryStore::new()));
        };

        let pool = create_pool(database_url, config.max_connections).await?;
        let store = PgStore::new(pool);
        store.init_schema().await?;
        info!("Connected to Postgres");

        Ok(Store::Postgres(store))
    }

    pub fn memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    pub async fn get_object(&self, key: &str) -> Result<Option<Versioned>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.get_object(key).await),
            Store::Postgres(store) => Ok(store.get_object(key).await?),
        }
    }

    /// Fetches several objects at once. The result lines up with `keys`.
    pub async fn get_objects(&self, keys: &[String]) -> Result<Vec<Option<Versioned>>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.get_objects(keys).await),
            Store::Postgres(store) => Ok(store.get_objects(keys).await?),
        }
    }

    /// Writes `value` only if `key` is free. Returns whether it was written.
    pub async fn insert_object(&self, key: &str, value: Value) -> Result<bool, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.insert_object(key, value).await),
            Store::Postgres(store) => Ok(store.insert_object(key, value).await?),
        }
    }

    pub async fn set_object(&self, key: &str, value: Value) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => {
                store.set_object(key, value).await;
                Ok(())
            }
            Store::Postgres(store) => Ok(store.set_object(key, value).await?),
        }
    }

    /// Overwrites `key` only if it is still at `expected_version`.
    pub async fn replace_object(
        &self,
        key: &str,
        expected_version: i64,
        value: Value,
    ) -> Result<bool, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.replace_object(key, expected_version, value).await),
            Store::Postgres(store) => Ok(store.replace_object(key, expected_version, value).await?),
        }
    }

    /// Removes whatever lives under `key`, object or sorted set.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => {
                store.delete(key).await;
                Ok(())
            }
            Store::Postgres(store) => Ok(store.delete(key).await?),
        }
    }

    pub async fn sorted_set_add(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => {
                store.sorted_set_add(key, score, member).await;
                Ok(())
            }
            Store::Postgres(store) => Ok(store.sorted_set_add(key, score, member).await?),
        }
    }

    pub async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => {
                store.sorted_set_remove(key, member).await;
                Ok(())
            }
            Store::Postgres(store) => Ok(store.sorted_set_remove(key, member).await?),
        }
    }

    /// Members ranked by score descending (ties broken by member descending),
    /// skipping `start` and returning at most `count`.
    pub async fn sorted_set_rev_range(
        &self,
        key: &str,
        start: usize,
        count: Option<usize>,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.sorted_set_rev_range(key, start, count).await),
            Store::Postgres(store) => Ok(store.sorted_set_rev_range(key, start, count).await?),
        }
    }

    /// Keeps the `keep` highest-ranked members and returns the evicted ones.
    pub async fn sorted_set_trim(&self, key: &str, keep: usize) -> Result<Vec<String>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.sorted_set_trim(key, keep).await),
            Store::Postgres(store) => Ok(store.sorted_set_trim(key, keep).await?),
        }
    }
}

pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<Pool<Postgres>, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}
