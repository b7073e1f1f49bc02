// src/history.rs
//! Per-user search history and the autocomplete built on it.
//!
//! Queries live in a sorted set scored by the time they were last run, so
//! saving a query again only moves it up. The `searchIn` of each query is
//! kept in a side object next to the set.
use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::{Store, StoreError};
use crate::models::{HistoryEntry, SearchIn, Uid, UnknownSearchFilter};

/// Most queries remembered per user.
pub const HISTORY_LIMIT: usize = 10;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Invalid search: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Store(err.into())
    }
}

impl From<UnknownSearchFilter> for HistoryError {
    fn from(err: UnknownSearchFilter) -> Self {
        HistoryError::Validation(err.to_string())
    }
}

fn history_key(uid: Uid) -> String {
    format!("uid:{uid}:searches")
}

fn scopes_key(uid: Uid) -> String {
    format!("uid:{uid}:searches:in")
}

#[derive(Clone)]
pub struct SearchHistory {
    store: Store,
}

impl SearchHistory {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Records `query` as the caller's most recent search.
    pub async fn save(&self, uid: Uid, query: &str, search_in: SearchIn) -> Result<HistoryEntry, HistoryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(HistoryError::Validation("query is required".to_string()));
        }

        let key = history_key(uid);

        // Scores only move forward, so saves in the same millisecond keep
        // their order.
        let now = Utc::now().timestamp_millis();
        let latest = self.store.sorted_set_rev_range(&key, 0, Some(1)).await?;
        let timestamp = latest.first().map_or(now, |newest| now.max(newest.score + 1));

        self.store.sorted_set_add(&key, timestamp, query).await?;
        let evicted = self.store.sorted_set_trim(&key, HISTORY_LIMIT).await?;
        if !evicted.is_empty() {
            debug!(uid, evicted = evicted.len(), "Trimmed search history");
        }

        let mut scopes = self.load_scopes(uid).await?;
        for old in &evicted {
            scopes.remove(old);
        }
        scopes.insert(query.to_string(), search_in);
        self.store
            .set_object(&scopes_key(uid), serde_json::to_value(&scopes)?)
            .await?;

        Ok(HistoryEntry {
            query: query.to_string(),
            search_in,
            timestamp,
        })
    }

    /// Up to `limit` entries, newest first.
    pub async fn get(&self, uid: Uid, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        self.entries(uid, limit.min(HISTORY_LIMIT)).await
    }

    pub async fn clear(&self, uid: Uid) -> Result<(), HistoryError> {
        self.store.delete(&history_key(uid)).await?;
        self.store.delete(&scopes_key(uid)).await?;
        info!(uid, "Search history cleared");
        Ok(())
    }

    /// Entries whose query starts with `query`, ignoring case, newest first.
    /// A blank query matches nothing.
    pub async fn autocomplete(&self, uid: Uid, query: &str, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let prefix = query.to_lowercase();
        let suggestions = self
            .entries(uid, HISTORY_LIMIT)
            .await?
            .into_iter()
            .filter(|entry| entry.query.to_lowercase().starts_with(&prefix))
            .take(limit)
            .collect();

        Ok(suggestions)
    }

    async fn entries(&self, uid: Uid, count: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let ranked = self
            .store
            .sorted_set_rev_range(&history_key(uid), 0, Some(count))
            .await?;
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let scopes = self.load_scopes(uid).await?;
        Ok(ranked
            .into_iter()
            .map(|entry| HistoryEntry {
                search_in: scopes.get(&entry.member).copied().unwrap_or_default(),
                query: entry.member,
                timestamp: entry.score,
            })
            .collect())
    }

    async fn load_scopes(&self, uid: Uid) -> Result<HashMap<String, SearchIn>, HistoryError> {
        match self.store.get_object(&scopes_key(uid)).await? {
            Some(stored) => Ok(serde_json::from_value(stored.value)?),
            None => Ok(HashMap::new()),
        }
    }
}
