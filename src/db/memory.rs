// src/db/memory.rs
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::{ScoredMember, Versioned};

#[derive(Default)]
struct Inner {
    objects: HashMap<String, Versioned>,
    sorted_sets: HashMap<String, HashMap<String, i64>>,
}

/// In-process store. Every call takes the lock once, so each primitive is
/// atomic on its own.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_object(&self, key: &str) -> Option<Versioned> {
        self.inner.read().await.objects.get(key).cloned()
    }

    pub async fn get_objects(&self, keys: &[String]) -> Vec<Option<Versioned>> {
        let inner = self.inner.read().await;
        keys.iter().map(|key| inner.objects.get(key).cloned()).collect()
    }

    pub async fn insert_object(&self, key: &str, value: Value) -> bool {
        let mut inner = self.inner.write().await;
        match inner.objects.entry(key.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Versioned { value, version: 1 });
                true
            }
        }
    }

    pub async fn set_object(&self, key: &str, value: Value) {
        let mut inner = self.inner.write().await;
        let version = inner.objects.get(key).map_or(1, |current| current.version + 1);
        inner.objects.insert(key.to_owned(), Versioned { value, version });
    }

    pub async fn replace_object(&self, key: &str, expected_version: i64, value: Value) -> bool {
        let mut inner = self.inner.write().await;
        match inner.objects.get_mut(key) {
            Some(current) if current.version == expected_version => {
                current.value = value;
                current.version += 1;
                true
            }
            _ => false,
        }
    }

    pub async fn delete(&self, key: &str) {
        let mut inner = self.inner.write().await;
        inner.objects.remove(key);
        inner.sorted_sets.remove(key);
    }

    pub async fn sorted_set_add(&self, key: &str, score: i64, member: &str) {
        let mut inner = self.inner.write().await;
        inner
            .sorted_sets
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned(), score);
    }

    pub async fn sorted_set_remove(&self, key: &str, member: &str) {
        let mut inner = self.inner.write().await;
        if let Some(set) = inner.sorted_sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                inner.sorted_sets.remove(key);
            }
        }
    }

    pub async fn sorted_set_rev_range(
        &self,
        key: &str,
        start: usize,
        count: Option<usize>,
    ) -> Vec<ScoredMember> {
        let inner = self.inner.read().await;
        let Some(set) = inner.sorted_sets.get(key) else {
            return Vec::new();
        };

        rank_descending(set)
            .into_iter()
            .skip(start)
            .take(count.unwrap_or(usize::MAX))
            .collect()
    }

    pub async fn sorted_set_trim(&self, key: &str, keep: usize) -> Vec<String> {
        let mut inner = self.inner.write().await;
        let Some(set) = inner.sorted_sets.get_mut(key) else {
            return Vec::new();
        };

        let evicted: Vec<String> = rank_descending(set)
            .into_iter()
            .skip(keep)
            .map(|entry| entry.member)
            .collect();
        for member in &evicted {
            set.remove(member);
        }

        evicted
    }
}

fn rank_descending(set: &HashMap<String, i64>) -> Vec<ScoredMember> {
    let mut ranked: Vec<ScoredMember> = set
        .iter()
        .map(|(member, &score)| ScoredMember {
            member: member.clone(),
            score,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| b.member.cmp(&a.member)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn members(entries: Vec<ScoredMember>) -> Vec<String> {
        entries.into_iter().map(|entry| entry.member).collect()
    }

    #[tokio::test]
    async fn insert_object_refuses_existing_key() {
        let store = MemoryStore::new();

        assert!(store.insert_object("poll:1", json!({ "a": 1 })).await);
        assert!(!store.insert_object("poll:1", json!({ "a": 2 })).await);

        let stored = store.get_object("poll:1").await.unwrap();
        assert_eq!(stored.value, json!({ "a": 1 }));
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn replace_object_only_succeeds_at_expected_version() {
        let store = MemoryStore::new();
        store.set_object("k", json!(1)).await;

        assert!(store.replace_object("k", 1, json!(2)).await);
        assert!(!store.replace_object("k", 1, json!(3)).await);
        assert!(!store.replace_object("missing", 1, json!(3)).await);

        let stored = store.get_object("k").await.unwrap();
        assert_eq!(stored.value, json!(2));
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn rev_range_orders_by_score_then_member() {
        let store = MemoryStore::new();
        store.sorted_set_add("z", 1, "a").await;
        store.sorted_set_add("z", 3, "c").await;
        store.sorted_set_add("z", 2, "b").await;
        store.sorted_set_add("z", 2, "d").await;

        let all = store.sorted_set_rev_range("z", 0, None).await;
        assert_eq!(members(all), ["c", "d", "b", "a"]);

        let page = store.sorted_set_rev_range("z", 1, Some(2)).await;
        assert_eq!(members(page), ["d", "b"]);
    }

    #[tokio::test]
    async fn re_adding_member_updates_score() {
        let store = MemoryStore::new();
        store.sorted_set_add("z", 1, "a").await;
        store.sorted_set_add("z", 2, "b").await;
        store.sorted_set_add("z", 3, "a").await;

        let all = store.sorted_set_rev_range("z", 0, None).await;
        assert_eq!(members(all), ["a", "b"]);
    }

    #[tokio::test]
    async fn trim_keeps_highest_scores() {
        let store = MemoryStore::new();
        for score in 0..5 {
            store.sorted_set_add("z", score, &format!("m{score}")).await;
        }

        let mut evicted = store.sorted_set_trim("z", 3).await;
        evicted.sort();
        assert_eq!(evicted, ["m0", "m1"]);

        let kept = store.sorted_set_rev_range("z", 0, None).await;
        assert_eq!(members(kept), ["m4", "m3", "m2"]);
    }

    #[tokio::test]
    async fn delete_removes_objects_and_sets() {
        let store = MemoryStore::new();
        store.set_object("k", json!(true)).await;
        store.sorted_set_add("k", 1, "m").await;

        store.delete("k").await;

        assert!(store.get_object("k").await.is_none());
        assert!(store.sorted_set_rev_range("k", 0, None).await.is_empty());
    }
}
