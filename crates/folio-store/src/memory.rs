//! In-memory fast store for tests and single-process deployments.
//!
//! [`InMemoryFastStore`] keeps values in a `HashMap` behind a `RwLock`.
//! Every write stamps the key with a fresh revision from a store-wide clock;
//! revisions survive deletion so a delete-then-recreate still invalidates an
//! outstanding [`Watch`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::traits::{FastStore, Watch};

/// An in-memory implementation of [`FastStore`].
///
/// Data is lost when the store is dropped. The store can be switched offline
/// with [`set_available`](Self::set_available) to exercise failure paths.
pub struct InMemoryFastStore {
    state: RwLock<FastState>,
    available: AtomicBool,
}

#[derive(Default)]
struct FastState {
    values: HashMap<String, Bytes>,
    revisions: HashMap<String, u64>,
    clock: u64,
}

impl FastState {
    fn revision(&self, key: &str) -> u64 {
        self.revisions.get(key).copied().unwrap_or(0)
    }

    fn put(&mut self, key: &str, value: Bytes) {
        self.values.insert(key.to_string(), value);
        self.bump(key);
    }

    fn bump(&mut self, key: &str) {
        self.clock += 1;
        self.revisions.insert(key.to_string(), self.clock);
    }
}

impl InMemoryFastStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(FastState::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Take the store offline (`false`) or bring it back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.read_state().map(|s| s.values.len()).unwrap_or(0)
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of stored keys starting with `prefix`.
    pub fn keys(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .read_state()
            .map(|s| {
                s.values
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory fast store is offline".into()))
        }
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, FastState>> {
        self.check_available()?;
        self.state
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, FastState>> {
        self.check_available()?;
        self.state
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryFastStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryFastStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryFastStore")
            .field("key_count", &self.len())
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl FastStore for InMemoryFastStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        Ok(self.read_state()?.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        self.write_state()?.put(key, value);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: Bytes) -> StoreResult<bool> {
        let mut state = self.write_state()?;
        if state.values.contains_key(key) {
            return Ok(false);
        }
        state.put(key, value);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut state = self.write_state()?;
        if state.values.remove(key).is_none() {
            return Ok(false);
        }
        state.bump(key);
        Ok(true)
    }

    async fn increment(&self, key: &str) -> StoreResult<u64> {
        let mut state = self.write_state()?;
        let current = match state.values.get(key) {
            None => 0,
            Some(raw) => std::str::from_utf8(raw)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| StoreError::NotAnInteger {
                    key: key.to_string(),
                })?,
        };
        let next = current.checked_add(1).ok_or_else(|| StoreError::Overflow {
            key: key.to_string(),
        })?;
        state.put(key, Bytes::from(next.to_string()));
        Ok(next)
    }

    async fn watch(&self, key: &str) -> StoreResult<Watch> {
        let state = self.read_state()?;
        Ok(Watch::new(
            key,
            state.values.get(key).cloned(),
            state.revision(key),
        ))
    }

    async fn commit(&self, watch: &Watch, value: Bytes) -> StoreResult<bool> {
        let mut state = self.write_state()?;
        if state.revision(watch.key()) != watch.revision() {
            return Ok(false);
        }
        state.put(watch.key(), value);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn get_set_delete() {
        let store = InMemoryFastStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", Bytes::from_static(b"v")).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap(), "v");

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn set_if_absent_never_overwrites() {
        let store = InMemoryFastStore::new();
        assert!(store.set_if_absent("k", Bytes::from_static(b"0")).await.unwrap());
        store.increment("k").await.unwrap();
        assert!(!store.set_if_absent("k", Bytes::from_static(b"0")).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().unwrap(), "1");
    }

    #[tokio::test]
    async fn increment_from_absent() {
        let store = InMemoryFastStore::new();
        assert_eq!(store.increment("c").await.unwrap(), 1);
        assert_eq!(store.increment("c").await.unwrap(), 2);
        assert_eq!(store.get("c").await.unwrap().unwrap(), "2");
    }

    #[tokio::test]
    async fn increment_rejects_non_integer() {
        let store = InMemoryFastStore::new();
        store.set("c", Bytes::from_static(b"abc")).await.unwrap();
        let err = store.increment("c").await.unwrap_err();
        assert!(matches!(err, StoreError::NotAnInteger { .. }));
    }

    #[tokio::test]
    async fn increment_at_max_leaves_store_usable() {
        let store = InMemoryFastStore::new();
        store
            .set("c", Bytes::from(u64::MAX.to_string()))
            .await
            .unwrap();
        store.set("other", Bytes::from_static(b"v")).await.unwrap();

        let err = store.increment("c").await.unwrap_err();
        assert!(matches!(err, StoreError::Overflow { ref key } if key == "c"));
        assert!(!err.is_unavailable());

        assert_eq!(store.get("c").await.unwrap().unwrap(), u64::MAX.to_string());
        assert_eq!(store.get("other").await.unwrap().unwrap(), "v");
        assert_eq!(store.increment("fresh").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn commit_succeeds_when_unchanged() {
        let store = InMemoryFastStore::new();
        let watch = store.watch("k").await.unwrap();
        assert!(watch.value().is_none());
        assert!(store.commit(&watch, Bytes::from_static(b"a")).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().unwrap(), "a");
    }

    #[tokio::test]
    async fn commit_conflicts_after_interleaved_write() {
        let store = InMemoryFastStore::new();
        store.set("k", Bytes::from_static(b"a")).await.unwrap();
        let watch = store.watch("k").await.unwrap();

        // Same bytes, but still a write.
        store.set("k", Bytes::from_static(b"a")).await.unwrap();

        assert!(!store.commit(&watch, Bytes::from_static(b"b")).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().unwrap(), "a");
    }

    #[tokio::test]
    async fn commit_conflicts_after_delete_and_recreate() {
        let store = InMemoryFastStore::new();
        let watch = store.watch("k").await.unwrap();
        store.set("k", Bytes::from_static(b"x")).await.unwrap();
        store.delete("k").await.unwrap();
        assert!(!store.commit(&watch, Bytes::from_static(b"y")).await.unwrap());
    }

    #[tokio::test]
    async fn second_commit_on_same_watch_conflicts() {
        let store = InMemoryFastStore::new();
        let watch = store.watch("k").await.unwrap();
        assert!(store.commit(&watch, Bytes::from_static(b"1")).await.unwrap());
        assert!(!store.commit(&watch, Bytes::from_static(b"2")).await.unwrap());
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = InMemoryFastStore::new();
        store.set_available(false);
        let err = store.get("k").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.increment("k").await.is_err());

        store.set_available(true);
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_unique() {
        let store = Arc::new(InMemoryFastStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..50 {
                    seen.push(store.increment("c").await.unwrap());
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for h in handles {
            all.extend(h.await.unwrap());
        }
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(all.last(), Some(&400));
    }

    #[tokio::test]
    async fn keys_by_prefix() {
        let store = InMemoryFastStore::new();
        store.set("project:1:a", Bytes::new()).await.unwrap();
        store.set("project:2:a", Bytes::new()).await.unwrap();
        store.set("catalog", Bytes::new()).await.unwrap();
        assert_eq!(store.keys("project:"), vec!["project:1:a", "project:2:a"]);
        let debug = format!("{store:?}");
        assert!(debug.contains("key_count"));
    }
}
