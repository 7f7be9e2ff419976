//! Storage abstraction for durable field payloads.
//!
//! Handlers speak to storage through the [`KeyValueStore`] and
//! [`OrderedIndex`] traits so the backing service is swappable. The crate
//! ships [`MemoryStore`], an in-process implementation with fault injection
//! used throughout the tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value as Json;
use thiserror::Error;

/// Opaque metadata attached to every durable write.
pub type Metadata = IndexMap<String, String>;

/// Page size used when walking an ordered index.
pub const PAGE_LENGTH: usize = 100;

/// A storage operation failed. The message comes from the backing service
/// and is treated as transient: callers retry through a
/// [`RetryPolicy`](crate::RetryPolicy).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// One entry of a sorted listing.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedEntry {
    pub key: String,
    pub value: f64,
}

/// One page of a sorted listing, with a cursor for the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub entries: Vec<SortedEntry>,
    pub next: Option<usize>,
}

/// A scoped key/value service carrying JSON-shaped payloads.
///
/// Implementations use interior mutability; handlers hold shared references.
pub trait KeyValueStore {
    /// Reads the payload at `scope`/`key`, `None` when absent.
    fn get(&self, scope: &str, key: &str) -> Result<Option<Json>, StoreError>;

    /// Writes a payload, attaching `metadata` to the write.
    fn set(&self, scope: &str, key: &str, value: &Json, metadata: &Metadata)
    -> Result<(), StoreError>;

    /// Atomically transforms the stored payload and returns the new one.
    ///
    /// The transformer receives the current payload (or `None`) and returns
    /// the replacement.
    fn update(
        &self,
        scope: &str,
        key: &str,
        apply: &mut dyn FnMut(Option<Json>) -> Json,
    ) -> Result<Json, StoreError>;

    /// Atomically adds `delta` to a numeric payload, treating an absent
    /// payload as zero, and returns the new total.
    fn increment(
        &self,
        scope: &str,
        key: &str,
        delta: f64,
        metadata: &Metadata,
    ) -> Result<f64, StoreError>;
}

/// A numeric index that serves sorted, paged listings of a scope.
pub trait OrderedIndex {
    /// Returns one page of entries ordered by value.
    ///
    /// `cursor` is `None` for the first page; subsequent pages pass the
    /// cursor from the previous [`Page::next`].
    fn page(
        &self,
        scope: &str,
        ascending: bool,
        page_size: usize,
        cursor: Option<usize>,
    ) -> Result<Page, StoreError>;
}

/// In-process store with scripted fault injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<(String, String), Json>>,
    fail_next: Cell<u32>,
    set_count: Cell<u32>,
    last_metadata: RefCell<Option<Metadata>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-loads a payload without counting it as a write.
    pub fn seed(&self, scope: &str, key: &str, value: Json) {
        self.entries
            .borrow_mut()
            .insert((scope.to_string(), key.to_string()), value);
    }

    /// Makes the next `count` operations fail.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.set(count);
    }

    /// Number of successful writes so far.
    pub fn set_count(&self) -> u32 {
        self.set_count.get()
    }

    /// Metadata attached to the most recent write.
    pub fn last_metadata(&self) -> Option<Metadata> {
        self.last_metadata.borrow().clone()
    }

    /// Reads a stored payload directly, bypassing fault injection.
    pub fn stored(&self, scope: &str, key: &str) -> Option<Json> {
        self.entries
            .borrow()
            .get(&(scope.to_string(), key.to_string()))
            .cloned()
    }

    fn tick(&self) -> Result<(), StoreError> {
        let remaining = self.fail_next.get();
        if remaining > 0 {
            self.fail_next.set(remaining - 1);
            return Err(StoreError("injected failure".to_string()));
        }
        Ok(())
    }

    fn record_write(&self, metadata: &Metadata) {
        self.set_count.set(self.set_count.get() + 1);
        *self.last_metadata.borrow_mut() = Some(metadata.clone());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, scope: &str, key: &str) -> Result<Option<Json>, StoreError> {
        self.tick()?;
        Ok(self.stored(scope, key))
    }

    fn set(
        &self,
        scope: &str,
        key: &str,
        value: &Json,
        metadata: &Metadata,
    ) -> Result<(), StoreError> {
        self.tick()?;
        self.seed(scope, key, value.clone());
        self.record_write(metadata);
        Ok(())
    }

    fn update(
        &self,
        scope: &str,
        key: &str,
        apply: &mut dyn FnMut(Option<Json>) -> Json,
    ) -> Result<Json, StoreError> {
        self.tick()?;
        let current = self.stored(scope, key);
        let next = apply(current);
        self.seed(scope, key, next.clone());
        self.record_write(&Metadata::new());
        Ok(next)
    }

    fn increment(
        &self,
        scope: &str,
        key: &str,
        delta: f64,
        metadata: &Metadata,
    ) -> Result<f64, StoreError> {
        self.tick()?;
        let current = self
            .stored(scope, key)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let next = current + delta;
        self.seed(scope, key, serde_json::json!(next));
        self.record_write(metadata);
        Ok(next)
    }
}

impl OrderedIndex for MemoryStore {
    fn page(
        &self,
        scope: &str,
        ascending: bool,
        page_size: usize,
        cursor: Option<usize>,
    ) -> Result<Page, StoreError> {
        self.tick()?;
        let mut all: Vec<SortedEntry> = self
            .entries
            .borrow()
            .iter()
            .filter(|((entry_scope, _), _)| entry_scope == scope)
            .filter_map(|((_, key), value)| {
                value.as_f64().map(|value| SortedEntry {
                    key: key.clone(),
                    value,
                })
            })
            .collect();
        all.sort_by(|a, b| {
            let ordering = a
                .value
                .partial_cmp(&b.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key));
            if ascending { ordering } else { ordering.reverse() }
        });

        let start = cursor.unwrap_or(0);
        let end = (start + page_size).min(all.len());
        let entries = all.get(start..end).unwrap_or(&[]).to_vec();
        let next = (end < all.len()).then_some(end);
        Ok(Page { entries, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_set_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("players", "alice"), Ok(None));

        let mut metadata = Metadata::new();
        metadata.insert("rev".to_string(), "1".to_string());
        store.set("players", "alice", &json!(10), &metadata).unwrap();

        assert_eq!(store.get("players", "alice"), Ok(Some(json!(10))));
        assert_eq!(store.set_count(), 1);
        assert_eq!(store.last_metadata(), Some(metadata));
    }

    #[test]
    fn test_fault_injection_is_consumed() {
        let store = MemoryStore::new();
        store.seed("players", "alice", json!(5));
        store.fail_next(2);

        assert!(store.get("players", "alice").is_err());
        assert!(store.get("players", "alice").is_err());
        assert_eq!(store.get("players", "alice"), Ok(Some(json!(5))));
    }

    #[test]
    fn test_update_transforms_in_place() {
        let store = MemoryStore::new();
        store.seed("players", "alice", json!(5));

        let next = store
            .update("players", "alice", &mut |current| {
                json!(current.and_then(|v| v.as_f64()).unwrap_or(0.0) * 2.0)
            })
            .unwrap();
        assert_eq!(next, json!(10.0));
        assert_eq!(store.stored("players", "alice"), Some(json!(10.0)));
    }

    #[test]
    fn test_increment_treats_absent_as_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.increment("scores", "bob", 7.0, &Metadata::new()), Ok(7.0));
        assert_eq!(store.increment("scores", "bob", -2.0, &Metadata::new()), Ok(5.0));
    }

    #[test]
    fn test_paging_walks_sorted_entries() {
        let store = MemoryStore::new();
        for (key, value) in [("a", 30.0), ("b", 10.0), ("c", 20.0), ("d", 40.0)] {
            store.seed("scores", key, json!(value));
        }

        let first = store.page("scores", false, 2, None).unwrap();
        assert_eq!(
            first.entries,
            vec![
                SortedEntry { key: "d".to_string(), value: 40.0 },
                SortedEntry { key: "a".to_string(), value: 30.0 },
            ]
        );
        let second = store.page("scores", false, 2, first.next).unwrap();
        assert_eq!(second.entries[0].key, "c");
        assert_eq!(second.entries[1].key, "b");
        assert_eq!(second.next, None);
    }
}
