//! In-memory host stores.
//!
//! [`MemoryStore`] stands in for a host-owned key/value table: the parameter
//! table that constants are written into, or any other plain map. Each
//! [`rebuild`](MemoryStore::rebuild) gives it a new [`StoreId`], the same way
//! a host reload hands out a brand new table object.

use crate::sync::ExternalStore;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of one generation of a host table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(u64);

impl StoreId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        StoreId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStore<K, V> {
    id: Option<StoreId>,
    entries: HashMap<K, V>,
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self {
            id: Some(StoreId::next()),
            entries: HashMap::new(),
        }
    }
}

impl<K, V> MemoryStore<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// A store the host has not created yet. Writes through the adapter are
    /// skipped until the first [`rebuild`](Self::rebuild).
    pub fn uninitialized() -> Self {
        Self {
            id: None,
            entries: HashMap::new(),
        }
    }

    pub fn id(&self) -> Option<StoreId> {
        self.id
    }

    pub fn is_initialized(&self) -> bool {
        self.id.is_some()
    }

    /// Replace every entry and take a fresh identity.
    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.entries = entries.into_iter().collect();
        self.id = Some(StoreId::next());
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryStore<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            id: Some(StoreId::next()),
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K, V> ExternalStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    type Original = V;
    type Identity = StoreId;

    fn current_identity(&self) -> Option<StoreId> {
        self.id
    }

    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &K, value: &V, _original: Option<&V>) {
        self.entries.insert(key.clone(), value.clone());
    }

    fn restore(&mut self, key: &K, original: V) {
        self.entries.insert(key.clone(), original);
    }

    fn delete(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_changes_identity() {
        let mut store: MemoryStore<&str, i32> = [("a", 1)].into_iter().collect();
        let before = store.id();

        store.rebuild([("b", 2)]);

        assert_ne!(store.id(), before);
        assert_eq!(store.get(&"a"), None);
        assert_eq!(store.get(&"b"), Some(&2));
    }

    #[test]
    fn test_uninitialized_has_no_identity() {
        let mut store: MemoryStore<&str, i32> = MemoryStore::uninitialized();
        assert!(!store.is_initialized());
        assert_eq!(store.id(), None);

        store.rebuild([]);
        assert!(store.is_initialized());
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let mut store: MemoryStore<&str, i32> = MemoryStore::new();
        assert!(!ExternalStore::<&str, i32>::delete(&mut store, &"missing"));
    }
}
