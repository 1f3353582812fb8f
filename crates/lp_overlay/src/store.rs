//! Priority-layered override store.
//!
//! A [`LayeredStore`] keeps one override map per mod plus a derived *effective*
//! map holding, for every key, the value from the highest-priority enabled mod
//! that defines it. Writes from lower-priority mods are kept but stay shadowed
//! until the mods above them retract their overrides or the load order changes.
//!
//! # Resolution
//!
//! - `set`: the writer takes the key if nobody holds it, if it already holds it,
//!   or if it outranks the current holder.
//! - `remove`: if the remover held the key, the nearest lower-priority mod that
//!   still defines it takes over; if there is none, the key leaves the effective
//!   map.
//! - `reorder`: the effective map is rebuilt from scratch from the current load
//!   order.
//!
//! The store reads priorities through [`PrioritySource`] on every call and never
//! caches them, so the host can change the order freely as long as it calls
//! [`reorder`](LayeredStore::reorder) afterwards.

use crate::observer::{ChangeKind, ChangeObserver, EffectiveMap, Resolved};
use crate::priority::PrioritySource;
use std::collections::HashMap;
use std::hash::Hash;

/// Per-mod override maps plus the resolved effective map.
///
/// `O` receives a notification after every mutation that changed the effective
/// map. The default `()` observer ignores them.
pub struct LayeredStore<K, V, O = ()> {
    layers: HashMap<String, HashMap<K, V>>,
    effective: EffectiveMap<K, V>,
    observer: O,
}

impl<K, V, O> Default for LayeredStore<K, V, O>
where
    O: Default,
{
    fn default() -> Self {
        Self {
            layers: HashMap::new(),
            effective: HashMap::new(),
            observer: O::default(),
        }
    }
}

impl<K, V> LayeredStore<K, V> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V, O> LayeredStore<K, V, O>
where
    K: Eq + Hash + Clone,
    V: Clone,
    O: ChangeObserver<K, V>,
{
    pub fn with_observer(observer: O) -> Self {
        Self {
            layers: HashMap::new(),
            effective: HashMap::new(),
            observer,
        }
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Split borrow for callers that need to drive the observer against the
    /// current effective map (the staleness guard does this).
    pub(crate) fn observer_and_effective(&mut self) -> (&mut O, &EffectiveMap<K, V>) {
        (&mut self.observer, &self.effective)
    }

    /// The resolved view: key to winning owner and value.
    pub fn effective(&self) -> &EffectiveMap<K, V> {
        &self.effective
    }

    /// The currently visible value for `key`.
    pub fn effective_value(&self, key: &K) -> Option<&V> {
        self.effective.get(key).map(|r| &r.value)
    }

    /// The mod whose value is currently visible for `key`.
    pub fn owner(&self, key: &K) -> Option<&str> {
        self.effective.get(key).map(|r| r.owner.as_str())
    }

    /// Read a mod's own override (shadowed or not).
    pub fn get(&self, ext: &str, key: &K) -> Option<&V> {
        self.layers.get(ext).and_then(|layer| layer.get(key))
    }

    /// Whether a mod has its own override for `key`.
    pub fn contains(&self, ext: &str, key: &K) -> bool {
        self.layers
            .get(ext)
            .is_some_and(|layer| layer.contains_key(key))
    }

    /// Every key a mod currently overrides.
    pub fn keys_of(&self, ext: &str) -> Vec<K> {
        self.layers
            .get(ext)
            .map(|layer| layer.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of mods that have written at least once since they were loaded.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Insert or update a mod's override for `key`.
    pub fn set(&mut self, order: &dyn PrioritySource, ext: &str, key: K, value: V) {
        let kind = self.claim(order, ext, &key, &value);
        self.layer_mut(ext).insert(key.clone(), value);

        if let Some(kind) = kind {
            self.observer.on_changed(&key, kind, &self.effective);
        }
    }

    /// Batched [`set`](Self::set). Observers see a single batch.
    pub fn set_range<I>(&mut self, order: &dyn PrioritySource, ext: &str, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut changes = Vec::new();
        for (key, value) in pairs {
            if let Some(kind) = self.claim(order, ext, &key, &value) {
                changes.push((key.clone(), kind));
            }
            self.layer_mut(ext).insert(key, value);
        }

        if !changes.is_empty() {
            self.observer.on_multi_changed(&changes, &self.effective);
        }
    }

    /// Delete a mod's override for `key`.
    ///
    /// Returns `false` if the mod never defined the key.
    pub fn remove(&mut self, order: &dyn PrioritySource, ext: &str, key: &K) -> bool {
        if !self.take(ext, key) {
            return false;
        }

        let lower = order.lower_than(ext);
        if let Some(kind) = self.release(&lower, ext, key) {
            self.observer.on_changed(key, kind, &self.effective);
        }
        true
    }

    /// Batched [`remove`](Self::remove). Returns how many keys the mod actually
    /// had. Observers see a single batch.
    pub fn remove_range<I>(&mut self, order: &dyn PrioritySource, ext: &str, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        let lower = order.lower_than(ext);
        let mut removed = 0;
        let mut changes = Vec::new();

        for key in keys {
            if !self.take(ext, &key) {
                continue;
            }
            removed += 1;
            if let Some(kind) = self.release(&lower, ext, &key) {
                changes.push((key, kind));
            }
        }

        if !changes.is_empty() {
            self.observer.on_multi_changed(&changes, &self.effective);
        }
        removed
    }

    /// Rebuild the effective map from the current load order.
    ///
    /// Call after any mod was enabled, disabled or moved. Observers get one
    /// reset carrying every previously effective key.
    pub fn reorder(&mut self, order: &dyn PrioritySource) {
        let old_keys: Vec<K> = self.effective.keys().cloned().collect();
        self.effective.clear();

        // Highest priority first: the first writer of a key keeps it.
        for ext in order.ranked().into_iter().rev() {
            let Some(layer) = self.layers.get(ext) else {
                continue;
            };
            for (key, value) in layer {
                self.effective
                    .entry(key.clone())
                    .or_insert_with(|| Resolved {
                        owner: ext.to_string(),
                        value: value.clone(),
                    });
            }
        }

        tracing::debug!(
            "Reordered overlay: {} keys before, {} effective now",
            old_keys.len(),
            self.effective.len()
        );
        self.observer.on_reset(&old_keys, &self.effective);
    }

    /// Lifecycle hook. Override maps are created lazily, so there is nothing to do.
    pub fn on_extension_loaded(&mut self, _ext: &str) {}

    /// Retract every override of a mod and forget its map.
    pub fn on_extension_unloaded(&mut self, order: &dyn PrioritySource, ext: &str) {
        let keys = self.keys_of(ext);
        let removed = self.remove_range(order, ext, keys);
        self.layers.remove(ext);
        tracing::debug!("Unloaded {} overrides of mod {}", removed, ext);
    }

    /// Outbound API bound to one mod.
    pub fn scope<'a>(
        &'a mut self,
        order: &'a dyn PrioritySource,
        ext: &'a str,
    ) -> Scope<'a, K, V, O> {
        Scope {
            store: self,
            order,
            ext,
        }
    }

    fn layer_mut(&mut self, ext: &str) -> &mut HashMap<K, V> {
        self.layers.entry(ext.to_string()).or_default()
    }

    /// Remove `key` from the mod's own map only.
    fn take(&mut self, ext: &str, key: &K) -> bool {
        self.layers
            .get_mut(ext)
            .is_some_and(|layer| layer.remove(key).is_some())
    }

    /// Try to make `ext` the owner of `key` with `value`.
    fn claim(
        &mut self,
        order: &dyn PrioritySource,
        ext: &str,
        key: &K,
        value: &V,
    ) -> Option<ChangeKind> {
        if let Some(resolved) = self.effective.get_mut(key) {
            if resolved.owner != ext && !order.outranks(ext, &resolved.owner) {
                return None;
            }
            resolved.owner = ext.to_string();
            resolved.value = value.clone();
            return Some(ChangeKind::Update);
        }

        if !order.is_enabled(ext) {
            return None;
        }
        self.effective.insert(
            key.clone(),
            Resolved {
                owner: ext.to_string(),
                value: value.clone(),
            },
        );
        Some(ChangeKind::Add)
    }

    /// Hand `key` down after `ext` dropped it. `lower` is nearest first.
    fn release(&mut self, lower: &[&str], ext: &str, key: &K) -> Option<ChangeKind> {
        if self.owner(key) != Some(ext) {
            return None;
        }

        let successor = lower.iter().find_map(|candidate| {
            self.layers
                .get(*candidate)
                .and_then(|layer| layer.get(key))
                .map(|value| (candidate.to_string(), value.clone()))
        });

        match successor {
            Some((owner, value)) => {
                self.effective.insert(key.clone(), Resolved { owner, value });
                Some(ChangeKind::Update)
            }
            None => {
                self.effective.remove(key);
                Some(ChangeKind::Remove)
            }
        }
    }
}

/// A store handle bound to one mod. This is the only surface mod code touches.
pub struct Scope<'a, K, V, O = ()> {
    store: &'a mut LayeredStore<K, V, O>,
    order: &'a dyn PrioritySource,
    ext: &'a str,
}

impl<K, V, O> Scope<'_, K, V, O>
where
    K: Eq + Hash + Clone,
    V: Clone,
    O: ChangeObserver<K, V>,
{
    pub fn id(&self) -> &str {
        self.ext
    }

    pub fn add_or_update(&mut self, key: K, value: V) {
        self.store.set(self.order, self.ext, key, value);
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.store.remove(self.order, self.ext, key)
    }

    pub fn add_or_update_batch<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.store.set_range(self.order, self.ext, pairs);
    }

    pub fn remove_batch<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        self.store.remove_range(self.order, self.ext, keys)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.store.get(self.ext, key)
    }
}
