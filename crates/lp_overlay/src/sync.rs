//! Mirroring an overlay's effective map into a host-owned store.
//!
//! The host application owns its tables and may throw them away and rebuild
//! them at any time (a data reload creates brand new table objects). A
//! [`SyncAdapter`] sits on a [`LayeredStore`] as its observer and keeps one
//! such table in step with the store's effective map:
//!
//! - before the first override of a key, the host's value is captured so it can
//!   be put back when the override is retracted;
//! - keys the host never had are deleted again on retraction;
//! - every access first compares the host table's identity with the one seen
//!   last time. A mismatch means every previously applied override is gone, so
//!   the captured originals are dropped and the whole effective map is
//!   reapplied to the new table.

use crate::observer::{ChangeKind, ChangeObserver, EffectiveMap};
use crate::store::LayeredStore;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// A keyed host store the adapter writes into but does not own.
///
/// `V` is what the overlay resolves; `Original` is what the host stores and
/// what gets captured for restoration. For plain maps they are the same type.
/// For record tables `V` is a partial record and `Original` the full row.
pub trait ExternalStore<K, V> {
    type Original;
    type Identity: PartialEq + Clone + Debug;

    /// Identity of the live store, or `None` if the host has not created it yet.
    ///
    /// Must be cheap; it is called on every guarded access.
    fn current_identity(&self) -> Option<Self::Identity>;

    /// The host's current value for `key`.
    fn get(&self, key: &K) -> Option<Self::Original>;

    /// Write an override. `original` is the captured pre-override value, if the
    /// key existed before the first override.
    fn set(&mut self, key: &K, value: &V, original: Option<&Self::Original>);

    /// Put a captured value back.
    fn restore(&mut self, key: &K, original: Self::Original);

    /// Remove `key`. Returns `false` if it was not there, which is not an error.
    fn delete(&mut self, key: &K) -> bool;
}

/// Shared host stores: the host keeps one handle, the adapter the other.
impl<K, V, T> ExternalStore<K, V> for Rc<RefCell<T>>
where
    T: ExternalStore<K, V>,
{
    type Original = T::Original;
    type Identity = T::Identity;

    fn current_identity(&self) -> Option<Self::Identity> {
        self.borrow().current_identity()
    }

    fn get(&self, key: &K) -> Option<Self::Original> {
        self.borrow().get(key)
    }

    fn set(&mut self, key: &K, value: &V, original: Option<&Self::Original>) {
        self.borrow_mut().set(key, value, original)
    }

    fn restore(&mut self, key: &K, original: Self::Original) {
        self.borrow_mut().restore(key, original)
    }

    fn delete(&mut self, key: &K) -> bool {
        self.borrow_mut().delete(key)
    }
}

/// Result of the identity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    /// Same store as last time; incremental updates are safe.
    Fresh,
    /// The store was replaced and has just been fully resynchronized.
    Resynced,
    /// There is no store to write to.
    Unavailable,
}

/// Observer that projects a store's effective map into an [`ExternalStore`].
pub struct SyncAdapter<K, V, S>
where
    S: ExternalStore<K, V>,
{
    label: String,
    store: S,
    originals: HashMap<K, S::Original>,
    last_identity: Option<S::Identity>,
    attached: bool,
    resyncs: usize,
}

impl<K, V, S> SyncAdapter<K, V, S>
where
    K: Eq + Hash + Clone + Debug,
    S: ExternalStore<K, V>,
{
    /// A detached adapter. Notifications are ignored until [`attach`](Self::attach).
    pub fn new(label: impl Into<String>, store: S) -> Self {
        Self {
            label: label.into(),
            store,
            originals: HashMap::new(),
            last_identity: None,
            attached: false,
            resyncs: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Captured original for `key`, if any.
    pub fn original(&self, key: &K) -> Option<&S::Original> {
        self.originals.get(key)
    }

    /// Number of captured originals.
    pub fn originals_len(&self) -> usize {
        self.originals.len()
    }

    /// How many times the whole effective map was reapplied after the host
    /// store changed identity (the initial attach not included).
    pub fn resync_count(&self) -> usize {
        self.resyncs
    }

    /// Start mirroring and push the whole effective map to the store.
    pub fn attach(&mut self, effective: &EffectiveMap<K, V>) {
        if self.attached {
            self.revalidate(effective);
            return;
        }
        self.attached = true;
        self.last_identity = None;
        self.originals.clear();
        if self.check(effective) == Freshness::Unavailable {
            tracing::debug!("Attached {} before its host store exists", self.label);
        }
    }

    /// Stop mirroring and take every override back out of the host store, so
    /// a later [`attach`](Self::attach) captures the host's own values.
    pub fn detach(&mut self, effective: &EffectiveMap<K, V>) {
        if !self.attached {
            return;
        }
        if self.check(effective) != Freshness::Unavailable {
            for key in effective.keys() {
                self.remove(key);
            }
            tracing::debug!(
                "Took {} overrides back out of {}",
                effective.len(),
                self.label
            );
        }
        self.attached = false;
        self.last_identity = None;
        self.originals.clear();
    }

    /// The staleness guard. Returns `true` if the store had been replaced and was
    /// resynchronized.
    pub fn revalidate(&mut self, effective: &EffectiveMap<K, V>) -> bool {
        self.attached && self.check(effective) == Freshness::Resynced
    }

    fn check(&mut self, effective: &EffectiveMap<K, V>) -> Freshness {
        let identity = self.store.current_identity();
        if identity == self.last_identity {
            return if identity.is_some() {
                Freshness::Fresh
            } else {
                Freshness::Unavailable
            };
        }

        // Originals describe a store that no longer exists.
        self.originals.clear();
        let previous = std::mem::replace(&mut self.last_identity, identity.clone());

        if identity.is_none() {
            tracing::warn!("Host store {} went away", self.label);
            return Freshness::Unavailable;
        }

        if previous.is_some() {
            self.resyncs += 1;
            tracing::warn!(
                "Host store {} was replaced ({:?} -> {:?}), reapplying {} overrides",
                self.label,
                previous,
                identity,
                effective.len()
            );
        } else {
            tracing::debug!(
                "Applying {} overrides to host store {}",
                effective.len(),
                self.label
            );
        }

        for key in effective.keys() {
            self.add(key, effective);
        }
        Freshness::Resynced
    }

    fn apply(&mut self, key: &K, kind: ChangeKind, effective: &EffectiveMap<K, V>) {
        match kind {
            ChangeKind::Add => self.add(key, effective),
            ChangeKind::Update => self.update(key, effective),
            ChangeKind::Remove => self.remove(key),
        }
    }

    fn add(&mut self, key: &K, effective: &EffectiveMap<K, V>) {
        if !self.originals.contains_key(key) {
            if let Some(original) = self.store.get(key) {
                self.originals.insert(key.clone(), original);
            }
        }
        self.update(key, effective);
    }

    fn update(&mut self, key: &K, effective: &EffectiveMap<K, V>) {
        match effective.get(key) {
            Some(resolved) => self
                .store
                .set(key, &resolved.value, self.originals.get(key)),
            None => {
                tracing::error!("{:?} changed in {} but has no effective value", key, self.label);
                debug_assert!(false, "update for non-effective key {key:?}");
            }
        }
    }

    fn remove(&mut self, key: &K) {
        match self.originals.remove(key) {
            Some(original) => self.store.restore(key, original),
            None => {
                if !self.store.delete(key) {
                    tracing::debug!("{:?} was already absent from {}", key, self.label);
                }
            }
        }
    }
}

impl<K, V, S> ChangeObserver<K, V> for SyncAdapter<K, V, S>
where
    K: Eq + Hash + Clone + Debug,
    S: ExternalStore<K, V>,
{
    fn on_changed(&mut self, key: &K, kind: ChangeKind, effective: &EffectiveMap<K, V>) {
        if !self.attached || self.check(effective) != Freshness::Fresh {
            return;
        }
        self.apply(key, kind, effective);
    }

    fn on_multi_changed(&mut self, changes: &[(K, ChangeKind)], effective: &EffectiveMap<K, V>) {
        if !self.attached || self.check(effective) != Freshness::Fresh {
            return;
        }
        for (key, kind) in changes {
            self.apply(key, *kind, effective);
        }
    }

    fn on_reset(&mut self, old_keys: &[K], effective: &EffectiveMap<K, V>) {
        if !self.attached || self.check(effective) != Freshness::Fresh {
            return;
        }
        for key in old_keys {
            self.remove(key);
        }
        self.originals.clear();
        for key in effective.keys() {
            self.add(key, effective);
        }
    }
}

/// A layered store mirrored into a host store.
pub type SyncedStore<K, V, S> = LayeredStore<K, V, SyncAdapter<K, V, S>>;

impl<K, V, S> LayeredStore<K, V, SyncAdapter<K, V, S>>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
    S: ExternalStore<K, V>,
{
    /// A store whose adapter starts attached.
    pub fn synced(label: impl Into<String>, external: S) -> Self {
        let mut store = Self::with_observer(SyncAdapter::new(label, external));
        store.attach();
        store
    }

    pub fn attach(&mut self) {
        let (adapter, effective) = self.observer_and_effective();
        adapter.attach(effective);
    }

    pub fn detach(&mut self) {
        let (adapter, effective) = self.observer_and_effective();
        adapter.detach(effective);
    }

    /// Run the staleness guard. Hosts call this before reading a guarded table.
    pub fn revalidate(&mut self) -> bool {
        let (adapter, effective) = self.observer_and_effective();
        adapter.revalidate(effective)
    }

    pub fn external(&self) -> &S {
        self.observer().store()
    }

    pub fn external_mut(&mut self) -> &mut S {
        self.observer_mut().store_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::priority::{LoadOrder, PrioritySource};
    use proptest::prelude::*;

    type Host = Rc<RefCell<MemoryStore<&'static str, i32>>>;

    fn host(entries: &[(&'static str, i32)]) -> Host {
        Rc::new(RefCell::new(entries.iter().copied().collect()))
    }

    fn order(mods: &[&str]) -> LoadOrder {
        let mut order = LoadOrder::default();
        for id in mods {
            order.push(*id, true);
        }
        order
    }

    fn value(host: &Host, key: &'static str) -> Option<i32> {
        host.borrow().get(&key).copied()
    }

    #[test]
    fn test_capture_and_restore_original() {
        let host = host(&[("speed", 10)]);
        let order = order(&["A", "B"]);
        let mut store = SyncedStore::synced("params", host.clone());

        store.set(&order, "A", "speed", 20);
        assert_eq!(value(&host, "speed"), Some(20));
        assert_eq!(store.observer().original(&"speed"), Some(&10));

        store.set(&order, "B", "speed", 30);
        assert_eq!(value(&host, "speed"), Some(30));
        // Captured once, from before the first override.
        assert_eq!(store.observer().original(&"speed"), Some(&10));

        store.remove(&order, "B", &"speed");
        assert_eq!(value(&host, "speed"), Some(20));

        store.remove(&order, "A", &"speed");
        assert_eq!(value(&host, "speed"), Some(10));
        assert_eq!(store.observer().originals_len(), 0);
    }

    #[test]
    fn test_new_key_is_deleted_on_retraction() {
        let host = host(&[]);
        let order = order(&["A"]);
        let mut store = SyncedStore::synced("params", host.clone());

        store.set(&order, "A", "fresh", 1);
        assert_eq!(value(&host, "fresh"), Some(1));
        assert_eq!(store.observer().originals_len(), 0);

        store.remove(&order, "A", &"fresh");
        assert_eq!(value(&host, "fresh"), None);
    }

    #[test]
    fn test_delete_of_missing_key_is_noop() {
        let host = host(&[]);
        let order = order(&["A"]);
        let mut store = SyncedStore::synced("params", host.clone());

        store.set(&order, "A", "k", 1);
        // The host drops the key on its own.
        host.borrow_mut().remove(&"k");

        assert!(store.remove(&order, "A", &"k"));
        assert_eq!(value(&host, "k"), None);
        assert!(store.effective().is_empty());
    }

    #[test]
    fn test_remove_and_readd_does_not_double_capture() {
        let host = host(&[("k", 5)]);
        let order = order(&["A"]);
        let mut store = SyncedStore::synced("params", host.clone());

        store.set(&order, "A", "k", 6);
        store.remove(&order, "A", &"k");
        store.set(&order, "A", "k", 6);

        assert_eq!(value(&host, "k"), Some(6));
        assert_eq!(store.observer().original(&"k"), Some(&5));
        assert_eq!(store.observer().originals_len(), 1);
    }

    #[test]
    fn test_detached_adapter_has_no_effect() {
        let host = host(&[("k", 1)]);
        let order = order(&["A"]);
        let mut store: SyncedStore<_, _, Host> =
            LayeredStore::with_observer(SyncAdapter::new("params", host.clone()));

        store.set(&order, "A", "k", 2);
        assert_eq!(value(&host, "k"), Some(1));

        store.attach();
        assert_eq!(value(&host, "k"), Some(2));

        store.detach();
        assert_eq!(value(&host, "k"), Some(1));
        store.set(&order, "A", "k", 3);
        assert_eq!(value(&host, "k"), Some(1));
    }

    #[test]
    fn test_reattach_keeps_host_original() {
        let host = host(&[("k", 1)]);
        let order = order(&["A"]);
        let mut store = SyncedStore::synced("params", host.clone());

        store.set(&order, "A", "k", 2);
        store.set(&order, "A", "added", 5);
        store.detach();
        assert_eq!(value(&host, "k"), Some(1));
        assert_eq!(value(&host, "added"), None);

        store.attach();
        assert_eq!(value(&host, "k"), Some(2));
        assert_eq!(store.observer().original(&"k"), Some(&1));

        store.remove(&order, "A", &"k");
        store.remove(&order, "A", &"added");
        assert_eq!(value(&host, "k"), Some(1));
        assert_eq!(value(&host, "added"), None);
    }

    #[test]
    fn test_reset_matches_effective_after_reorder() {
        let host = host(&[("x", 0), ("y", 0)]);
        let mut order = order(&["A", "B"]);
        let mut store = SyncedStore::synced("params", host.clone());

        store.set(&order, "A", "x", 1);
        store.set(&order, "B", "x", 2);
        store.set(&order, "B", "only_b", 7);
        assert_eq!(value(&host, "x"), Some(2));

        order.set_enabled("B", false, None);
        store.reorder(&order);

        assert_eq!(value(&host, "x"), Some(1));
        assert_eq!(value(&host, "only_b"), None);
        assert_eq!(value(&host, "y"), Some(0));
        assert_eq!(store.observer().original(&"x"), Some(&0));
        assert_eq!(store.observer().originals_len(), 1);
    }

    #[test]
    fn test_replaced_host_store_is_resynced() {
        let host = host(&[("x", 0), ("z", 0)]);
        let order = order(&["A", "B"]);
        let mut store = SyncedStore::synced("params", host.clone());

        store.set(&order, "A", "x", 1);
        store.set(&order, "B", "x", 2);
        store.set(&order, "A", "new", 9);

        // The host reloads its table: fresh object, none of our patches.
        host.borrow_mut().rebuild([("x", 100), ("z", 100)]);
        assert_eq!(value(&host, "x"), Some(100));

        assert!(store.revalidate());
        assert_eq!(store.observer().resync_count(), 1);
        assert_eq!(value(&host, "x"), Some(2));
        assert_eq!(value(&host, "new"), Some(9));
        assert_eq!(value(&host, "z"), Some(100));
        // Originals now come from the new table only.
        assert_eq!(store.observer().original(&"x"), Some(&100));
        assert_eq!(store.observer().original(&"new"), None);

        assert!(!store.revalidate());

        store.remove(&order, "B", &"x");
        store.remove(&order, "A", &"x");
        assert_eq!(value(&host, "x"), Some(100));
    }

    #[test]
    fn test_replacement_detected_on_next_mutation() {
        let host = host(&[("x", 0)]);
        let order = order(&["A", "B"]);
        let mut store = SyncedStore::synced("params", host.clone());

        store.set(&order, "A", "x", 1);
        host.borrow_mut().rebuild([("x", 50)]);

        // A write to another key is the first guarded access.
        store.set(&order, "B", "y", 3);

        assert_eq!(value(&host, "x"), Some(1));
        assert_eq!(value(&host, "y"), Some(3));
        assert_eq!(store.observer().original(&"x"), Some(&50));

        store.on_extension_unloaded(&order, "A");
        assert_eq!(value(&host, "x"), Some(50));
    }

    #[test]
    fn test_store_created_after_attach() {
        let host: Host = Rc::new(RefCell::new(MemoryStore::uninitialized()));
        let order = order(&["A"]);
        let mut store = SyncedStore::synced("params", host.clone());

        store.set(&order, "A", "k", 4);
        assert_eq!(value(&host, "k"), None);

        host.borrow_mut().rebuild([("k", 1)]);
        assert!(store.revalidate());
        assert_eq!(value(&host, "k"), Some(4));
        // First appearance of the store is not counted as a replacement.
        assert_eq!(store.observer().resync_count(), 0);

        store.remove(&order, "A", &"k");
        assert_eq!(value(&host, "k"), Some(1));
    }

    const MODS: [&str; 3] = ["A", "B", "C"];
    const KEYS: [&str; 4] = ["k0", "k1", "k2", "k3"];

    #[derive(Debug, Clone, proptest_derive::Arbitrary)]
    enum Op {
        Set {
            #[proptest(strategy = "0..MODS.len()")]
            ext: usize,
            #[proptest(strategy = "0..KEYS.len()")]
            key: usize,
            value: i32,
        },
        Remove {
            #[proptest(strategy = "0..MODS.len()")]
            ext: usize,
            #[proptest(strategy = "0..KEYS.len()")]
            key: usize,
        },
        Toggle {
            #[proptest(strategy = "0..MODS.len()")]
            ext: usize,
        },
        /// The host reloads its table; bit `i` of `present` keeps `KEYS[i]`.
        Rebuild {
            #[proptest(strategy = "0u8..16")]
            present: u8,
            offset: i32,
        },
        Reattach,
    }

    proptest! {
        #[test]
        fn test_external_matches_effective_under_random_ops(
            ops in proptest::collection::vec(any::<Op>(), 1..150)
        ) {
            // What the host itself holds, without any overrides.
            let mut base: HashMap<&'static str, i32> = HashMap::from([("k0", -1), ("k2", -3)]);
            let host: Host = Rc::new(RefCell::new(base.clone().into_iter().collect()));
            let mut order = order(&MODS);
            let mut store = SyncedStore::synced("params", host.clone());

            for op in ops {
                match op {
                    Op::Set { ext, key, value } => store.set(&order, MODS[ext], KEYS[key], value),
                    Op::Remove { ext, key } => {
                        store.remove(&order, MODS[ext], &KEYS[key]);
                    }
                    Op::Toggle { ext } => {
                        let enabled = order.is_enabled(MODS[ext]);
                        order.set_enabled(MODS[ext], !enabled, None);
                        store.reorder(&order);
                    }
                    Op::Rebuild { present, offset } => {
                        base = KEYS
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| (present >> i) & 1 == 1)
                            .map(|(i, k)| (*k, offset.wrapping_add(i as i32)))
                            .collect();
                        host.borrow_mut().rebuild(base.clone());
                        store.revalidate();
                    }
                    Op::Reattach => {
                        store.detach();
                        for key in KEYS {
                            prop_assert_eq!(value(&host, key), base.get(key).copied());
                        }
                        store.attach();
                    }
                }

                for key in KEYS {
                    let expected = store
                        .effective_value(&key)
                        .copied()
                        .or_else(|| base.get(key).copied());
                    prop_assert_eq!(value(&host, key), expected, "key {}", key);
                    if store.effective_value(&key).is_none() {
                        prop_assert!(store.observer().original(&key).is_none());
                    }
                }
            }
        }
    }
}
