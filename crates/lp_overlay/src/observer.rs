//! Change notifications emitted by [`LayeredStore`](crate::LayeredStore).
//!
//! Every mutating store call delivers at most one notification, after the
//! effective map has reached its new state. Observers receive the effective map
//! alongside the change so they never have to call back into the store.

use std::collections::HashMap;

/// How a key in the effective map changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The key entered the effective map.
    Add,
    /// The key stayed in the effective map but its value or owner changed.
    Update,
    /// The key left the effective map.
    Remove,
}

/// The winning override for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<V> {
    /// Id of the mod whose value is visible.
    pub owner: String,
    pub value: V,
}

/// Key to winning override. Owner and value are stored together so they can
/// never disagree.
pub type EffectiveMap<K, V> = HashMap<K, Resolved<V>>;

/// Receives store notifications.
pub trait ChangeObserver<K, V> {
    /// A single key changed.
    fn on_changed(&mut self, key: &K, kind: ChangeKind, effective: &EffectiveMap<K, V>);

    /// A batch of keys changed in one operation.
    fn on_multi_changed(&mut self, changes: &[(K, ChangeKind)], effective: &EffectiveMap<K, V>);

    /// The effective map was rebuilt from scratch. `old_keys` is every key that
    /// was effective before the rebuild.
    fn on_reset(&mut self, old_keys: &[K], effective: &EffectiveMap<K, V>);
}

/// The unit observer ignores everything. Stores that only serve lookups
/// (file and asset remaps) use it.
impl<K, V> ChangeObserver<K, V> for () {
    fn on_changed(&mut self, _: &K, _: ChangeKind, _: &EffectiveMap<K, V>) {}
    fn on_multi_changed(&mut self, _: &[(K, ChangeKind)], _: &EffectiveMap<K, V>) {}
    fn on_reset(&mut self, _: &[K], _: &EffectiveMap<K, V>) {}
}
