//! Named integer constants.
//!
//! The host keeps its tunables in a flat name to integer table. Mods may only
//! override names the host actually knows about, so every write is checked
//! against a closed [`ConstantSet`] and rejected with
//! [`Error::UnknownConstant`] otherwise.

use crate::error::{Error, Result};
use crate::memory::MemoryStore;
use crate::priority::PrioritySource;
use crate::sync::{ExternalStore, SyncedStore};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// The closed set of constant names a host recognizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantSet {
    names: BTreeSet<String>,
}

impl ConstantSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub type ParameterTable = Rc<RefCell<MemoryStore<String, i32>>>;

/// Layered constant overrides mirrored into a host parameter table.
pub struct ConstantOverlay<S = ParameterTable>
where
    S: ExternalStore<String, i32>,
{
    known: ConstantSet,
    store: SyncedStore<String, i32, S>,
}

impl<S> ConstantOverlay<S>
where
    S: ExternalStore<String, i32>,
{
    pub fn new(known: ConstantSet, table: S) -> Self {
        Self {
            known,
            store: SyncedStore::synced("PARAMETERS", table),
        }
    }

    pub fn known(&self) -> &ConstantSet {
        &self.known
    }

    pub fn store(&self) -> &SyncedStore<String, i32, S> {
        &self.store
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.known.contains(name) {
            Ok(())
        } else {
            tracing::warn!("Rejected override of unknown constant {}", name);
            Err(Error::UnknownConstant(name.to_string()))
        }
    }

    pub fn patch(
        &mut self,
        order: &dyn PrioritySource,
        ext: &str,
        name: &str,
        value: i32,
    ) -> Result<()> {
        self.check(name)?;
        self.store.revalidate();
        self.store.set(order, ext, name.to_string(), value);
        Ok(())
    }

    /// Batched [`patch`](Self::patch). All names are checked before anything is
    /// written.
    pub fn patch_many<I>(&mut self, order: &dyn PrioritySource, ext: &str, pairs: I) -> Result<usize>
    where
        I: IntoIterator<Item = (String, i32)>,
    {
        let pairs: Vec<(String, i32)> = pairs.into_iter().collect();
        for (name, _) in &pairs {
            self.check(name)?;
        }
        self.store.revalidate();

        let count = pairs.len();
        self.store.set_range(order, ext, pairs);
        Ok(count)
    }

    /// Retract an override. Unknown names were never stored, so they report `false`.
    pub fn remove(&mut self, order: &dyn PrioritySource, ext: &str, name: &str) -> bool {
        self.store.revalidate();
        self.store.remove(order, ext, &name.to_string())
    }

    pub fn unload(&mut self, order: &dyn PrioritySource, ext: &str) {
        self.store.revalidate();
        self.store.on_extension_unloaded(order, ext);
    }

    pub fn reorder(&mut self, order: &dyn PrioritySource) {
        self.store.revalidate();
        self.store.reorder(order);
    }

    pub fn revalidate(&mut self) -> bool {
        self.store.revalidate()
    }

    /// The overriding value for `name`, if any mod overrides it.
    pub fn value(&self, name: &str) -> Option<i32> {
        self.store.effective_value(&name.to_string()).copied()
    }

    pub fn owner(&self, name: &str) -> Option<&str> {
        self.store.owner(&name.to_string())
    }
}
