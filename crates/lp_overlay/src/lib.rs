//! Priority-layered overrides for live host tables.
//!
//! Many mods may want to change the same entry of the same host table at the
//! same time. This crate decides whose value wins and keeps the host's tables
//! in step with that decision:
//!
//! - **[`LayeredStore`]**: one override map per mod plus the resolved effective
//!   map. Later mods in the load order win by default; retracting the winning
//!   override falls back to the next one down.
//! - **[`SyncAdapter`]**: mirrors the effective map into a host store, keeps the
//!   host's original values for restoration, and reapplies everything when the
//!   host replaces its table.
//! - **[`RecordOverlay`]** / **[`ConstantOverlay`]**: the two host table shapes
//!   used by mods, record tables described by a [`TableSchema`] and named integer
//!   constants.
//!
//! # Example
//!
//! ```
//! use lp_overlay::{LoadOrder, MemoryStore, SyncedStore};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let host = Rc::new(RefCell::new(
//!     [("speed".to_string(), 10)].into_iter().collect::<MemoryStore<_, _>>(),
//! ));
//!
//! let mut order = LoadOrder::default();
//! order.push("base-tweaks", true);
//! order.push("fast-mode", true);
//!
//! let mut store = SyncedStore::synced("params", host.clone());
//! store.set(&order, "base-tweaks", "speed".to_string(), 12);
//! store.set(&order, "fast-mode", "speed".to_string(), 20);
//! assert_eq!(host.borrow().get(&"speed".to_string()), Some(&20));
//!
//! store.on_extension_unloaded(&order, "fast-mode");
//! assert_eq!(host.borrow().get(&"speed".to_string()), Some(&12));
//!
//! store.on_extension_unloaded(&order, "base-tweaks");
//! assert_eq!(host.borrow().get(&"speed".to_string()), Some(&10));
//! ```

pub mod constants;
pub mod error;
pub mod memory;
pub mod observer;
pub mod priority;
pub mod schema;
pub mod store;
pub mod sync;
pub mod table;
pub mod value;

// Re-export main types
pub use constants::{ConstantOverlay, ConstantSet, ParameterTable};
pub use error::{Error, Result};
pub use memory::{MemoryStore, StoreId};
pub use observer::{ChangeKind, ChangeObserver, EffectiveMap, Resolved};
pub use priority::{LoadOrder, OrderEntry, PriorityRule, PrioritySource};
pub use schema::{PartialRecord, RecordKey, TableSchema};
pub use store::{LayeredStore, Scope};
pub use sync::{ExternalStore, SyncAdapter, SyncedStore};
pub use table::{EffectiveEntry, RecordOverlay, RecordTable, TablePatcher, TableRegistry};
pub use value::{FieldKind, Value};
