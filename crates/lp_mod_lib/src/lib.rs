//! Mod host for LayerPatch.
//!
//! [`ModHost`] is the composition root: it owns the load order, one overlay
//! per host table, the constant overlay and the file/asset remap stores. It
//! discovers mods in a mods directory, loads their content through the
//! per-mod [`ModContext`], and re-resolves every overlay when mods are
//! enabled, disabled or moved.
//!
//! # Example
//!
//! ```no_run
//! use lp_mod_lib::{HostConfig, ModHost};
//!
//! # fn main() -> lp_mod_lib::Result<()> {
//! let mut host = ModHost::new(HostConfig::new("mods"));
//! // host.register_table(...) for every host table first
//! for report in host.discover()? {
//!     println!("{}: {} entries", report.mod_id, report.total_applied());
//! }
//! host.save_load_order()?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod host;
pub mod loaders;
pub mod report;

pub use context::{AssetRef, AssetRemapStore, FileRemapStore, ModContext};
pub use error::{Error, Result};
pub use host::{HostConfig, ModEntry, ModHost, ModStatus};
pub use report::{ContentKind, LoadReport};
