//! The per-mod API that mod content and mod code write through.

use crate::error::Result;
use camino::Utf8PathBuf;
use lp_overlay::{
    ConstantOverlay, LayeredStore, LoadOrder, PartialRecord, RecordKey, Scope, TableRegistry,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An asset inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    pub bundle: String,
    pub asset: String,
}

impl AssetRef {
    pub fn new(bundle: impl Into<String>, asset: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            asset: asset.into(),
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bundle, self.asset)
    }
}

/// File hash to replacement file on disk.
pub type FileRemapStore = LayeredStore<String, Utf8PathBuf>;

/// Original asset to replacement asset.
pub type AssetRemapStore = LayeredStore<AssetRef, AssetRef>;

/// Every host store, borrowed for one mod.
///
/// Obtained from [`ModHost::scope`](crate::ModHost::scope). Each write is
/// recorded under this mod's id and resolved against the load order.
pub struct ModContext<'a> {
    pub(crate) id: &'a str,
    pub(crate) order: &'a LoadOrder,
    pub(crate) tables: &'a mut TableRegistry,
    pub(crate) text_tables: &'a mut TableRegistry,
    pub(crate) constants: &'a mut ConstantOverlay,
    pub(crate) file_remaps: &'a mut FileRemapStore,
    pub(crate) asset_remaps: &'a mut AssetRemapStore,
}

impl<'a> ModContext<'a> {
    pub fn id(&self) -> &str {
        self.id
    }

    /// Add or update records of a record table.
    pub fn patch_table(&mut self, table: &str, records: Vec<PartialRecord>) -> Result<usize> {
        let count = self
            .tables
            .get_mut(table)?
            .patch_records(self.order, self.id, records)?;
        Ok(count)
    }

    /// Decode and apply a table payload.
    pub fn patch_table_json(&mut self, table: &str, json: &serde_json::Value) -> Result<usize> {
        let count = self
            .tables
            .get_mut(table)?
            .patch_json(self.order, self.id, json)?;
        Ok(count)
    }

    pub fn remove_table_entry(&mut self, table: &str, key: &RecordKey) -> Result<bool> {
        Ok(self.tables.get_mut(table)?.remove_key(self.order, self.id, key))
    }

    /// Decode and apply a localization table payload (`<NAME>_DICT`).
    pub fn patch_text_table_json(
        &mut self,
        table: &str,
        json: &serde_json::Value,
    ) -> Result<usize> {
        let count = self
            .text_tables
            .get_mut(table)?
            .patch_json(self.order, self.id, json)?;
        Ok(count)
    }

    pub fn remove_text_entry(&mut self, table: &str, key: &RecordKey) -> Result<bool> {
        Ok(self
            .text_tables
            .get_mut(table)?
            .remove_key(self.order, self.id, key))
    }

    pub fn patch_const(&mut self, name: &str, value: i32) -> Result<()> {
        self.constants.patch(self.order, self.id, name, value)?;
        Ok(())
    }

    pub fn patch_consts(&mut self, pairs: Vec<(String, i32)>) -> Result<usize> {
        Ok(self.constants.patch_many(self.order, self.id, pairs)?)
    }

    pub fn remove_const(&mut self, name: &str) -> bool {
        self.constants.remove(self.order, self.id, name)
    }

    /// Serve `path` whenever the game asks for the file with this hash.
    pub fn add_file(&mut self, hash: impl Into<String>, path: impl Into<Utf8PathBuf>) {
        self.file_remaps()
            .add_or_update(hash.into(), path.into());
    }

    pub fn remove_file(&mut self, hash: &str) -> bool {
        self.file_remaps().remove(&hash.to_string())
    }

    pub fn remap_asset(&mut self, from: AssetRef, to: AssetRef) {
        self.asset_remaps().add_or_update(from, to);
    }

    pub fn remove_remapping(&mut self, from: &AssetRef) -> bool {
        self.asset_remaps().remove(from)
    }

    /// Generic outbound API over the file remap store.
    pub fn file_remaps(&mut self) -> Scope<'_, String, Utf8PathBuf> {
        self.file_remaps.scope(self.order, self.id)
    }

    /// Generic outbound API over the asset remap store.
    pub fn asset_remaps(&mut self) -> Scope<'_, AssetRef, AssetRef> {
        self.asset_remaps.scope(self.order, self.id)
    }
}
