//! `ModLoadOrder.json`: the saved order and enabled flags of mods.
//!
//! ```json
//! [
//!   { "name": "faster-dash", "enabled": true },
//!   { "name": "old-ui", "enabled": false }
//! ]
//! ```

use crate::error::Result;
use crate::{read_json, write_json};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoadOrderEntry {
    /// Mod id (folder name)
    pub name: String,
    pub enabled: bool,
}

/// Saved load order, first entry lowest in the list.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct LoadOrderFile {
    pub entries: Vec<LoadOrderEntry>,
}

impl LoadOrderFile {
    pub fn new(entries: Vec<LoadOrderEntry>) -> Self {
        Self { entries }
    }

    /// Load a saved order.
    ///
    /// Returns `Ok(None)` if the file doesn't exist and `Err` if it exists but
    /// cannot be parsed.
    pub fn load(path: &Utf8Path) -> Result<Option<Self>> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        read_json(path).map(Some)
    }

    /// Save the order, creating parent directories if needed.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name && !e.enabled)
    }
}
