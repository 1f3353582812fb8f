//! On-disk formats of a LayerPatch mod.
//!
//! A mod is a folder inside the mods directory. Its folder name is the mod id.
//!
//! ```text
//! mods/
//! ├── ModLoadOrder.json
//! └── faster-dash/
//!     ├── Mod.json
//!     ├── ModReload.txt          (optional reload marker)
//!     ├── Tables/
//!     │   ├── CHARACTER_TABLE.json
//!     │   └── PARAMETERS.json
//!     ├── TextTables/
//!     │   └── LOCALIZATION.json
//!     ├── FileRemap.json
//!     ├── Files/
//!     └── AssetRemap.json
//! ```

pub mod content;
pub mod error;
pub mod load_order;

pub use content::{AssetRemap, AssetRemapFile, FileRemap, FileRemapFile, TableFile};
pub use error::{Error, Result};
pub use load_order::{LoadOrderEntry, LoadOrderFile};

use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const MOD_FILE: &str = "Mod.json";
pub const LOAD_ORDER_FILE: &str = "ModLoadOrder.json";
pub const RELOAD_MARKER_FILE: &str = "ModReload.txt";
pub const TABLES_DIR: &str = "Tables";
pub const TEXT_TABLES_DIR: &str = "TextTables";
pub const PARAMETERS_FILE: &str = "PARAMETERS.json";
pub const FILE_REMAP_FILE: &str = "FileRemap.json";
pub const FILES_DIR: &str = "Files";
pub const ASSET_REMAP_FILE: &str = "AssetRemap.json";

/// Mod manifest, stored as `Mod.json` with PascalCase keys.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModInfo {
    /// Display name of the mod
    pub name: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    /// Nexus Mods page id, `0` if the mod is not published there
    #[serde(default)]
    pub nexus_mod_id: i32,

    #[serde(default)]
    pub link: String,
}

impl ModInfo {
    pub fn read(path: &Utf8Path) -> Result<Self> {
        read_json(path)
    }

    pub fn write(&self, path: &Utf8Path) -> Result<()> {
        write_json(path, self)
    }
}

/// Paths inside one mod folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModLayout {
    root: Utf8PathBuf,
}

impl ModLayout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The mod id: the folder's name.
    pub fn id(&self) -> &str {
        self.root.file_name().unwrap_or_default()
    }

    pub fn mod_file(&self) -> Utf8PathBuf {
        self.root.join(MOD_FILE)
    }

    pub fn reload_marker(&self) -> Utf8PathBuf {
        self.root.join(RELOAD_MARKER_FILE)
    }

    pub fn tables_dir(&self) -> Utf8PathBuf {
        self.root.join(TABLES_DIR)
    }

    pub fn text_tables_dir(&self) -> Utf8PathBuf {
        self.root.join(TEXT_TABLES_DIR)
    }

    pub fn parameters_file(&self) -> Utf8PathBuf {
        self.tables_dir().join(PARAMETERS_FILE)
    }

    pub fn file_remap_file(&self) -> Utf8PathBuf {
        self.root.join(FILE_REMAP_FILE)
    }

    pub fn files_dir(&self) -> Utf8PathBuf {
        self.root.join(FILES_DIR)
    }

    pub fn asset_remap_file(&self) -> Utf8PathBuf {
        self.root.join(ASSET_REMAP_FILE)
    }

    pub fn has_manifest(&self) -> bool {
        self.mod_file().is_file()
    }

    pub fn has_reload_marker(&self) -> bool {
        self.reload_marker().is_file()
    }

    pub fn read_info(&self) -> Result<ModInfo> {
        ModInfo::read(&self.mod_file())
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T> {
    let contents = std::fs::read_to_string(path.as_std_path())?;
    serde_json::from_str(&contents).map_err(|source| Error::Json {
        path: path.to_owned(),
        source,
    })
}

pub(crate) fn write_json<T: Serialize>(path: &Utf8Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent.as_std_path())?;
    }
    let contents = serde_json::to_string_pretty(value).map_err(|source| Error::Json {
        path: path.to_owned(),
        source,
    })?;
    std::fs::write(path.as_std_path(), contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_mod_info_pascal_case() {
        let json = r#"{
            "Name": "Faster Dash",
            "Author": "someone",
            "Version": "1.2.0",
            "Description": "Dash goes brr",
            "NexusModId": 42,
            "Link": "https://example.com"
        }"#;

        let info: ModInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.name, "Faster Dash");
        assert_eq!(info.nexus_mod_id, 42);

        let out = serde_json::to_string(&info).unwrap();
        assert!(out.contains("\"NexusModId\":42"));
    }

    #[test]
    fn test_mod_info_optional_fields() {
        let info: ModInfo = serde_json::from_str(r#"{ "Name": "Bare" }"#).unwrap();
        assert_eq!(info.author, "");
        assert_eq!(info.nexus_mod_id, 0);
    }

    #[test]
    fn test_layout_paths_and_id() {
        let layout = ModLayout::new("/mods/faster-dash");
        assert_eq!(layout.id(), "faster-dash");
        assert_eq!(
            layout.parameters_file(),
            Utf8PathBuf::from("/mods/faster-dash/Tables/PARAMETERS.json")
        );
        assert_eq!(
            layout.reload_marker(),
            Utf8PathBuf::from("/mods/faster-dash/ModReload.txt")
        );
    }

    #[test]
    fn test_read_info_round_trip() {
        let (_dir, root) = temp_root();
        let layout = ModLayout::new(root.join("my-mod"));
        assert!(!layout.has_manifest());

        let info = ModInfo {
            name: "My Mod".to_string(),
            version: "0.1.0".to_string(),
            ..Default::default()
        };
        info.write(&layout.mod_file()).unwrap();

        assert!(layout.has_manifest());
        assert_eq!(layout.read_info().unwrap(), info);
    }

    #[test]
    fn test_read_info_reports_path_on_bad_json() {
        let (_dir, root) = temp_root();
        let path = root.join(MOD_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        match ModInfo::read(&path) {
            Err(Error::Json { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected a JSON error, got {other:?}"),
        }
    }
}
