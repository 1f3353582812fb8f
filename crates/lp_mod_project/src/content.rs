//! Mod content files: table patches, parameters, file and asset remaps.
//!
//! Table payloads are returned as raw JSON. Decoding them needs the table's
//! schema, which only the host has.

use crate::error::{Error, Result};
use crate::{read_json, PARAMETERS_FILE};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// One `*.json` file in a mod's `Tables/` or `TextTables/` folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFile {
    /// File stem, which names the table it patches
    pub name: String,
    pub path: Utf8PathBuf,
}

impl TableFile {
    pub fn read(&self) -> Result<serde_json::Value> {
        read_json(&self.path)
    }

    /// Name of the localization table a `TextTables/` file patches.
    pub fn text_table_name(&self) -> String {
        format!("{}_DICT", self.name)
    }
}

/// List the table files in `dir`, sorted by name.
///
/// `PARAMETERS.json` is not a table and is skipped. A missing directory yields
/// an empty list.
pub fn list_table_files(dir: &Utf8Path) -> Result<Vec<TableFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension() != Some("json") {
            continue;
        }
        if path.file_name() == Some(PARAMETERS_FILE) {
            continue;
        }
        if let Some(stem) = path.file_stem() {
            files.push(TableFile {
                name: stem.to_string(),
                path: path.to_owned(),
            });
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Read `Tables/PARAMETERS.json`.
///
/// The file's first property holds an object of constant names to values.
/// Values may be integers or strings containing an integer.
pub fn read_parameters(path: &Utf8Path) -> Result<Vec<(String, i32)>> {
    let json: serde_json::Value = read_json(path)?;
    let malformed = |reason: &str| Error::Malformed {
        path: path.to_owned(),
        reason: reason.to_string(),
    };

    let params = json
        .as_object()
        .ok_or_else(|| malformed("expected an object"))?
        .values()
        .next()
        .and_then(|v| v.as_object())
        .ok_or_else(|| malformed("first property is not an object of parameters"))?;

    params
        .iter()
        .map(|(name, value)| {
            let invalid = |reason: String| Error::InvalidParameter {
                path: path.to_owned(),
                name: name.clone(),
                reason,
            };
            let parsed = match value {
                serde_json::Value::Number(n) => n
                    .as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .ok_or_else(|| invalid(format!("{n} is not a 32-bit integer")))?,
                serde_json::Value::String(s) => s
                    .trim()
                    .parse::<i32>()
                    .map_err(|e| invalid(format!("'{s}': {e}")))?,
                other => return Err(invalid(format!("unexpected {other}"))),
            };
            Ok((name.clone(), parsed))
        })
        .collect()
}

/// `FileRemap.json`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FileRemapFile {
    #[serde(rename = "ListFile")]
    pub list_file: Vec<FileRemap>,
}

/// Replace the game file `file` with `Files/<new_file>` from the mod.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileRemap {
    pub file: String,
    pub new_file: String,
}

impl FileRemapFile {
    pub fn read(path: &Utf8Path) -> Result<Self> {
        read_json(path)
    }
}

impl FileRemap {
    /// Where the replacement lives inside a mod's `Files/` folder, or `None`
    /// if `newFile` climbs out of it with `..`.
    pub fn resolve(&self, files_dir: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut path = files_dir.to_owned();
        for part in self.new_file.split(['/', '\\']) {
            match part {
                "" | "." => {}
                ".." => return None,
                part => path.push(part),
            }
        }
        Some(path)
    }
}

/// `AssetRemap.json`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AssetRemapFile {
    #[serde(rename = "ListAsset")]
    pub list_asset: Vec<AssetRemap>,
}

/// Load `new_bundle_name`/`new_asset_name` wherever the game asks for
/// `bundle_name`/`asset_name`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetRemap {
    pub bundle_name: String,
    pub asset_name: String,
    pub new_bundle_name: String,
    pub new_asset_name: String,
}

impl AssetRemapFile {
    pub fn read(path: &Utf8Path) -> Result<Self> {
        read_json(path)
    }
}
