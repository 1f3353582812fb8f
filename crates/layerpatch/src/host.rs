//! Built-in sample host: the tables and constants `resolve` and `check` load
//! mods against.

use crate::errors::CliError;
use crate::utils::config::AppConfig;
use camino::Utf8PathBuf;
use lp_mod_lib::{HostConfig, ModHost};
use lp_overlay::{
    ConstantOverlay, ConstantSet, ParameterTable, RecordOverlay, RecordTable, TableSchema,
};
use miette::Result;
use std::cell::RefCell;
use std::rc::Rc;

pub const CHARACTER_TABLE: &str = "CHARACTER_TABLE";
pub const ITEM_TABLE: &str = "ITEM_TABLE";
pub const LOCALIZATION_DICT: &str = "LOCALIZATION_DICT";

pub const CONSTANTS: [&str; 5] = [
    "MAX_PARTY_SIZE",
    "MAX_LEVEL",
    "START_GOLD",
    "INVENTORY_SLOTS",
    "SAVE_SLOTS",
];

#[derive(Debug, Clone, Default)]
pub struct Character {
    pub id: i32,
    pub name: String,
    pub hp: i32,
    pub speed: f32,
    pub model: String,
}

#[derive(Debug, Clone, Default)]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub price: i32,
    pub weight: f32,
    pub flags: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Text {
    pub key: String,
    pub text: String,
}

pub fn character_schema() -> lp_overlay::Result<TableSchema<Character>> {
    TableSchema::<Character>::builder(CHARACTER_TABLE, "n_ID")
        .int("n_ID", |c| c.id, |c, v| c.id = v)
        .str("s_NAME", |c| c.name.clone(), |c, v| c.name = v)
        .int("n_HP", |c| c.hp, |c, v| c.hp = v)
        .float("f_SPEED", |c| c.speed, |c, v| c.speed = v)
        .str("s_MODEL", |c| c.model.clone(), |c, v| c.model = v)
        .build()
}

pub fn item_schema() -> lp_overlay::Result<TableSchema<Item>> {
    TableSchema::<Item>::builder(ITEM_TABLE, "n_ID")
        .int("n_ID", |i| i.id, |i, v| i.id = v)
        .str("s_NAME", |i| i.name.clone(), |i, v| i.name = v)
        .int("n_PRICE", |i| i.price, |i, v| i.price = v)
        .float("f_WEIGHT", |i| i.weight, |i, v| i.weight = v)
        .int("#_FLAGS", |i| i.flags, |i, v| i.flags = v)
        .build()
}

pub fn localization_schema() -> lp_overlay::Result<TableSchema<Text>> {
    TableSchema::<Text>::builder(LOCALIZATION_DICT, "w_KEY")
        .str("w_KEY", |t| t.key.clone(), |t, v| t.key = v)
        .str("s_TEXT", |t| t.text.clone(), |t, v| t.text = v)
        .build()
}

fn schema<R>(built: lp_overlay::Result<TableSchema<R>>) -> Result<TableSchema<R>, CliError> {
    built.map_err(|e| lp_mod_lib::Error::from(e).into())
}

/// The mods directory from `--mods-dir` or the config file.
pub fn resolve_mods_dir(arg: Option<String>, cfg: &AppConfig) -> Result<Utf8PathBuf> {
    let dir = arg
        .map(Utf8PathBuf::from)
        .or_else(|| cfg.mods_dir.clone())
        .ok_or(CliError::ModsDirNotSet)?;
    if !dir.is_dir() {
        return Err(CliError::mods_dir_not_found(dir).into());
    }
    Ok(dir)
}

/// A host with the sample tables registered and no mods discovered yet.
pub fn build_host(mods_dir: Utf8PathBuf, cfg: &AppConfig) -> Result<ModHost> {
    let mut config = HostConfig::new(mods_dir);
    config.priority_rule = cfg.priority_rule;
    let mut host = ModHost::new(config);

    host.register_table(Box::new(RecordOverlay::new(
        schema(character_schema())?,
        Rc::new(RefCell::new(RecordTable::new())),
    )));
    host.register_table(Box::new(RecordOverlay::new(
        schema(item_schema())?,
        Rc::new(RefCell::new(RecordTable::new())),
    )));
    host.register_text_table(Box::new(RecordOverlay::new(
        schema(localization_schema())?,
        Rc::new(RefCell::new(RecordTable::new())),
    )));
    host.set_constants(ConstantOverlay::new(
        ConstantSet::new(CONSTANTS),
        ParameterTable::default(),
    ));

    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_schemas_build() {
        assert_eq!(character_schema().unwrap().fields().len(), 5);
        assert_eq!(item_schema().unwrap().key_field(), "n_ID");
        assert_eq!(localization_schema().unwrap().key_field(), "w_KEY");
    }

    #[test]
    fn host_registers_every_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let mods_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let host = build_host(mods_dir, &AppConfig::default()).unwrap();

        assert_eq!(host.tables().names(), vec![CHARACTER_TABLE, ITEM_TABLE]);
        assert!(host.text_tables().contains(LOCALIZATION_DICT));
        assert_eq!(host.constants().known().len(), CONSTANTS.len());
    }

    #[test]
    fn missing_mods_dir_is_an_error() {
        let cfg = AppConfig::default();
        assert!(resolve_mods_dir(None, &cfg).is_err());
        assert!(resolve_mods_dir(Some("/definitely/not/here".to_string()), &cfg).is_err());
    }
}
