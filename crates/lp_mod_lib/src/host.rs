//! The mod host: owns the load order and every overlay, and drives them when
//! mods are discovered, enabled, disabled, reloaded or moved.

use crate::context::{AssetRef, AssetRemapStore, FileRemapStore, ModContext};
use crate::error::{Error, Result};
use crate::loaders;
use crate::report::{ContentKind, LoadReport};
use camino::{Utf8Path, Utf8PathBuf};
use lp_mod_project::{LoadOrderEntry, LoadOrderFile, ModInfo, ModLayout, LOAD_ORDER_FILE};
use lp_overlay::{
    ConstantOverlay, ConstantSet, LoadOrder, MemoryStore, PriorityRule, PrioritySource,
    TablePatcher, TableRegistry,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Loaders run in this order.
const LOAD_SEQUENCE: [ContentKind; 5] = [
    ContentKind::FileRemaps,
    ContentKind::AssetRemaps,
    ContentKind::Tables,
    ContentKind::TextTables,
    ContentKind::Parameters,
];

/// Where the host finds mods and how it ranks them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    pub mods_dir: Utf8PathBuf,
    /// Defaults to `ModLoadOrder.json` inside the mods directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_order_path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub priority_rule: PriorityRule,
}

impl HostConfig {
    pub fn new(mods_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            mods_dir: mods_dir.into(),
            load_order_path: None,
            priority_rule: PriorityRule::default(),
        }
    }

    pub fn load_order_path(&self) -> Utf8PathBuf {
        self.load_order_path
            .clone()
            .unwrap_or_else(|| self.mods_dir.join(LOAD_ORDER_FILE))
    }
}

/// A discovered mod.
#[derive(Debug, Clone)]
pub struct ModEntry {
    pub info: ModInfo,
    pub layout: ModLayout,
}

/// One row of [`ModHost::status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModStatus {
    pub id: String,
    pub name: String,
    pub version: String,
    pub enabled: bool,
    pub loaded: bool,
    /// Priority rank among enabled mods, 0 = lowest
    pub rank: Option<usize>,
    pub disabled_reason: Option<String>,
}

pub struct ModHost {
    config: HostConfig,
    order: LoadOrder,
    mods: HashMap<String, ModEntry>,
    loaded: HashSet<String>,
    tables: TableRegistry,
    text_tables: TableRegistry,
    constants: ConstantOverlay,
    file_remaps: FileRemapStore,
    asset_remaps: AssetRemapStore,
}

impl ModHost {
    pub fn new(config: HostConfig) -> Self {
        let order = LoadOrder::new(config.priority_rule);
        Self {
            config,
            order,
            mods: HashMap::new(),
            loaded: HashSet::new(),
            tables: TableRegistry::new(),
            text_tables: TableRegistry::new(),
            constants: ConstantOverlay::new(
                ConstantSet::default(),
                Rc::new(RefCell::new(MemoryStore::new())),
            ),
            file_remaps: FileRemapStore::new(),
            asset_remaps: AssetRemapStore::new(),
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Attach a record table overlay. Call before [`discover`](Self::discover).
    pub fn register_table(&mut self, table: Box<dyn TablePatcher>) {
        tracing::debug!("Registered table {}", table.name());
        self.tables.register(table);
    }

    /// Attach a localization table overlay (`<NAME>_DICT`).
    pub fn register_text_table(&mut self, table: Box<dyn TablePatcher>) {
        tracing::debug!("Registered text table {}", table.name());
        self.text_tables.register(table);
    }

    /// Attach the host's parameter table.
    pub fn set_constants(&mut self, constants: ConstantOverlay) {
        self.constants = constants;
    }

    pub fn order(&self) -> &LoadOrder {
        &self.order
    }

    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    pub fn text_tables(&self) -> &TableRegistry {
        &self.text_tables
    }

    pub fn constants(&self) -> &ConstantOverlay {
        &self.constants
    }

    pub fn file_remaps(&self) -> &FileRemapStore {
        &self.file_remaps
    }

    pub fn asset_remaps(&self) -> &AssetRemapStore {
        &self.asset_remaps
    }

    pub fn mod_entry(&self, id: &str) -> Option<&ModEntry> {
        self.mods.get(id)
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.contains(id)
    }

    /// Read the saved load order. A missing or unreadable file yields `None`;
    /// the latter is logged.
    fn read_saved_order(&self) -> Option<LoadOrderFile> {
        let path = self.config.load_order_path();
        match LoadOrderFile::load(&path) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!("Failed to read {}: {}", path, e);
                None
            }
        }
    }

    /// Mod folder names, saved order first, then new folders by name.
    fn ordered_folders(&self, saved: Option<&LoadOrderFile>) -> Result<Vec<String>> {
        let mut folders = Vec::new();
        for entry in self.config.mods_dir.read_dir_utf8()? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                folders.push(entry.file_name().to_string());
            }
        }
        folders.sort();

        let Some(saved) = saved else {
            return Ok(folders);
        };
        let mut ordered: Vec<String> = saved
            .names()
            .filter(|name| folders.iter().any(|f| f == *name))
            .map(str::to_string)
            .collect();
        ordered.extend(
            folders
                .into_iter()
                .filter(|f| !saved.names().any(|n| n == f.as_str())),
        );
        Ok(ordered)
    }

    /// Scan the mods directory, register every mod in load order and load the
    /// ones that are not disabled.
    pub fn discover(&mut self) -> Result<Vec<LoadReport>> {
        if !self.config.mods_dir.is_dir() {
            return Err(Error::ModsDirNotFound(self.config.mods_dir.clone()));
        }
        let mut reports = Vec::new();

        let saved = self.read_saved_order();
        let folders = self.ordered_folders(saved.as_ref())?;

        for folder in folders {
            if self.mods.contains_key(&folder) {
                tracing::error!("Cannot add mod because it was added before: {}", folder);
                continue;
            }

            let layout = ModLayout::new(self.config.mods_dir.join(&folder));
            if !layout.has_manifest() {
                tracing::warn!(
                    "Ignoring mod folder because it does not have \"{}\": {}",
                    lp_mod_project::MOD_FILE,
                    folder
                );
                continue;
            }
            let info = match layout.read_info() {
                Ok(info) => info,
                Err(e) => {
                    tracing::error!("Failed to add mod \"{}\": {}", folder, e);
                    continue;
                }
            };

            let enabled = !saved.as_ref().is_some_and(|s| s.is_disabled(&folder));
            tracing::info!(
                "Found mod {} ({} {}){}",
                folder,
                info.name,
                info.version,
                if enabled { "" } else { " [disabled]" }
            );
            self.mods.insert(folder.clone(), ModEntry { info, layout });
            self.order.push(folder.clone(), enabled);

            if enabled {
                reports.push(self.load_mod(&folder)?);
            }
        }

        if self.mods.is_empty() {
            tracing::warn!("No mods were loaded!");
        }
        Ok(reports)
    }

    /// Run every content loader that has files in the mod's folder.
    ///
    /// Loader failures are logged and collected in the report; the remaining
    /// loaders still run. A mod that is already loaded is unloaded first.
    pub fn load_mod(&mut self, id: &str) -> Result<LoadReport> {
        let layout = self
            .mods
            .get(id)
            .map(|entry| entry.layout.clone())
            .ok_or_else(|| Error::UnknownMod(id.to_string()))?;

        if self.loaded.contains(id) {
            tracing::debug!("Mod {} is already loaded, unloading first", id);
            self.unload_mod(id)?;
        }

        let mut report = LoadReport::new(id);
        let mut ctx = self.scope(id)?;
        for kind in LOAD_SEQUENCE {
            if !loaders::has_content(&layout, kind) {
                continue;
            }
            match loaders::load(&mut ctx, &layout, kind) {
                Ok(count) => {
                    tracing::debug!("Mod {}: applied {} {}", id, count, kind);
                    report.applied.push((kind, count));
                }
                Err(e) => {
                    tracing::error!("Mod {}: failed to load {}: {}", id, kind, e);
                    report.failures.push((kind, e.to_string()));
                }
            }
        }

        self.loaded.insert(id.to_string());
        tracing::info!("Loaded mod {} ({} entries)", id, report.total_applied());
        Ok(report)
    }

    /// Retract every override the mod made.
    pub fn unload_mod(&mut self, id: &str) -> Result<()> {
        if !self.mods.contains_key(id) {
            return Err(Error::UnknownMod(id.to_string()));
        }

        for table in self.tables.iter_mut() {
            table.unload(&self.order, id);
        }
        for table in self.text_tables.iter_mut() {
            table.unload(&self.order, id);
        }
        self.constants.unload(&self.order, id);
        self.file_remaps.on_extension_unloaded(&self.order, id);
        self.asset_remaps.on_extension_unloaded(&self.order, id);

        self.loaded.remove(id);
        tracing::info!("Unloaded mod {}", id);
        Ok(())
    }

    /// Enable and load a mod. Returns `None` if it was already enabled.
    pub fn enable_mod(&mut self, id: &str) -> Result<Option<LoadReport>> {
        self.ensure_known(id)?;
        if !self.order.set_enabled(id, true, None) {
            return Ok(None);
        }
        self.load_mod(id).map(Some)
    }

    /// Disable and unload a mod. Returns `false` if it was already disabled.
    pub fn disable_mod(&mut self, id: &str, reason: Option<String>) -> Result<bool> {
        self.ensure_known(id)?;
        if let Some(reason) = &reason {
            tracing::warn!("Disabling mod {}: {}", id, reason);
        }
        if !self.order.set_enabled(id, false, reason) {
            return Ok(false);
        }
        self.unload_mod(id)?;
        Ok(true)
    }

    /// Unload and load a mod again, picking up changed files. A disabled mod is
    /// enabled.
    pub fn reload_mod(&mut self, id: &str) -> Result<LoadReport> {
        self.ensure_known(id)?;
        if self.order.is_enabled(id) {
            self.unload_mod(id)?;
            self.load_mod(id)
        } else {
            self.order.set_enabled(id, true, None);
            self.load_mod(id)
        }
    }

    /// Move a mod to `index` in the load order and re-resolve every overlay.
    pub fn move_mod(&mut self, id: &str, index: usize) -> Result<bool> {
        self.ensure_known(id)?;
        if !self.order.move_to(id, index) {
            return Ok(false);
        }
        self.on_priority_order_changed();
        Ok(true)
    }

    /// Switch between later-wins and earlier-wins.
    pub fn set_priority_rule(&mut self, rule: PriorityRule) {
        if self.order.rule() == rule {
            return;
        }
        self.order.set_rule(rule);
        self.config.priority_rule = rule;
        self.on_priority_order_changed();
    }

    /// Rebuild every overlay's effective map from the current load order.
    pub fn on_priority_order_changed(&mut self) {
        for table in self.tables.iter_mut() {
            table.reorder(&self.order);
        }
        for table in self.text_tables.iter_mut() {
            table.reorder(&self.order);
        }
        self.constants.reorder(&self.order);
        self.file_remaps.reorder(&self.order);
        self.asset_remaps.reorder(&self.order);
    }

    /// Enabled mods carrying a `ModReload.txt` marker.
    pub fn mods_to_reload(&self) -> Vec<String> {
        self.order
            .enabled_ids_in_order()
            .into_iter()
            .filter(|id| {
                self.mods
                    .get(*id)
                    .is_some_and(|entry| entry.layout.has_reload_marker())
            })
            .map(str::to_string)
            .collect()
    }

    /// Reload every mod returned by [`mods_to_reload`](Self::mods_to_reload).
    pub fn reload_marked(&mut self) -> Result<Vec<LoadReport>> {
        self.mods_to_reload()
            .iter()
            .map(|id| self.reload_mod(id))
            .collect()
    }

    /// Persist the current order and enabled flags.
    pub fn save_load_order(&self) -> Result<()> {
        let file = LoadOrderFile::new(
            self.order
                .entries()
                .iter()
                .map(|e| LoadOrderEntry {
                    name: e.id.clone(),
                    enabled: e.enabled,
                })
                .collect(),
        );
        let path = self.config.load_order_path();
        file.save(&path)?;
        tracing::debug!("Saved load order to {}", path);
        Ok(())
    }

    /// The outbound API bound to one mod.
    pub fn scope(&mut self, id: &str) -> Result<ModContext<'_>> {
        let (id, _) = self
            .mods
            .get_key_value(id)
            .ok_or_else(|| Error::UnknownMod(id.to_string()))?;
        Ok(ModContext {
            id: id.as_str(),
            order: &self.order,
            tables: &mut self.tables,
            text_tables: &mut self.text_tables,
            constants: &mut self.constants,
            file_remaps: &mut self.file_remaps,
            asset_remaps: &mut self.asset_remaps,
        })
    }

    /// Replacement file for a game file hash, if a mod provides one.
    pub fn resolve_file(&self, hash: &str) -> Option<&Utf8Path> {
        self.file_remaps
            .effective_value(&hash.to_string())
            .map(|p| p.as_path())
    }

    /// Replacement for an asset, if a mod remaps it.
    pub fn resolve_asset(&self, bundle: &str, asset: &str) -> Option<&AssetRef> {
        self.asset_remaps
            .effective_value(&AssetRef::new(bundle, asset))
    }

    /// Run the staleness guard on every host table. Returns how many had been
    /// replaced and were resynchronized.
    pub fn revalidate(&mut self) -> usize {
        let mut resynced = 0;
        for table in self.tables.iter_mut().chain(self.text_tables.iter_mut()) {
            if table.revalidate() {
                resynced += 1;
            }
        }
        if self.constants.revalidate() {
            resynced += 1;
        }
        resynced
    }

    /// Every discovered mod in load order.
    pub fn status(&self) -> Vec<ModStatus> {
        self.order
            .entries()
            .iter()
            .filter_map(|e| {
                let entry = self.mods.get(&e.id)?;
                Some(ModStatus {
                    id: e.id.clone(),
                    name: entry.info.name.clone(),
                    version: entry.info.version.clone(),
                    enabled: e.enabled,
                    loaded: self.loaded.contains(&e.id),
                    rank: self.order.rank_of(&e.id),
                    disabled_reason: e.disabled_reason.clone(),
                })
            })
            .collect()
    }

    fn ensure_known(&self, id: &str) -> Result<()> {
        if self.mods.contains_key(id) {
            Ok(())
        } else {
            Err(Error::UnknownMod(id.to_string()))
        }
    }
}
