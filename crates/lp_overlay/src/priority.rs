//! Load order and priority resolution.
//!
//! The overlay stores never own the load order. They read it through the
//! [`PrioritySource`] trait on every mutation, so the host is free to keep the
//! order wherever it likes. [`LoadOrder`] is the plain in-memory implementation
//! used by the mod host.
//!
//! How a position in the list maps to a priority is decided by a single
//! [`PriorityRule`]. With the default [`PriorityRule::LaterWins`], the mod that
//! appears *later* in the list overrides the ones before it, matching how the
//! mod manager has always applied its load order.

use serde::{Deserialize, Serialize};

/// Maps a load order position to a priority rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityRule {
    /// Mods later in the list override earlier ones.
    #[default]
    LaterWins,
    /// Mods earlier in the list override later ones.
    EarlierWins,
}

/// Read-only view of an ordered, enable-flagged list of mod ids.
///
/// Implementors provide the three raw queries; the ranking helpers are derived
/// from them and the [`rule`](Self::rule).
pub trait PrioritySource {
    /// Whether the mod is present in the order and enabled.
    fn is_enabled(&self, id: &str) -> bool;

    /// Position of the mod in the order, enabled or not.
    fn index_of(&self, id: &str) -> Option<usize>;

    /// Enabled mod ids in list order.
    fn enabled_ids_in_order(&self) -> Vec<&str>;

    /// The position-to-priority policy.
    fn rule(&self) -> PriorityRule {
        PriorityRule::LaterWins
    }

    /// Enabled mod ids from the lowest priority to the highest.
    fn ranked(&self) -> Vec<&str> {
        let mut ids = self.enabled_ids_in_order();
        if self.rule() == PriorityRule::EarlierWins {
            ids.reverse();
        }
        ids
    }

    /// Priority rank of an enabled mod (0 = lowest). Disabled or unknown mods have none.
    fn rank_of(&self, id: &str) -> Option<usize> {
        if !self.is_enabled(id) {
            return None;
        }
        self.ranked().iter().position(|candidate| *candidate == id)
    }

    /// Whether `challenger` should take a key away from `holder`.
    ///
    /// Only enabled mods can win. An enabled challenger always beats a holder
    /// that is no longer enabled.
    fn outranks(&self, challenger: &str, holder: &str) -> bool {
        match (self.rank_of(challenger), self.rank_of(holder)) {
            (Some(c), Some(h)) => c > h,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Enabled mods with a lower priority than `id`, nearest first.
    ///
    /// `id` itself does not need to be enabled; its list position is what
    /// matters. This is what lets a mod that was just disabled hand its keys
    /// down to the mods below it. An id missing from the order is treated as
    /// sitting above every enabled mod.
    fn lower_than(&self, id: &str) -> Vec<&str> {
        let mut ranked = self.ranked();
        let Some(position) = self.index_of(id) else {
            ranked.reverse();
            return ranked;
        };

        let rule = self.rule();
        let mut lower: Vec<&str> = ranked
            .into_iter()
            .filter(|other| *other != id)
            .filter(|other| match self.index_of(other) {
                Some(index) => match rule {
                    PriorityRule::LaterWins => index < position,
                    PriorityRule::EarlierWins => index > position,
                },
                None => false,
            })
            .collect();
        lower.reverse();
        lower
    }
}

/// One mod's slot in the load order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEntry {
    /// Mod id (the mod's folder name).
    pub id: String,
    /// Whether the mod currently participates in resolution.
    pub enabled: bool,
    /// Why the mod was disabled, if it disabled itself or failed to load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
}

/// In-memory load order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOrder {
    entries: Vec<OrderEntry>,
    #[serde(default)]
    rule: PriorityRule,
}

impl LoadOrder {
    pub fn new(rule: PriorityRule) -> Self {
        Self {
            entries: Vec::new(),
            rule,
        }
    }

    /// Append a mod at the end (highest priority under [`PriorityRule::LaterWins`]).
    ///
    /// Returns `false` if the id is already present.
    pub fn push(&mut self, id: impl Into<String>, enabled: bool) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.entries.push(OrderEntry {
            id,
            enabled,
            disabled_reason: None,
        });
        true
    }

    /// Remove a mod from the order entirely.
    pub fn remove(&mut self, id: &str) -> Option<OrderEntry> {
        let index = self.index_of(id)?;
        Some(self.entries.remove(index))
    }

    /// Flip a mod's enabled flag. Returns `true` if the flag changed.
    ///
    /// Enabling clears any recorded disable reason.
    pub fn set_enabled(&mut self, id: &str, enabled: bool, reason: Option<String>) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        if entry.enabled == enabled {
            return false;
        }
        entry.enabled = enabled;
        entry.disabled_reason = if enabled { None } else { reason };
        true
    }

    /// Move a mod to `index` (clamped to the end). Returns `true` if it moved.
    pub fn move_to(&mut self, id: &str, index: usize) -> bool {
        let Some(current) = self.index_of(id) else {
            return false;
        };
        let target = index.min(self.entries.len() - 1);
        if current == target {
            return false;
        }
        let entry = self.entries.remove(current);
        self.entries.insert(target, entry);
        true
    }

    pub fn set_rule(&mut self, rule: PriorityRule) {
        self.rule = rule;
    }

    pub fn entries(&self) -> &[OrderEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &str) -> Option<&OrderEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PrioritySource for LoadOrder {
    fn is_enabled(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id && e.enabled)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn enabled_ids_in_order(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.id.as_str())
            .collect()
    }

    fn rule(&self) -> PriorityRule {
        self.rule
    }
}
