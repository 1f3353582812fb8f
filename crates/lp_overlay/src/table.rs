//! Record table overlays.
//!
//! A host record table is a keyed collection of shared row objects. Other parts
//! of the host may hold on to a row (`Rc<RefCell<R>>`), so overrides are written
//! field by field into the existing row instead of swapping it out. Rows that
//! only exist because a mod added them are created fresh and deleted again when
//! the override goes away.

use crate::error::{Error, Result};
use crate::memory::StoreId;
use crate::priority::PrioritySource;
use crate::schema::{PartialRecord, RecordKey, TableSchema};
use crate::sync::{ExternalStore, SyncedStore};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

pub type Row<R> = Rc<RefCell<R>>;

/// A host-owned record table.
pub struct RecordTable<R> {
    id: Option<StoreId>,
    rows: HashMap<RecordKey, Row<R>>,
}

impl<R> Default for RecordTable<R> {
    fn default() -> Self {
        Self {
            id: Some(StoreId::next()),
            rows: HashMap::new(),
        }
    }
}

impl<R> RecordTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table the host has not loaded yet.
    pub fn uninitialized() -> Self {
        Self {
            id: None,
            rows: HashMap::new(),
        }
    }

    pub fn from_records<I>(schema: &TableSchema<R>, records: I) -> Self
    where
        I: IntoIterator<Item = R>,
    {
        let mut table = Self::default();
        table.reload(schema, records);
        table
    }

    /// Replace every row with freshly created ones, as a host data reload does.
    /// The table takes a new identity.
    pub fn reload<I>(&mut self, schema: &TableSchema<R>, records: I)
    where
        I: IntoIterator<Item = R>,
    {
        self.rows = records
            .into_iter()
            .map(|record| (schema.key_of(&record), Rc::new(RefCell::new(record))))
            .collect();
        self.id = Some(StoreId::next());
    }

    pub fn id(&self) -> Option<StoreId> {
        self.id
    }

    /// Shared handle to a row.
    pub fn row(&self, key: &RecordKey) -> Option<Row<R>> {
        self.rows.get(key).cloned()
    }

    /// Copy of a row's current contents.
    pub fn snapshot(&self, key: &RecordKey) -> Option<R>
    where
        R: Clone,
    {
        self.rows.get(key).map(|row| row.borrow().clone())
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The adapter's view of a [`RecordTable`]: writes partial records into rows.
///
/// Only the fields an override names are written. The sink remembers which
/// fields it last wrote per row so an owner switch can put back the ones the
/// new owner leaves out, and a retraction only touches those fields.
pub struct RecordSink<R> {
    table: Rc<RefCell<RecordTable<R>>>,
    schema: Rc<TableSchema<R>>,
    written: HashMap<RecordKey, BTreeSet<String>>,
}

impl<R> RecordSink<R> {
    pub fn new(table: Rc<RefCell<RecordTable<R>>>, schema: Rc<TableSchema<R>>) -> Self {
        Self {
            table,
            schema,
            written: HashMap::new(),
        }
    }

    pub fn table(&self) -> &Rc<RefCell<RecordTable<R>>> {
        &self.table
    }

    fn insert_row(&mut self, key: &RecordKey, record: R) {
        self.table
            .borrow_mut()
            .rows
            .insert(key.clone(), Rc::new(RefCell::new(record)));
    }

    /// Copy the named fields from `from` onto `to`.
    fn copy_named<'a, I>(&self, names: I, from: &R, to: &mut R)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for name in names {
            if let Some(field) = self.schema.field(name) {
                field.copy(from, to);
            }
        }
    }
}

impl<R> ExternalStore<RecordKey, PartialRecord> for RecordSink<R>
where
    R: Clone + Default,
{
    type Original = R;
    type Identity = StoreId;

    fn current_identity(&self) -> Option<StoreId> {
        self.table.borrow().id
    }

    fn get(&self, key: &RecordKey) -> Option<R> {
        self.table.borrow().snapshot(key)
    }

    fn set(&mut self, key: &RecordKey, value: &PartialRecord, original: Option<&R>) {
        let base = match original {
            Some(original) => original.clone(),
            None => self.schema.blank(key),
        };
        let fields: BTreeSet<String> = value.fields.keys().cloned().collect();

        let existing = self.table.borrow().rows.get(key).cloned();
        match existing {
            Some(row) => {
                let mut row = row.borrow_mut();
                if let Some(previous) = self.written.get(key) {
                    self.copy_named(previous.difference(&fields), &base, &mut row);
                }
                self.schema.apply(&mut row, value);
            }
            None => {
                let mut record = base;
                self.schema.apply(&mut record, value);
                self.insert_row(key, record);
            }
        }
        self.written.insert(key.clone(), fields);
    }

    fn restore(&mut self, key: &RecordKey, original: R) {
        let written = self.written.remove(key);
        let existing = self.table.borrow().rows.get(key).cloned();
        match (existing, written) {
            (Some(row), Some(fields)) => self.copy_named(&fields, &original, &mut row.borrow_mut()),
            (Some(row), None) => self.schema.copy_fields(&original, &mut row.borrow_mut()),
            (None, _) => self.insert_row(key, original),
        }
    }

    fn delete(&mut self, key: &RecordKey) -> bool {
        self.written.remove(key);
        self.table.borrow_mut().rows.remove(key).is_some()
    }
}

pub type RecordStore<R> = SyncedStore<RecordKey, PartialRecord, RecordSink<R>>;

/// Layered overrides for one record table, mirrored into the host table.
pub struct RecordOverlay<R>
where
    R: Clone + Default,
{
    schema: Rc<TableSchema<R>>,
    store: RecordStore<R>,
}

impl<R> RecordOverlay<R>
where
    R: Clone + Default,
{
    pub fn new(schema: TableSchema<R>, table: Rc<RefCell<RecordTable<R>>>) -> Self {
        let schema = Rc::new(schema);
        let sink = RecordSink::new(table, schema.clone());
        let store = RecordStore::synced(schema.name(), sink);
        Self { schema, store }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &TableSchema<R> {
        &self.schema
    }

    pub fn store(&self) -> &RecordStore<R> {
        &self.store
    }

    pub fn table(&self) -> &Rc<RefCell<RecordTable<R>>> {
        self.store.external().table()
    }

    /// Add or update records on behalf of `ext`.
    ///
    /// Every record is validated against the schema first; on error nothing is
    /// written.
    pub fn patch(
        &mut self,
        order: &dyn PrioritySource,
        ext: &str,
        records: Vec<PartialRecord>,
    ) -> Result<usize> {
        for record in &records {
            self.schema.validate(record)?;
        }
        self.store.revalidate();

        let count = records.len();
        self.store
            .set_range(order, ext, records.into_iter().map(|r| (r.key.clone(), r)));
        tracing::debug!("{} patched {} records of {}", ext, count, self.name());
        Ok(count)
    }

    /// Decode a JSON table payload and patch it.
    pub fn patch_json(
        &mut self,
        order: &dyn PrioritySource,
        ext: &str,
        json: &serde_json::Value,
    ) -> Result<usize> {
        let records = self.schema.decode_table(json)?;
        self.patch(order, ext, records)
    }

    pub fn remove(&mut self, order: &dyn PrioritySource, ext: &str, key: &RecordKey) -> bool {
        self.store.revalidate();
        self.store.remove(order, ext, key)
    }

    pub fn remove_many<I>(&mut self, order: &dyn PrioritySource, ext: &str, keys: I) -> usize
    where
        I: IntoIterator<Item = RecordKey>,
    {
        self.store.revalidate();
        self.store.remove_range(order, ext, keys)
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

    /// The winning partial record for `key`.
    pub fn effective(&self, key: &RecordKey) -> Option<&PartialRecord> {
        self.store.effective_value(key)
    }

    pub fn owner(&self, key: &RecordKey) -> Option<&str> {
        self.store.owner(key)
    }
}

/// One winning override, for listing.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveEntry {
    pub key: RecordKey,
    pub owner: String,
    pub record: PartialRecord,
}

/// Object-safe face of a [`RecordOverlay`], so overlays over different record
/// types can live in one registry keyed by table name.
pub trait TablePatcher {
    fn name(&self) -> &str;

    fn key_field(&self) -> &str;

    fn patch_records(
        &mut self,
        order: &dyn PrioritySource,
        ext: &str,
        records: Vec<PartialRecord>,
    ) -> Result<usize>;

    fn patch_json(
        &mut self,
        order: &dyn PrioritySource,
        ext: &str,
        json: &serde_json::Value,
    ) -> Result<usize>;

    fn remove_key(&mut self, order: &dyn PrioritySource, ext: &str, key: &RecordKey) -> bool;

    fn unload(&mut self, order: &dyn PrioritySource, ext: &str);

    fn reorder(&mut self, order: &dyn PrioritySource);

    fn revalidate(&mut self) -> bool;

    /// Every effective key with its owner, sorted by key.
    fn effective_entries(&self) -> Vec<EffectiveEntry>;
}

impl<R> TablePatcher for RecordOverlay<R>
where
    R: Clone + Default,
{
    fn name(&self) -> &str {
        RecordOverlay::name(self)
    }

    fn key_field(&self) -> &str {
        self.schema.key_field()
    }

    fn patch_records(
        &mut self,
        order: &dyn PrioritySource,
        ext: &str,
        records: Vec<PartialRecord>,
    ) -> Result<usize> {
        self.patch(order, ext, records)
    }

    fn patch_json(
        &mut self,
        order: &dyn PrioritySource,
        ext: &str,
        json: &serde_json::Value,
    ) -> Result<usize> {
        RecordOverlay::patch_json(self, order, ext, json)
    }

    fn remove_key(&mut self, order: &dyn PrioritySource, ext: &str, key: &RecordKey) -> bool {
        self.remove(order, ext, key)
    }

    fn unload(&mut self, order: &dyn PrioritySource, ext: &str) {
        RecordOverlay::unload(self, order, ext)
    }

    fn reorder(&mut self, order: &dyn PrioritySource) {
        RecordOverlay::reorder(self, order)
    }

    fn revalidate(&mut self) -> bool {
        RecordOverlay::revalidate(self)
    }

    fn effective_entries(&self) -> Vec<EffectiveEntry> {
        let mut entries: Vec<EffectiveEntry> = self
            .store
            .effective()
            .iter()
            .map(|(key, resolved)| EffectiveEntry {
                key: key.clone(),
                owner: resolved.owner.clone(),
                record: resolved.value.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }
}

/// Registry of table overlays by table name.
#[derive(Default)]
pub struct TableRegistry {
    tables: HashMap<String, Box<dyn TablePatcher>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an overlay under its table name, replacing any previous one.
    pub fn register(&mut self, patcher: Box<dyn TablePatcher>) {
        let name = patcher.name().to_string();
        if self.tables.insert(name.clone(), patcher).is_some() {
            tracing::warn!("Table {} was registered twice; keeping the newer one", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn TablePatcher> {
        self.tables.get(name).map(|t| t.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut (dyn TablePatcher + 'static)> {
        self.tables
            .get_mut(name)
            .map(|t| t.as_mut())
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn TablePatcher>> {
        self.tables.values_mut()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::LoadOrder;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Weapon {
        id: i32,
        name: String,
        damage: f32,
        // Not part of the schema: host-only state that overrides must not touch.
        cache_slot: u32,
    }

    fn schema() -> TableSchema<Weapon> {
        TableSchema::<Weapon>::builder("WEAPON_TABLE", "n_ID")
            .int("n_ID", |w| w.id, |w, v| w.id = v)
            .str("s_NAME", |w| w.name.clone(), |w, v| w.name = v)
            .float("f_DAMAGE", |w| w.damage, |w, v| w.damage = v)
            .build()
            .unwrap()
    }

    fn weapon(id: i32, name: &str, damage: f32) -> Weapon {
        Weapon {
            id,
            name: name.to_string(),
            damage,
            cache_slot: 7,
        }
    }

    fn setup() -> (Rc<RefCell<RecordTable<Weapon>>>, RecordOverlay<Weapon>, LoadOrder) {
        let table = Rc::new(RefCell::new(RecordTable::from_records(
            &schema(),
            [weapon(1, "Sword", 10.0), weapon(2, "Axe", 12.0)],
        )));
        let overlay = RecordOverlay::new(schema(), table.clone());
        let mut order = LoadOrder::default();
        order.push("A", true);
        order.push("B", true);
        (table, overlay, order)
    }

    #[test]
    fn test_partial_patch_keeps_row_object() {
        let (table, mut overlay, order) = setup();
        let row = table.borrow().row(&RecordKey::Int(1)).unwrap();

        overlay
            .patch(&order, "A", vec![PartialRecord::new(1).with("f_DAMAGE", 99.0f32)])
            .unwrap();

        // Same object, patched in place.
        assert_eq!(row.borrow().damage, 99.0);
        assert_eq!(row.borrow().name, "Sword");
        assert_eq!(row.borrow().cache_slot, 7);

        overlay.unload(&order, "A");
        assert_eq!(*row.borrow(), weapon(1, "Sword", 10.0));
    }

    #[test]
    fn test_owner_switch_does_not_leak_fields() {
        let (table, mut overlay, order) = setup();

        overlay
            .patch(&order, "A", vec![PartialRecord::new(1).with("s_NAME", "Blade")])
            .unwrap();
        overlay
            .patch(&order, "B", vec![PartialRecord::new(1).with("f_DAMAGE", 50.0f32)])
            .unwrap();

        let row = table.borrow().snapshot(&RecordKey::Int(1)).unwrap();
        assert_eq!(row.name, "Sword");
        assert_eq!(row.damage, 50.0);
        assert_eq!(overlay.owner(&RecordKey::Int(1)), Some("B"));

        overlay.remove(&order, "B", &RecordKey::Int(1));
        let row = table.borrow().snapshot(&RecordKey::Int(1)).unwrap();
        assert_eq!(row.name, "Blade");
        assert_eq!(row.damage, 10.0);
    }

    #[test]
    fn test_update_leaves_unnamed_fields_alone() {
        let (table, mut overlay, order) = setup();
        let row = table.borrow().row(&RecordKey::Int(1)).unwrap();

        overlay
            .patch(&order, "A", vec![PartialRecord::new(1).with("f_DAMAGE", 20.0f32)])
            .unwrap();
        // The host edits a field nobody overrides.
        row.borrow_mut().name = "Host Renamed".to_string();

        overlay
            .patch(&order, "A", vec![PartialRecord::new(1).with("f_DAMAGE", 30.0f32)])
            .unwrap();
        assert_eq!(row.borrow().damage, 30.0);
        assert_eq!(row.borrow().name, "Host Renamed");

        overlay.unload(&order, "A");
        assert_eq!(row.borrow().damage, 10.0);
        assert_eq!(row.borrow().name, "Host Renamed");
    }

    #[test]
    fn test_new_record_is_created_and_deleted() {
        let (table, mut overlay, order) = setup();

        let count = overlay
            .patch_json(
                &order,
                "A",
                &json!({ "WEAPON_TABLE": [{ "n_ID": 3, "s_NAME": "Bow" }] }),
            )
            .unwrap();
        assert_eq!(count, 1);

        let row = table.borrow().snapshot(&RecordKey::Int(3)).unwrap();
        assert_eq!(row.name, "Bow");
        assert_eq!(row.damage, 0.0);

        assert!(overlay.remove(&order, "A", &RecordKey::Int(3)));
        assert!(!table.borrow().contains(&RecordKey::Int(3)));
    }

    #[test]
    fn test_invalid_batch_writes_nothing() {
        let (table, mut overlay, order) = setup();

        let result = overlay.patch(
            &order,
            "A",
            vec![
                PartialRecord::new(1).with("s_NAME", "ok"),
                PartialRecord::new(2).with("s_UNKNOWN", "bad"),
            ],
        );

        assert!(matches!(result, Err(Error::UnknownField { .. })));
        assert_eq!(table.borrow().snapshot(&RecordKey::Int(1)).unwrap().name, "Sword");
        assert!(overlay.store().effective().is_empty());
    }

    #[test]
    fn test_reloaded_table_gets_overrides_back() {
        let (table, mut overlay, order) = setup();
        overlay
            .patch(&order, "A", vec![PartialRecord::new(2).with("f_DAMAGE", 1.0f32)])
            .unwrap();

        table
            .borrow_mut()
            .reload(&schema(), [weapon(1, "Sword", 10.0), weapon(2, "Axe", 20.0)]);
        assert_eq!(table.borrow().snapshot(&RecordKey::Int(2)).unwrap().damage, 20.0);

        assert!(overlay.revalidate());
        assert_eq!(table.borrow().snapshot(&RecordKey::Int(2)).unwrap().damage, 1.0);

        overlay.unload(&order, "A");
        // Restored to the reloaded value, not the one from before the reload.
        assert_eq!(table.borrow().snapshot(&RecordKey::Int(2)).unwrap().damage, 20.0);
    }

    #[test]
    fn test_registry_lookup_and_entries() {
        let (_table, overlay, order) = setup();
        let mut registry = TableRegistry::new();
        registry.register(Box::new(overlay));

        assert!(matches!(
            registry.get_mut("NOPE"),
            Err(Error::UnknownTable(_))
        ));

        let patcher = registry.get_mut("WEAPON_TABLE").unwrap();
        patcher
            .patch_json(&order, "B", &json!([{ "n_ID": 2, "f_DAMAGE": 3 }]))
            .unwrap();
        patcher
            .patch_json(&order, "A", &json!([{ "n_ID": 1, "s_NAME": "x" }]))
            .unwrap();

        let entries = registry.get("WEAPON_TABLE").unwrap().effective_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, RecordKey::Int(1));
        assert_eq!(entries[0].owner, "A");
        assert_eq!(entries[1].owner, "B");
    }
}
