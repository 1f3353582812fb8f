//! Record table descriptors.
//!
//! A [`TableSchema`] describes one host record type: the table's name, which
//! field identifies a record, and a typed getter/setter pair for every patchable
//! field. Schemas are built once when a table is registered and validated then,
//! so decoding and patching never have to discover fields at runtime.
//!
//! ```
//! use lp_overlay::schema::TableSchema;
//!
//! #[derive(Debug, Clone, Default)]
//! struct Weapon {
//!     id: i32,
//!     name: String,
//!     damage: f32,
//! }
//!
//! let schema = TableSchema::<Weapon>::builder("WEAPON_TABLE", "n_ID")
//!     .int("n_ID", |w| w.id, |w, v| w.id = v)
//!     .str("s_NAME", |w| w.name.clone(), |w, v| w.name = v)
//!     .float("f_DAMAGE", |w| w.damage, |w, v| w.damage = v)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.fields().len(), 3);
//! ```

use crate::error::{Error, Result};
use crate::value::{FieldKind, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The identifying key of a record: the value of the table's key field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Int(i32),
    Str(String),
}

impl RecordKey {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(RecordKey::Int(*v)),
            Value::Str(v) => Some(RecordKey::Str(v.clone())),
            Value::Float(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordKey::Int(v) => Value::Int(*v),
            RecordKey::Str(v) => Value::Str(v.clone()),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Int(v) => write!(f, "{v}"),
            RecordKey::Str(v) => f.write_str(v),
        }
    }
}

impl From<i32> for RecordKey {
    fn from(v: i32) -> Self {
        RecordKey::Int(v)
    }
}

impl From<&str> for RecordKey {
    fn from(v: &str) -> Self {
        RecordKey::Str(v.to_string())
    }
}

/// A full or partial record update: the key plus the fields to change.
///
/// The key field itself is not part of `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialRecord {
    pub key: RecordKey,
    pub fields: BTreeMap<String, Value>,
}

impl PartialRecord {
    pub fn new(key: impl Into<RecordKey>) -> Self {
        Self {
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }
}

/// Typed getter/setter pair for one field.
pub enum Accessor<R> {
    Int {
        get: fn(&R) -> i32,
        set: fn(&mut R, i32),
    },
    Float {
        get: fn(&R) -> f32,
        set: fn(&mut R, f32),
    },
    Str {
        get: fn(&R) -> String,
        set: fn(&mut R, String),
    },
}

// Manual impls: a derive would require `R: Clone`.
impl<R> Clone for Accessor<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Accessor<R> {}

impl<R> Accessor<R> {
    pub fn kind(&self) -> FieldKind {
        match self {
            Accessor::Int { .. } => FieldKind::Int,
            Accessor::Float { .. } => FieldKind::Float,
            Accessor::Str { .. } => FieldKind::Str,
        }
    }
}

/// One patchable field of a record type.
pub struct FieldAccessor<R> {
    name: String,
    accessor: Accessor<R>,
}

impl<R> FieldAccessor<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.accessor.kind()
    }

    pub fn read(&self, record: &R) -> Value {
        match self.accessor {
            Accessor::Int { get, .. } => Value::Int(get(record)),
            Accessor::Float { get, .. } => Value::Float(get(record)),
            Accessor::Str { get, .. } => Value::Str(get(record)),
        }
    }

    /// Store `value` into the field. Returns `false` on a kind mismatch.
    pub fn write(&self, record: &mut R, value: &Value) -> bool {
        match (self.accessor, value) {
            (Accessor::Int { set, .. }, Value::Int(v)) => set(record, *v),
            (Accessor::Float { set, .. }, Value::Float(v)) => set(record, *v),
            (Accessor::Str { set, .. }, Value::Str(v)) => set(record, v.clone()),
            _ => return false,
        }
        true
    }

    /// Copy this field from one record onto another.
    pub fn copy(&self, from: &R, to: &mut R) {
        match self.accessor {
            Accessor::Int { get, set } => set(to, get(from)),
            Accessor::Float { get, set } => set(to, get(from)),
            Accessor::Str { get, set } => set(to, get(from)),
        }
    }
}

/// Descriptor for one record table.
pub struct TableSchema<R> {
    name: String,
    key_field: String,
    fields: Vec<FieldAccessor<R>>,
    index: HashMap<String, usize>,
}

impl<R> fmt::Debug for TableSchema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSchema")
            .field("name", &self.name)
            .field("key_field", &self.key_field)
            .field(
                "fields",
                &self.fields.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<R> TableSchema<R> {
    pub fn builder(name: impl Into<String>, key_field: impl Into<String>) -> TableSchemaBuilder<R> {
        TableSchemaBuilder {
            name: name.into(),
            key_field: key_field.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn fields(&self) -> &[FieldAccessor<R>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldAccessor<R>> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    fn key_accessor(&self) -> &FieldAccessor<R> {
        // `build` guarantees the key field is registered.
        &self.fields[self.index[&self.key_field]]
    }

    /// Identifying key of a host record.
    pub fn key_of(&self, record: &R) -> RecordKey {
        match self.key_accessor().read(record) {
            Value::Int(v) => RecordKey::Int(v),
            Value::Str(v) => RecordKey::Str(v),
            Value::Float(_) => unreachable!("key fields are validated to be int or string"),
        }
    }

    /// Check that a hand-built partial record only names known fields with the
    /// right kinds and that its key has the key field's kind.
    pub fn validate(&self, partial: &PartialRecord) -> Result<()> {
        let key_kind = partial.key.to_value().kind();
        if key_kind != self.key_accessor().kind() {
            return Err(Error::InvalidField {
                table: self.name.clone(),
                field: self.key_field.clone(),
                reason: format!(
                    "key is {key_kind}, expected {}",
                    self.key_accessor().kind()
                ),
            });
        }

        for (name, value) in &partial.fields {
            let field = self.field(name).ok_or_else(|| Error::UnknownField {
                table: self.name.clone(),
                field: name.clone(),
            })?;
            if field.kind() != value.kind() {
                return Err(Error::InvalidField {
                    table: self.name.clone(),
                    field: name.clone(),
                    reason: format!("expected {}, found {}", field.kind(), value.kind()),
                });
            }
        }
        Ok(())
    }

    /// Decode one JSON object into a partial record.
    pub fn decode_record(
        &self,
        object: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<PartialRecord> {
        let mut key = None;
        let mut fields = BTreeMap::new();

        for (name, json) in object {
            let field = self.field(name).ok_or_else(|| Error::UnknownField {
                table: self.name.clone(),
                field: name.clone(),
            })?;
            let value = Value::decode(field.kind(), json).map_err(|reason| Error::InvalidField {
                table: self.name.clone(),
                field: name.clone(),
                reason,
            })?;

            if *name == self.key_field {
                key = RecordKey::from_value(&value);
            } else {
                fields.insert(name.clone(), value);
            }
        }

        let key = key.ok_or_else(|| Error::MissingKey {
            table: self.name.clone(),
            field: self.key_field.clone(),
        })?;
        Ok(PartialRecord { key, fields })
    }

    /// Decode a table payload.
    ///
    /// Accepts either a bare array of record objects, or an object whose first
    /// property holds that array (the shape of exported game tables:
    /// `{ "CHARACTER_TABLE": [ ... ] }`).
    pub fn decode_table(&self, json: &serde_json::Value) -> Result<Vec<PartialRecord>> {
        let malformed = |reason: &str| Error::MalformedPayload {
            table: self.name.clone(),
            reason: reason.to_string(),
        };

        let list = match json {
            serde_json::Value::Array(list) => list,
            serde_json::Value::Object(object) => object
                .values()
                .next()
                .and_then(|v| v.as_array())
                .ok_or_else(|| malformed("first property is not a list of records"))?,
            _ => return Err(malformed("expected an object or a list")),
        };

        list.iter()
            .map(|entry| {
                entry
                    .as_object()
                    .ok_or_else(|| malformed("record is not an object"))
                    .and_then(|object| self.decode_record(object))
            })
            .collect()
    }

    /// Write every field present in `partial`, plus its key, onto `record`.
    pub fn apply(&self, record: &mut R, partial: &PartialRecord) {
        self.key_accessor().write(record, &partial.key.to_value());
        for (name, value) in &partial.fields {
            match self.field(name) {
                Some(field) if field.write(record, value) => {}
                _ => tracing::warn!(
                    "Skipping field {} with mismatched kind in table {}",
                    name,
                    self.name
                ),
            }
        }
    }

    /// Copy every declared field from one record onto another, in place.
    pub fn copy_fields(&self, from: &R, to: &mut R) {
        for field in &self.fields {
            field.copy(from, to);
        }
    }

    /// A default record with only its key set.
    pub fn blank(&self, key: &RecordKey) -> R
    where
        R: Default,
    {
        let mut record = R::default();
        self.key_accessor().write(&mut record, &key.to_value());
        record
    }
}

/// Collects field accessors, then validates them in [`build`](Self::build).
pub struct TableSchemaBuilder<R> {
    name: String,
    key_field: String,
    fields: Vec<FieldAccessor<R>>,
}

impl<R> TableSchemaBuilder<R> {
    pub fn int(self, name: &str, get: fn(&R) -> i32, set: fn(&mut R, i32)) -> Self {
        self.field(name, Accessor::Int { get, set })
    }

    pub fn float(self, name: &str, get: fn(&R) -> f32, set: fn(&mut R, f32)) -> Self {
        self.field(name, Accessor::Float { get, set })
    }

    pub fn str(self, name: &str, get: fn(&R) -> String, set: fn(&mut R, String)) -> Self {
        self.field(name, Accessor::Str { get, set })
    }

    pub fn field(mut self, name: &str, accessor: Accessor<R>) -> Self {
        self.fields.push(FieldAccessor {
            name: name.to_string(),
            accessor,
        });
        self
    }

    /// Validate and freeze the schema.
    ///
    /// Fails if a field name is duplicated, if a field's name prefix does not
    /// match its declared kind, or if the key field is missing or a float.
    pub fn build(self) -> Result<TableSchema<R>> {
        let invalid = |reason: String| Error::InvalidSchema {
            table: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("table name is empty".to_string()));
        }

        let mut index = HashMap::with_capacity(self.fields.len());
        for (i, field) in self.fields.iter().enumerate() {
            match FieldKind::from_field_name(&field.name) {
                Some(kind) if kind == field.kind() => {}
                Some(kind) => {
                    return Err(invalid(format!(
                        "field '{}' is declared {} but its prefix means {}",
                        field.name,
                        field.kind(),
                        kind
                    )))
                }
                None => {
                    return Err(invalid(format!(
                        "field '{}' does not use a patchable prefix",
                        field.name
                    )))
                }
            }
            if index.insert(field.name.clone(), i).is_some() {
                return Err(invalid(format!("field '{}' is declared twice", field.name)));
            }
        }

        match index.get(&self.key_field).map(|&i| self.fields[i].kind()) {
            Some(FieldKind::Int | FieldKind::Str) => {}
            Some(FieldKind::Float) => {
                return Err(invalid(format!(
                    "key field '{}' cannot be a float",
                    self.key_field
                )))
            }
            None => {
                return Err(invalid(format!(
                    "key field '{}' is not declared",
                    self.key_field
                )))
            }
        }

        Ok(TableSchema {
            name: self.name,
            key_field: self.key_field,
            fields: self.fields,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Character {
        id: i32,
        name: String,
        speed: f32,
        flags: i32,
    }

    fn character_schema() -> TableSchema<Character> {
        TableSchema::<Character>::builder("CHARACTER_TABLE", "n_ID")
            .int("n_ID", |c| c.id, |c, v| c.id = v)
            .str("s_NAME", |c| c.name.clone(), |c, v| c.name = v)
            .float("f_SPEED", |c| c.speed, |c, v| c.speed = v)
            .int("#_FLAGS", |c| c.flags, |c, v| c.flags = v)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_rejects_prefix_mismatch() {
        let result = TableSchema::<Character>::builder("T", "n_ID")
            .int("n_ID", |c| c.id, |c, v| c.id = v)
            .int("f_SPEED", |c| c.flags, |c, v| c.flags = v)
            .build();
        assert!(matches!(result, Err(Error::InvalidSchema { .. })));
    }

    #[test]
    fn test_build_rejects_missing_or_float_key() {
        let missing = TableSchema::<Character>::builder("T", "n_ID")
            .str("s_NAME", |c| c.name.clone(), |c, v| c.name = v)
            .build();
        assert!(missing.is_err());

        let float = TableSchema::<Character>::builder("T", "f_SPEED")
            .float("f_SPEED", |c| c.speed, |c, v| c.speed = v)
            .build();
        assert!(float.is_err());
    }

    #[test]
    fn test_build_rejects_duplicates_and_unpatchable() {
        let dup = TableSchema::<Character>::builder("T", "n_ID")
            .int("n_ID", |c| c.id, |c, v| c.id = v)
            .int("n_ID", |c| c.id, |c, v| c.id = v)
            .build();
        assert!(dup.is_err());

        let unpatchable = TableSchema::<Character>::builder("T", "n_ID")
            .int("n_ID", |c| c.id, |c, v| c.id = v)
            .int("Count", |c| c.flags, |c, v| c.flags = v)
            .build();
        assert!(unpatchable.is_err());
    }

    #[test]
    fn test_decode_table_wrapped_and_bare() {
        let schema = character_schema();
        let wrapped = json!({
            "CHARACTER_TABLE": [
                { "n_ID": 1, "s_NAME": "X", "#_FLAGS": 4294967295u64 },
                { "n_ID": 2, "f_SPEED": 1.5 }
            ]
        });

        let records = schema.decode_table(&wrapped).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, RecordKey::Int(1));
        assert_eq!(records[0].fields.get("#_FLAGS"), Some(&Value::Int(-1)));
        assert!(!records[0].fields.contains_key("n_ID"));
        assert_eq!(records[1].fields.get("f_SPEED"), Some(&Value::Float(1.5)));

        let bare = json!([{ "n_ID": 3 }]);
        assert_eq!(schema.decode_table(&bare).unwrap()[0].key, RecordKey::Int(3));
    }

    #[test]
    fn test_decode_errors() {
        let schema = character_schema();

        assert!(matches!(
            schema.decode_table(&json!([{ "s_NAME": "no key" }])),
            Err(Error::MissingKey { .. })
        ));
        assert!(matches!(
            schema.decode_table(&json!([{ "n_ID": 1, "s_BOGUS": "?" }])),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(
            schema.decode_table(&json!([{ "n_ID": "one" }])),
            Err(Error::InvalidField { .. })
        ));
        assert!(matches!(
            schema.decode_table(&json!({ "CHARACTER_TABLE": 5 })),
            Err(Error::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_apply_and_copy_fields() {
        let schema = character_schema();
        let mut record = schema.blank(&RecordKey::Int(9));
        assert_eq!(record.id, 9);

        schema.apply(&mut record, &PartialRecord::new(9).with("f_SPEED", 3.0f32));
        assert_eq!(record.speed, 3.0);
        assert_eq!(schema.key_of(&record), RecordKey::Int(9));

        let mut other = Character::default();
        schema.copy_fields(&record, &mut other);
        assert_eq!(other, record);
    }

    #[test]
    fn test_validate_partial() {
        let schema = character_schema();
        assert!(schema
            .validate(&PartialRecord::new(1).with("s_NAME", "ok"))
            .is_ok());
        assert!(schema
            .validate(&PartialRecord::new(1).with("s_NAME", 5))
            .is_err());
        assert!(schema.validate(&PartialRecord::new("str-key")).is_err());
        assert!(schema
            .validate(&PartialRecord::new(1).with("s_MISSING", "x"))
            .is_err());
    }
}
