//! Error types for overlay operations.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type. Only structural problems are errors: an unknown table or
//! constant name, a malformed record payload, or a schema that fails validation.
//! A host table being replaced underneath an overlay is recovered internally and
//! never shows up here.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while patching host tables.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A mod referenced a table that no overlay was registered for.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A mod tried to patch a constant outside the recognized set.
    #[error("Unknown constant: {0}")]
    UnknownConstant(String),

    /// A record payload named a field the table schema does not declare.
    #[error("Unknown field '{field}' in table {table}")]
    UnknownField { table: String, field: String },

    /// A record payload is missing the table's key field.
    #[error("Record for table {table} is missing key field '{field}'")]
    MissingKey { table: String, field: String },

    /// A record field value could not be decoded into the field's declared kind.
    #[error("Invalid value for field '{field}' in table {table}: {reason}")]
    InvalidField {
        table: String,
        field: String,
        reason: String,
    },

    /// The payload was not shaped like a table (object of records, list of objects).
    #[error("Malformed table payload for {table}: {reason}")]
    MalformedPayload { table: String, reason: String },

    /// A table schema failed validation when it was built.
    #[error("Invalid schema for table {table}: {reason}")]
    InvalidSchema { table: String, reason: String },
}
