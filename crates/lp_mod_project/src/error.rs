//! Error types for reading and writing mod files.

use camino::Utf8PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A file exists but is not valid JSON for its format.
    #[error("Failed to parse {path}: {source}")]
    Json {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON, wrong shape.
    #[error("Malformed {path}: {reason}")]
    Malformed { path: Utf8PathBuf, reason: String },

    /// A `PARAMETERS.json` entry is neither an integer nor a string holding one.
    #[error("Invalid value for parameter '{name}' in {path}: {reason}")]
    InvalidParameter {
        path: Utf8PathBuf,
        name: String,
        reason: String,
    },
}
