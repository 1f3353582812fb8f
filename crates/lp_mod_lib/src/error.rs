//! Error types for the mod host.

use camino::Utf8PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A mod file could not be read or has the wrong shape.
    #[error(transparent)]
    Project(#[from] lp_mod_project::Error),

    /// An override was rejected (unknown table or constant, bad record).
    #[error(transparent)]
    Overlay(#[from] lp_overlay::Error),

    /// No mod with this id was discovered.
    #[error("Unknown mod: {0}")]
    UnknownMod(String),

    #[error("Mods directory not found: {0}")]
    ModsDirNotFound(Utf8PathBuf),
}
