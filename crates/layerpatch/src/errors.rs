use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("No mods directory configured")]
    #[diagnostic(
        code(config::mods_dir_not_set),
        help("Run 'layerpatch config set-mods-dir <path>' or pass --mods-dir <path>")
    )]
    ModsDirNotSet,

    #[error("Mods directory not found: {path}")]
    #[diagnostic(
        code(config::mods_dir_not_found),
        help("Make sure the directory exists and the path is correct")
    )]
    ModsDirNotFound { path: Utf8PathBuf },

    #[error("Unknown mod: {id}")]
    #[diagnostic(
        code(mods::unknown),
        help("Run 'layerpatch order' to list the mods found in the mods directory")
    )]
    UnknownMod { id: String },

    #[error("Unknown table: {name}")]
    #[diagnostic(code(tables::unknown), help("Available tables: {available}"))]
    UnknownTable { name: String, available: String },

    #[error("{count} mod(s) failed to load cleanly")]
    #[diagnostic(
        code(mods::check_failed),
        help("Fix the files listed above, then run 'layerpatch check' again")
    )]
    CheckFailed { count: usize },

    #[error("Configuration file error")]
    #[diagnostic(
        code(config::io_error),
        help("Check that the directory next to the executable is writable")
    )]
    ConfigError {
        #[source]
        source: std::io::Error,
    },

    #[error("Mod host error")]
    #[diagnostic(code(host::error))]
    HostError {
        #[source]
        source: lp_mod_lib::Error,
    },
}

impl CliError {
    pub fn mods_dir_not_found(path: Utf8PathBuf) -> Self {
        Self::ModsDirNotFound { path }
    }

    pub fn unknown_table(name: String, available: &[&str]) -> Self {
        Self::UnknownTable {
            name,
            available: available.join(", "),
        }
    }

    pub fn config_error(source: std::io::Error) -> Self {
        Self::ConfigError { source }
    }
}

impl From<lp_mod_lib::Error> for CliError {
    fn from(source: lp_mod_lib::Error) -> Self {
        match source {
            lp_mod_lib::Error::UnknownMod(id) => Self::UnknownMod { id },
            lp_mod_lib::Error::ModsDirNotFound(path) => Self::ModsDirNotFound { path },
            source => Self::HostError { source },
        }
    }
}
