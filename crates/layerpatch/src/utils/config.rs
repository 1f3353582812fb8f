//! Application configuration management utilities.

use camino::Utf8PathBuf;
use lp_overlay::PriorityRule;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;

/// Application-wide configuration stored in config.toml.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub mods_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub priority_rule: PriorityRule,
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path (config.toml).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the application configuration from config.toml.
/// Returns default configuration if file doesn't exist or cannot be parsed.
pub fn load_config() -> AppConfig {
    let Some(path) = default_config_path() else {
        return AppConfig::default();
    };
    match fs::read_to_string(&path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid config file {}: {}", path, e);
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// Saves the application configuration to config.toml.
pub fn save_config(cfg: &AppConfig) -> io::Result<()> {
    let path = default_config_path().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "Could not determine config path")
    })?;
    fs::write(&path, render_config(cfg)?)
}

fn parse_config(content: &str) -> io::Result<AppConfig> {
    toml::from_str(content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn render_config(cfg: &AppConfig) -> io::Result<String> {
    toml::to_string_pretty(cfg).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_toml() {
        let cfg = AppConfig {
            mods_dir: Some(Utf8PathBuf::from("/games/mods")),
            priority_rule: PriorityRule::EarlierWins,
        };
        let text = render_config(&cfg).unwrap();
        assert!(text.contains("priority_rule = \"earlier-wins\""));
        assert_eq!(parse_config(&text).unwrap(), cfg);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.priority_rule, PriorityRule::LaterWins);
    }

    #[test]
    fn invalid_rule_is_rejected() {
        assert!(parse_config("priority_rule = \"random\"").is_err());
    }
}
