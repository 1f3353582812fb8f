use crate::commands::rule_label;
use crate::errors::CliError;
use crate::utils::config::{self, AppConfig};
use camino::Utf8PathBuf;
use colored::Colorize;
use lp_overlay::PriorityRule;
use miette::Result;

fn update_config(update: impl FnOnce(&mut AppConfig)) -> Result<()> {
    let mut cfg = config::load_config();
    update(&mut cfg);
    config::save_config(&cfg).map_err(|e| CliError::config_error(e).into())
}

/// Print a config path entry with status indicator
fn print_path_config(name: &str, path: Option<&Utf8PathBuf>) {
    match path {
        Some(p) => {
            let status = if p.is_dir() {
                "✓".bright_green()
            } else {
                "✗".bright_red()
            };
            println!("  {} {} {}", format!("{}:", name).bright_white(), p, status);
        }
        None => {
            println!(
                "  {} {}",
                format!("{}:", name).bright_white(),
                "(not set)".bright_yellow()
            );
        }
    }
}

pub fn show_config() -> Result<()> {
    let cfg = config::load_config();
    let config_path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    println!();
    println!("  {} {}", "config_file:".bright_white(), config_path);
    print_path_config("mods_dir", cfg.mods_dir.as_ref());
    println!(
        "  {} {}",
        "priority_rule:".bright_white(),
        rule_label(cfg.priority_rule)
    );
    println!();
    Ok(())
}

pub fn set_mods_dir(path: String) -> Result<()> {
    let path = Utf8PathBuf::from(&path);
    if !path.is_dir() {
        eprintln!(
            "  {}",
            "The path must point to the folder that holds one folder per mod.".bright_yellow()
        );
        return Err(CliError::mods_dir_not_found(path).into());
    }

    update_config(|cfg| cfg.mods_dir = Some(path.clone()))?;

    println!(
        "{}",
        "✓ Mods directory set successfully!".bright_green().bold()
    );
    println!();
    println!(
        "  {} {}",
        "Path:".bright_white().bold(),
        path.as_str().bright_green()
    );
    Ok(())
}

pub fn set_priority_rule(rule: PriorityRule) -> Result<()> {
    update_config(|cfg| cfg.priority_rule = rule)?;
    println!(
        "{} {}",
        "✓ Priority rule set to".bright_green().bold(),
        rule_label(rule).bright_green()
    );
    Ok(())
}

pub fn reset_config() -> Result<()> {
    let config_path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    config::save_config(&AppConfig::default()).map_err(CliError::config_error)?;

    println!(
        "{}",
        "✓ Configuration reset to defaults".bright_green().bold()
    );
    println!();
    println!("  {} {}", "Config file:".bright_white().bold(), config_path);
    println!();
    println!(
        "  {}",
        "Run 'layerpatch config set-mods-dir <path>' to choose your mods folder".bright_cyan()
    );
    Ok(())
}
