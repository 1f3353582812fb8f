use crate::commands::order::print_status_line;
use crate::errors::CliError;
use crate::host::{build_host, resolve_mods_dir};
use crate::utils::config;
use colored::Colorize;
use lp_mod_lib::ModHost;
use miette::Result;

pub struct EditOrderArgs {
    pub mods_dir: Option<String>,
    pub id: String,
}

fn open_host(mods_dir: Option<String>) -> Result<ModHost> {
    let cfg = config::load_config();
    let mods_dir = resolve_mods_dir(mods_dir, &cfg)?;
    let mut host = build_host(mods_dir, &cfg)?;
    host.discover().map_err(CliError::from)?;
    Ok(host)
}

fn save_and_show(host: &ModHost, id: &str) -> Result<()> {
    host.save_load_order().map_err(CliError::from)?;
    let status = host.status();
    if let Some(index) = status.iter().position(|s| s.id == id) {
        print_status_line(index, &status[index]);
    }
    println!(
        "{} {}",
        "✓ Saved".bright_green().bold(),
        host.config().load_order_path().as_str().dimmed()
    );
    Ok(())
}

pub fn enable_mod(args: EditOrderArgs) -> Result<()> {
    let mut host = open_host(args.mods_dir)?;
    if host.enable_mod(&args.id).map_err(CliError::from)?.is_none() {
        println!("{} is already enabled", args.id.bright_cyan());
    }
    save_and_show(&host, &args.id)
}

pub fn disable_mod(args: EditOrderArgs, reason: Option<String>) -> Result<()> {
    let mut host = open_host(args.mods_dir)?;
    if !host.disable_mod(&args.id, reason).map_err(CliError::from)? {
        println!("{} is already disabled", args.id.bright_cyan());
    }
    save_and_show(&host, &args.id)
}

pub fn move_mod(args: EditOrderArgs, index: usize) -> Result<()> {
    let mut host = open_host(args.mods_dir)?;
    if !host.move_mod(&args.id, index).map_err(CliError::from)? {
        println!("{} is already at that position", args.id.bright_cyan());
    }
    save_and_show(&host, &args.id)
}
