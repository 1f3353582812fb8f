use crate::commands::rule_label;
use crate::errors::CliError;
use crate::host::{build_host, resolve_mods_dir};
use crate::println_pad;
use crate::utils::config;
use colored::Colorize;
use lp_mod_lib::ModStatus;
use miette::Result;

pub struct ListOrderArgs {
    pub mods_dir: Option<String>,
}

pub fn list_order(args: ListOrderArgs) -> Result<()> {
    let cfg = config::load_config();
    let mods_dir = resolve_mods_dir(args.mods_dir, &cfg)?;
    let mut host = build_host(mods_dir.clone(), &cfg)?;
    host.discover().map_err(CliError::from)?;

    let status = host.status();
    println_pad!(
        "{} {} {}",
        "📂 Mods:".bright_blue().bold(),
        mods_dir.as_str().bright_cyan(),
        format!("({})", rule_label(cfg.priority_rule)).dimmed()
    );
    if status.is_empty() {
        println_pad!("   {}", "No mods found".bright_yellow());
        return Ok(());
    }

    for (index, mod_status) in status.iter().enumerate() {
        print_status_line(index, mod_status);
    }
    Ok(())
}

pub(crate) fn print_status_line(index: usize, status: &ModStatus) {
    let state = if status.enabled {
        "enabled".bright_green()
    } else {
        "disabled".bright_red()
    };
    let rank = match status.rank {
        Some(rank) => format!("rank {}", rank),
        None => "-".to_string(),
    };

    println_pad!(
        "   {:>3}. {} {} {} {}",
        index,
        status.id.bright_cyan().bold(),
        format!("({} {})", status.name, status.version).dimmed(),
        state,
        rank.dimmed()
    );
    if let Some(reason) = &status.disabled_reason {
        println_pad!("        {} {}", "reason:".bright_yellow(), reason);
    }
}
