use crate::errors::CliError;
use crate::host::{build_host, resolve_mods_dir};
use crate::println_pad;
use crate::utils::config;
use colored::Colorize;
use lp_mod_lib::LoadReport;
use miette::Result;

pub struct CheckModsArgs {
    pub mods_dir: Option<String>,
}

pub fn check_mods(args: CheckModsArgs) -> Result<()> {
    let cfg = config::load_config();
    let mods_dir = resolve_mods_dir(args.mods_dir, &cfg)?;
    let mut host = build_host(mods_dir, &cfg)?;
    let reports = host.discover().map_err(CliError::from)?;

    for report in &reports {
        print_report(report);
    }
    for status in host.status().iter().filter(|s| !s.enabled) {
        println_pad!(
            "{} {} {}",
            "-".dimmed(),
            status.id.bright_cyan(),
            "(disabled, not checked)".dimmed()
        );
    }

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        return Err(CliError::CheckFailed { count: failed }.into());
    }

    println!();
    println!(
        "{}",
        format!("✓ {} mod(s) loaded cleanly", reports.len())
            .bright_green()
            .bold()
    );
    Ok(())
}

fn print_report(report: &LoadReport) {
    let mark = if report.is_ok() {
        "✓".bright_green()
    } else {
        "✗".bright_red()
    };
    println_pad!(
        "{} {} {}",
        mark,
        report.mod_id.bright_cyan().bold(),
        format!("({} entries)", report.total_applied()).dimmed()
    );
    for (kind, count) in &report.applied {
        println_pad!("     {} {}: {}", "•".bright_cyan(), kind, count);
    }
    for (kind, error) in &report.failures {
        println_pad!("     {} {}: {}", "•".bright_red(), kind, error.bright_red());
    }
}
