use crate::errors::CliError;
use crate::host::{build_host, resolve_mods_dir};
use crate::println_pad;
use crate::utils::{config, format_fields, format_owner};
use colored::Colorize;
use lp_mod_lib::ModHost;
use lp_overlay::TablePatcher;
use miette::Result;

pub struct ResolveModsArgs {
    pub mods_dir: Option<String>,
    pub table: Option<String>,
}

pub fn resolve_mods(args: ResolveModsArgs) -> Result<()> {
    let cfg = config::load_config();
    let mods_dir = resolve_mods_dir(args.mods_dir, &cfg)?;
    let mut host = build_host(mods_dir, &cfg)?;
    host.discover().map_err(CliError::from)?;

    if let Some(name) = args.table {
        let table = host
            .tables()
            .get(&name)
            .or_else(|| host.text_tables().get(&name));
        return match table {
            Some(table) => {
                print_table(table);
                Ok(())
            }
            None => {
                let mut available = host.tables().names();
                available.extend(host.text_tables().names());
                Err(CliError::unknown_table(name, &available).into())
            }
        };
    }

    for name in host.tables().names() {
        if let Some(table) = host.tables().get(name) {
            print_table(table);
        }
    }
    for name in host.text_tables().names() {
        if let Some(table) = host.text_tables().get(name) {
            print_table(table);
        }
    }
    print_constants(&host);
    print_remaps(&host);
    Ok(())
}

fn print_table(table: &dyn TablePatcher) {
    let entries = table.effective_entries();
    println_pad!(
        "{} {} {}",
        "🗂️ ".bright_blue(),
        table.name().bright_blue().bold(),
        format!("({} overridden)", entries.len()).dimmed()
    );
    for entry in entries {
        println_pad!(
            "   {}={} {} {}",
            table.key_field().bright_white(),
            entry.key.to_string().bright_cyan(),
            format_owner(&entry.owner),
            format_fields(&entry.record)
        );
    }
    println!();
}

fn print_constants(host: &ModHost) {
    let mut constants: Vec<_> = host.constants().store().effective().iter().collect();
    constants.sort_by(|a, b| a.0.cmp(b.0));

    println_pad!(
        "{} {}",
        "🔢".bright_blue(),
        "PARAMETERS".bright_blue().bold()
    );
    for (name, resolved) in constants {
        println_pad!(
            "   {} = {} {}",
            name.bright_cyan(),
            resolved.value,
            format_owner(&resolved.owner)
        );
    }
    println!();
}

fn print_remaps(host: &ModHost) {
    let mut files: Vec<_> = host.file_remaps().effective().iter().collect();
    files.sort_by(|a, b| a.0.cmp(b.0));
    println_pad!("{} {}", "📁".bright_blue(), "Files".bright_blue().bold());
    for (hash, resolved) in files {
        println_pad!(
            "   {} -> {} {}",
            hash.bright_cyan(),
            resolved.value,
            format_owner(&resolved.owner)
        );
    }
    println!();

    let mut assets: Vec<_> = host.asset_remaps().effective().iter().collect();
    assets.sort_by(|a, b| a.0.cmp(b.0));
    println_pad!("{} {}", "🎨".bright_blue(), "Assets".bright_blue().bold());
    for (from, resolved) in assets {
        println_pad!(
            "   {} -> {} {}",
            from.to_string().bright_cyan(),
            resolved.value,
            format_owner(&resolved.owner)
        );
    }
}
