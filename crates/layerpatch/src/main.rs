use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    check_mods, disable_mod, enable_mod, list_order, move_mod, resolve_mods, CheckModsArgs,
    EditOrderArgs, ListOrderArgs, ResolveModsArgs, RuleArg,
};
use miette::Result;

mod commands;
mod errors;
mod host;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The mods directory to use instead of the configured one
    #[arg(short, long, global = true)]
    mods_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List mods in load order
    Order,
    /// Load every enabled mod and print the winning override of each key
    Resolve {
        /// Only print this table
        #[arg(short, long)]
        table: Option<String>,
    },
    /// Load each mod and report content errors
    Check,
    /// Enable a mod and save the load order
    Enable {
        /// The mod id (its folder name)
        id: String,
    },
    /// Disable a mod and save the load order
    Disable {
        /// The mod id (its folder name)
        id: String,

        /// Why the mod is being disabled
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Move a mod to a new position in the load order
    Move {
        /// The mod id (its folder name)
        id: String,

        /// The new position, 0 being the first entry
        index: usize,
    },
    /// Show or edit the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Set the default mods directory
    SetModsDir { path: String },
    /// Set whether later or earlier mods in the load order win
    SetPriorityRule {
        #[arg(value_enum)]
        rule: RuleArg,
    },
    /// Reset the configuration to defaults
    Reset,
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "layerpatch=info,lp_mod_lib=info,lp_overlay=warn".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let args = parse_args();
    let mods_dir = args.mods_dir;

    match args.command {
        Commands::Order => list_order(ListOrderArgs { mods_dir }),
        Commands::Resolve { table } => resolve_mods(ResolveModsArgs { mods_dir, table }),
        Commands::Check => check_mods(CheckModsArgs { mods_dir }),
        Commands::Enable { id } => enable_mod(EditOrderArgs { mods_dir, id }),
        Commands::Disable { id, reason } => disable_mod(EditOrderArgs { mods_dir, id }, reason),
        Commands::Move { id, index } => move_mod(EditOrderArgs { mods_dir, id }, index),
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config::show_config(),
            ConfigCommands::SetModsDir { path } => commands::config::set_mods_dir(path),
            ConfigCommands::SetPriorityRule { rule } => {
                commands::config::set_priority_rule(rule.into())
            }
            ConfigCommands::Reset => commands::config::reset_config(),
        },
    }
}
