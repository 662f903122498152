//! Command line front end of the explorer index tooling.

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;
mod common;

pub use commands::CommandError;

const WORKSPACE_CRATES: [&str; 3] = [
    "explorer_index_common",
    "explorer_index_core",
    "explorer_index_cli",
];

#[derive(Parser, Debug)]
#[command(
    name = "explorer-index",
    version,
    about = "Maintains the search indices of the explorer 🔎"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 🔁 Rebuild indices from their mapping and swap the aliases
    Reindex(commands::reindex::ReindexArgs),
    /// 🔗 Point each alias at the current index of its application
    Alias(commands::alias::AliasArgs),
    /// 🧱 Drop and recreate indices from their mapping
    Migrate(commands::migrate::MigrateArgs),
    /// 🧹 Find documents indexed twice for one resource and drop the stale ones
    Duplicate(commands::duplicate::DuplicateArgs),
}

/// Parse `args` (program name first) and run the selected command.
/// Returns the process exit status.
pub async fn run_cli(args: Vec<String>) -> i32 {
    init_tracing();
    match Cli::try_parse_from(args) {
        Ok(cli) => match cli.command {
            Some(Commands::Reindex(args)) => commands::reindex::run(args).await,
            Some(Commands::Alias(args)) => commands::alias::run(args).await,
            Some(Commands::Migrate(args)) => commands::migrate::run(args).await,
            Some(Commands::Duplicate(args)) => commands::duplicate::run(args).await,
            None => {
                let mut cmd = Cli::command();
                let _ = cmd.print_help();
                println!();
                0
            }
        },
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    }
}

fn init_tracing() {
    // EXPLORER_INDEX_LOG: "trace", "debug", "info", "warn", "error"
    // or a full tracing filter spec like "explorer_index_core=debug,reqwest=warn"
    let filter = match std::env::var("EXPLORER_INDEX_LOG") {
        Ok(level) if is_plain_level(&level) => crate_filter(&level),
        Ok(spec) => spec,
        Err(_) => crate_filter("info"),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already initialized.");
    }
}

fn crate_filter(level: &str) -> String {
    WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn is_plain_level(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    )
}
