use std::path::PathBuf;

use clap::Args;
use explorer_index_common::{
    AppId, DEFAULT_ALIAS_PREFIX, DEFAULT_CONF_PATH, IndexNaming, expand_worklist,
};
use explorer_index_core::{DuplicateCleaner, OpenSearchClient, PgResourceCatalog};
use tracing::info;

use crate::commands::{CommandError, run_cli_async};
use crate::common::{
    load_config, needs_prompt, print_report, prompt_application, prompt_conf_path, prompt_confirm,
    spinner,
};

#[derive(Args, Debug, Clone)]
pub struct DuplicateArgs {
    #[arg(
        long,
        visible_alias = "la",
        num_args = 1..,
        value_name = "APP",
        help = "Applications to check, or `all`. Will prompt if not provided"
    )]
    pub list_apps: Vec<String>,
    #[arg(
        long,
        visible_alias = "cp",
        default_value = DEFAULT_CONF_PATH,
        help = "Path to the platform configuration"
    )]
    pub conf_path: PathBuf,
    #[arg(
        long,
        visible_alias = "del",
        help = "Delete the stale documents instead of only listing them"
    )]
    pub delete: bool,
}

pub async fn run(args: DuplicateArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(mut args: DuplicateArgs) -> Result<(), CommandError> {
    let interactive = needs_prompt(&args.list_apps);
    if interactive {
        args.conf_path = prompt_conf_path(&args.conf_path)?;
    }
    let config = load_config(&args.conf_path)?;
    if interactive {
        args.list_apps = vec![prompt_application(&config)?.to_string()];
        args.delete = prompt_confirm(
            "Delete the stale documents?",
            args.delete,
            "delete choice",
        )?;
    }

    let requested: Vec<AppId> = args.list_apps.iter().map(AppId::new).collect();
    let worklist = expand_worklist(&requested, &config.applications)?;
    let postgres = config.require_postgres(&args.conf_path)?.clone();

    let engine = OpenSearchClient::connect(&config.engine)?;
    let catalog = PgResourceCatalog::new(postgres);
    // Documents are read from the physical index, aliases are not involved.
    let naming = IndexNaming::new(config.index_prefix, DEFAULT_ALIAS_PREFIX);
    info!(delete = args.delete, "Starting duplicate cleanup.");

    let cleaner = DuplicateCleaner::new(&engine, &catalog, naming, args.delete);
    let progress = spinner(&format!("Scanning {} indices...", worklist.len()));
    let report = cleaner.run(&worklist).await;
    progress.finish_and_clear();

    print_report(&report);
    if !args.delete {
        println!("\nNothing was deleted. Run again with --delete to remove the stale documents.");
    }
    Ok(())
}
