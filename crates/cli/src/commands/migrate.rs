use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use explorer_index_common::{
    AppId, DEFAULT_ALIAS_PREFIX, DEFAULT_CONF_PATH, IndexNaming, expand_worklist,
};
use explorer_index_core::{
    DEFAULT_MAPPING_BASE_URL, HttpMappingSource, MappingLocation, Migrator, OpenSearchClient,
    platform_reindex_url,
};
use tracing::info;

use crate::commands::{CommandError, run_cli_async};
use crate::common::{
    format_elapsed_ms, load_config, needs_prompt, print_report, prompt_application,
    prompt_conf_path, prompt_confirm, prompt_text, spinner,
};

#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    #[arg(
        long,
        visible_alias = "la",
        num_args = 1..,
        value_name = "APP",
        help = "Applications to recreate, or `all`. Will prompt if not provided"
    )]
    pub list_apps: Vec<String>,
    #[arg(
        long,
        visible_alias = "gb",
        default_value = "master",
        help = "Branch or tag holding the mapping files"
    )]
    pub git_branch: String,
    #[arg(
        long,
        visible_alias = "cp",
        default_value = DEFAULT_CONF_PATH,
        help = "Path to the platform configuration"
    )]
    pub conf_path: PathBuf,
    #[arg(
        long,
        visible_alias = "sc",
        help = "Do not ask whether the ingest job is disabled"
    )]
    pub skip_check: bool,
    #[arg(
        long,
        default_value = DEFAULT_MAPPING_BASE_URL,
        help = "Base URL serving `<branch>/backend/src/main/resources/es/*.json`"
    )]
    pub mapping_base_url: String,
}

pub async fn run(args: MigrateArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(mut args: MigrateArgs) -> Result<(), CommandError> {
    let interactive = needs_prompt(&args.list_apps);
    if interactive {
        args.conf_path = prompt_conf_path(&args.conf_path)?;
    }
    let config = load_config(&args.conf_path)?;
    if interactive {
        args.list_apps = vec![prompt_application(&config)?.to_string()];
        args.git_branch = prompt_text(
            "Branch or tag of the mappings",
            &args.git_branch,
            "branch",
        )?;
    }

    let requested: Vec<AppId> = args.list_apps.iter().map(AppId::new).collect();
    let worklist = expand_worklist(&requested, &config.applications)?;

    if !args.skip_check {
        wait_for_ingest_disabled()?;
    }

    let engine = OpenSearchClient::connect(&config.engine)?;
    let mappings = HttpMappingSource::new(engine.http().clone());
    // Only the index prefix matters here, aliases are left alone.
    let naming = IndexNaming::new(config.index_prefix, DEFAULT_ALIAS_PREFIX);
    let location = MappingLocation::new(args.mapping_base_url, args.git_branch);
    info!(branch = location.branch(), "Starting migration.");

    let migrator = Migrator::new(&engine, &mappings, naming, location);
    let progress = spinner(&format!("Recreating {} indices...", worklist.len()));
    let start = Instant::now();
    let report = migrator.run(&worklist).await;
    progress.finish_and_clear();

    print_report(&report);
    println!("Migration finished in {}", format_elapsed_ms(start));
    println!(
        "\nRefill the indices from the platform: {}",
        platform_reindex_url(&config.host)
    );
    Ok(())
}

fn wait_for_ingest_disabled() -> Result<(), CommandError> {
    while !prompt_confirm(
        "Has the explorer ingest job been disabled?",
        false,
        "ingest job confirmation",
    )? {
        println!("⚠️  Disable the ingest job before recreating the indices.");
    }
    Ok(())
}
