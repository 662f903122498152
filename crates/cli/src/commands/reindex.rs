use std::path::PathBuf;
use std::time::Instant;

use clap::{ArgAction, Args};
use explorer_index_common::{
    AppId, DEFAULT_ALIAS_PREFIX, DEFAULT_CONF_PATH, IndexNaming, IndexSuffix, expand_worklist,
};
use explorer_index_core::{
    DEFAULT_MAPPING_BASE_URL, HttpMappingSource, MappingLocation, OpenSearchClient,
    ReindexOptions, Reindexer,
};
use tracing::{debug, info};

use crate::commands::{CommandError, run_cli_async};
use crate::common::{
    format_elapsed_ms, load_config, needs_prompt, print_report, prompt_application,
    prompt_conf_path, prompt_confirm, prompt_text, spinner,
};

#[derive(Args, Debug, Clone)]
pub struct ReindexArgs {
    #[arg(
        long,
        visible_alias = "la",
        num_args = 1..,
        value_name = "APP",
        help = "Applications to rebuild, or `all`. Will prompt if not provided"
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
        visible_alias = "ap",
        default_value = DEFAULT_ALIAS_PREFIX,
        help = "Alias prefix. Empty means the alias is named like the index"
    )]
    pub alias_prefix: String,
    #[arg(
        long,
        visible_alias = "do",
        default_value_t = true,
        action = ArgAction::Set,
        value_name = "BOOL",
        help = "Delete the previous index once the alias has moved"
    )]
    pub delete_old: bool,
    #[arg(
        long,
        visible_alias = "ia",
        default_value_t = false,
        action = ArgAction::Set,
        value_name = "BOOL",
        help = "Copy from the un-aliased index `<prefix><app>` (first migration)"
    )]
    pub init_alias: bool,
    #[arg(
        long,
        default_value = DEFAULT_MAPPING_BASE_URL,
        help = "Base URL serving `<branch>/backend/src/main/resources/es/*.json`"
    )]
    pub mapping_base_url: String,
}

pub async fn run(args: ReindexArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(mut args: ReindexArgs) -> Result<(), CommandError> {
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
        args.alias_prefix = prompt_text("Alias prefix", &args.alias_prefix, "alias prefix")?;
        args.init_alias = prompt_confirm(
            "Copy from the un-aliased indices (first migration)?",
            args.init_alias,
            "init alias choice",
        )?;
        args.delete_old = prompt_confirm(
            "Delete the old indices afterwards?",
            args.delete_old,
            "delete choice",
        )?;
    }

    let requested: Vec<AppId> = args.list_apps.iter().map(AppId::new).collect();
    let worklist = expand_worklist(&requested, &config.applications)?;
    debug!(?worklist, "Resolved worklist.");

    let engine = OpenSearchClient::connect(&config.engine)?;
    let mappings = HttpMappingSource::new(engine.http().clone());
    let options = ReindexOptions {
        naming: IndexNaming::new(config.index_prefix, args.alias_prefix),
        suffix: IndexSuffix::now(),
        location: MappingLocation::new(args.mapping_base_url, args.git_branch),
        delete_old: args.delete_old,
        init_alias: args.init_alias,
    };
    info!(
        suffix = %options.suffix,
        branch = options.location.branch(),
        delete_old = options.delete_old,
        init_alias = options.init_alias,
        "Starting reindex."
    );

    let reindexer = Reindexer::new(&engine, &mappings, options);
    let progress = spinner(&format!("Rebuilding {} indices...", worklist.len()));
    let start = Instant::now();
    let report = reindexer.run(&worklist).await;
    progress.finish_and_clear();

    print_report(&report);
    println!("Reindex finished in {}", format_elapsed_ms(start));
    Ok(())
}
