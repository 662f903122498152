use std::path::PathBuf;

use clap::Args;
use explorer_index_common::{
    AppId, DEFAULT_ALIAS_PREFIX, DEFAULT_CONF_PATH, IndexNaming, expand_worklist,
};
use explorer_index_core::{AliasBootstrap, OpenSearchClient};

use crate::commands::{CommandError, run_cli_async};
use crate::common::{
    load_config, needs_prompt, print_report, prompt_application, prompt_conf_path, prompt_text,
    spinner,
};

#[derive(Args, Debug, Clone)]
pub struct AliasArgs {
    #[arg(
        long,
        visible_alias = "la",
        num_args = 1..,
        value_name = "APP",
        help = "Applications to alias, or `all`. Will prompt if not provided"
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
        visible_aliases = ["ap", "pe"],
        default_value = DEFAULT_ALIAS_PREFIX,
        help = "Alias prefix"
    )]
    pub alias_prefix: String,
}

pub async fn run(args: AliasArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(mut args: AliasArgs) -> Result<(), CommandError> {
    let interactive = needs_prompt(&args.list_apps);
    if interactive {
        args.conf_path = prompt_conf_path(&args.conf_path)?;
    }
    let config = load_config(&args.conf_path)?;
    if interactive {
        args.list_apps = vec![prompt_application(&config)?.to_string()];
        args.alias_prefix = prompt_text("Alias prefix", &args.alias_prefix, "alias prefix")?;
    }

    let requested: Vec<AppId> = args.list_apps.iter().map(AppId::new).collect();
    let worklist = expand_worklist(&requested, &config.applications)?;
    let engine = OpenSearchClient::connect(&config.engine)?;

    let bootstrap = AliasBootstrap::new(
        &engine,
        IndexNaming::new(config.index_prefix, args.alias_prefix),
    );
    let progress = spinner("Updating aliases...");
    let report = bootstrap.run(&worklist).await;
    progress.finish_and_clear();

    print_report(&report);
    Ok(())
}
