//! Console helpers shared by the commands: prompts, spinner and reports.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use dialoguer::{Confirm, Input, Select};
use explorer_index_common::{AppId, ExplorerConfig};
use explorer_index_core::{AppOutcome, RunReport};
use indicatif::{ProgressBar, ProgressStyle};

use crate::commands::CommandError;

pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());
    spinner
}

pub fn format_elapsed_ms(start: Instant) -> String {
    format_duration(start.elapsed())
}

fn format_duration(elapsed: Duration) -> String {
    if elapsed.as_secs() == 0 {
        return format!("{}ms", elapsed.as_millis());
    }
    let seconds = elapsed.as_secs();
    let remaining_ms = elapsed.subsec_millis();
    format!("{seconds}s {remaining_ms}ms")
}

/// Prompts only run when no application was given on the command line.
pub fn needs_prompt(list_apps: &[String]) -> bool {
    list_apps.is_empty()
}

pub fn load_config(path: &Path) -> Result<ExplorerConfig, CommandError> {
    Ok(ExplorerConfig::load(path)?)
}

pub fn prompt_conf_path(default: &Path) -> Result<PathBuf, CommandError> {
    let path = Input::<String>::new()
        .with_prompt("Path to the platform configuration")
        .default(default.display().to_string())
        .interact_text()
        .map_err(CommandError::prompt("configuration path"))?;
    Ok(PathBuf::from(path))
}

pub fn prompt_application(config: &ExplorerConfig) -> Result<AppId, CommandError> {
    let choices = config.app_choices();
    let default_idx = choices.iter().position(AppId::is_wildcard).unwrap_or(0);
    let selection = Select::new()
        .with_prompt("Which application?")
        .items(&choices)
        .default(default_idx)
        .interact()
        .map_err(CommandError::prompt("application"))?;
    Ok(choices.get(selection).cloned().unwrap_or_else(AppId::all))
}

pub fn prompt_text(
    prompt: &str,
    default: &str,
    what: &'static str,
) -> Result<String, CommandError> {
    Input::<String>::new()
        .with_prompt(prompt)
        .default(default.to_string())
        .allow_empty(true)
        .interact_text()
        .map_err(CommandError::prompt(what))
}

pub fn prompt_confirm(prompt: &str, default: bool, what: &'static str) -> Result<bool, CommandError> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(CommandError::prompt(what))
}

/// Print one line per application, then the totals.
pub fn print_report(report: &RunReport) {
    println!();
    for entry in report.entries() {
        println!("{}", outcome_line(&entry.app, &entry.outcome));
    }
    println!(
        "\n{} succeeded, {} skipped, {} failed",
        report.succeeded(),
        report.skipped(),
        report.failed()
    );
}

fn outcome_line(app: &AppId, outcome: &AppOutcome) -> String {
    match outcome {
        AppOutcome::Rebuilt {
            new_index,
            copied,
            previous_index,
            deleted_index,
        } => {
            let mut line = format!("✅ {app}: {new_index} ({copied} documents copied");
            match (previous_index, deleted_index) {
                (_, Some(deleted)) => line.push_str(&format!(", {deleted} deleted)")),
                (Some(previous), None) => line.push_str(&format!(", {previous} kept)")),
                (None, None) => line.push(')'),
            }
            line
        }
        AppOutcome::AliasUpdated {
            alias,
            index,
            previous_index: Some(previous),
        } => format!("✅ {app}: {alias} -> {index} (was {previous})"),
        AppOutcome::AliasUpdated { alias, index, .. } => format!("✅ {app}: {alias} -> {index}"),
        AppOutcome::Recreated { index } => format!("✅ {app}: {index} recreated"),
        AppOutcome::Deduplicated {
            index,
            scanned,
            duplicates,
            stale_ids,
            deleted,
        } => {
            let action = if *deleted { "deleted" } else { "to delete" };
            format!(
                "✅ {app}: {index} ({scanned} documents, {duplicates} duplicated resources, {} stale {action})",
                stale_ids.len()
            )
        }
        AppOutcome::Skipped {
            reason,
            orphan_index: Some(orphan),
        } => format!("⚠️  {app}: skipped, {reason} ({orphan} left without alias)"),
        AppOutcome::Skipped { reason, .. } => format!("⚠️  {app}: skipped, {reason}"),
        AppOutcome::Failed(err) => format!("❌ {app}: {err}"),
    }
}
