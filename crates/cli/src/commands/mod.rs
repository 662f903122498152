pub mod alias;
pub mod duplicate;
pub mod migrate;
pub mod reindex;

use explorer_index_common::{AppSelectionError, ConfigError};
use explorer_index_core::EngineError;
use thiserror::Error;

/// Exit status for an unusable platform configuration.
pub const CONFIG_EXIT_CODE: i32 = 255;

/// Errors that abort a command before or outside the per-application loop.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Selection(#[from] AppSelectionError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to read {what}: {source}")]
    Prompt {
        what: &'static str,
        #[source]
        source: dialoguer::Error,
    },
}

impl CommandError {
    pub fn prompt(what: &'static str) -> impl FnOnce(dialoguer::Error) -> Self {
        move |source| Self::Prompt { what, source }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => CONFIG_EXIT_CODE,
            _ => 1,
        }
    }
}

pub async fn run_cli_async<F, Fut>(f: F) -> i32
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<(), CommandError>>,
{
    match f().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("❌ {err}");
            err.exit_code()
        }
    }
}
