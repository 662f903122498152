//! Shared types for the explorer index tooling
//!
//! This crate holds what every command needs before talking to the search
//! engine: the platform configuration (`entcore.conf`), application
//! identifiers and the naming rules for indices and aliases.

pub mod apps;
pub mod config;
pub mod naming;

// Re-export commonly used types
pub use apps::{ALL_APPS, AppId, AppSelectionError, FOLDER_APP, expand_worklist, selectable_apps};
pub use config::{
    ConfigError, DEFAULT_CONF_PATH, DEFAULT_INDEX_PREFIX, EngineConnection, ExplorerConfig,
    PostgresConnection,
};
pub use naming::{DEFAULT_ALIAS_PREFIX, IndexNaming, IndexSuffix};
