//! Application identifiers and worklist expansion.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

/// Wildcard selecting every configured application.
pub const ALL_APPS: &str = "all";

/// Pseudo-application holding the folder hierarchy.
pub const FOLDER_APP: &str = "explorer";

/// A named content category whose documents live in their own index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppId(String);

impl AppId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    /// The folder-hierarchy pseudo-application.
    pub fn folder() -> Self {
        Self(FOLDER_APP.to_string())
    }

    /// The "all applications" wildcard.
    pub fn all() -> Self {
        Self(ALL_APPS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_folder(&self) -> bool {
        self.0 == FOLDER_APP
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == ALL_APPS
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for AppId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppSelectionError {
    #[error("No application selected")]
    Empty,

    #[error("Unknown application '{app}'. Known applications: {}", .known.join(", "))]
    Unknown { app: String, known: Vec<String> },
}

/// Every identifier an operator may pick: the folder pseudo-application, the
/// configured applications and the wildcard, sorted and deduplicated.
pub fn selectable_apps(configured: &[AppId]) -> Vec<AppId> {
    let mut choices: Vec<AppId> = std::iter::once(AppId::folder())
        .chain(configured.iter().cloned())
        .chain(std::iter::once(AppId::all()))
        .collect();
    choices.sort();
    choices.dedup();
    choices
}

/// Resolve the applications to process, in processing order.
///
/// When the selection contains the wildcard, the worklist is the folder
/// pseudo-application followed by the configured applications in
/// configuration order. Otherwise it is the explicit selection. In both cases
/// duplicates are dropped (first occurrence wins) and the wildcard itself is
/// never part of the result.
pub fn expand_worklist(
    requested: &[AppId],
    configured: &[AppId],
) -> Result<Vec<AppId>, AppSelectionError> {
    if requested.is_empty() {
        return Err(AppSelectionError::Empty);
    }

    let known = selectable_apps(configured);
    if let Some(unknown) = requested.iter().find(|app| !known.contains(app)) {
        return Err(AppSelectionError::Unknown {
            app: unknown.to_string(),
            known: known.iter().map(ToString::to_string).collect(),
        });
    }

    let candidates: Vec<AppId> = if requested.iter().any(AppId::is_wildcard) {
        std::iter::once(AppId::folder())
            .chain(configured.iter().cloned())
            .collect()
    } else {
        requested.to_vec()
    };

    let mut seen = HashSet::new();
    Ok(candidates
        .into_iter()
        .filter(|app| !app.is_wildcard())
        .filter(|app| seen.insert(app.clone()))
        .collect())
}
