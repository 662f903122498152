//! Index and alias naming rules.
//!
//! - current index: `<index-prefix><app>`
//! - rebuilt index: `<index-prefix><app>-<yyyyMMddHHmmss>`
//! - alias: `<alias-prefix>-<index-prefix><app>`

use std::fmt;

use chrono::{Local, NaiveDateTime};

use crate::apps::AppId;

/// Alias prefix used when the operator does not pick one.
pub const DEFAULT_ALIAS_PREFIX: &str = "latest";

const SUFFIX_FORMAT: &str = "%Y%m%d%H%M%S";

/// Timestamp suffix shared by every index created during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSuffix(String);

impl IndexSuffix {
    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime.format(SUFFIX_FORMAT).to_string())
    }

    /// Suffix for the current local time, one-second resolution.
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNaming {
    index_prefix: String,
    alias_prefix: String,
}

impl IndexNaming {
    pub fn new(index_prefix: impl Into<String>, alias_prefix: impl Into<String>) -> Self {
        Self {
            index_prefix: index_prefix.into(),
            alias_prefix: alias_prefix.into(),
        }
    }

    pub fn index_prefix(&self) -> &str {
        &self.index_prefix
    }

    pub fn alias_prefix(&self) -> &str {
        &self.alias_prefix
    }

    /// Name of the index (or pre-alias physical index) of an application.
    pub fn current_index(&self, app: &AppId) -> String {
        format!("{}{app}", self.index_prefix)
    }

    /// Name of the index built for an application during a run.
    pub fn new_index(&self, app: &AppId, suffix: &IndexSuffix) -> String {
        format!("{}{app}-{suffix}", self.index_prefix)
    }

    /// Stable alias the platform queries. An empty alias prefix falls back to
    /// the bare index name.
    pub fn alias(&self, app: &AppId) -> String {
        if self.alias_prefix.is_empty() {
            self.current_index(app)
        } else {
            format!("{}-{}{app}", self.alias_prefix, self.index_prefix)
        }
    }
}
