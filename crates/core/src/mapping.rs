//! Mapping documents: where they live and how they are fetched.

use explorer_index_common::AppId;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::MappingError;

/// Repository root serving raw mapping files, one directory per branch or tag.
pub const DEFAULT_MAPPING_BASE_URL: &str =
    "https://raw.githubusercontent.com/opendigitaleducation/explorer";

const MAPPING_DIR: &str = "backend/src/main/resources/es";

/// Which of the two mapping shapes an application uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    Folder,
    Resource,
}

impl MappingKind {
    pub fn for_app(app: &AppId) -> Self {
        if app.is_folder() {
            MappingKind::Folder
        } else {
            MappingKind::Resource
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            MappingKind::Folder => "mappingFolder.json",
            MappingKind::Resource => "mappingResource.json",
        }
    }
}

/// Versioned location of the mapping files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingLocation {
    base: String,
    branch: String,
}

impl MappingLocation {
    pub fn new(base: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            branch: branch.into(),
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn url_for(&self, kind: MappingKind) -> Result<Url, MappingError> {
        let location = format!(
            "{}/{}/{MAPPING_DIR}/{}",
            self.base.trim_end_matches('/'),
            self.branch.trim_matches('/'),
            kind.file_name()
        );
        Url::parse(&location).map_err(|source| MappingError::InvalidLocation { location, source })
    }
}

#[allow(async_fn_in_trait)]
pub trait MappingSource {
    async fn fetch(&self, url: &Url) -> Result<Value, MappingError>;
}

/// Fetches mapping documents over HTTP. No caching, no retry.
#[derive(Debug, Clone)]
pub struct HttpMappingSource {
    http: reqwest::Client,
}

impl HttpMappingSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl MappingSource for HttpMappingSource {
    async fn fetch(&self, url: &Url) -> Result<Value, MappingError> {
        debug!(%url, "Fetching mapping.");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| MappingError::Fetch {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(MappingError::Unavailable {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.json().await.map_err(|source| MappingError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
