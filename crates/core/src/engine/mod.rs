//! Search engine operations used by the pipelines.

mod opensearch;

pub use opensearch::OpenSearchClient;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;

/// One entry of an `_aliases` batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

impl AliasAction {
    pub fn add(index: &str, alias: &str) -> Self {
        Self::Add {
            index: index.to_string(),
            alias: alias.to_string(),
        }
    }

    pub fn remove(index: &str, alias: &str) -> Self {
        Self::Remove {
            index: index.to_string(),
            alias: alias.to_string(),
        }
    }
}

/// Result of a completed `_reindex` call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReindexSummary {
    /// Milliseconds spent by the engine.
    #[serde(default)]
    pub took: u64,
    /// Documents the source matched.
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub updated: u64,
    /// Set when the engine stopped before every document was processed.
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub failures: Vec<Value>,
}

impl ReindexSummary {
    /// Documents actually written into the destination.
    pub fn copied(&self) -> u64 {
        self.created + self.updated
    }
}

/// One stored document: its `_id` and `_source`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexedDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Index, alias and reindex primitives of an OpenSearch-compatible engine.
///
/// Calls are awaited one after the other; implementations do not need to be
/// shareable across tasks.
#[allow(async_fn_in_trait)]
pub trait SearchEngine {
    /// Create `index` with the given mapping document as body.
    async fn create_index(&self, index: &str, mapping: &Value) -> Result<(), EngineError>;

    async fn delete_index(&self, index: &str) -> Result<(), EngineError>;

    /// Indices an alias currently resolves to. Empty when the alias does not
    /// exist.
    async fn alias_targets(&self, alias: &str) -> Result<Vec<String>, EngineError>;

    /// Apply every action in one atomic request.
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), EngineError>;

    /// Copy every document of `source` into `dest`, waiting for completion.
    async fn reindex(&self, source: &str, dest: &str) -> Result<ReindexSummary, EngineError>;

    /// Every document of `index`, read page by page.
    async fn scan_documents(&self, index: &str) -> Result<Vec<IndexedDocument>, EngineError>;

    /// Delete one document. `routing` must match the value used at indexing.
    async fn delete_document(
        &self,
        index: &str,
        id: &str,
        routing: &str,
    ) -> Result<(), EngineError>;
}
