//! Index rebuild and alias maintenance for the explorer search indices
//!
//! Every command works application by application: it resolves a worklist,
//! runs a short pipeline of typed [`pipeline::Step`]s against the search engine
//! for each application and records one [`pipeline::AppOutcome`] per
//! application. A failing application never stops the run.
//!
//! The duplicate cleanup also reads the resource catalog of the platform
//! database, see [`catalog`].

pub mod alias;
pub mod bootstrap;
pub mod catalog;
pub mod duplicate;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod migrate;
pub mod pipeline;
pub mod reindex;

#[cfg(test)]
pub(crate) mod testing;

pub use alias::{resolve_alias, retarget_alias};
pub use bootstrap::AliasBootstrap;
pub use catalog::{PgResourceCatalog, ResourceCatalog, resource_key};
pub use duplicate::DuplicateCleaner;
pub use engine::{AliasAction, IndexedDocument, OpenSearchClient, ReindexSummary, SearchEngine};
pub use error::{CatalogError, EngineError, MappingError, PipelineError};
pub use mapping::{
    DEFAULT_MAPPING_BASE_URL, HttpMappingSource, MappingKind, MappingLocation, MappingSource,
};
pub use migrate::{Migrator, platform_reindex_url};
pub use pipeline::{AppOutcome, AppReport, RunReport, Step};
pub use reindex::{ReindexOptions, Reindexer};
