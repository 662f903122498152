//! Error types for engine calls, mapping retrieval and pipelines.

use serde_json::Value;
use thiserror::Error;

use crate::pipeline::Step;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid search engine URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to build search engine client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Search engine request '{operation}' failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Search engine rejected '{operation}' with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: Value,
    },

    #[error("Unexpected search engine response for '{operation}': {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl EngineError {
    /// HTTP status returned by the engine, when it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured error payload returned by the engine.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Invalid mapping location '{location}': {source}")]
    InvalidLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to fetch mapping {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Mapping {url} returned status {status}")]
    Unavailable { url: String, status: u16 },

    #[error("Mapping {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failures of the resource catalog (`explorer.resources` in PostgreSQL).
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to set up TLS for the resource catalog: {0}")]
    Tls(#[source] rustls::Error),

    #[error("Failed to connect to the resource catalog: {0}")]
    Connect(#[source] tokio_postgres::Error),

    #[error("Resource catalog query failed: {0}")]
    Query(#[source] tokio_postgres::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{step}: {source}")]
    Mapping {
        step: Step,
        #[source]
        source: MappingError,
    },

    #[error("{step}: {source}")]
    Engine {
        step: Step,
        #[source]
        source: EngineError,
    },

    #[error("{step}: copy into '{dest}' reported {} failed documents", .failures.len())]
    CopyFailures {
        step: Step,
        dest: String,
        failures: Vec<Value>,
    },

    #[error("{step}: copy into '{dest}' timed out after {copied} of {total} documents")]
    CopyTimedOut {
        step: Step,
        dest: String,
        copied: u64,
        total: u64,
    },

    #[error(
        "{step}: alias '{alias}' is still a physical index; it must be deleted before the alias can be created"
    )]
    AliasShadowedByIndex { step: Step, alias: String },

    #[error("{step}: {source}")]
    Catalog {
        step: Step,
        #[source]
        source: CatalogError,
    },
}

impl PipelineError {
    pub fn engine(step: Step, source: EngineError) -> Self {
        Self::Engine { step, source }
    }

    pub fn mapping(step: Step, source: MappingError) -> Self {
        Self::Mapping { step, source }
    }

    pub fn catalog(step: Step, source: CatalogError) -> Self {
        Self::Catalog { step, source }
    }

    /// Pipeline step that failed.
    pub fn step(&self) -> Step {
        match self {
            Self::Mapping { step, .. }
            | Self::Engine { step, .. }
            | Self::CopyFailures { step, .. }
            | Self::CopyTimedOut { step, .. }
            | Self::AliasShadowedByIndex { step, .. }
            | Self::Catalog { step, .. } => *step,
        }
    }

    /// Engine diagnostics serialized for logging.
    pub fn diagnostics(&self) -> Option<String> {
        match self {
            Self::Engine { source, .. } => source.payload().map(Value::to_string),
            Self::CopyFailures { failures, .. } => Some(Value::Array(failures.clone()).to_string()),
            _ => None,
        }
    }
}
