//! Drop and recreate each application's physical index from the mapping.
//!
//! The data is not copied: the platform has to reindex afterwards, see
//! [`platform_reindex_url`].

use explorer_index_common::{AppId, IndexNaming};
use tracing::{info, warn};

use crate::engine::SearchEngine;
use crate::error::PipelineError;
use crate::mapping::{MappingKind, MappingLocation, MappingSource};
use crate::pipeline::{AppOutcome, RunReport, Step};

#[derive(Debug)]
pub struct Migrator<'a, E, M> {
    engine: &'a E,
    mappings: &'a M,
    naming: IndexNaming,
    location: MappingLocation,
}

impl<'a, E: SearchEngine, M: MappingSource> Migrator<'a, E, M> {
    pub fn new(
        engine: &'a E,
        mappings: &'a M,
        naming: IndexNaming,
        location: MappingLocation,
    ) -> Self {
        Self {
            engine,
            mappings,
            naming,
            location,
        }
    }

    pub async fn run(&self, worklist: &[AppId]) -> RunReport {
        let mut report = RunReport::new();
        for app in worklist {
            let result = self.recreate(app).await;
            report.record(app, result);
        }
        report
    }

    pub async fn recreate(&self, app: &AppId) -> Result<AppOutcome, PipelineError> {
        let index = self.naming.current_index(app);
        let url = self
            .location
            .url_for(MappingKind::for_app(app))
            .map_err(|err| PipelineError::mapping(Step::BuildMappingUrl, err))?;
        let mapping = self
            .mappings
            .fetch(&url)
            .await
            .map_err(|err| PipelineError::mapping(Step::FetchMapping, err))?;

        if let Err(err) = self.engine.delete_index(&index).await {
            // Usually the index simply does not exist yet.
            warn!(app = %app, %index, error = %err, "Could not delete index, continuing.");
        }

        info!(app = %app, %index, %url, "Creating index.");
        self.engine
            .create_index(&index, &mapping)
            .await
            .map_err(|err| PipelineError::engine(Step::CreateIndex, err))?;
        Ok(AppOutcome::Recreated { index })
    }
}

/// Platform endpoint that refills every explorer index from the databases.
pub fn platform_reindex_url(host: &str) -> String {
    format!(
        "{}/explorer/reindex/all/all?include_old_folders=true&include_new_folders=true",
        host.trim_end_matches('/')
    )
}
