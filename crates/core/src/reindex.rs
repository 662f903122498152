//! Index rebuild and alias swap.
//!
//! For every application: build a new index from the versioned mapping, copy
//! the documents of the index currently behind the alias into it, move the
//! alias onto the new index and optionally drop the previous one.

use std::time::Instant;

use explorer_index_common::{AppId, IndexNaming, IndexSuffix};
use tracing::{error, info};

use crate::alias::{resolve_alias, retarget_alias};
use crate::engine::SearchEngine;
use crate::error::PipelineError;
use crate::mapping::{MappingKind, MappingLocation, MappingSource};
use crate::pipeline::{AppOutcome, RunReport, Step};

#[derive(Debug, Clone)]
pub struct ReindexOptions {
    pub naming: IndexNaming,
    /// Shared by every index created during the run.
    pub suffix: IndexSuffix,
    pub location: MappingLocation,
    /// Drop the previous index once the alias has moved.
    pub delete_old: bool,
    /// Copy from the pre-alias physical index `<prefix><app>` instead of the
    /// alias target.
    pub init_alias: bool,
}

#[derive(Debug)]
pub struct Reindexer<'a, E, M> {
    engine: &'a E,
    mappings: &'a M,
    options: ReindexOptions,
}

impl<'a, E: SearchEngine, M: MappingSource> Reindexer<'a, E, M> {
    pub fn new(engine: &'a E, mappings: &'a M, options: ReindexOptions) -> Self {
        Self {
            engine,
            mappings,
            options,
        }
    }

    /// Rebuild every application of the worklist, in order. Failures are
    /// recorded and the loop moves on to the next application.
    pub async fn run(&self, worklist: &[AppId]) -> RunReport {
        let mut report = RunReport::new();
        for app in worklist {
            info!(app = %app, "Rebuilding index.");
            let result = self.rebuild(app).await;
            report.record(app, result);
        }
        report
    }

    pub async fn rebuild(&self, app: &AppId) -> Result<AppOutcome, PipelineError> {
        let naming = &self.options.naming;
        let alias = naming.alias(app);
        let new_index = naming.new_index(app, &self.options.suffix);

        let url = self
            .options
            .location
            .url_for(MappingKind::for_app(app))
            .map_err(|err| PipelineError::mapping(Step::BuildMappingUrl, err))?;

        let mapping = self
            .mappings
            .fetch(&url)
            .await
            .map_err(|err| PipelineError::mapping(Step::FetchMapping, err))?;

        // A bare alias name collides with the legacy index, which then has to go.
        let shadowed = self.options.init_alias && naming.current_index(app) == alias;
        if shadowed && !self.options.delete_old {
            return Err(PipelineError::AliasShadowedByIndex {
                step: Step::SwapAlias,
                alias,
            });
        }

        info!(app = %app, index = %new_index, %url, "Creating index.");
        self.engine
            .create_index(&new_index, &mapping)
            .await
            .map_err(|err| PipelineError::engine(Step::CreateIndex, err))?;

        let source_index = if self.options.init_alias {
            Some(naming.current_index(app))
        } else {
            resolve_alias(self.engine, &alias)
                .await
                .map_err(|err| PipelineError::engine(Step::CopyData, err))?
        };
        let Some(source_index) = source_index else {
            // Nothing to copy from. The new index stays unaliased for now.
            error!(app = %app, alias = %alias, "No index behind alias, nothing to copy.");
            return Ok(AppOutcome::Skipped {
                reason: format!("no index behind alias '{alias}'"),
                orphan_index: Some(new_index),
            });
        };

        let copied = self.copy(&source_index, &new_index).await?;

        let mut deleted_index = None;
        if shadowed {
            self.delete(&source_index).await?;
            deleted_index = Some(source_index.clone());
        }

        let previous = retarget_alias(self.engine, &alias, &new_index)
            .await
            .map_err(|err| PipelineError::engine(Step::SwapAlias, err))?;

        let previous_index = if self.options.init_alias {
            Some(source_index)
        } else {
            previous
        };

        if self.options.delete_old
            && deleted_index.is_none()
            && let Some(old) = previous_index.as_deref()
        {
            self.delete(old).await?;
            deleted_index = Some(old.to_string());
        }

        info!(app = %app, alias = %alias, index = %new_index, "Index rebuilt.");
        Ok(AppOutcome::Rebuilt {
            new_index,
            copied,
            previous_index,
            deleted_index,
        })
    }

    async fn copy(&self, source: &str, dest: &str) -> Result<u64, PipelineError> {
        info!(source, dest, "Copying documents.");
        let start = Instant::now();
        let summary = self
            .engine
            .reindex(source, dest)
            .await
            .map_err(|err| PipelineError::engine(Step::CopyData, err))?;
        if !summary.failures.is_empty() {
            return Err(PipelineError::CopyFailures {
                step: Step::CopyData,
                dest: dest.to_string(),
                failures: summary.failures,
            });
        }
        let copied = summary.copied();
        if summary.timed_out {
            return Err(PipelineError::CopyTimedOut {
                step: Step::CopyData,
                dest: dest.to_string(),
                copied,
                total: summary.total,
            });
        }
        info!(
            source,
            dest,
            took_ms = summary.took,
            elapsed_ms = start.elapsed().as_millis() as u64,
            docs = summary.total,
            copied,
            "Documents copied."
        );
        Ok(copied)
    }

    async fn delete(&self, index: &str) -> Result<(), PipelineError> {
        info!(index, "Deleting old index.");
        self.engine
            .delete_index(index)
            .await
            .map_err(|err| PipelineError::engine(Step::DeleteOld, err))
    }
}
