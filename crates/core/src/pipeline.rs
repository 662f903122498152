//! Pipeline steps and per-application run reports.

use std::fmt;

use explorer_index_common::AppId;
use tracing::{error, warn};

use crate::error::PipelineError;

/// One transition of a per-application pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    BuildMappingUrl,
    FetchMapping,
    DeleteIndex,
    CreateIndex,
    CopyData,
    SwapAlias,
    DeleteOld,
    ScanIndex,
    LookupCatalog,
    DeleteDuplicates,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::BuildMappingUrl => "build mapping url",
            Step::FetchMapping => "fetch mapping",
            Step::DeleteIndex => "delete index",
            Step::CreateIndex => "create index",
            Step::CopyData => "copy data",
            Step::SwapAlias => "swap alias",
            Step::DeleteOld => "delete old index",
            Step::ScanIndex => "scan index",
            Step::LookupCatalog => "look up catalog",
            Step::DeleteDuplicates => "delete duplicates",
        };
        f.write_str(name)
    }
}

/// Terminal state of one application's pipeline.
#[derive(Debug)]
pub enum AppOutcome {
    /// A new index was built, filled and put behind the alias.
    Rebuilt {
        new_index: String,
        copied: u64,
        previous_index: Option<String>,
        deleted_index: Option<String>,
    },
    /// The alias now points at `index`.
    AliasUpdated {
        alias: String,
        index: String,
        previous_index: Option<String>,
    },
    /// The index was dropped and created again from the mapping.
    Recreated { index: String },
    /// Documents sharing a resource were checked against the catalog.
    /// `stale_ids` are only gone from the index when `deleted` is set.
    Deduplicated {
        index: String,
        scanned: usize,
        duplicates: usize,
        stale_ids: Vec<String>,
        deleted: bool,
    },
    /// The pipeline stopped early without an error.
    Skipped {
        reason: String,
        orphan_index: Option<String>,
    },
    Failed(PipelineError),
}

impl AppOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, AppOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, AppOutcome::Skipped { .. })
    }
}

#[derive(Debug)]
pub struct AppReport {
    pub app: AppId,
    pub outcome: AppOutcome,
}

/// Outcomes of a run, in processing order.
#[derive(Debug, Default)]
pub struct RunReport {
    entries: Vec<AppReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of one application, logging failures and skips.
    pub fn record(&mut self, app: &AppId, result: Result<AppOutcome, PipelineError>) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    app = %app,
                    step = %err.step(),
                    error = %err,
                    diagnostics = err.diagnostics().as_deref().unwrap_or("-"),
                    "Pipeline failed for application."
                );
                AppOutcome::Failed(err)
            }
        };
        if let AppOutcome::Skipped { reason, .. } = &outcome {
            warn!(app = %app, %reason, "Pipeline skipped for application.");
        }
        self.entries.push(AppReport {
            app: app.clone(),
            outcome,
        });
    }

    pub fn entries(&self) -> &[AppReport] {
        &self.entries
    }

    pub fn outcome(&self, app: &AppId) -> Option<&AppOutcome> {
        self.entries
            .iter()
            .find(|entry| &entry.app == app)
            .map(|entry| &entry.outcome)
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome.is_failure())
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome.is_skipped())
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.len() - self.failed() - self.skipped()
    }
}
