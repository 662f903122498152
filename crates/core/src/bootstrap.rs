//! Point each application's alias at its current physical index.

use explorer_index_common::{AppId, IndexNaming};
use tracing::info;

use crate::alias::retarget_alias;
use crate::engine::SearchEngine;
use crate::error::PipelineError;
use crate::pipeline::{AppOutcome, RunReport, Step};

#[derive(Debug)]
pub struct AliasBootstrap<'a, E> {
    engine: &'a E,
    naming: IndexNaming,
}

impl<'a, E: SearchEngine> AliasBootstrap<'a, E> {
    pub fn new(engine: &'a E, naming: IndexNaming) -> Self {
        Self { engine, naming }
    }

    pub async fn run(&self, worklist: &[AppId]) -> RunReport {
        let mut report = RunReport::new();
        for app in worklist {
            let result = self.bind(app).await;
            report.record(app, result);
        }
        report
    }

    pub async fn bind(&self, app: &AppId) -> Result<AppOutcome, PipelineError> {
        let alias = self.naming.alias(app);
        let index = self.naming.current_index(app);
        if alias == index {
            return Ok(AppOutcome::Skipped {
                reason: format!("alias '{alias}' has the name of the index itself"),
                orphan_index: None,
            });
        }
        info!(app = %app, %alias, %index, "Binding alias.");
        let previous_index = retarget_alias(self.engine, &alias, &index)
            .await
            .map_err(|err| PipelineError::engine(Step::SwapAlias, err))?;
        Ok(AppOutcome::AliasUpdated {
            alias,
            index,
            previous_index,
        })
    }
}
