//! Cleanup of search documents indexed more than once for one resource.
//!
//! Documents are grouped by `<application>_<assetId>`. For every group with
//! more than one document the resource catalog names the document to keep;
//! the others are stale. Groups the catalog does not know are left alone.

use std::collections::{BTreeMap, BTreeSet};

use explorer_index_common::{AppId, IndexNaming};
use tracing::{debug, info, warn};

use crate::catalog::{ResourceCatalog, resource_key};
use crate::engine::{IndexedDocument, SearchEngine};
use crate::error::PipelineError;
use crate::pipeline::{AppOutcome, RunReport, Step};

#[derive(Debug, Default)]
struct ResourceGroup {
    ent_id: String,
    ids: Vec<String>,
}

#[derive(Debug)]
pub struct DuplicateCleaner<'a, E, C> {
    engine: &'a E,
    catalog: &'a C,
    naming: IndexNaming,
    /// Without it the stale documents are only reported.
    delete: bool,
}

impl<'a, E: SearchEngine, C: ResourceCatalog> DuplicateCleaner<'a, E, C> {
    pub fn new(engine: &'a E, catalog: &'a C, naming: IndexNaming, delete: bool) -> Self {
        Self {
            engine,
            catalog,
            naming,
            delete,
        }
    }

    pub async fn run(&self, worklist: &[AppId]) -> RunReport {
        let mut report = RunReport::new();
        for app in worklist {
            let result = if app.is_folder() {
                Ok(AppOutcome::Skipped {
                    reason: "folders have no catalog entry".to_string(),
                    orphan_index: None,
                })
            } else {
                info!(app = %app, delete = self.delete, "Looking for duplicate documents.");
                self.clean(app).await
            };
            report.record(app, result);
        }
        report
    }

    pub async fn clean(&self, app: &AppId) -> Result<AppOutcome, PipelineError> {
        let index = self.naming.current_index(app);
        let documents = self
            .engine
            .scan_documents(&index)
            .await
            .map_err(|err| PipelineError::engine(Step::ScanIndex, err))?;
        let scanned = documents.len();

        let groups = group_by_resource(documents);
        let duplicated: Vec<(&String, &ResourceGroup)> = groups
            .iter()
            .filter(|(_, group)| group.ids.len() > 1)
            .collect();
        for (key, group) in &duplicated {
            info!(app = %app, %key, ent_id = %group.ent_id, ids = ?group.ids, "Duplicate documents.");
        }

        let ent_ids: Vec<String> = duplicated
            .iter()
            .map(|(_, group)| group.ent_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let canonical = self
            .catalog
            .canonical_ids(&ent_ids)
            .await
            .map_err(|err| PipelineError::catalog(Step::LookupCatalog, err))?;

        let mut stale_ids = Vec::new();
        for (key, group) in &duplicated {
            let Some(keep) = canonical.get(*key) else {
                warn!(app = %app, %key, "Duplicate documents without catalog entry, kept.");
                continue;
            };
            for id in group.ids.iter().filter(|id| *id != keep) {
                info!(app = %app, %key, %id, %keep, "Stale document.");
                stale_ids.push(id.clone());
            }
        }

        if self.delete {
            for id in &stale_ids {
                self.engine
                    .delete_document(&index, id, app.as_str())
                    .await
                    .map_err(|err| PipelineError::engine(Step::DeleteDuplicates, err))?;
            }
            info!(app = %app, %index, deleted = stale_ids.len(), "Stale documents deleted.");
        } else if !stale_ids.is_empty() {
            info!(app = %app, %index, stale = stale_ids.len(), "Dry run, stale documents kept.");
        }

        Ok(AppOutcome::Deduplicated {
            index,
            scanned,
            duplicates: duplicated.len(),
            stale_ids,
            deleted: self.delete,
        })
    }
}

fn group_by_resource(documents: Vec<IndexedDocument>) -> BTreeMap<String, ResourceGroup> {
    let mut groups: BTreeMap<String, ResourceGroup> = BTreeMap::new();
    for document in documents {
        let application = document.source["application"].as_str();
        let ent_id = document.source["assetId"].as_str();
        let (Some(application), Some(ent_id)) = (application, ent_id) else {
            debug!(id = %document.id, "Document without application or assetId, ignored.");
            continue;
        };
        let group = groups
            .entry(resource_key(application, ent_id))
            .or_insert_with(|| ResourceGroup {
                ent_id: ent_id.to_string(),
                ids: Vec::new(),
            });
        if !group.ids.contains(&document.id) {
            group.ids.push(document.id);
        }
    }
    groups
}
