//! In-memory search engine and mapping source for pipeline tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Value, json};
use url::Url;

use crate::catalog::ResourceCatalog;
use crate::engine::{AliasAction, IndexedDocument, ReindexSummary, SearchEngine};
use crate::error::{CatalogError, EngineError, MappingError};
use crate::mapping::MappingSource;

#[derive(Debug, Default)]
struct State {
    /// Index name to document count.
    indices: BTreeMap<String, u64>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    /// Alias targets observed after every alias mutation.
    alias_history: Vec<(String, BTreeSet<String>)>,
    alias_batches: usize,
    fail_reindex_into: Vec<String>,
    reindex_failures_into: Vec<String>,
    timed_out_reindex_into: Vec<String>,
    documents: BTreeMap<String, Vec<IndexedDocument>>,
    calls: Vec<String>,
}

/// Engine fake with the alias semantics of OpenSearch: batches apply
/// atomically and deleting an index drops its aliases.
#[derive(Debug, Default)]
pub(crate) struct InMemoryEngine {
    state: RefCell<State>,
}

fn rejected(operation: &'static str, status: u16, kind: &str) -> EngineError {
    EngineError::Status {
        operation,
        status,
        body: json!({ "error": { "type": kind }, "status": status }),
    }
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(self, index: &str, docs: u64) -> Self {
        self.state.borrow_mut().indices.insert(index.to_string(), docs);
        self
    }

    pub fn with_alias(self, alias: &str, index: &str) -> Self {
        self.state
            .borrow_mut()
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
        self
    }

    /// Make every reindex whose destination contains `needle` fail.
    pub fn failing_reindex_into(self, needle: &str) -> Self {
        self.state
            .borrow_mut()
            .fail_reindex_into
            .push(needle.to_string());
        self
    }

    /// Make reindex into `needle` succeed with per-document failures.
    pub fn partial_reindex_into(self, needle: &str) -> Self {
        self.state
            .borrow_mut()
            .reindex_failures_into
            .push(needle.to_string());
        self
    }

    /// Make reindex into `needle` stop half way and report a timeout.
    pub fn timing_out_reindex_into(self, needle: &str) -> Self {
        self.state
            .borrow_mut()
            .timed_out_reindex_into
            .push(needle.to_string());
        self
    }

    /// Store a document in `index` for scans, creating the index if needed.
    pub fn with_document(self, index: &str, id: &str, source: Value) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let docs = state.documents.entry(index.to_string()).or_default();
            docs.push(IndexedDocument {
                id: id.to_string(),
                source,
            });
            let count = docs.len() as u64;
            state.indices.insert(index.to_string(), count);
        }
        self
    }

    pub fn document_ids(&self, index: &str) -> Vec<String> {
        self.state
            .borrow()
            .documents
            .get(index)
            .map(|docs| docs.iter().map(|doc| doc.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.state.borrow().indices.contains_key(index)
    }

    pub fn docs(&self, index: &str) -> Option<u64> {
        self.state.borrow().indices.get(index).copied()
    }

    pub fn indices(&self) -> Vec<String> {
        self.state.borrow().indices.keys().cloned().collect()
    }

    pub fn targets(&self, alias: &str) -> Vec<String> {
        self.state
            .borrow()
            .aliases
            .get(alias)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn alias_history(&self, alias: &str) -> Vec<BTreeSet<String>> {
        self.state
            .borrow()
            .alias_history
            .iter()
            .filter(|(name, _)| name == alias)
            .map(|(_, targets)| targets.clone())
            .collect()
    }

    pub fn alias_batches(&self) -> usize {
        self.state.borrow().alias_batches
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    fn snapshot(state: &mut State, alias: &str) {
        let targets = state.aliases.get(alias).cloned().unwrap_or_default();
        state.alias_history.push((alias.to_string(), targets));
    }
}

impl SearchEngine for InMemoryEngine {
    async fn create_index(&self, index: &str, _mapping: &Value) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("create {index}"));
        if state.indices.contains_key(index) || state.aliases.contains_key(index) {
            return Err(rejected(
                "create index",
                400,
                "resource_already_exists_exception",
            ));
        }
        state.indices.insert(index.to_string(), 0);
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("delete {index}"));
        if state.indices.remove(index).is_none() {
            return Err(rejected("delete index", 404, "index_not_found_exception"));
        }
        let touched: Vec<String> = state
            .aliases
            .iter_mut()
            .filter_map(|(alias, targets)| targets.remove(index).then(|| alias.clone()))
            .collect();
        for alias in touched {
            if state.aliases.get(&alias).is_some_and(BTreeSet::is_empty) {
                state.aliases.remove(&alias);
            }
            Self::snapshot(&mut state, &alias);
        }
        Ok(())
    }

    async fn alias_targets(&self, alias: &str) -> Result<Vec<String>, EngineError> {
        Ok(self.targets(alias))
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("aliases {}", actions.len()));
        for action in actions {
            match action {
                AliasAction::Add { index, .. } if !state.indices.contains_key(index) => {
                    return Err(rejected("update aliases", 404, "index_not_found_exception"));
                }
                AliasAction::Add { alias, .. } if state.indices.contains_key(alias) => {
                    return Err(rejected("update aliases", 400, "invalid_alias_name_exception"));
                }
                AliasAction::Remove { index, alias }
                    if !state.aliases.get(alias).is_some_and(|t| t.contains(index)) =>
                {
                    return Err(rejected("update aliases", 404, "aliases_not_found_exception"));
                }
                _ => {}
            }
        }
        let mut touched = BTreeSet::new();
        for action in actions {
            match action {
                AliasAction::Add { index, alias } => {
                    state
                        .aliases
                        .entry(alias.clone())
                        .or_default()
                        .insert(index.clone());
                    touched.insert(alias.clone());
                }
                AliasAction::Remove { index, alias } => {
                    if let Some(targets) = state.aliases.get_mut(alias) {
                        targets.remove(index);
                    }
                    touched.insert(alias.clone());
                }
            }
        }
        for alias in touched {
            if state.aliases.get(&alias).is_some_and(BTreeSet::is_empty) {
                state.aliases.remove(&alias);
            }
            Self::snapshot(&mut state, &alias);
        }
        state.alias_batches += 1;
        Ok(())
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<ReindexSummary, EngineError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("reindex {source} -> {dest}"));
        if state.fail_reindex_into.iter().any(|needle| dest.contains(needle)) {
            return Err(rejected("reindex", 500, "search_phase_execution_exception"));
        }
        let Some(docs) = state.indices.get(source).copied() else {
            return Err(rejected("reindex", 404, "index_not_found_exception"));
        };
        if !state.indices.contains_key(dest) {
            return Err(rejected("reindex", 404, "index_not_found_exception"));
        }
        let failures = if state
            .reindex_failures_into
            .iter()
            .any(|needle| dest.contains(needle))
        {
            vec![json!({ "index": dest, "id": "1", "cause": { "type": "mapper_parsing_exception" } })]
        } else {
            Vec::new()
        };
        let timed_out = state
            .timed_out_reindex_into
            .iter()
            .any(|needle| dest.contains(needle));
        let created = if timed_out { docs / 2 } else { docs };
        state.indices.insert(dest.to_string(), created);
        Ok(ReindexSummary {
            took: 7,
            total: docs,
            created,
            updated: 0,
            timed_out,
            failures,
        })
    }

    async fn scan_documents(&self, index: &str) -> Result<Vec<IndexedDocument>, EngineError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("scan {index}"));
        if !state.indices.contains_key(index) {
            return Err(rejected("scan documents", 404, "index_not_found_exception"));
        }
        Ok(state.documents.get(index).cloned().unwrap_or_default())
    }

    async fn delete_document(
        &self,
        index: &str,
        id: &str,
        routing: &str,
    ) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state
            .calls
            .push(format!("delete doc {index}/{id} routing {routing}"));
        let Some(docs) = state.documents.get_mut(index) else {
            return Err(rejected("delete document", 404, "index_not_found_exception"));
        };
        let Some(position) = docs.iter().position(|doc| doc.id == id) else {
            return Err(rejected("delete document", 404, "not_found"));
        };
        docs.remove(position);
        let count = docs.len() as u64;
        state.indices.insert(index.to_string(), count);
        Ok(())
    }
}

/// Mapping source serving one document per file name.
#[derive(Debug, Default)]
pub(crate) struct StaticMappings {
    fetched: RefCell<Vec<String>>,
    missing: Vec<String>,
}

impl StaticMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer 404 for URLs containing `needle`.
    pub fn missing(mut self, needle: &str) -> Self {
        self.missing.push(needle.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl MappingSource for StaticMappings {
    async fn fetch(&self, url: &Url) -> Result<Value, MappingError> {
        self.fetched.borrow_mut().push(url.to_string());
        if self.missing.iter().any(|needle| url.as_str().contains(needle)) {
            return Err(MappingError::Unavailable {
                url: url.to_string(),
                status: 404,
            });
        }
        let file = url.path_segments().and_then(|mut s| s.next_back()).unwrap_or_default();
        Ok(json!({ "mappings": { "_meta": { "file": file } } }))
    }
}

/// Resource table keyed like the catalog lookup, `<application>_<ent_id>`.
#[derive(Debug, Default)]
pub(crate) struct StaticCatalog {
    rows: HashMap<String, String>,
    lookups: RefCell<Vec<Vec<String>>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, application: &str, ent_id: &str, id: &str) -> Self {
        self.rows
            .insert(format!("{application}_{ent_id}"), id.to_string());
        self
    }

    pub fn lookups(&self) -> Vec<Vec<String>> {
        self.lookups.borrow().clone()
    }
}

impl ResourceCatalog for StaticCatalog {
    async fn canonical_ids(
        &self,
        ent_ids: &[String],
    ) -> Result<HashMap<String, String>, CatalogError> {
        self.lookups.borrow_mut().push(ent_ids.to_vec());
        Ok(self
            .rows
            .iter()
            .filter(|(key, _)| {
                ent_ids
                    .iter()
                    .any(|ent_id| key.ends_with(&format!("_{ent_id}")))
            })
            .map(|(key, id)| (key.clone(), id.clone()))
            .collect())
    }
}
