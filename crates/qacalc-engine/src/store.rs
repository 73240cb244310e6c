//! Procedure store: the collaborator that resolves composite ids into
//! slug/source pairs.
//!
//! The engine only needs `lookup`; where the definitions actually live
//! (a database in the full QA system, a JSON file for the CLI) is the
//! store's business. Unknown ids are silently dropped -- the orchestrator
//! rejects the run only when nothing resolves at all.

use indexmap::IndexMap;
use std::path::Path;
use thiserror::Error;

/// Resolves composite ids to `slug -> calculation procedure source`.
pub trait ProcedureStore {
    fn lookup(&self, ids: &[String]) -> IndexMap<String, String>;
}

/// Errors loading a store from external data.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read procedure file: {0}")]
    Io(#[from] std::io::Error),

    #[error("procedure file is not a JSON object of slug -> source: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory procedure store keyed by slug.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    procedures: IndexMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Loads a store from a JSON file shaped `{"slug": "source", ...}`.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path)?;
        let procedures: IndexMap<String, String> = serde_json::from_str(&text)?;
        Ok(MemoryStore { procedures })
    }

    pub fn insert(&mut self, slug: impl Into<String>, source: impl Into<String>) {
        self.procedures.insert(slug.into(), source.into());
    }

    /// All slugs in the store, in insertion order.
    pub fn slugs(&self) -> Vec<String> {
        self.procedures.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        MemoryStore {
            procedures: iter
                .into_iter()
                .map(|(slug, source)| (slug.into(), source.into()))
                .collect(),
        }
    }
}

impl ProcedureStore for MemoryStore {
    fn lookup(&self, ids: &[String]) -> IndexMap<String, String> {
        ids.iter()
            .filter_map(|id| {
                self.procedures
                    .get(id)
                    .map(|source| (id.clone(), source.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_drops_unknown_ids() {
        let store: MemoryStore = [("a", "result = 1"), ("b", "result = 2")]
            .into_iter()
            .collect();
        let found = store.lookup(&["a".to_string(), "missing".to_string()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found["a"], "result = 1");
    }

    #[test]
    fn lookup_preserves_request_order() {
        let store: MemoryStore = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        let found = store.lookup(&["c".to_string(), "a".to_string()]);
        let slugs: Vec<&String> = found.keys().collect();
        assert_eq!(slugs, vec!["c", "a"]);
    }
}
