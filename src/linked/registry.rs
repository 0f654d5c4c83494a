//! Lazily linked models keyed by module id.

use super::{LinkedModel, LinkerConfig};
use crate::csn::CsnDocument;
use crate::error::ReflectError;
use crate::lazy::{lazified, LazyFacade, ModuleLoader};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Where a registered document comes from.
#[derive(Debug, Clone)]
enum Source {
    Document(CsnDocument),
    File(PathBuf),
}

/// Loads and links CSN documents by module id.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    sources: BTreeMap<String, Source>,
    config: LinkerConfig,
}

impl DocumentLoader {
    pub fn new(config: LinkerConfig) -> Self {
        DocumentLoader {
            sources: BTreeMap::new(),
            config,
        }
    }

    /// Register an in-memory document under `id`.
    pub fn document(mut self, id: impl Into<String>, document: CsnDocument) -> Self {
        self.sources.insert(id.into(), Source::Document(document));
        self
    }

    /// Register a CSN JSON file under `id`; it is read when first loaded.
    pub fn file(mut self, id: impl Into<String>, path: impl AsRef<Path>) -> Self {
        self.sources
            .insert(id.into(), Source::File(path.as_ref().to_path_buf()));
        self
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    fn read(&self, id: &str) -> Result<CsnDocument, ReflectError> {
        match self.sources.get(id) {
            Some(Source::Document(document)) => Ok(document.clone()),
            Some(Source::File(path)) => {
                let json = std::fs::read_to_string(path).map_err(|err| ReflectError::ModuleLoad {
                    id: id.to_string(),
                    reason: format!("{}: {}", path.display(), err),
                })?;
                Ok(CsnDocument::from_json(&json)?)
            }
            None => Err(ReflectError::UnknownKey(id.to_string())),
        }
    }
}

impl ModuleLoader for DocumentLoader {
    type Module = LinkedModel;

    fn load(&self, id: &str) -> Result<LinkedModel, ReflectError> {
        debug!(module = %id, "Linking model on first access");
        let document = self.read(id)?;
        Ok(LinkedModel::link_with(&document, &self.config)?)
    }
}

/// Facade over every registered document; each model is linked on first read.
pub fn model_registry(loader: Arc<DocumentLoader>) -> LazyFacade<LinkedModel> {
    let ids: Vec<String> = loader.ids().map(str::to_string).collect();
    lazified(loader).facade(ids.iter().map(|id| (id.clone(), id.as_str())))
}
