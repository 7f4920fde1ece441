//! Loading a vocabulary distribution directory into a fact graph.
//!
//! The distribution is a tree of JSON-LD fragments:
//!
//! - `*schema.jsonld`: canonical schema shapes
//! - `*concepts.jsonld`: conceptual summary (areas, groups, classes, properties)
//! - `*about.jsonld`: shared manifest, always loaded
//!
//! Fragments reference a published context that is not fetched; the local
//! copy (`src/context.jsonld`, falling back to `context.jsonld`) replaces
//! every file's `@context` before expansion.
//!
//! Besides loading a graph, the loader can frame the distribution: every
//! node of one type, merged by identifier and compacted (see [`CimLoader::frame_by_type`]).

mod context;
mod expand;
mod frame;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cimgraph_factdb::{FactDbError, FactGraph, LoadStats, NodeDocument};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

pub use context::{ActiveContext, Container, TermDefinition, TypeMapping};
pub use expand::{expand_document, ExpandError};
pub use frame::{Compactor, NodeMap};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no context document found (tried {tried:?})")]
    ContextNotFound { tried: Vec<PathBuf> },

    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to walk distribution: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid shared context: {0}")]
    Context(String),

    #[error("failed to expand {path}: {message}")]
    Expand { path: PathBuf, message: String },

    #[error(transparent)]
    Graph(#[from] FactDbError),
}

/// Which slice of the distribution to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
    /// Schema shapes only
    CanonicalSchema,
    /// Conceptual summary only
    Conceptual,
    /// Both
    #[default]
    ConceptualAndSchema,
}

impl Profile {
    pub const SCHEMA_SUFFIX: &'static str = "schema.jsonld";
    pub const CONCEPTS_SUFFIX: &'static str = "concepts.jsonld";

    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            Profile::CanonicalSchema => &[Self::SCHEMA_SUFFIX],
            Profile::Conceptual => &[Self::CONCEPTS_SUFFIX],
            Profile::ConceptualAndSchema => &[Self::SCHEMA_SUFFIX, Self::CONCEPTS_SUFFIX],
        }
    }
}

/// Options controlling distribution loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    pub profile: Profile,
    /// Context locations, relative to the root, tried in order.
    pub context_locations: Vec<PathBuf>,
    /// File-name suffix of the manifest loaded with every profile.
    pub manifest_suffix: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            context_locations: vec![
                PathBuf::from("src").join("context.jsonld"),
                PathBuf::from("context.jsonld"),
            ],
            manifest_suffix: "about.jsonld".to_string(),
        }
    }
}

impl LoadOptions {
    pub fn with_profile(profile: Profile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }
}

/// Loader for one distribution root.
#[derive(Debug, Clone)]
pub struct CimLoader {
    root: PathBuf,
    options: LoadOptions,
}

impl CimLoader {
    pub fn new(root: impl Into<PathBuf>, profile: Profile) -> Self {
        Self::with_options(root, LoadOptions::with_profile(profile))
    }

    pub fn with_options(root: impl Into<PathBuf>, options: LoadOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Whether a file belongs to the selected profile.
    pub fn must_load(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        file_name.ends_with(self.options.manifest_suffix.as_str())
            || self
                .options
                .profile
                .suffixes()
                .iter()
                .any(|s| file_name.ends_with(s))
    }

    /// Selected files, in a deterministic (sorted walk) order.
    pub fn schema_files(&self) -> Result<Vec<PathBuf>, LoadError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && self.must_load(entry.path()) {
                files.push(entry.into_path());
            }
        }
        debug!(root = %self.root.display(), files = files.len(), "selected distribution files");
        Ok(files)
    }

    /// The shared context, with a `{"@context": ...}` wrapper removed.
    pub fn load_context(&self) -> Result<Value, LoadError> {
        let mut tried = Vec::new();
        for location in &self.options.context_locations {
            let path = self.root.join(location);
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tried.push(path);
                    continue;
                }
                Err(source) => return Err(LoadError::Io { path, source }),
            };
            let json: Value = serde_json::from_str(&text)
                .map_err(|source| LoadError::Json { path: path.clone(), source })?;
            debug!(path = %path.display(), "loaded context");
            return Ok(match json {
                Value::Object(mut map) if map.len() == 1 && map.contains_key("@context") => {
                    map.remove("@context").unwrap_or(Value::Null)
                }
                other => other,
            });
        }
        Err(LoadError::ContextNotFound { tried })
    }

    /// Every selected file parsed, with its `@context` replaced by the shared one.
    pub fn json_documents(&self) -> Result<Vec<Value>, LoadError> {
        Ok(self
            .read_documents()?
            .into_iter()
            .map(|(_, json)| json)
            .collect())
    }

    /// All documents under one `@graph`.
    pub fn merged_document(&self) -> Result<Value, LoadError> {
        let mut map = Map::new();
        map.insert("@graph".to_string(), Value::Array(self.json_documents()?));
        Ok(Value::Object(map))
    }

    /// Expanded node documents, one per selected file.
    pub fn node_documents(&self) -> Result<Vec<NodeDocument>, LoadError> {
        self.read_documents()?
            .into_iter()
            .map(|(path, json)| {
                let source = path.display().to_string();
                expand_document(&json, &source).map_err(|e| LoadError::Expand {
                    path,
                    message: e.message,
                })
            })
            .collect()
    }

    /// Every node typed `type_name` (a term, compact IRI or IRI), merged
    /// across the selected files and compacted against the shared context,
    /// as `{"@context": ..., "@graph": [...]}`.
    pub fn frame_by_type(&self, type_name: &str) -> Result<Value, LoadError> {
        let context = self.load_context()?;
        let active = ActiveContext::new()
            .extend(&context)
            .map_err(LoadError::Context)?;
        let type_iri = active.expand_iri(type_name, true);

        let nodes = NodeMap::from_documents(&self.node_documents()?);
        let compactor = Compactor::new(&active);
        let graph: Vec<Value> = nodes
            .of_type(&type_iri)
            .map(|node| compactor.node(node))
            .collect();
        debug!(type_iri = %type_iri, merged = nodes.len(), framed = graph.len(), "framed distribution");

        let mut map = Map::new();
        map.insert("@context".to_string(), context);
        map.insert("@graph".to_string(), Value::Array(graph));
        Ok(Value::Object(map))
    }

    /// Load the selected slice into a fresh graph with the default prefixes.
    pub fn load_graph(&self) -> Result<FactGraph, LoadError> {
        let mut graph = FactGraph::with_default_prefixes();
        let stats = self.load_into(&mut graph)?;
        info!(
            documents = stats.documents,
            statements = stats.statements_added,
            duplicates = stats.duplicates,
            "loaded distribution"
        );
        Ok(graph)
    }

    /// Load into an existing graph. Nothing is inserted if any file fails.
    pub fn load_into(&self, graph: &mut FactGraph) -> Result<LoadStats, LoadError> {
        let docs = self.node_documents()?;
        Ok(graph.load_documents(docs)?)
    }

    fn read_documents(&self) -> Result<Vec<(PathBuf, Value)>, LoadError> {
        let context = self.load_context()?;
        self.schema_files()?
            .into_iter()
            .map(|path| {
                let json = read_document(&path, &context)?;
                Ok((path, json))
            })
            .collect()
    }
}

fn read_document(path: &Path, context: &Value) -> Result<Value, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let json: Value = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(mut map) = json else {
        return Err(LoadError::Expand {
            path: path.to_path_buf(),
            message: "top-level value must be an object".to_string(),
        });
    };
    map.insert("@context".to_string(), context.clone());
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_selection_by_suffix() {
        let schema = CimLoader::new("/tmp", Profile::CanonicalSchema);
        let concepts = CimLoader::new("/tmp", Profile::Conceptual);
        let both = CimLoader::new("/tmp", Profile::ConceptualAndSchema);

        let s = Path::new("model/Account/schema.jsonld");
        let c = Path::new("model/Account/Account.concepts.jsonld");
        let a = Path::new("about.jsonld");
        let other = Path::new("model/readme.md");

        assert!(schema.must_load(s) && !schema.must_load(c) && schema.must_load(a));
        assert!(!concepts.must_load(s) && concepts.must_load(c) && concepts.must_load(a));
        assert!(both.must_load(s) && both.must_load(c) && both.must_load(a));
        assert!(!both.must_load(other));
    }

    #[test]
    fn default_options() {
        let opts = LoadOptions::default();
        assert_eq!(opts.profile, Profile::ConceptualAndSchema);
        assert_eq!(opts.manifest_suffix, "about.jsonld");
        assert_eq!(opts.context_locations.len(), 2);
    }
}
