//! Active JSON-LD context: `@vocab`, `@base` and term definitions.

use std::collections::HashMap;

use cimgraph_factdb::document::is_absolute_iri;
use serde_json::{Map, Value};
use tracing::warn;

/// How a term's string values are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeMapping {
    /// `@type: @id`: document-relative IRI reference
    Id,
    /// `@type: @vocab`: vocabulary-relative IRI reference
    Vocab,
    /// Literal with this datatype IRI
    Datatype(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    List,
    Set,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermDefinition {
    /// Expanded IRI; `None` for a term explicitly mapped to `null`
    pub id: Option<String>,
    pub type_mapping: Option<TypeMapping>,
    pub container: Option<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveContext {
    pub vocab: Option<String>,
    pub base: Option<String>,
    pub terms: HashMap<String, TermDefinition>,
}

impl ActiveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a local context on top of `self`.
    ///
    /// Accepts an object, an array of contexts (applied in order), `null`
    /// (reset) or a `{"@context": ...}` wrapper. Remote (string) contexts are
    /// not fetched.
    pub fn extend(&self, local: &Value) -> Result<ActiveContext, String> {
        match local {
            Value::Null => Ok(ActiveContext::new()),
            Value::Array(items) => {
                let mut active = self.clone();
                for item in items {
                    active = active.extend(item)?;
                }
                Ok(active)
            }
            Value::Object(map) => match map.get("@context") {
                Some(inner) => self.extend(inner),
                None => self.extend_map(map),
            },
            Value::String(url) => Err(format!("remote context `{url}` is not supported")),
            other => Err(format!("invalid @context value: {other}")),
        }
    }

    fn extend_map(&self, map: &Map<String, Value>) -> Result<ActiveContext, String> {
        let mut active = self.clone();

        if let Some(base) = map.get("@base") {
            active.base = match base {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => return Err(format!("@base must be a string, got {other}")),
            };
        }
        if let Some(vocab) = map.get("@vocab") {
            active.vocab = match vocab {
                Value::String(s) if s.is_empty() => active.base.clone(),
                Value::String(s) => Some(active.expand_iri(s, true)),
                Value::Null => None,
                other => return Err(format!("@vocab must be a string, got {other}")),
            };
        }

        // Terms may refer to each other in any order (`"cim:name"` needs `cim`,
        // which may itself be an object definition). Raw `@id`s are installed
        // first, then definitions are re-derived until none changes.
        let mut raw: Vec<(&String, &Value)> = Vec::new();
        for (key, value) in map {
            if key.starts_with('@') {
                continue;
            }
            raw.push((key, value));
            let provisional = match value {
                Value::String(id) => Some(id.as_str()),
                Value::Object(def) => def.get("@id").and_then(Value::as_str),
                _ => None,
            };
            if let Some(id) = provisional {
                active.terms.insert(
                    key.clone(),
                    TermDefinition {
                        id: Some(id.to_string()),
                        ..Default::default()
                    },
                );
            }
        }

        for _ in 0..=raw.len() {
            let mut changed = false;
            for &(key, value) in &raw {
                let def = active.term_definition(key, value)?;
                if active.terms.get(key) != Some(&def) {
                    active.terms.insert(key.clone(), def);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        Ok(active)
    }

    fn term_definition(&self, term: &str, value: &Value) -> Result<TermDefinition, String> {
        match value {
            Value::Null => Ok(TermDefinition::default()),
            Value::String(id) => Ok(TermDefinition {
                id: Some(self.expand_term_id(term, Some(id))),
                ..Default::default()
            }),
            Value::Object(def) => {
                let id = match def.get("@id") {
                    Some(Value::Null) => None,
                    Some(Value::String(id)) => Some(self.expand_term_id(term, Some(id))),
                    Some(other) => return Err(format!("@id of `{term}` must be a string, got {other}")),
                    None => Some(self.expand_term_id(term, None)),
                };
                let type_mapping = match def.get("@type") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(t)) => Some(match t.as_str() {
                        "@id" => TypeMapping::Id,
                        "@vocab" => TypeMapping::Vocab,
                        dt => TypeMapping::Datatype(self.expand_iri(dt, true)),
                    }),
                    Some(other) => {
                        return Err(format!("@type of `{term}` must be a string, got {other}"))
                    }
                };
                let container = match def.get("@container") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(c)) => container_of(term, c),
                    Some(Value::Array(cs)) => cs
                        .iter()
                        .filter_map(Value::as_str)
                        .find_map(|c| container_of(term, c)),
                    Some(other) => {
                        return Err(format!("@container of `{term}` must be a string, got {other}"))
                    }
                };
                Ok(TermDefinition {
                    id,
                    type_mapping,
                    container,
                })
            }
            other => Err(format!("invalid definition for term `{term}`: {other}")),
        }
    }

    fn expand_term_id(&self, term: &str, id: Option<&str>) -> String {
        match id {
            // A term that maps to itself would otherwise loop back to its raw form.
            Some(id) if id != term => self.expand_iri(id, true),
            _ => {
                if let Some((prefix, suffix)) = split_compact(term) {
                    if let Some(ns) = self.prefix_iri(prefix) {
                        return format!("{ns}{suffix}");
                    }
                }
                match &self.vocab {
                    Some(vocab) if !is_absolute_iri(term) => format!("{vocab}{term}"),
                    _ => term.to_string(),
                }
            }
        }
    }

    fn prefix_iri(&self, prefix: &str) -> Option<&str> {
        self.terms.get(prefix).and_then(|d| d.id.as_deref())
    }

    pub fn term(&self, key: &str) -> Option<&TermDefinition> {
        self.terms.get(key)
    }

    /// Expand a term, compact IRI or relative reference.
    ///
    /// `vocab` selects vocabulary-relative expansion (property keys, types)
    /// over document-relative expansion against `@base` (`@id` values).
    pub fn expand_iri(&self, value: &str, vocab: bool) -> String {
        if value.starts_with('@') || value.starts_with("_:") {
            return value.to_string();
        }
        if vocab {
            if let Some(def) = self.terms.get(value) {
                if let Some(id) = &def.id {
                    return id.clone();
                }
            }
        }
        if let Some((prefix, suffix)) = split_compact(value) {
            if let Some(ns) = self.prefix_iri(prefix) {
                return format!("{ns}{suffix}");
            }
        }
        if is_absolute_iri(value) {
            return value.to_string();
        }
        if vocab {
            if let Some(v) = &self.vocab {
                return format!("{v}{value}");
            }
        } else if let Some(base) = &self.base {
            return join(base, value);
        }
        value.to_string()
    }
}

fn container_of(term: &str, container: &str) -> Option<Container> {
    match container {
        "@list" => Some(Container::List),
        "@set" => Some(Container::Set),
        other => {
            warn!(term, container = other, "unsupported @container ignored");
            None
        }
    }
}

/// `prefix:suffix`, excluding `scheme://` forms and blank labels.
fn split_compact(value: &str) -> Option<(&str, &str)> {
    let (prefix, suffix) = value.split_once(':')?;
    if prefix.is_empty() || prefix == "_" || suffix.starts_with("//") {
        return None;
    }
    Some((prefix, suffix))
}

fn join(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    if relative.starts_with('#') {
        let stem = base.split_once('#').map_or(base, |(stem, _)| stem);
        return format!("{stem}{relative}");
    }
    match base.rfind('/') {
        Some(i) if !base[..i].ends_with('/') => format!("{}{}", &base[..=i], relative),
        _ => format!("{}/{}", base.trim_end_matches('/'), relative),
    }
}
