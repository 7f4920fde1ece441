//! Prefix table: expansion of prefixed names and compaction for display.

use std::collections::BTreeMap;

use crate::{FactDbError, Node};

#[derive(Debug, Clone, Default)]
pub struct PrefixMap {
    /// short prefix -> namespace
    prefixes: BTreeMap<String, String>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a prefix mapping.
    pub fn register(&mut self, short: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(short.into(), namespace.into());
    }

    pub fn namespace(&self, short: &str) -> Option<&str> {
        self.prefixes.get(short).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Expand `prefix:local` into a full IRI.
    pub fn expand(&self, prefixed: &str) -> Result<String, FactDbError> {
        let Some((prefix, local)) = prefixed.split_once(':') else {
            return Err(FactDbError::NotPrefixed(prefixed.to_string()));
        };
        let Some(namespace) = self.prefixes.get(prefix) else {
            return Err(FactDbError::UnknownPrefix {
                prefix: prefix.to_string(),
                name: prefixed.to_string(),
            });
        };
        Ok(format!("{namespace}{local}"))
    }

    /// Shortest recognizable display form of an IRI.
    ///
    /// Order: registered namespace (longest match) stripped, else the suffix
    /// after the last `#`, else the suffix after the last `/`, else the IRI.
    pub fn compact(&self, iri: &str) -> String {
        let best = self
            .prefixes
            .values()
            .filter(|ns| !ns.is_empty() && iri.starts_with(ns.as_str()))
            .max_by_key(|ns| ns.len());
        if let Some(ns) = best {
            return iri[ns.len()..].to_string();
        }
        if let Some((_, fragment)) = iri.rsplit_once('#') {
            return fragment.to_string();
        }
        if let Some((_, segment)) = iri.rsplit_once('/') {
            return segment.to_string();
        }
        iri.to_string()
    }

    /// Compact a node; anonymous nodes have no display form.
    pub fn compact_node(&self, node: &Node) -> String {
        match node {
            Node::Iri(iri) => self.compact(iri),
            Node::Blank(_) => String::new(),
        }
    }
}
