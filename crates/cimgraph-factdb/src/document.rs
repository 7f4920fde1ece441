//! Node documents and their bulk load into a [`FactGraph`].
//!
//! A node document is the already-expanded form of one input file: a list of
//! node objects whose property values are nested node objects, references to
//! other nodes, literals, or ordered lists. Loading flattens them:
//!
//! - a nested object without an identifier becomes a fresh blank node, linked
//!   from its parent by the property it sits under;
//! - blank labels (`_:x`) are scoped to their document, one fresh blank node
//!   per label;
//! - lists become `rdf:first` / `rdf:rest` chains ending in `rdf:nil`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::vocab::rdf;
use crate::{FactDbError, FactGraph, Literal, Node, Term};

/// Identifier of a node inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    Iri(String),
    /// Document-scoped blank label, without the `_:` prefix.
    Blank(String),
}

impl NodeRef {
    /// `_:label` becomes a blank label, anything else an IRI.
    pub fn parse(id: &str) -> Self {
        match id.strip_prefix("_:") {
            Some(label) => NodeRef::Blank(label.to_string()),
            None => NodeRef::Iri(id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeValue {
    Object(NodeObject),
    Ref(NodeRef),
    Literal(Literal),
    List(Vec<NodeValue>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeObject {
    pub id: Option<NodeRef>,
    /// (predicate IRI, values) in document order
    pub properties: Vec<(String, Vec<NodeValue>)>,
}

impl NodeObject {
    pub fn new(id: Option<NodeRef>) -> Self {
        Self {
            id,
            properties: Vec::new(),
        }
    }

    pub fn with_iri(iri: impl Into<String>) -> Self {
        Self::new(Some(NodeRef::Iri(iri.into())))
    }

    /// Append a value under a predicate, keeping predicate order stable.
    pub fn push(&mut self, predicate: impl Into<String>, value: NodeValue) {
        let predicate = predicate.into();
        match self.properties.iter_mut().find(|(p, _)| *p == predicate) {
            Some((_, values)) => values.push(value),
            None => self.properties.push((predicate, vec![value])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.properties.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Where the document came from (file path), used in errors and logs
    pub source: String,
    pub nodes: Vec<NodeObject>,
}

impl NodeDocument {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            nodes: Vec::new(),
        }
    }
}

/// Summary of a bulk load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub documents: usize,
    pub statements_added: usize,
    /// Statements that were already present
    pub duplicates: usize,
}

impl FactGraph {
    /// Flatten node documents into statements.
    ///
    /// Every document is checked before anything is inserted, so an invalid
    /// document leaves the graph untouched.
    pub fn load_documents(
        &mut self,
        docs: impl IntoIterator<Item = NodeDocument>,
    ) -> Result<LoadStats, FactDbError> {
        let docs: Vec<NodeDocument> = docs.into_iter().collect();
        for doc in &docs {
            validate_document(doc)?;
        }

        let mut stats = LoadStats::default();
        for doc in &docs {
            let before = stats;
            let mut flattener = Flattener {
                graph: self,
                labels: HashMap::new(),
                stats: &mut stats,
            };
            for node in &doc.nodes {
                flattener.object(node);
            }
            stats.documents += 1;
            debug!(
                source = %doc.source,
                added = stats.statements_added - before.statements_added,
                duplicates = stats.duplicates - before.duplicates,
                "loaded document"
            );
        }
        Ok(stats)
    }
}

struct Flattener<'g> {
    graph: &'g mut FactGraph,
    /// Blank labels of the current document
    labels: HashMap<String, Node>,
    stats: &'g mut LoadStats,
}

impl Flattener<'_> {
    fn node(&mut self, id: Option<&NodeRef>) -> Node {
        match id {
            Some(NodeRef::Iri(iri)) => Node::Iri(iri.clone()),
            Some(NodeRef::Blank(label)) => {
                if let Some(node) = self.labels.get(label) {
                    return node.clone();
                }
                let node = self.graph.fresh_blank();
                self.labels.insert(label.clone(), node.clone());
                node
            }
            None => self.graph.fresh_blank(),
        }
    }

    fn add(&mut self, subject: Node, predicate: Node, object: Term) {
        if self.graph.add_statement(subject, predicate, object) {
            self.stats.statements_added += 1;
        } else {
            self.stats.duplicates += 1;
        }
    }

    fn object(&mut self, obj: &NodeObject) -> Node {
        let subject = self.node(obj.id.as_ref());
        for (predicate, values) in &obj.properties {
            for value in values {
                let object = self.value(value);
                self.add(subject.clone(), Node::Iri(predicate.clone()), object);
            }
        }
        subject
    }

    fn value(&mut self, value: &NodeValue) -> Term {
        match value {
            NodeValue::Object(obj) => Term::Node(self.object(obj)),
            NodeValue::Ref(r) => Term::Node(self.node(Some(r))),
            NodeValue::Literal(lit) => Term::Literal(lit.clone()),
            NodeValue::List(items) => Term::Node(self.list(items)),
        }
    }

    fn list(&mut self, items: &[NodeValue]) -> Node {
        let nil = Node::iri(rdf::NIL);
        let Some(first) = items.first() else {
            return nil;
        };
        let head = self.graph.fresh_blank();
        let first = self.value(first);
        self.add(head.clone(), Node::iri(rdf::FIRST), first);

        let mut cell = head.clone();
        for item in &items[1..] {
            let next = self.graph.fresh_blank();
            self.add(cell, Node::iri(rdf::REST), Term::Node(next.clone()));
            let value = self.value(item);
            self.add(next.clone(), Node::iri(rdf::FIRST), value);
            cell = next;
        }
        self.add(cell, Node::iri(rdf::REST), Term::Node(nil));
        head
    }
}

/// `scheme:rest` with an RFC 3986 scheme.
pub fn is_absolute_iri(iri: &str) -> bool {
    let Some((scheme, _)) = iri.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn validate_document(doc: &NodeDocument) -> Result<(), FactDbError> {
    let fail = |message: String| FactDbError::Load {
        document: doc.source.clone(),
        message,
    };

    fn check_object(obj: &NodeObject) -> Result<(), String> {
        if let Some(NodeRef::Iri(iri)) = &obj.id {
            check_iri(iri)?;
        }
        for (predicate, values) in &obj.properties {
            check_iri(predicate)?;
            for value in values {
                check_value(value)?;
            }
        }
        Ok(())
    }

    fn check_value(value: &NodeValue) -> Result<(), String> {
        match value {
            NodeValue::Object(obj) => check_object(obj),
            NodeValue::Ref(NodeRef::Iri(iri)) => check_iri(iri),
            NodeValue::Ref(NodeRef::Blank(_)) | NodeValue::Literal(_) => Ok(()),
            NodeValue::List(items) => items.iter().try_for_each(check_value),
        }
    }

    fn check_iri(iri: &str) -> Result<(), String> {
        if is_absolute_iri(iri) {
            Ok(())
        } else {
            Err(format!("`{iri}` is not an absolute IRI"))
        }
    }

    doc.nodes.iter().try_for_each(check_object).map_err(fail)
}
