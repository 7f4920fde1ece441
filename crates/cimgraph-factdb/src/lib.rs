//! cimgraph-factdb: in-memory fact graph for vocabulary models
//!
//! A fact graph is a set of subject–predicate–object statements plus a prefix
//! table used to expand prefixed names and compact IRIs for display.
//!
//! Key pieces:
//! 1. **Term Interning**: every term is stored once, statements are `u32` triples
//! 2. **Statement Indexes**: by subject, (subject, predicate), predicate and
//!    (predicate, object); lookups pick the most selective one
//! 3. **Bulk Load**: node documents (nested objects, references, lists) are
//!    flattened into statements, see [`document`]
//!
//! The graph is built once (`&mut FactGraph`) and then shared read-only by
//! every query and report.

pub mod document;
mod interner;
mod prefix;
mod term;
pub mod vocab;

use std::slice;

use ahash::{AHashMap, AHashSet};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use document::{LoadStats, NodeDocument, NodeObject, NodeRef, NodeValue};
pub use interner::{TermId, TermInterner};
pub use prefix::PrefixMap;
pub use term::{compare_terms, BlankNode, Literal, Node, Term, TypedValue};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FactDbError {
    #[error("unknown prefix `{prefix}` in `{name}`")]
    UnknownPrefix { prefix: String, name: String },

    #[error("`{0}` is not a prefixed name")]
    NotPrefixed(String),

    #[error("failed to load document `{document}`: {message}")]
    Load { document: String, message: String },
}

// ============================================================================
// Statements
// ============================================================================

/// A single fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Node,
    pub predicate: Node,
    pub object: Term,
}

impl Statement {
    pub fn new(subject: Node, predicate: Node, object: impl Into<Term>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
        }
    }
}

/// Interned statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: TermId,
    pub predicate: TermId,
    pub object: TermId,
}

// ============================================================================
// Statement Storage (Triple List with Indexes)
// ============================================================================

/// Indexed statement storage over interned terms.
#[derive(Debug, Default)]
pub struct StatementStore {
    /// All statements, in insertion order
    triples: Vec<Triple>,
    /// Set view used to collapse duplicates
    seen: AHashSet<Triple>,
    /// subject -> statement IDs
    by_subject: AHashMap<TermId, Vec<u32>>,
    /// (subject, predicate) -> statement IDs
    by_subject_predicate: AHashMap<(TermId, TermId), Vec<u32>>,
    /// predicate -> statement IDs
    by_predicate: AHashMap<TermId, RoaringBitmap>,
    /// (predicate, object) -> statement IDs
    by_predicate_object: AHashMap<(TermId, TermId), Vec<u32>>,
}

impl StatementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Add a statement; returns `false` if it was already present.
    pub fn add(&mut self, triple: Triple) -> bool {
        if !self.seen.insert(triple) {
            return false;
        }
        let id = self.triples.len() as u32;

        self.by_subject.entry(triple.subject).or_default().push(id);
        self.by_subject_predicate
            .entry((triple.subject, triple.predicate))
            .or_default()
            .push(id);
        self.by_predicate
            .entry(triple.predicate)
            .or_insert_with(RoaringBitmap::new)
            .insert(id);
        self.by_predicate_object
            .entry((triple.predicate, triple.object))
            .or_default()
            .push(id);

        self.triples.push(triple);
        true
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.seen.contains(triple)
    }

    /// Number of statements using a predicate.
    pub fn predicate_count(&self, predicate: TermId) -> usize {
        self.by_predicate
            .get(&predicate)
            .map(|ids| ids.len() as usize)
            .unwrap_or(0)
    }

    /// Statements matching the given components (`None` matches anything).
    pub fn matching(
        &self,
        subject: Option<TermId>,
        predicate: Option<TermId>,
        object: Option<TermId>,
    ) -> Matching<'_> {
        let candidates = match (subject, predicate, object) {
            (Some(s), Some(p), Some(o)) => {
                let t = Triple {
                    subject: s,
                    predicate: p,
                    object: o,
                };
                // Exact lookup: at most one candidate.
                if self.contains(&t) {
                    self.slice(self.by_subject_predicate.get(&(s, p)))
                } else {
                    self.slice(None)
                }
            }
            (Some(s), Some(p), None) => self.slice(self.by_subject_predicate.get(&(s, p))),
            (None, Some(p), Some(o)) => self.slice(self.by_predicate_object.get(&(p, o))),
            (Some(s), None, _) => self.slice(self.by_subject.get(&s)),
            (None, Some(p), None) => match self.by_predicate.get(&p) {
                Some(bitmap) => Candidates::Bitmap(bitmap.iter()),
                None => self.slice(None),
            },
            (None, None, _) => Candidates::All(0..self.triples.len() as u32),
        };
        Matching {
            store: self,
            candidates,
            subject,
            predicate,
            object,
        }
    }

    fn slice<'a>(&'a self, ids: Option<&'a Vec<u32>>) -> Candidates<'a> {
        Candidates::Slice(ids.map(|v| v.as_slice()).unwrap_or(&[]).iter())
    }

    pub fn iter(&self) -> impl Iterator<Item = Triple> + '_ {
        self.triples.iter().copied()
    }
}

enum Candidates<'a> {
    Slice(slice::Iter<'a, u32>),
    Bitmap(roaring::bitmap::Iter<'a>),
    All(std::ops::Range<u32>),
}

impl Iterator for Candidates<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        match self {
            Candidates::Slice(it) => it.next().copied(),
            Candidates::Bitmap(it) => it.next(),
            Candidates::All(it) => it.next(),
        }
    }
}

/// Lazy iterator returned by [`StatementStore::matching`].
pub struct Matching<'a> {
    store: &'a StatementStore,
    candidates: Candidates<'a>,
    subject: Option<TermId>,
    predicate: Option<TermId>,
    object: Option<TermId>,
}

impl Iterator for Matching<'_> {
    type Item = Triple;

    fn next(&mut self) -> Option<Triple> {
        for id in self.candidates.by_ref() {
            let Some(t) = self.store.triples.get(id as usize) else {
                continue;
            };
            if self.subject.is_some_and(|s| s != t.subject)
                || self.predicate.is_some_and(|p| p != t.predicate)
                || self.object.is_some_and(|o| o != t.object)
            {
                continue;
            }
            return Some(*t);
        }
        None
    }
}

// ============================================================================
// FactGraph: statements + terms + prefixes
// ============================================================================

/// The fact graph.
#[derive(Debug, Default)]
pub struct FactGraph {
    terms: TermInterner,
    store: StatementStore,
    prefixes: PrefixMap,
    /// Nodes seen in subject or object position
    nodes: Vec<TermId>,
    node_set: RoaringBitmap,
    next_blank: u32,
}

impl FactGraph {
    /// Empty graph with an empty prefix table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty graph with the vocabulary's default prefixes registered.
    pub fn with_default_prefixes() -> Self {
        let mut graph = Self::new();
        for (short, namespace) in vocab::DEFAULT_PREFIXES {
            graph.register_prefix(*short, *namespace);
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    // ------------------------------------------------------------------------
    // Build phase
    // ------------------------------------------------------------------------

    /// Allocate a new anonymous node, distinct from every other in this graph.
    pub fn fresh_blank(&mut self) -> Node {
        let blank = BlankNode::new(self.next_blank);
        self.next_blank += 1;
        Node::Blank(blank)
    }

    /// Insert a statement. Returns `true` if it was new.
    pub fn add_statement(&mut self, subject: Node, predicate: Node, object: impl Into<Term>) -> bool {
        let object = object.into();
        let s = self.terms.intern(&Term::Node(subject));
        let p = self.terms.intern(&Term::Node(predicate));
        let o_is_node = matches!(object, Term::Node(_));
        let o = self.terms.intern(&object);

        let added = self.store.add(Triple {
            subject: s,
            predicate: p,
            object: o,
        });
        if added {
            self.note_node(s);
            if o_is_node {
                self.note_node(o);
            }
        }
        added
    }

    /// Insert a statement whose components are prefixed names (`cim:Foo`).
    pub fn add_prefixed(
        &mut self,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> Result<bool, FactDbError> {
        let s = Node::Iri(self.expand(subject)?);
        let p = Node::Iri(self.expand(predicate)?);
        let o = Node::Iri(self.expand(object)?);
        Ok(self.add_statement(s, p, o))
    }

    fn note_node(&mut self, id: TermId) {
        if self.node_set.insert(id.raw()) {
            self.nodes.push(id);
        }
    }

    // ------------------------------------------------------------------------
    // Prefixes
    // ------------------------------------------------------------------------

    pub fn register_prefix(&mut self, short: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.register(short, namespace);
    }

    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    pub fn expand(&self, prefixed: &str) -> Result<String, FactDbError> {
        self.prefixes.expand(prefixed)
    }

    pub fn compact(&self, iri: &str) -> String {
        self.prefixes.compact(iri)
    }

    pub fn compact_node(&self, node: &Node) -> String {
        self.prefixes.compact_node(node)
    }

    /// Display form of any term: nodes are compacted, literals give their
    /// lexical form.
    pub fn compact_term(&self, term: &Term) -> String {
        match term {
            Term::Node(node) => self.compact_node(node),
            Term::Literal(lit) => lit.lexical.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Read phase
    // ------------------------------------------------------------------------

    /// Lazily iterate statements matching the given components.
    ///
    /// A component that never occurs in the graph matches nothing.
    pub fn statements_matching<'a>(
        &'a self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Term>,
    ) -> impl Iterator<Item = Statement> + 'a {
        let resolve_node = |n: Option<&Node>| match n {
            None => Some(None),
            Some(n) => self.node_id(n).map(Some),
        };
        let resolved = (|| {
            let s = resolve_node(subject)?;
            let p = resolve_node(predicate)?;
            let o = match object {
                None => None,
                Some(t) => Some(self.term_id(t)?),
            };
            Some((s, p, o))
        })();

        resolved
            .into_iter()
            .flat_map(move |(s, p, o)| self.store.matching(s, p, o))
            .filter_map(move |t| self.statement(t))
    }

    /// Interned lookup for the evaluator.
    pub fn matching_ids(
        &self,
        subject: Option<TermId>,
        predicate: Option<TermId>,
        object: Option<TermId>,
    ) -> Matching<'_> {
        self.store.matching(subject, predicate, object)
    }

    /// Objects of `(subject, predicate, *)`.
    pub fn objects<'a>(&'a self, subject: &Node, predicate: &Node) -> impl Iterator<Item = &'a Term> + 'a {
        let ids = self.node_id(subject).zip(self.node_id(predicate));
        ids.into_iter()
            .flat_map(move |(s, p)| self.store.matching(Some(s), Some(p), None))
            .filter_map(move |t| self.term(t.object))
    }

    /// Subjects of `(*, predicate, object)`.
    pub fn subjects<'a>(&'a self, predicate: &Node, object: &Term) -> impl Iterator<Item = &'a Node> + 'a {
        let ids = self.node_id(predicate).zip(self.term_id(object));
        ids.into_iter()
            .flat_map(move |(p, o)| self.store.matching(None, Some(p), Some(o)))
            .filter_map(move |t| self.term(t.subject).and_then(Term::as_node))
    }

    /// Every node in subject or object position, in first-seen order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.node_ids()
            .iter()
            .filter_map(|id| self.term(*id).and_then(Term::as_node))
    }

    pub fn node_ids(&self) -> &[TermId] {
        &self.nodes
    }

    /// Whether a term ID denotes a node in subject or object position.
    pub fn is_graph_node(&self, id: TermId) -> bool {
        self.node_set.contains(id.raw())
    }

    /// All statements, in insertion order.
    pub fn statements(&self) -> impl Iterator<Item = Statement> + '_ {
        self.store.iter().filter_map(|t| self.statement(t))
    }

    pub fn store(&self) -> &StatementStore {
        &self.store
    }

    pub fn term_id(&self, term: &Term) -> Option<TermId> {
        self.terms.id_of(term)
    }

    pub fn node_id(&self, node: &Node) -> Option<TermId> {
        self.terms.id_of(&Term::Node(node.clone()))
    }

    pub fn term(&self, id: TermId) -> Option<&Term> {
        self.terms.lookup(id)
    }

    fn statement(&self, t: Triple) -> Option<Statement> {
        let subject = self.term(t.subject)?.as_node()?.clone();
        let predicate = self.term(t.predicate)?.as_node()?.clone();
        let object = self.term(t.object)?.clone();
        Some(Statement {
            subject,
            predicate,
            object,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::rdf;

    fn n(local: &str) -> Node {
        Node::iri(format!("http://x/{local}"))
    }

    #[test]
    fn insert_is_idempotent() {
        let mut g = FactGraph::new();
        assert!(g.add_statement(n("a"), n("p"), n("b")));
        assert!(!g.add_statement(n("a"), n("p"), n("b")));
        assert_eq!(g.len(), 1);
        assert_eq!(g.statements_matching(None, None, None).count(), 1);
    }

    #[test]
    fn matching_uses_every_component() {
        let mut g = FactGraph::new();
        g.add_statement(n("a"), n("p"), n("b"));
        g.add_statement(n("a"), n("q"), n("c"));
        g.add_statement(n("d"), n("p"), n("b"));
        g.add_statement(n("d"), n("p"), Literal::plain("text"));

        assert_eq!(g.statements_matching(Some(&n("a")), None, None).count(), 2);
        assert_eq!(g.statements_matching(None, Some(&n("p")), None).count(), 3);
        assert_eq!(
            g.statements_matching(None, Some(&n("p")), Some(&n("b").into()))
                .count(),
            2
        );
        assert_eq!(
            g.statements_matching(Some(&n("d")), Some(&n("p")), Some(&Term::literal("text")))
                .count(),
            1
        );
        assert_eq!(
            g.statements_matching(None, None, Some(&n("c").into())).count(),
            1
        );
        // Unknown components match nothing.
        assert_eq!(g.statements_matching(Some(&n("zz")), None, None).count(), 0);
    }

    #[test]
    fn nodes_in_first_seen_order() {
        let mut g = FactGraph::new();
        g.add_statement(n("a"), n("p"), n("b"));
        g.add_statement(n("b"), n("p"), Literal::plain("lit"));
        g.add_statement(n("c"), n("p"), n("a"));
        let nodes: Vec<_> = g.nodes().cloned().collect();
        assert_eq!(nodes, vec![n("a"), n("b"), n("c")]);
    }

    #[test]
    fn fresh_blanks_are_distinct_and_compact_to_empty() {
        let mut g = FactGraph::with_default_prefixes();
        let b1 = g.fresh_blank();
        let b2 = g.fresh_blank();
        assert_ne!(b1, b2);
        assert_eq!(g.compact_node(&b1), "");
        assert_eq!(g.compact(rdf::TYPE), "type");
    }

    #[test]
    fn objects_and_subjects() {
        let mut g = FactGraph::with_default_prefixes();
        g.add_prefixed("cim:C1", "rdf:type", "rdfs:Class").unwrap();
        g.add_prefixed("cim:C2", "rdf:type", "rdfs:Class").unwrap();
        let ty = Node::iri(rdf::TYPE);
        let class = Term::iri(g.expand("rdfs:Class").unwrap());
        let subjects: Vec<_> = g.subjects(&ty, &class).map(|s| g.compact_node(s)).collect();
        assert_eq!(subjects, vec!["C1", "C2"]);
        let c1 = Node::iri(g.expand("cim:C1").unwrap());
        assert_eq!(g.objects(&c1, &ty).count(), 1);
    }

    #[test]
    fn add_prefixed_rejects_unknown_prefix() {
        let mut g = FactGraph::with_default_prefixes();
        let err = g.add_prefixed("nope:x", "rdf:type", "cim:Y").unwrap_err();
        assert!(matches!(err, FactDbError::UnknownPrefix { .. }));
        assert!(g.is_empty());
    }
}
