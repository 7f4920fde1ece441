//! RDF-style term model for the fact graph.
//!
//! - [`Node`]: an absolute IRI or a graph-local blank node.
//! - [`Literal`]: lexical form plus an optional datatype IRI.
//! - [`Term`]: anything that may sit in object position.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vocab::xsd;

/// Graph-local anonymous node handle.
///
/// Handles are allocated by the owning [`crate::FactGraph`] and carry no
/// meaning outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BlankNode(u32);

impl BlankNode {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:b{}", self.0)
    }
}

/// A subject or predicate: absolute reference or anonymous node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Node {
    Iri(String),
    Blank(BlankNode),
}

impl Node {
    pub fn iri(iri: impl Into<String>) -> Self {
        Node::Iri(iri.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Node::Iri(iri) => Some(iri.as_str()),
            Node::Blank(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank(_))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(iri) => f.write_str(iri),
            Node::Blank(b) => b.fmt(f),
        }
    }
}

/// A literal value with an optional datatype IRI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
}

/// Typed view of a literal used for comparisons and ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypedValue<'a> {
    Number(f64),
    Boolean(bool),
    Text(&'a str),
    /// A numeric/boolean datatype whose lexical form does not parse.
    Malformed,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), xsd::INTEGER)
    }

    pub fn boolean(value: bool) -> Self {
        Self::typed(value.to_string(), xsd::BOOLEAN)
    }

    pub fn is_numeric(&self) -> bool {
        self.datatype.as_deref().is_some_and(xsd::is_numeric)
    }

    /// Numeric value when the datatype is numeric and the lexical form parses.
    pub fn as_number(&self) -> Option<f64> {
        match self.typed_value() {
            TypedValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Integer view, accepting any lexical form that parses as an integer.
    ///
    /// This mirrors an `xsd:integer(...)` cast: the datatype is not consulted.
    pub fn as_integer(&self) -> Option<i64> {
        let text = self.lexical.trim();
        if let Ok(v) = text.parse::<i64>() {
            return Some(v);
        }
        // `1.0`-style lexical forms of integral decimals.
        // Out-of-range values are malformed, not clamped.
        const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
        let f = text.parse::<f64>().ok()?;
        (f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then_some(f as i64)
    }

    pub fn typed_value(&self) -> TypedValue<'_> {
        match self.datatype.as_deref() {
            Some(dt) if xsd::is_numeric(dt) => match self.lexical.trim().parse::<f64>() {
                Ok(n) if !n.is_nan() => TypedValue::Number(n),
                _ => TypedValue::Malformed,
            },
            Some(xsd::BOOLEAN) => match self.lexical.trim() {
                "true" | "1" => TypedValue::Boolean(true),
                "false" | "0" => TypedValue::Boolean(false),
                _ => TypedValue::Malformed,
            },
            _ => TypedValue::Text(&self.lexical),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.datatype {
            Some(dt) => write!(f, "\"{}\"^^<{}>", self.lexical, dt),
            None => write!(f, "\"{}\"", self.lexical),
        }
    }
}

/// Object-position value: a node or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Node(Node),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Node(Node::Iri(iri.into()))
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal::plain(lexical))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Term::Node(n) => Some(n),
            Term::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            Term::Node(_) => None,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        self.as_node().and_then(Node::as_iri)
    }
}

impl From<Node> for Term {
    fn from(node: Node) -> Self {
        Term::Node(node)
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Term::Literal(lit)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Node(n) => n.fmt(f),
            Term::Literal(l) => l.fmt(f),
        }
    }
}

/// Total order used by `ORDER BY`.
///
/// Blank nodes sort before IRIs, IRIs before literals. Identifiers compare by
/// their full string form; literals compare by typed value (numbers
/// numerically, everything else lexically) with malformed numerics last.
pub fn compare_terms(a: &Term, b: &Term) -> Ordering {
    fn rank(t: &Term) -> u8 {
        match t {
            Term::Node(Node::Blank(_)) => 0,
            Term::Node(Node::Iri(_)) => 1,
            Term::Literal(_) => 2,
        }
    }

    match (a, b) {
        (Term::Node(Node::Blank(x)), Term::Node(Node::Blank(y))) => x.cmp(y),
        (Term::Node(Node::Iri(x)), Term::Node(Node::Iri(y))) => x.cmp(y),
        (Term::Literal(x), Term::Literal(y)) => compare_literals(x, y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_literals(a: &Literal, b: &Literal) -> Ordering {
    fn rank(v: &TypedValue<'_>) -> u8 {
        match v {
            TypedValue::Number(_) => 0,
            TypedValue::Boolean(_) => 1,
            TypedValue::Text(_) => 2,
            TypedValue::Malformed => 3,
        }
    }

    let (va, vb) = (a.typed_value(), b.typed_value());
    match (va, vb) {
        (TypedValue::Number(x), TypedValue::Number(y)) => {
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (TypedValue::Boolean(x), TypedValue::Boolean(y)) => x.cmp(&y),
        (TypedValue::Text(x), TypedValue::Text(y)) => x.cmp(y),
        (TypedValue::Malformed, TypedValue::Malformed) => a.lexical.cmp(&b.lexical),
        _ => rank(&va).cmp(&rank(&vb)),
    }
}
