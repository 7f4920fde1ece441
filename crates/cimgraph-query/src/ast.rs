//! Pattern query AST and builder.
//!
//! Queries are plain data: an ordered list of clauses, filters, order keys and
//! an optional projection / count. Reports assemble them through
//! [`Query::builder`] instead of concatenating query text.

use std::fmt;

use cimgraph_factdb::Literal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Terms
// ============================================================================

/// A graph identifier as written in a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Name {
    /// `prefix:local`, expanded against the graph's prefix table
    Prefixed(String),
    /// Absolute IRI
    Iri(String),
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Prefixed(p) => f.write_str(p),
            Name::Iri(iri) => write!(f, "<{iri}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermPattern {
    Var(String),
    Name(Name),
    Literal(Literal),
}

impl fmt::Display for TermPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermPattern::Var(v) => write!(f, "?{v}"),
            TermPattern::Name(n) => n.fmt(f),
            TermPattern::Literal(l) => l.fmt(f),
        }
    }
}

/// `?name` variable pattern (the `?` is optional).
pub fn var(name: &str) -> TermPattern {
    TermPattern::Var(name.trim_start_matches('?').to_string())
}

/// Prefixed name pattern, e.g. `name("cim:SubjectArea")`.
pub fn name(prefixed: &str) -> TermPattern {
    TermPattern::Name(Name::Prefixed(prefixed.to_string()))
}

pub fn iri(iri: &str) -> TermPattern {
    TermPattern::Name(Name::Iri(iri.to_string()))
}

pub fn lit(literal: Literal) -> TermPattern {
    TermPattern::Literal(literal)
}

// ============================================================================
// Paths
// ============================================================================

/// Property path over the supported operator family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathExpr {
    /// One edge labelled by the name
    Link(Name),
    /// Each part in turn, left to right
    Seq(Vec<PathExpr>),
    /// Reflexive-transitive closure
    ZeroOrMore(Box<PathExpr>),
}

impl PathExpr {
    pub fn link(prefixed: &str) -> Self {
        PathExpr::Link(Name::Prefixed(prefixed.to_string()))
    }

    pub fn seq(parts: impl IntoIterator<Item = PathExpr>) -> Self {
        mk_seq(parts.into_iter().collect())
    }

    pub fn zero_or_more(inner: PathExpr) -> Self {
        PathExpr::ZeroOrMore(Box::new(inner))
    }
}

/// Flatten nested sequences; a single part stands for itself.
pub(crate) fn mk_seq(parts: Vec<PathExpr>) -> PathExpr {
    let mut out: Vec<PathExpr> = Vec::new();
    for p in parts {
        match p {
            PathExpr::Seq(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
    if out.len() == 1 {
        out.remove(0)
    } else {
        PathExpr::Seq(out)
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathExpr::Link(n) => n.fmt(f),
            PathExpr::Seq(parts) => {
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    match p {
                        PathExpr::Seq(_) => write!(f, "({p})")?,
                        _ => p.fmt(f)?,
                    }
                }
                Ok(())
            }
            PathExpr::ZeroOrMore(inner) => match inner.as_ref() {
                PathExpr::Link(_) => write!(f, "{inner}*"),
                _ => write!(f, "({inner})*"),
            },
        }
    }
}

// ============================================================================
// Clauses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    Triple {
        subject: TermPattern,
        predicate: TermPattern,
        object: TermPattern,
    },
    Path {
        subject: TermPattern,
        path: PathExpr,
        object: TermPattern,
    },
    /// Left-outer-joined group
    Optional(Vec<Clause>),
}

impl Clause {
    pub fn triple(subject: TermPattern, predicate: TermPattern, object: TermPattern) -> Self {
        Clause::Triple {
            subject,
            predicate,
            object,
        }
    }

    pub fn path(subject: TermPattern, path: PathExpr, object: TermPattern) -> Self {
        Clause::Path {
            subject,
            path,
            object,
        }
    }

    pub fn optional(clauses: impl IntoIterator<Item = Clause>) -> Self {
        Clause::Optional(clauses.into_iter().collect())
    }
}

// ============================================================================
// Filters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Var(String),
    Name(Name),
    Literal(Literal),
    /// Integer cast of a variable's value (`xsd:integer(?v)`)
    IntegerOf(String),
}

impl Operand {
    pub fn var(name: &str) -> Self {
        Operand::Var(name.trim_start_matches('?').to_string())
    }

    pub fn name(prefixed: &str) -> Self {
        Operand::Name(Name::Prefixed(prefixed.to_string()))
    }

    pub fn int(value: i64) -> Self {
        Operand::Literal(Literal::integer(value))
    }

    pub fn integer_of(var: &str) -> Self {
        Operand::IntegerOf(var.trim_start_matches('?').to_string())
    }
}

/// Filter expression, evaluated with three-valued logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Bound(String),
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn bound(var: &str) -> Self {
        Expr::Bound(var.trim_start_matches('?').to_string())
    }

    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Expr::Compare { op, left, right }
    }

    pub fn eq(left: Operand, right: Operand) -> Self {
        Self::compare(left, CompareOp::Eq, right)
    }

    pub fn ne(left: Operand, right: Operand) -> Self {
        Self::compare(left, CompareOp::Ne, right)
    }

    pub fn gt(left: Operand, right: Operand) -> Self {
        Self::compare(left, CompareOp::Gt, right)
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

// ============================================================================
// Solution modifiers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    pub var: String,
    pub descending: bool,
}

impl OrderKey {
    pub fn asc(var: &str) -> Self {
        Self {
            var: var.trim_start_matches('?').to_string(),
            descending: false,
        }
    }

    pub fn desc(var: &str) -> Self {
        Self {
            descending: true,
            ..Self::asc(var)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectItem {
    Var(String),
    /// `(expr AS ?alias)`: a boolean binding, unbound when `expr` errors
    Bind { alias: String, expr: Expr },
}

/// `COUNT(?var) AS ?alias`, or `COUNT(*)` when `var` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub var: Option<String>,
    pub alias: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub clauses: Vec<Clause>,
    pub filters: Vec<Expr>,
    pub order_by: Vec<OrderKey>,
    pub distinct: bool,
    pub select: Option<Vec<SelectItem>>,
    pub count: Option<Count>,
}

impl Query {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn triple(mut self, subject: TermPattern, predicate: TermPattern, object: TermPattern) -> Self {
        self.query
            .clauses
            .push(Clause::triple(subject, predicate, object));
        self
    }

    pub fn path(mut self, subject: TermPattern, path: PathExpr, object: TermPattern) -> Self {
        self.query.clauses.push(Clause::path(subject, path, object));
        self
    }

    pub fn optional(mut self, clauses: impl IntoIterator<Item = Clause>) -> Self {
        self.query.clauses.push(Clause::optional(clauses));
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.query.filters.push(expr);
        self
    }

    pub fn order_by<'a>(mut self, vars: impl IntoIterator<Item = &'a str>) -> Self {
        self.query
            .order_by
            .extend(vars.into_iter().map(OrderKey::asc));
        self
    }

    pub fn order_key(mut self, key: OrderKey) -> Self {
        self.query.order_by.push(key);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.query.distinct = true;
        self
    }

    pub fn select<'a>(mut self, vars: impl IntoIterator<Item = &'a str>) -> Self {
        let items = self.query.select.get_or_insert_with(Vec::new);
        items.extend(
            vars.into_iter()
                .map(|v| SelectItem::Var(v.trim_start_matches('?').to_string())),
        );
        self
    }

    pub fn select_bind(mut self, alias: &str, expr: Expr) -> Self {
        self.query
            .select
            .get_or_insert_with(Vec::new)
            .push(SelectItem::Bind {
                alias: alias.trim_start_matches('?').to_string(),
                expr,
            });
        self
    }

    pub fn count(mut self, var: &str, alias: &str) -> Self {
        self.query.count = Some(Count {
            var: Some(var.trim_start_matches('?').to_string()),
            alias: alias.trim_start_matches('?').to_string(),
        });
        self
    }

    pub fn count_rows(mut self, alias: &str) -> Self {
        self.query.count = Some(Count {
            var: None,
            alias: alias.trim_start_matches('?').to_string(),
        });
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}
