//! Backtracking-join evaluator.
//!
//! A query is first *prepared* against a graph: prefixed names are expanded,
//! constants are resolved to interned term IDs and every variable gets a slot.
//! Execution then threads rows of `Option<TermId>` slots through the clauses
//! left to right:
//!
//! - triple clause: one output row per matching statement;
//! - path clause: set of endpoints from a breadth-first expansion
//!   (forward from a bound subject, backward from a bound object, or from every
//!   graph node when both ends are free);
//! - optional group: left-outer join.
//!
//! Filters, ordering, projection, distinct and counting follow, in that order.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cimgraph_factdb::vocab::xsd;
use cimgraph_factdb::{compare_terms, FactGraph, Literal, Node, Term, TermId, TypedValue};
use roaring::RoaringBitmap;
use tracing::debug;

use crate::ast::{Clause, CompareOp, Expr, Name, Operand, PathExpr, Query, SelectItem, TermPattern};
use crate::solution::{Solution, Solutions};
use crate::QueryError;

type Row = Vec<Option<TermId>>;

// ============================================================================
// Prepared form
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Var(usize),
    Const(TermId),
    /// A constant that does not occur in the graph: matches nothing
    Absent,
}

#[derive(Debug, Clone)]
enum PreparedPath {
    Link(Option<TermId>),
    Seq(Vec<PreparedPath>),
    Star(Box<PreparedPath>),
}

#[derive(Debug, Clone)]
enum PreparedClause {
    Triple {
        subject: Slot,
        predicate: Slot,
        object: Slot,
    },
    Path {
        subject: Slot,
        path: PreparedPath,
        object: Slot,
    },
    Optional(Vec<PreparedClause>),
}

#[derive(Debug, Clone)]
enum PreparedOperand {
    Var(usize),
    Const(Term),
    IntegerOf(usize),
}

#[derive(Debug, Clone)]
enum PreparedExpr {
    Bound(usize),
    Compare {
        op: CompareOp,
        left: PreparedOperand,
        right: PreparedOperand,
    },
    And(Box<PreparedExpr>, Box<PreparedExpr>),
    Or(Box<PreparedExpr>, Box<PreparedExpr>),
    Not(Box<PreparedExpr>),
}

#[derive(Debug, Clone)]
enum Column {
    Var(usize),
    Bind(PreparedExpr),
}

/// A query resolved against one graph, ready to execute.
#[derive(Debug)]
pub struct PreparedQuery<'g> {
    graph: &'g FactGraph,
    vars: Vec<String>,
    clauses: Vec<PreparedClause>,
    filters: Vec<PreparedExpr>,
    order_by: Vec<(usize, bool)>,
    distinct: bool,
    columns: Arc<[String]>,
    projection: Vec<Column>,
    count: Option<(Option<usize>, String)>,
}

impl<'g> PreparedQuery<'g> {
    /// Resolve every name in `query` against `graph`.
    ///
    /// Fails with [`QueryError::Resolve`] on an unknown prefix, before any row
    /// is produced.
    pub fn prepare(graph: &'g FactGraph, query: &Query) -> Result<Self, QueryError> {
        let mut p = Preparer {
            graph,
            vars: Vec::new(),
            var_index: HashMap::new(),
        };

        let clauses = query
            .clauses
            .iter()
            .map(|c| p.clause(c))
            .collect::<Result<Vec<_>, _>>()?;
        let pattern_vars = p.vars.len();

        let filters = query
            .filters
            .iter()
            .map(|f| p.expr(f))
            .collect::<Result<Vec<_>, _>>()?;

        let (column_names, projection) = match &query.select {
            None => (
                p.vars[..pattern_vars].to_vec(),
                (0..pattern_vars).map(Column::Var).collect(),
            ),
            Some(items) => {
                let mut names = Vec::with_capacity(items.len());
                let mut cols = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        SelectItem::Var(v) => {
                            names.push(v.clone());
                            cols.push(Column::Var(p.var(v)));
                        }
                        SelectItem::Bind { alias, expr } => {
                            if p.var_index.contains_key(alias) {
                                return Err(QueryError::InvalidPattern(format!(
                                    "binding alias ?{alias} is already a pattern variable"
                                )));
                            }
                            names.push(alias.clone());
                            cols.push(Column::Bind(p.expr(expr)?));
                        }
                    }
                }
                (names, cols)
            }
        };

        let order_by = query
            .order_by
            .iter()
            .map(|k| (p.var(&k.var), k.descending))
            .collect();

        let count = query
            .count
            .as_ref()
            .map(|c| (c.var.as_deref().map(|v| p.var(v)), c.alias.clone()));

        Ok(Self {
            graph,
            vars: p.vars,
            clauses,
            filters,
            order_by,
            distinct: query.distinct,
            columns: column_names.into(),
            projection,
            count,
        })
    }

    /// Every variable the query mentions, in first-appearance order.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    pub fn execute(&self) -> Solutions {
        let mut rows: Vec<Row> = vec![vec![None; self.vars.len()]];
        for clause in &self.clauses {
            rows = self.join(clause, rows);
            if rows.is_empty() {
                break;
            }
        }
        let matched = rows.len();

        rows.retain(|row| {
            self.filters
                .iter()
                .all(|f| self.eval_expr(f, row) == Truth::True)
        });
        let filtered = rows.len();

        if let Some((var, alias)) = &self.count {
            if self.distinct {
                let mut seen: HashSet<Row> = HashSet::new();
                rows.retain(|r| seen.insert(r.clone()));
            }
            let n = rows
                .iter()
                .filter(|r| var.map_or(true, |i| r[i].is_some()))
                .count();
            debug!(matched, filtered, count = n, "evaluated count query");
            let columns: Arc<[String]> = vec![alias.clone()].into();
            let value = Term::Literal(Literal::integer(n as i64));
            let row = Solution::new(columns.clone(), vec![Some(value)]);
            return Solutions::new(columns, vec![row]);
        }

        if !self.order_by.is_empty() {
            // `sort_by` is stable: ties keep evaluation order.
            rows.sort_by(|a, b| self.compare_rows(a, b));
        }

        let mut projected: Vec<Vec<Option<Term>>> =
            rows.iter().map(|row| self.project(row)).collect();

        if self.distinct {
            let mut seen: HashSet<Vec<Option<Term>>> = HashSet::new();
            projected.retain(|r| seen.insert(r.clone()));
        }

        debug!(matched, filtered, rows = projected.len(), "evaluated query");
        let out = projected
            .into_iter()
            .map(|values| Solution::new(self.columns.clone(), values))
            .collect();
        Solutions::new(self.columns.clone(), out)
    }

    // ------------------------------------------------------------------------
    // Clauses
    // ------------------------------------------------------------------------

    fn join(&self, clause: &PreparedClause, rows: Vec<Row>) -> Vec<Row> {
        let mut out = Vec::new();
        for row in &rows {
            self.extend_row(clause, row, &mut out);
        }
        out
    }

    fn extend_row(&self, clause: &PreparedClause, row: &Row, out: &mut Vec<Row>) {
        match clause {
            PreparedClause::Triple {
                subject,
                predicate,
                object,
            } => self.match_triple(*subject, *predicate, *object, row, out),
            PreparedClause::Path {
                subject,
                path,
                object,
            } => self.match_path(*subject, path, *object, row, out),
            PreparedClause::Optional(group) => {
                let mut matched = vec![row.clone()];
                for c in group {
                    matched = self.join(c, matched);
                    if matched.is_empty() {
                        break;
                    }
                }
                if matched.is_empty() {
                    out.push(row.clone());
                } else {
                    out.extend(matched);
                }
            }
        }
    }

    fn match_triple(&self, s: Slot, p: Slot, o: Slot, row: &Row, out: &mut Vec<Row>) {
        let (Some(ks), Some(kp), Some(ko)) = (known(s, row), known(p, row), known(o, row)) else {
            return;
        };
        for t in self.graph.matching_ids(ks, kp, ko) {
            let mut next = row.clone();
            if bind(&mut next, s, t.subject)
                && bind(&mut next, p, t.predicate)
                && bind(&mut next, o, t.object)
            {
                out.push(next);
            }
        }
    }

    fn match_path(&self, s: Slot, path: &PreparedPath, o: Slot, row: &Row, out: &mut Vec<Row>) {
        let (Some(ks), Some(ko)) = (known(s, row), known(o, row)) else {
            return;
        };
        match (ks, ko) {
            (Some(start), _) => {
                let ends = self.walk(path, &single(start), Direction::Forward);
                for end in ends.iter() {
                    let mut next = row.clone();
                    if bind(&mut next, o, TermId::new(end)) {
                        out.push(next);
                    }
                }
            }
            (None, Some(end)) => {
                let starts = self.walk(path, &single(end), Direction::Backward);
                for start in starts.iter() {
                    let mut next = row.clone();
                    if bind(&mut next, s, TermId::new(start)) {
                        out.push(next);
                    }
                }
            }
            (None, None) => {
                for &start in self.graph.node_ids() {
                    let mut base = row.clone();
                    if !bind(&mut base, s, start) {
                        continue;
                    }
                    let ends = self.walk(path, &single(start), Direction::Forward);
                    for end in ends.iter() {
                        let mut next = base.clone();
                        if bind(&mut next, o, TermId::new(end)) {
                            out.push(next);
                        }
                    }
                }
            }
        }
    }

    /// Set of nodes reachable from `from` along `path`.
    fn walk(&self, path: &PreparedPath, from: &RoaringBitmap, dir: Direction) -> RoaringBitmap {
        match path {
            PreparedPath::Link(None) => RoaringBitmap::new(),
            PreparedPath::Link(Some(label)) => {
                let mut out = RoaringBitmap::new();
                for raw in from.iter() {
                    let node = TermId::new(raw);
                    match dir {
                        Direction::Forward => {
                            for t in self.graph.matching_ids(Some(node), Some(*label), None) {
                                out.insert(t.object.raw());
                            }
                        }
                        Direction::Backward => {
                            for t in self.graph.matching_ids(None, Some(*label), Some(node)) {
                                out.insert(t.subject.raw());
                            }
                        }
                    }
                }
                out
            }
            PreparedPath::Seq(parts) => {
                let ordered: Vec<&PreparedPath> = match dir {
                    Direction::Forward => parts.iter().collect(),
                    Direction::Backward => parts.iter().rev().collect(),
                };
                let mut current = from.clone();
                for part in ordered {
                    current = self.walk(part, &current, dir);
                    if current.is_empty() {
                        break;
                    }
                }
                current
            }
            PreparedPath::Star(inner) => {
                let mut visited = from.clone();
                let mut frontier = from.clone();
                while !frontier.is_empty() {
                    let reached = self.walk(inner, &frontier, dir);
                    frontier = reached - &visited;
                    visited |= &frontier;
                }
                visited
            }
        }
    }

    // ------------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------------

    fn eval_expr(&self, expr: &PreparedExpr, row: &Row) -> Truth {
        match expr {
            PreparedExpr::Bound(i) => Truth::from(row[*i].is_some()),
            PreparedExpr::Compare { op, left, right } => {
                let (Some(a), Some(b)) = (self.operand(left, row), self.operand(right, row)) else {
                    return Truth::Error;
                };
                compare(*op, &a, &b)
            }
            PreparedExpr::And(a, b) => match (self.eval_expr(a, row), self.eval_expr(b, row)) {
                (Truth::False, _) | (_, Truth::False) => Truth::False,
                (Truth::True, Truth::True) => Truth::True,
                _ => Truth::Error,
            },
            PreparedExpr::Or(a, b) => match (self.eval_expr(a, row), self.eval_expr(b, row)) {
                (Truth::True, _) | (_, Truth::True) => Truth::True,
                (Truth::False, Truth::False) => Truth::False,
                _ => Truth::Error,
            },
            PreparedExpr::Not(inner) => match self.eval_expr(inner, row) {
                Truth::True => Truth::False,
                Truth::False => Truth::True,
                Truth::Error => Truth::Error,
            },
        }
    }

    fn operand<'a>(&'a self, op: &'a PreparedOperand, row: &Row) -> Option<Cow<'a, Term>> {
        match op {
            PreparedOperand::Var(i) => row[*i].and_then(|id| self.graph.term(id)).map(Cow::Borrowed),
            PreparedOperand::Const(term) => Some(Cow::Borrowed(term)),
            PreparedOperand::IntegerOf(i) => {
                let term = self.graph.term(row[*i]?)?;
                let value = term.as_literal()?.as_integer()?;
                Some(Cow::Owned(Term::Literal(Literal::integer(value))))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Modifiers
    // ------------------------------------------------------------------------

    fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        for &(i, descending) in &self.order_by {
            let ord = match (a[i], b[i]) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) if x == y => Ordering::Equal,
                (Some(x), Some(y)) => match (self.graph.term(x), self.graph.term(y)) {
                    (Some(tx), Some(ty)) => compare_terms(tx, ty),
                    _ => Ordering::Equal,
                },
            };
            let ord = if descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn project(&self, row: &Row) -> Vec<Option<Term>> {
        self.projection
            .iter()
            .map(|col| match col {
                Column::Var(i) => row[*i].and_then(|id| self.graph.term(id)).cloned(),
                Column::Bind(expr) => match self.eval_expr(expr, row) {
                    Truth::True => Some(Term::Literal(Literal::boolean(true))),
                    Truth::False => Some(Term::Literal(Literal::boolean(false))),
                    Truth::Error => None,
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

fn single(id: TermId) -> RoaringBitmap {
    let mut set = RoaringBitmap::new();
    set.insert(id.raw());
    set
}

/// Lookup filter for a slot: `None` when the slot can never match,
/// `Some(None)` when it is free.
fn known(slot: Slot, row: &Row) -> Option<Option<TermId>> {
    match slot {
        Slot::Var(i) => Some(row[i]),
        Slot::Const(id) => Some(Some(id)),
        Slot::Absent => None,
    }
}

/// Bind or check a slot against a matched value.
fn bind(row: &mut Row, slot: Slot, value: TermId) -> bool {
    match slot {
        Slot::Var(i) => match row[i] {
            None => {
                row[i] = Some(value);
                true
            }
            Some(existing) => existing == value,
        },
        Slot::Const(id) => id == value,
        Slot::Absent => false,
    }
}

// ============================================================================
// Three-valued comparisons
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Truth {
    True,
    False,
    Error,
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b {
            Truth::True
        } else {
            Truth::False
        }
    }
}

fn compare(op: CompareOp, a: &Term, b: &Term) -> Truth {
    match op {
        CompareOp::Eq => equals(a, b),
        CompareOp::Ne => match equals(a, b) {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Error => Truth::Error,
        },
        _ => {
            let Some(ord) = ordering(a, b) else {
                return Truth::Error;
            };
            Truth::from(match op {
                CompareOp::Lt => ord.is_lt(),
                CompareOp::Le => ord.is_le(),
                CompareOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            })
        }
    }
}

fn equals(a: &Term, b: &Term) -> Truth {
    let (Term::Literal(x), Term::Literal(y)) = (a, b) else {
        return Truth::from(a == b);
    };
    match (x.typed_value(), y.typed_value()) {
        (TypedValue::Number(m), TypedValue::Number(n)) => Truth::from(m == n),
        (TypedValue::Boolean(m), TypedValue::Boolean(n)) => Truth::from(m == n),
        (TypedValue::Malformed, _) | (_, TypedValue::Malformed) => {
            if x == y {
                Truth::True
            } else {
                Truth::Error
            }
        }
        _ => Truth::from(x == y),
    }
}

fn ordering(a: &Term, b: &Term) -> Option<Ordering> {
    let (Term::Literal(x), Term::Literal(y)) = (a, b) else {
        return None;
    };
    match (x.typed_value(), y.typed_value()) {
        (TypedValue::Number(m), TypedValue::Number(n)) => m.partial_cmp(&n),
        (TypedValue::Boolean(m), TypedValue::Boolean(n)) => Some(m.cmp(&n)),
        (TypedValue::Text(m), TypedValue::Text(n))
            if (is_string(x) && is_string(y)) || x.datatype == y.datatype =>
        {
            Some(m.cmp(n))
        }
        _ => None,
    }
}

fn is_string(lit: &Literal) -> bool {
    lit.datatype.as_deref().map_or(true, |dt| dt == xsd::STRING)
}

// ============================================================================
// Preparation
// ============================================================================

struct Preparer<'g> {
    graph: &'g FactGraph,
    vars: Vec<String>,
    var_index: HashMap<String, usize>,
}

impl Preparer<'_> {
    fn var(&mut self, name: &str) -> usize {
        if let Some(&i) = self.var_index.get(name) {
            return i;
        }
        let i = self.vars.len();
        self.vars.push(name.to_string());
        self.var_index.insert(name.to_string(), i);
        i
    }

    fn resolve(&self, name: &Name) -> Result<Node, QueryError> {
        match name {
            Name::Prefixed(prefixed) => Ok(Node::Iri(self.graph.expand(prefixed)?)),
            Name::Iri(iri) => Ok(Node::Iri(iri.clone())),
        }
    }

    fn slot(&mut self, pattern: &TermPattern) -> Result<Slot, QueryError> {
        let id = match pattern {
            TermPattern::Var(v) => return Ok(Slot::Var(self.var(v))),
            TermPattern::Name(name) => {
                let node = self.resolve(name)?;
                self.graph.node_id(&node)
            }
            TermPattern::Literal(lit) => self.graph.term_id(&Term::Literal(lit.clone())),
        };
        Ok(id.map_or(Slot::Absent, Slot::Const))
    }

    fn clause(&mut self, clause: &Clause) -> Result<PreparedClause, QueryError> {
        Ok(match clause {
            Clause::Triple {
                subject,
                predicate,
                object,
            } => PreparedClause::Triple {
                subject: self.slot(subject)?,
                predicate: self.slot(predicate)?,
                object: self.slot(object)?,
            },
            Clause::Path {
                subject,
                path,
                object,
            } => PreparedClause::Path {
                subject: self.slot(subject)?,
                path: self.path(path)?,
                object: self.slot(object)?,
            },
            Clause::Optional(group) => PreparedClause::Optional(
                group
                    .iter()
                    .map(|c| self.clause(c))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        })
    }

    fn path(&self, path: &PathExpr) -> Result<PreparedPath, QueryError> {
        Ok(match path {
            PathExpr::Link(name) => {
                let node = self.resolve(name)?;
                PreparedPath::Link(self.graph.node_id(&node))
            }
            PathExpr::Seq(parts) => {
                if parts.is_empty() {
                    return Err(QueryError::InvalidPattern("empty path sequence".into()));
                }
                PreparedPath::Seq(
                    parts
                        .iter()
                        .map(|p| self.path(p))
                        .collect::<Result<Vec<_>, _>>()?,
                )
            }
            PathExpr::ZeroOrMore(inner) => PreparedPath::Star(Box::new(self.path(inner)?)),
        })
    }

    fn operand(&mut self, op: &Operand) -> Result<PreparedOperand, QueryError> {
        Ok(match op {
            Operand::Var(v) => PreparedOperand::Var(self.var(v)),
            Operand::Name(name) => PreparedOperand::Const(Term::Node(self.resolve(name)?)),
            Operand::Literal(lit) => PreparedOperand::Const(Term::Literal(lit.clone())),
            Operand::IntegerOf(v) => PreparedOperand::IntegerOf(self.var(v)),
        })
    }

    fn expr(&mut self, expr: &Expr) -> Result<PreparedExpr, QueryError> {
        Ok(match expr {
            Expr::Bound(v) => PreparedExpr::Bound(self.var(v)),
            Expr::Compare { op, left, right } => PreparedExpr::Compare {
                op: *op,
                left: self.operand(left)?,
                right: self.operand(right)?,
            },
            Expr::And(a, b) => PreparedExpr::And(Box::new(self.expr(a)?), Box::new(self.expr(b)?)),
            Expr::Or(a, b) => PreparedExpr::Or(Box::new(self.expr(a)?), Box::new(self.expr(b)?)),
            Expr::Not(inner) => PreparedExpr::Not(Box::new(self.expr(inner)?)),
        })
    }
}
