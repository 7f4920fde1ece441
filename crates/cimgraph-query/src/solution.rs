//! Binding rows produced by the evaluator.

use std::sync::Arc;

use cimgraph_factdb::{Literal, Node, Term};

/// One binding row: variable name -> value (or unbound).
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    vars: Arc<[String]>,
    values: Vec<Option<Term>>,
}

impl Solution {
    pub(crate) fn new(vars: Arc<[String]>, values: Vec<Option<Term>>) -> Self {
        Self { vars, values }
    }

    /// Value bound to `var`, if any.
    pub fn get(&self, var: &str) -> Option<&Term> {
        let var = var.trim_start_matches('?');
        let idx = self.vars.iter().position(|v| v == var)?;
        self.values.get(idx).and_then(Option::as_ref)
    }

    pub fn is_bound(&self, var: &str) -> bool {
        self.get(var).is_some()
    }

    pub fn node(&self, var: &str) -> Option<&Node> {
        self.get(var).and_then(Term::as_node)
    }

    pub fn literal(&self, var: &str) -> Option<&Literal> {
        self.get(var).and_then(Term::as_literal)
    }

    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    pub fn values(&self) -> &[Option<Term>] {
        &self.values
    }

    /// (variable, value) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Term>)> {
        self.vars
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Option::as_ref))
    }
}

/// Ordered evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub struct Solutions {
    vars: Arc<[String]>,
    rows: Vec<Solution>,
}

impl Solutions {
    pub(crate) fn new(vars: Arc<[String]>, rows: Vec<Solution>) -> Self {
        Self { vars, rows }
    }

    /// Column names, in projection order.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Solution] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Solution> {
        self.rows.iter()
    }

    /// Integer value of a single-row count result.
    pub fn count_value(&self, alias: &str) -> Option<i64> {
        self.rows.first()?.literal(alias)?.as_integer()
    }
}

impl IntoIterator for Solutions {
    type Item = Solution;
    type IntoIter = std::vec::IntoIter<Solution>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Solutions {
    type Item = &'a Solution;
    type IntoIter = std::slice::Iter<'a, Solution>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
