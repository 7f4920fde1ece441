//! cimgraph-query: graph-pattern queries over a [`FactGraph`]
//!
//! Supported surface, and nothing more:
//! - triple patterns and optional (left-outer-joined) groups
//! - property paths: sequence `A/B` and reflexive-transitive closure `A*`
//! - filters: `BOUND`, `=`, `!=`, `<`, `<=`, `>`, `>=`, `&&`, `||`, `!`, and an
//!   integer cast, under three-valued logic
//! - ORDER BY, DISTINCT, projection with computed boolean bindings, COUNT
//!
//! ```ignore
//! let q = Query::builder()
//!     .triple(var("c"), name("rdf:type"), name("rdfs:Class"))
//!     .path(var("c"), parse_path("sh:and*/sh:property")?, var("p"))
//!     .order_by(["c"])
//!     .build();
//! let rows = evaluate(&graph, &q)?;
//! ```

pub mod ast;
mod eval;
mod path;
mod solution;

use cimgraph_factdb::{FactDbError, FactGraph};
use thiserror::Error;

pub use ast::{
    iri, lit, name, var, Clause, CompareOp, Count, Expr, Name, Operand, OrderKey, PathExpr, Query,
    QueryBuilder, SelectItem, TermPattern,
};
pub use eval::PreparedQuery;
pub use path::parse_path;
pub use solution::{Solution, Solutions};

#[derive(Debug, Error)]
pub enum QueryError {
    /// A name in the query could not be expanded against the graph's prefixes.
    #[error("cannot resolve query name: {0}")]
    Resolve(#[from] FactDbError),

    #[error("invalid path `{input}`: {message}")]
    PathSyntax { input: String, message: String },

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Prepare and execute `query` against `graph`.
pub fn evaluate(graph: &FactGraph, query: &Query) -> Result<Solutions, QueryError> {
    Ok(PreparedQuery::prepare(graph, query)?.execute())
}
