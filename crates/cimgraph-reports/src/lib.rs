//! cimgraph-reports: fixed queries over a loaded vocabulary graph
//!
//! Every report is a pure function of the graph: a pattern query built with
//! [`cimgraph_query::Query::builder`] plus a projection of its rows to text.
//! Identifiers are compacted through the graph's prefix table; unbound
//! optional values render as empty cells.
//!
//! - tabular regeneration extracts (`subject_areas`, `entity_groups`,
//!   `class_concepts`, `property_concepts`, `schemas`, `schema_properties`)
//! - narrative listings (`list_classes`, `reconstruct_table`,
//!   `list_model_element_types`, `cardinalities`)
//! - exploration helpers (`count_of_type`, `model_summary`, `property_domains`)

mod explore;
mod narrative;
mod queries;
mod regenerate;
mod tsv;

use std::fmt;
use std::str::FromStr;

use cimgraph_factdb::FactGraph;
use cimgraph_query::{evaluate, Query, QueryError, Solution, Solutions};
use thiserror::Error;

pub use explore::ModelSummary;
pub use queries::{direct_property_path, grouped_property_path};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("failed to format report: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("unknown report `{0}` (expected one of: {names})", names = ReportKind::names().join(", "))]
    UnknownReport(String),
}

/// Report entry points over one graph.
#[derive(Debug, Clone, Copy)]
pub struct Reports<'g> {
    graph: &'g FactGraph,
}

impl<'g> Reports<'g> {
    pub fn new(graph: &'g FactGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g FactGraph {
        self.graph
    }

    /// Render one named report.
    pub fn render(&self, kind: ReportKind) -> Result<String, ReportError> {
        match kind {
            ReportKind::SubjectAreas => self.subject_areas(),
            ReportKind::EntityGroups => self.entity_groups(),
            ReportKind::ClassConcepts => self.class_concepts(),
            ReportKind::PropertyConcepts => self.property_concepts(),
            ReportKind::Schemas => self.schemas(),
            ReportKind::SchemaProperties => self.schema_properties(),
            ReportKind::Classes => self.list_classes(),
            ReportKind::Table => self.reconstruct_table(),
            ReportKind::Cardinalities => self.cardinalities(),
            ReportKind::Types => self.list_model_element_types(),
            ReportKind::Summary => Ok(self.model_summary()?.to_string()),
            ReportKind::Domains => self.property_domains(),
        }
    }

    /// The six tabular extracts, in regeneration order.
    pub fn regenerate(&self) -> Result<Vec<(ReportKind, String)>, ReportError> {
        ReportKind::REGENERATION
            .iter()
            .map(|&kind| Ok((kind, self.render(kind)?)))
            .collect()
    }

    fn run(&self, query: &Query) -> Result<Solutions, ReportError> {
        Ok(evaluate(self.graph, query)?)
    }

    /// Display form of a bound value; empty when unbound.
    fn cell(&self, row: &Solution, var: &str) -> String {
        row.get(var)
            .map(|t| self.graph.compact_term(t))
            .unwrap_or_default()
    }
}

// ============================================================================
// Report names
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    SubjectAreas,
    EntityGroups,
    ClassConcepts,
    PropertyConcepts,
    Schemas,
    SchemaProperties,
    Classes,
    Table,
    Cardinalities,
    Types,
    Summary,
    Domains,
}

impl ReportKind {
    pub const ALL: [ReportKind; 12] = [
        ReportKind::SubjectAreas,
        ReportKind::EntityGroups,
        ReportKind::ClassConcepts,
        ReportKind::PropertyConcepts,
        ReportKind::Schemas,
        ReportKind::SchemaProperties,
        ReportKind::Classes,
        ReportKind::Table,
        ReportKind::Cardinalities,
        ReportKind::Types,
        ReportKind::Summary,
        ReportKind::Domains,
    ];

    pub const REGENERATION: [ReportKind; 6] = [
        ReportKind::SubjectAreas,
        ReportKind::EntityGroups,
        ReportKind::ClassConcepts,
        ReportKind::PropertyConcepts,
        ReportKind::Schemas,
        ReportKind::SchemaProperties,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReportKind::SubjectAreas => "subject-areas",
            ReportKind::EntityGroups => "entity-groups",
            ReportKind::ClassConcepts => "class-concepts",
            ReportKind::PropertyConcepts => "property-concepts",
            ReportKind::Schemas => "schemas",
            ReportKind::SchemaProperties => "schema-properties",
            ReportKind::Classes => "classes",
            ReportKind::Table => "table",
            ReportKind::Cardinalities => "cardinalities",
            ReportKind::Types => "types",
            ReportKind::Summary => "summary",
            ReportKind::Domains => "domains",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.name()).collect()
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ReportError::UnknownReport(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_names_parse_back() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.name().parse::<ReportKind>().unwrap(), kind);
        }
        assert_eq!("Schema_Properties".parse::<ReportKind>().unwrap(), ReportKind::SchemaProperties);
        assert!(matches!(
            "nope".parse::<ReportKind>(),
            Err(ReportError::UnknownReport(_))
        ));
    }
}
