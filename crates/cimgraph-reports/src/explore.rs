//! Counts and direct graph lookups for exploring a loaded model.

use std::fmt::{self, Write};

use cimgraph_factdb::vocab::{rdf, rdfs};
use cimgraph_factdb::{Node, Term};

use crate::{queries, ReportError, Reports};

/// Size of the loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelSummary {
    pub statements: usize,
    pub subject_areas: i64,
    pub entity_groups: i64,
    pub classes: i64,
    pub properties: i64,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model size:")?;
        writeln!(f, "  Statements {}", self.statements)?;
        writeln!(f, "  Subject Areas {}", self.subject_areas)?;
        writeln!(f, "  Entity Groups {}", self.entity_groups)?;
        writeln!(f, "  Classes {}", self.classes)?;
        writeln!(f, "  Properties {}", self.properties)
    }
}

impl Reports<'_> {
    /// Number of nodes typed with `prefixed_type` (e.g. `cim:SubjectArea`).
    pub fn count_of_type(&self, prefixed_type: &str) -> Result<i64, ReportError> {
        let rows = self.run(&queries::count_of_type(prefixed_type))?;
        Ok(rows.count_value("total").unwrap_or(0))
    }

    pub fn model_summary(&self) -> Result<ModelSummary, ReportError> {
        Ok(ModelSummary {
            statements: self.graph.len(),
            subject_areas: self.count_of_type("cim:SubjectArea")?,
            entity_groups: self.count_of_type("cim:EntityGroup")?,
            classes: self.count_of_type("rdfs:Class")?,
            properties: self.count_of_type("rdf:Property")?,
        })
    }

    /// Domains of every `rdf:Property`, read straight from the statement
    /// indexes.
    pub fn property_domains(&self) -> Result<String, ReportError> {
        let rdf_type = Node::iri(rdf::TYPE);
        let property_class = Term::iri(rdf::PROPERTY);
        let domain = Node::iri(format!("{}domain", rdfs::NS));

        let mut out = String::new();
        for property in self.graph.subjects(&rdf_type, &property_class) {
            writeln!(&mut out, "** Property: {}", self.graph.compact_node(property))?;
            writeln!(&mut out, "  Property domain:")?;
            for d in self.graph.objects(property, &domain) {
                writeln!(&mut out, "    - {}", self.graph.compact_term(d))?;
            }
            writeln!(&mut out)?;
        }
        Ok(out)
    }
}
