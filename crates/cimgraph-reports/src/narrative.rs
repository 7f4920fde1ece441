//! Indented, human-readable listings.

use std::collections::HashSet;
use std::fmt::Write;

use cimgraph_factdb::Node;
use tracing::debug;

use crate::{queries, ReportError, Reports};

impl Reports<'_> {
    /// Classes with their properties and descriptions.
    ///
    /// Rows are ordered by class then property, so a header is printed the
    /// first time a class (or a property within it) appears.
    pub fn list_classes(&self) -> Result<String, ReportError> {
        let rows = self.run(&queries::list_classes())?;
        let mut out = String::new();
        let mut last_class: Option<&Node> = None;
        let mut last_property: Option<&Node> = None;

        for row in &rows {
            let (Some(class), Some(property)) = (row.node("class"), row.node("property")) else {
                continue;
            };
            if last_class != Some(class) {
                writeln!(
                    &mut out,
                    " => Class: {}[{}]",
                    self.cell(row, "className"),
                    self.graph.compact_node(class)
                )?;
                writeln!(&mut out, "       {}", self.cell(row, "classDescription"))?;
                writeln!(&mut out, "    Properties: ")?;
                last_class = Some(class);
                last_property = None;
            }
            if last_property != Some(property) {
                writeln!(
                    &mut out,
                    "    - {}[{}] ",
                    self.cell(row, "propertyName"),
                    self.graph.compact_node(property)
                )?;
                writeln!(&mut out, "         {}", self.cell(row, "propertyDescription"))?;
                last_property = Some(property);
            }
        }
        debug!(rows = rows.len(), "class listing");
        Ok(out)
    }

    /// The model's source table, one block per class property.
    pub fn reconstruct_table(&self) -> Result<String, ReportError> {
        let rows = self.run(&queries::reconstruct_table())?;
        let mut out = String::new();
        for row in &rows {
            writeln!(&mut out, "  developerName: {}", self.cell(row, "developerName"))?;
            writeln!(&mut out, "  description: {}", self.cell(row, "description"))?;
            writeln!(&mut out, "  entityGroup: {}", self.cell(row, "entityGroup"))?;

            let property = self.cell(row, "propertyDeveloperName");
            if row.is_bound("propertyDatatype") {
                writeln!(&mut out, "  propertyDeveloperName: {property}")?;
                writeln!(&mut out, "  propertyDatatype: {}", self.cell(row, "propertyDatatype"))?;
            }
            if row.is_bound("referencedName") {
                let referenced = self.cell(row, "referencedName");
                writeln!(&mut out, "  propertyDeveloperName: {}Id", referenced.replace(' ', ""))?;
                writeln!(&mut out, "  propertyDatatype: URI reference")?;
                writeln!(&mut out, "  referencedRelationshipName: {property}")?;
                writeln!(&mut out, "  referencedEntity: {referenced}")?;
            }

            writeln!(&mut out, "  required: {}", self.cell(row, "required"))?;
            writeln!(&mut out, "----")?;
        }
        debug!(rows = rows.len(), "reconstructed table");
        Ok(out)
    }

    /// Every distinct `rdf:type` object, sorted.
    pub fn list_model_element_types(&self) -> Result<String, ReportError> {
        let rows = self.run(&queries::model_element_types())?;
        let mut out = String::new();
        for row in &rows {
            writeln!(&mut out, "  - {}", self.cell(row, "type"))?;
        }
        Ok(out)
    }

    /// 1:1 and 1:n relationships of every class.
    ///
    /// A class linked both ways with C is 1:1; one that only links to C is
    /// 1:n. Classes C links to without a link back are not listed.
    pub fn cardinalities(&self) -> Result<String, ReportError> {
        let classes = self.run(&queries::classes())?;
        let links = self.run(&queries::class_links())?;
        let pairs: Vec<(&Node, &Node)> = links
            .iter()
            .filter_map(|row| Some((row.node("sourceClass")?, row.node("targetClass")?)))
            .collect();

        let mut out = String::new();
        for class in classes.iter().filter_map(|row| row.node("class")) {
            let linked_to: Vec<&Node> = pairs
                .iter()
                .filter(|(s, _)| *s == class)
                .map(|(_, t)| *t)
                .collect();
            let linked_from: Vec<&Node> = pairs
                .iter()
                .filter(|(_, t)| *t == class)
                .map(|(s, _)| *s)
                .collect();
            let to: HashSet<&Node> = linked_to.iter().copied().collect();
            let from: HashSet<&Node> = linked_from.iter().copied().collect();

            writeln!(&mut out, "* Class {}", self.graph.compact_node(class))?;
            writeln!(&mut out, "  1:1")?;
            for target in linked_to.iter().filter(|t| from.contains(*t)) {
                writeln!(&mut out, "   - {}", self.graph.compact_node(target))?;
            }
            writeln!(&mut out, "  1:n")?;
            for source in linked_from.iter().filter(|s| !to.contains(*s)) {
                writeln!(&mut out, "   - {}", self.graph.compact_node(source))?;
            }
        }
        debug!(classes = classes.len(), links = pairs.len(), "cardinalities");
        Ok(out)
    }
}
