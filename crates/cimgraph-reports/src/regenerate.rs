//! Tabular extracts used to regenerate the model's source spreadsheets.

use tracing::debug;

use crate::tsv::Tsv;
use crate::{queries, ReportError, Reports};

impl Reports<'_> {
    /// One row per subject area.
    pub fn subject_areas(&self) -> Result<String, ReportError> {
        let rows = self.run(&queries::subject_areas())?;
        let mut out = Tsv::new(&["subjectAreaId", "subjectAreaName", "description"]);
        for row in &rows {
            out.row([
                self.cell(row, "subjectAreaId"),
                self.cell(row, "subjectAreaName"),
                self.cell(row, "description"),
            ]);
        }
        debug!(rows = rows.len(), "subject areas");
        Ok(out.finish())
    }

    /// One row per (subject area, entity group) pair.
    pub fn entity_groups(&self) -> Result<String, ReportError> {
        let rows = self.run(&queries::entity_groups())?;
        let mut out = Tsv::new(&[
            "subjectAreaId",
            "entityGroupId",
            "entityGroupN",
            "type",
            "subjectArea",
            "description",
        ]);
        for row in &rows {
            out.row([
                self.cell(row, "subjectAreaId"),
                self.cell(row, "entityGroupId"),
                self.cell(row, "entityGroupName"),
                self.cell(row, "type"),
                self.cell(row, "subjectArea"),
                self.cell(row, "description"),
            ]);
        }
        debug!(rows = rows.len(), "entity groups");
        Ok(out.finish())
    }

    /// Classes per entity group. Name, description and type are required.
    pub fn class_concepts(&self) -> Result<String, ReportError> {
        let rows = self.run(&queries::class_concepts())?;
        // Header order differs from cell order (className/classId), as in the
        // published extract.
        let mut out = Tsv::new(&[
            "subjectAreaId",
            "entityGroupId",
            "className",
            "classId",
            "type",
            "subClassOf",
            "description",
        ]);
        for row in &rows {
            out.row([
                self.cell(row, "subjectAreaId"),
                self.cell(row, "entityGroupId"),
                self.cell(row, "classId"),
                self.cell(row, "className"),
                self.cell(row, "type"),
                self.cell(row, "subClassOf"),
                self.cell(row, "description"),
            ]);
        }
        debug!(rows = rows.len(), "class concepts");
        Ok(out.finish())
    }

    /// Properties whose domain is a class of the same entity group.
    pub fn property_concepts(&self) -> Result<String, ReportError> {
        let rows = self.run(&queries::property_concepts())?;
        let mut out = Tsv::new(&[
            "subjectAreaId",
            "entityGroupId",
            "propertyId",
            "prope",
            "domain",
            "subClassOf",
            "EntityAndAttribute",
            "propertyGUID",
        ]);
        for row in &rows {
            let domain = self.cell(row, "domain");
            let property = self.cell(row, "propertyId");
            out.row([
                self.cell(row, "subjectAreaId"),
                self.cell(row, "entityGroupId"),
                property.clone(),
                self.cell(row, "type"),
                domain.clone(),
                self.cell(row, "subClassOf"),
                format!("{domain}:{property}"),
                self.cell(row, "attributeId"),
            ]);
        }
        debug!(rows = rows.len(), "property concepts");
        Ok(out.finish())
    }

    /// Shapes whose target class belongs to an entity group.
    pub fn schemas(&self) -> Result<String, ReportError> {
        let rows = self.run(&queries::schemas())?;
        let mut out = Tsv::new(&[
            "targetClass",
            "subjectAreaId",
            "entityGroupId",
            "schemaId",
            "sche",
            "targetClass",
        ]);
        for row in &rows {
            let target = self.cell(row, "targetClass");
            out.row([
                target.clone(),
                self.cell(row, "subjectAreaId"),
                self.cell(row, "entityGroupId"),
                self.cell(row, "schemaId"),
                self.cell(row, "type"),
                target,
            ]);
        }
        debug!(rows = rows.len(), "schemas");
        Ok(out.finish())
    }

    /// Property shapes of every shape targeting a grouped class.
    pub fn schema_properties(&self) -> Result<String, ReportError> {
        let rows = self.run(&queries::schema_properties())?;
        let mut out = Tsv::new(&[
            "fullPath",
            "path",
            "subjectAreaId",
            "entityGroupId",
            "schemaId",
            "propertyId",
            "datatype",
            "minCount",
            "maxCount",
            "node",
            "schemaName",
        ]);
        for row in &rows {
            let class = self.cell(row, "targetClass");
            let path = self.cell(row, "path");
            out.row([
                format!("{class}:{path}"),
                path,
                self.cell(row, "subjectAreaId"),
                self.cell(row, "entityGroupId"),
                self.cell(row, "schemaId"),
                self.cell(row, "attributeId"),
                self.cell(row, "datatype"),
                self.cell(row, "minCount"),
                self.cell(row, "maxCount"),
                self.cell(row, "node"),
                class,
            ]);
        }
        debug!(rows = rows.len(), "schema properties");
        Ok(out.finish())
    }
}
