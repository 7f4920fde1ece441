//! Query definitions, one function per report.

use cimgraph_query::{name, var, Clause, Expr, Operand, PathExpr, Query};

/// From a shape to the property shapes the regeneration extracts report.
///
/// A shape that extends another is written `sh:and (Parent [own properties])`;
/// `sh:and/rdf:rest/rdf:first` steps to the second list member, so the
/// shape's own properties are reached and the parent's are not.
pub fn grouped_property_path() -> PathExpr {
    let own_group = PathExpr::seq([
        PathExpr::link("sh:and"),
        PathExpr::link("rdf:rest"),
        PathExpr::link("rdf:first"),
    ]);
    PathExpr::seq([
        PathExpr::zero_or_more(own_group),
        PathExpr::link("sh:property"),
    ])
}

/// `sh:and*/sh:property`, used by the narrative listings.
pub fn direct_property_path() -> PathExpr {
    PathExpr::seq([
        PathExpr::zero_or_more(PathExpr::link("sh:and")),
        PathExpr::link("sh:property"),
    ])
}

fn triple(s: &str, p: &str, o: &str) -> Clause {
    Clause::triple(var(s), name(p), var(o))
}

// ============================================================================
// Regeneration extracts
// ============================================================================

pub(crate) fn subject_areas() -> Query {
    Query::builder()
        .triple(var("subjectAreaId"), name("rdf:type"), name("cim:SubjectArea"))
        .optional([triple("subjectAreaId", "rdfs:label", "subjectAreaName")])
        .optional([triple("subjectAreaId", "rdfs:comment", "description")])
        .order_by(["subjectAreaId"])
        .build()
}

pub(crate) fn entity_groups() -> Query {
    Query::builder()
        .triple(var("subjectAreaId"), name("cim:entityGroup"), var("entityGroupId"))
        .optional([triple("entityGroupId", "rdf:type", "type")])
        .optional([triple("entityGroupId", "rdfs:label", "entityGroupName")])
        .optional([triple("entityGroupId", "rdfs:comment", "description")])
        .optional([triple("entityGroupId", "cim:subjectArea", "subjectArea")])
        .order_by(["subjectAreaId"])
        .build()
}

pub(crate) fn class_concepts() -> Query {
    Query::builder()
        .triple(var("subjectAreaId"), name("cim:entityGroup"), var("entityGroupId"))
        .triple(var("entityGroupId"), name("cim:classes"), var("classId"))
        .triple(var("classId"), name("rdfs:label"), var("className"))
        .triple(var("classId"), name("rdfs:comment"), var("description"))
        .triple(var("classId"), name("rdf:type"), var("type"))
        .optional([triple("classId", "rdfs:subClassOf", "subClassOf")])
        .order_by(["subjectAreaId", "entityGroupId", "classId"])
        .build()
}

pub(crate) fn property_concepts() -> Query {
    Query::builder()
        .triple(var("subjectAreaId"), name("cim:entityGroup"), var("entityGroupId"))
        .triple(var("entityGroupId"), name("cim:properties"), var("propertyId"))
        .triple(var("propertyId"), name("rdf:type"), var("type"))
        .triple(var("propertyId"), name("rdfs:domain"), var("domain"))
        .triple(var("entityGroupId"), name("cim:classes"), var("domain"))
        .optional([triple("domain", "rdfs:subClassOf", "subClassOf")])
        .optional([
            triple("shapeId", "sh:targetClass", "domain"),
            Clause::path(var("shapeId"), grouped_property_path(), var("attributeId")),
            triple("attributeId", "sh:path", "propertyId"),
        ])
        .order_by(["subjectAreaId", "entityGroupId", "propertyId"])
        .build()
}

pub(crate) fn schemas() -> Query {
    Query::builder()
        .triple(var("schemaId"), name("sh:targetClass"), var("targetClass"))
        .triple(var("schemaId"), name("rdf:type"), var("type"))
        .triple(var("subjectAreaId"), name("cim:entityGroup"), var("entityGroupId"))
        .triple(var("entityGroupId"), name("cim:classes"), var("targetClass"))
        .order_by(["subjectAreaId", "entityGroupId", "targetClass"])
        .build()
}

pub(crate) fn schema_properties() -> Query {
    Query::builder()
        .triple(var("schemaId"), name("sh:targetClass"), var("targetClass"))
        .path(var("schemaId"), grouped_property_path(), var("attributeId"))
        .triple(var("attributeId"), name("sh:path"), var("path"))
        .optional([triple("attributeId", "sh:datatype", "datatype")])
        .optional([triple("attributeId", "sh:minCount", "minCount")])
        .optional([triple("attributeId", "sh:maxCount", "maxCount")])
        .optional([triple("attributeId", "sh:node", "node")])
        .triple(var("subjectAreaId"), name("cim:entityGroup"), var("entityGroupId"))
        .triple(var("entityGroupId"), name("cim:classes"), var("targetClass"))
        .order_by(["subjectAreaId", "entityGroupId", "targetClass"])
        .build()
}

// ============================================================================
// Narrative listings
// ============================================================================

pub(crate) fn list_classes() -> Query {
    Query::builder()
        .triple(var("class"), name("rdfs:label"), var("className"))
        .triple(var("class"), name("rdfs:comment"), var("classDescription"))
        .path(
            var("class"),
            PathExpr::seq([direct_property_path(), PathExpr::link("sh:path")]),
            var("property"),
        )
        .triple(var("property"), name("rdfs:comment"), var("propertyDescription"))
        .triple(var("property"), name("rdfs:label"), var("propertyName"))
        .order_by(["class", "property"])
        .build()
}

pub(crate) fn reconstruct_table() -> Query {
    let required = Expr::bound("minCount").and(Expr::gt(
        Operand::integer_of("minCount"),
        Operand::int(0),
    ));
    // Identifier-typed fields are reported through their referenced class.
    let not_identifier = Expr::ne(Operand::var("propertyDatatype"), Operand::name("cim:id"))
        .or(Expr::bound("referencedName"));

    Query::builder()
        .triple(var("entityGroupId"), name("cim:classes"), var("classId"))
        .triple(var("entityGroupId"), name("rdfs:label"), var("entityGroup"))
        .triple(var("classId"), name("rdfs:label"), var("developerName"))
        .triple(var("classId"), name("rdfs:comment"), var("description"))
        .path(var("classId"), direct_property_path(), var("propertyShape"))
        .triple(var("propertyShape"), name("sh:path"), var("propertyId"))
        .triple(var("propertyId"), name("rdfs:label"), var("propertyDeveloperName"))
        .triple(var("propertyId"), name("rdfs:comment"), var("propertyDescription"))
        .optional([triple("propertyShape", "sh:datatype", "propertyDatatype")])
        .optional([
            triple("propertyShape", "sh:node", "referencedClass"),
            triple("referencedClass", "rdfs:label", "referencedName"),
        ])
        .optional([triple("propertyShape", "sh:minCount", "minCount")])
        .filter(not_identifier)
        .order_by(["classId", "propertyId"])
        .select([
            "developerName",
            "description",
            "entityGroup",
            "propertyDeveloperName",
            "propertyDatatype",
            "referencedName",
        ])
        .select_bind("required", required)
        .distinct()
        .build()
}

pub(crate) fn model_element_types() -> Query {
    Query::builder()
        .triple(var("s"), name("rdf:type"), var("type"))
        .select(["type"])
        .distinct()
        .order_by(["type"])
        .build()
}

pub(crate) fn classes() -> Query {
    Query::builder()
        .triple(var("class"), name("rdf:type"), name("rdfs:Class"))
        .select(["class"])
        .distinct()
        .order_by(["class"])
        .build()
}

/// Every (class, referenced node class) pair reachable through a property shape.
pub(crate) fn class_links() -> Query {
    Query::builder()
        .triple(var("sourceClass"), name("rdf:type"), name("rdfs:Class"))
        .path(
            var("sourceClass"),
            PathExpr::seq([direct_property_path(), PathExpr::link("sh:node")]),
            var("targetClass"),
        )
        .select(["sourceClass", "targetClass"])
        .distinct()
        .order_by(["sourceClass", "targetClass"])
        .build()
}

// ============================================================================
// Counts
// ============================================================================

pub(crate) fn count_of_type(prefixed_type: &str) -> Query {
    Query::builder()
        .triple(var("modelElement"), name("rdf:type"), name(prefixed_type))
        .count("modelElement", "total")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_path_text() {
        assert_eq!(
            grouped_property_path().to_string(),
            "(sh:and/rdf:rest/rdf:first)*/sh:property"
        );
        let parsed: PathExpr = "(sh:and/rdf:rest/rdf:first)*/sh:property".parse().unwrap();
        assert_eq!(parsed, grouped_property_path());
        assert_eq!(direct_property_path().to_string(), "sh:and*/sh:property");
    }

    #[test]
    fn table_query_projects_required_flag_last() {
        let q = reconstruct_table();
        let select = q.select.as_ref().unwrap();
        assert_eq!(select.len(), 7);
        assert!(matches!(
            select.last(),
            Some(cimgraph_query::SelectItem::Bind { alias, .. }) if alias == "required"
        ));
        assert!(q.distinct);
    }
}
