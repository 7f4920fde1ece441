//! Integration tests for the complete cimgraph pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Distribution directory → Loader → Fact graph
//! - Fact graph → Pattern queries → Reports
//!
//! Run with: cargo test --test integration_tests

use std::fs;
use std::path::Path;

use anyhow::Result;
use tempfile::tempdir;

use cimgraph_factdb::Term;
use cimgraph_ingest_jsonld::{CimLoader, Profile};
use cimgraph_query::{evaluate, name, parse_path, var, Query};
use cimgraph_reports::{ReportKind, Reports};

const CONTEXT: &str = r#"{
  "@context": {
    "cim": "http://cloudinformationmodel.org/model/",
    "rdf": "http://www.w3.org/1999/02/22-rdf-syntax-ns#",
    "rdfs": "http://www.w3.org/2000/01/rdf-schema#",
    "sh": "http://www.w3.org/ns/shacl#",
    "xsd": "http://www.w3.org/2001/XMLSchema#",
    "name": "rdfs:label",
    "description": "rdfs:comment",
    "subClassOf": {"@id": "rdfs:subClassOf", "@type": "@id"},
    "entityGroups": {"@id": "cim:entityGroup", "@type": "@id"},
    "classes": {"@id": "cim:classes", "@type": "@id"},
    "properties": {"@id": "cim:properties", "@type": "@id"},
    "domain": {"@id": "rdfs:domain", "@type": "@id"},
    "targetClass": {"@id": "sh:targetClass", "@type": "@id"},
    "and": {"@id": "sh:and", "@type": "@id", "@container": "@list"},
    "property": {"@id": "sh:property"},
    "path": {"@id": "sh:path", "@type": "@id"},
    "datatype": {"@id": "sh:datatype", "@type": "@id"},
    "node": {"@id": "sh:node", "@type": "@id"},
    "minCount": {"@id": "sh:minCount"},
    "maxCount": {"@id": "sh:maxCount"}
  }
}"#;

const ABOUT: &str = r#"{
  "@context": "https://cloudinformationmodel.org/context.jsonld",
  "@id": "cim:about",
  "name": "Cloud Information Model"
}"#;

const CONCEPTS: &str = r#"{
  "@context": "https://cloudinformationmodel.org/context.jsonld",
  "@graph": [
    {"@id": "cim:SA1", "@type": "cim:SubjectArea", "entityGroups": ["cim:EG1"]},
    {"@id": "cim:EG1", "@type": "cim:EntityGroup", "name": "Party",
     "classes": ["cim:C1", "cim:Party"], "properties": ["cim:P1"]},
    {"@id": "cim:C1", "@type": "rdfs:Class", "name": "Customer",
     "description": "A customer record"},
    {"@id": "cim:Party", "@type": "rdfs:Class", "name": "Party",
     "description": "Anyone the business deals with"},
    {"@id": "cim:P1", "@type": "rdf:Property", "name": "customerName",
     "description": "Name of the customer", "domain": "cim:C1"}
  ]
}"#;

const SCHEMA: &str = r#"{
  "@context": "https://cloudinformationmodel.org/context.jsonld",
  "@graph": [
    {
      "@id": "cim:C1Shape",
      "@type": "sh:NodeShape",
      "targetClass": "cim:C1",
      "and": [
        "cim:PartyShape",
        {"property": [
          {"path": "cim:P1", "datatype": "xsd:string", "minCount": 1, "maxCount": 1}
        ]}
      ]
    },
    {
      "@id": "cim:PartyShape",
      "@type": "sh:NodeShape",
      "targetClass": "cim:Party",
      "property": [{"@id": "cim:PartyRef", "path": "cim:P2", "node": "cim:C1"}]
    }
  ]
}"#;

fn write(root: &Path, rel: &str, body: &str) -> Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, body)?;
    Ok(())
}

fn distribution(root: &Path) -> Result<()> {
    write(root, "src/context.jsonld", CONTEXT)?;
    write(root, "about.jsonld", ABOUT)?;
    write(root, "model/Party/Party.concepts.jsonld", CONCEPTS)?;
    write(root, "model/Party/Customer/schema.jsonld", SCHEMA)?;
    Ok(())
}

// ============================================================================
// Loader → graph
// ============================================================================

#[test]
fn test_profiles_load_different_slices() -> Result<()> {
    let dir = tempdir()?;
    distribution(dir.path())?;

    let schema = CimLoader::new(dir.path(), Profile::CanonicalSchema).load_graph()?;
    let concepts = CimLoader::new(dir.path(), Profile::Conceptual).load_graph()?;
    let both = CimLoader::new(dir.path(), Profile::ConceptualAndSchema).load_graph()?;

    assert!(!schema.is_empty());
    assert!(!concepts.is_empty());
    // The manifest is shared; everything else is disjoint.
    assert_eq!(both.len() + 1, schema.len() + concepts.len());

    let schema_reports = Reports::new(&schema);
    assert_eq!(schema_reports.count_of_type("rdfs:Class")?, 0);
    assert_eq!(schema_reports.count_of_type("sh:NodeShape")?, 2);
    Ok(())
}

#[test]
fn test_path_query_over_loaded_lists() -> Result<()> {
    let dir = tempdir()?;
    distribution(dir.path())?;
    let graph = CimLoader::new(dir.path(), Profile::CanonicalSchema).load_graph()?;

    let paths_from = |path: &str| -> Result<Vec<String>> {
        let q = Query::builder()
            .path(name("cim:C1Shape"), parse_path(path)?, var("path"))
            .order_by(["path"])
            .build();
        Ok(evaluate(&graph, &q)?
            .iter()
            .filter_map(|r| r.get("path"))
            .map(|t| graph.compact_term(t))
            .collect())
    };

    // The second `sh:and` member holds C1Shape's own properties; the first
    // is the parent shape.
    assert_eq!(
        paths_from("(sh:and/rdf:rest/rdf:first)*/sh:property/sh:path")?,
        vec!["P1"]
    );
    assert_eq!(
        paths_from("(sh:and/rdf:rest*/rdf:first)*/sh:property/sh:path")?,
        vec!["P1", "P2"]
    );
    assert!(paths_from("sh:and*/sh:property/sh:path")?.is_empty());
    Ok(())
}

// ============================================================================
// Loader → reports
// ============================================================================

#[test]
fn test_regeneration_reports_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    distribution(dir.path())?;
    let graph = CimLoader::new(dir.path(), Profile::ConceptualAndSchema).load_graph()?;
    let reports = Reports::new(&graph);

    assert_eq!(
        reports.subject_areas()?,
        "subjectAreaId\tsubjectAreaName\tdescription\nSA1\t\t\n"
    );

    let classes = reports.class_concepts()?;
    let rows: Vec<&str> = classes.lines().skip(1).collect();
    assert_eq!(
        rows,
        vec![
            "SA1\tEG1\tC1\tCustomer\tClass\t\tA customer record",
            "SA1\tEG1\tParty\tParty\tClass\t\tAnyone the business deals with",
        ]
    );

    assert_eq!(
        reports.property_concepts()?.lines().nth(1),
        Some("SA1\tEG1\tP1\tProperty\tC1\t\tC1:P1\t")
    );

    let schemas = reports.schemas()?;
    assert_eq!(schemas.lines().count(), 3);
    assert!(schemas.contains("C1\tSA1\tEG1\tC1Shape\tNodeShape\tC1\n"));
    assert!(schemas.contains("Party\tSA1\tEG1\tPartyShape\tNodeShape\tParty\n"));

    let props = reports.schema_properties()?;
    assert!(props.contains("C1:P1\tP1\tSA1\tEG1\tC1Shape\t\tstring\t1\t1\t\tC1\n"));
    // The parent shape's properties are reported under the parent only.
    assert!(!props.contains("C1:P2"));
    assert!(props.contains("Party:P2\tP2\tSA1\tEG1\tPartyShape\tPartyRef\t\t\t\tC1\tParty\n"));

    let all = reports.regenerate()?;
    assert_eq!(all.len(), 6);
    Ok(())
}

#[test]
fn test_narrative_reports_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    distribution(dir.path())?;
    let graph = CimLoader::new(dir.path(), Profile::ConceptualAndSchema).load_graph()?;
    let reports = Reports::new(&graph);

    let summary = reports.model_summary()?;
    assert_eq!(summary.subject_areas, 1);
    assert_eq!(summary.entity_groups, 1);
    assert_eq!(summary.classes, 2);
    assert_eq!(summary.properties, 1);
    assert_eq!(summary.statements, graph.len());

    let types = reports.render(ReportKind::Types)?;
    assert!(types.contains("  - SubjectArea\n"));
    assert!(types.contains("  - NodeShape\n"));

    let domains = reports.render(ReportKind::Domains)?;
    assert_eq!(domains, "** Property: P1\n  Property domain:\n    - C1\n\n");

    // Classes are not their own shapes in this distribution: nothing links.
    assert_eq!(
        reports.cardinalities()?,
        "* Class C1\n  1:1\n  1:n\n* Class Party\n  1:1\n  1:n\n"
    );
    Ok(())
}

#[test]
fn test_malformed_fragment_fails_the_whole_load() -> Result<()> {
    let dir = tempdir()?;
    distribution(dir.path())?;
    write(dir.path(), "model/Bad/Bad.concepts.jsonld", "[1, 2")?;

    let result = CimLoader::new(dir.path(), Profile::ConceptualAndSchema).load_graph();
    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_literals_survive_loading_with_types() -> Result<()> {
    let dir = tempdir()?;
    distribution(dir.path())?;
    let graph = CimLoader::new(dir.path(), Profile::CanonicalSchema).load_graph()?;

    let q = Query::builder()
        .triple(var("shape"), name("sh:minCount"), var("min"))
        .build();
    let rows = evaluate(&graph, &q)?;
    assert_eq!(rows.len(), 1);
    let min = rows.rows()[0].get("min").and_then(Term::as_literal).expect("literal");
    assert_eq!(min.as_integer(), Some(1));
    Ok(())
}
