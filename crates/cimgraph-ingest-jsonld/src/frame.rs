//! Framing by type: every node of one type, merged across fragments and
//! compacted against the shared context.
//!
//! Fragments describe the same node in several files (a class in its
//! concepts file, its shape in a schema file), so expanded node objects are
//! first merged by identifier. References to other nodes stay references;
//! nothing is embedded.

use std::collections::BTreeMap;

use cimgraph_factdb::vocab::{rdf, xsd};
use cimgraph_factdb::{Literal, NodeDocument, NodeObject, NodeRef, NodeValue};
use serde_json::{json, Map, Number, Value};

use crate::context::{ActiveContext, Container, TermDefinition, TypeMapping};

// ============================================================================
// Node map
// ============================================================================

/// Node objects of a set of documents, merged by identifier.
#[derive(Debug, Default)]
pub struct NodeMap {
    named: BTreeMap<String, NodeObject>,
    anonymous: Vec<NodeObject>,
}

impl NodeMap {
    pub fn from_documents(docs: &[NodeDocument]) -> Self {
        let mut map = NodeMap::default();
        for (doc, document) in docs.iter().enumerate() {
            for node in &document.nodes {
                let node = map.flatten(node, doc);
                match node.id.clone() {
                    Some(id) => map.merge(id, node),
                    None => map.anonymous.push(node),
                }
            }
        }
        map
    }

    pub fn len(&self) -> usize {
        self.named.len() + self.anonymous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, iri: &str) -> Option<&NodeObject> {
        self.named.get(iri)
    }

    /// Nodes typed `type_iri`: identified nodes in identifier order, then
    /// anonymous ones in document order.
    pub fn of_type<'a>(&'a self, type_iri: &'a str) -> impl Iterator<Item = &'a NodeObject> + 'a {
        self.named
            .values()
            .chain(&self.anonymous)
            .filter(move |node| has_type(node, type_iri))
    }

    /// Scope blank labels to their document and lift identified embedded
    /// nodes into the map, leaving a reference in their place.
    fn flatten(&mut self, node: &NodeObject, doc: usize) -> NodeObject {
        let mut out = NodeObject::new(node.id.as_ref().map(|id| scoped(id, doc)));
        for (predicate, values) in &node.properties {
            for value in values {
                let value = self.flatten_value(value, doc);
                out.push(predicate.clone(), value);
            }
        }
        out
    }

    fn flatten_value(&mut self, value: &NodeValue, doc: usize) -> NodeValue {
        match value {
            NodeValue::Object(inner) => {
                let inner = self.flatten(inner, doc);
                match inner.id.clone() {
                    Some(id) => {
                        self.merge(id.clone(), inner);
                        NodeValue::Ref(id)
                    }
                    None => NodeValue::Object(inner),
                }
            }
            NodeValue::Ref(id) => NodeValue::Ref(scoped(id, doc)),
            NodeValue::List(items) => NodeValue::List(
                items
                    .iter()
                    .map(|item| self.flatten_value(item, doc))
                    .collect(),
            ),
            NodeValue::Literal(lit) => NodeValue::Literal(lit.clone()),
        }
    }

    fn merge(&mut self, id: NodeRef, node: NodeObject) {
        let entry = self
            .named
            .entry(id_key(&id))
            .or_insert_with(|| NodeObject::new(Some(id)));
        for (predicate, values) in node.properties {
            for value in values {
                let seen = entry
                    .properties
                    .iter()
                    .any(|(p, vs)| *p == predicate && vs.contains(&value));
                if !seen {
                    entry.push(predicate.clone(), value);
                }
            }
        }
    }
}

fn scoped(id: &NodeRef, doc: usize) -> NodeRef {
    match id {
        NodeRef::Blank(label) => NodeRef::Blank(format!("d{doc}-{label}")),
        iri => iri.clone(),
    }
}

fn id_key(id: &NodeRef) -> String {
    match id {
        NodeRef::Iri(iri) => iri.clone(),
        NodeRef::Blank(label) => format!("_:{label}"),
    }
}

fn has_type(node: &NodeObject, type_iri: &str) -> bool {
    node.properties.iter().any(|(p, values)| {
        p == rdf::TYPE
            && values
                .iter()
                .any(|v| matches!(v, NodeValue::Ref(NodeRef::Iri(t)) if t == type_iri))
    })
}

// ============================================================================
// Compaction
// ============================================================================

/// Reverse lookups from IRIs to a context's terms and prefixes.
#[derive(Debug)]
pub struct Compactor<'c> {
    /// Defined terms, shortest name first
    terms: Vec<(&'c str, &'c TermDefinition)>,
    /// (namespace, prefix), longest namespace first
    prefixes: Vec<(&'c str, &'c str)>,
}

impl<'c> Compactor<'c> {
    pub fn new(context: &'c ActiveContext) -> Self {
        let mut terms: Vec<(&str, &TermDefinition)> = context
            .terms
            .iter()
            .filter(|(_, def)| def.id.is_some())
            .map(|(term, def)| (term.as_str(), def))
            .collect();
        terms.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then(a.0.cmp(b.0)));

        let mut prefixes: Vec<(&str, &str)> = terms
            .iter()
            .filter(|(term, def)| {
                !term.contains(':') && def.type_mapping.is_none() && def.container.is_none()
            })
            .filter_map(|(term, def)| {
                let ns = def.id.as_deref()?;
                (ns.ends_with('/') || ns.ends_with('#')).then_some((ns, *term))
            })
            .collect();
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.1.cmp(b.1)));

        Self { terms, prefixes }
    }

    /// Compact IRI for an identifier position; terms are not used.
    pub fn compact_id(&self, iri: &str) -> String {
        for (ns, prefix) in &self.prefixes {
            if let Some(suffix) = iri.strip_prefix(ns) {
                if !suffix.is_empty() {
                    return format!("{prefix}:{suffix}");
                }
            }
        }
        iri.to_string()
    }

    /// A plain term mapped to `iri`, else its compact IRI.
    pub fn compact_vocab(&self, iri: &str) -> String {
        self.terms
            .iter()
            .find(|(_, def)| {
                def.id.as_deref() == Some(iri) && def.type_mapping.is_none() && def.container.is_none()
            })
            .map(|(term, _)| term.to_string())
            .unwrap_or_else(|| self.compact_id(iri))
    }

    /// A node object in compacted form.
    pub fn node(&self, node: &NodeObject) -> Value {
        let mut out = Map::new();
        if let Some(id) = &node.id {
            out.insert("@id".to_string(), Value::String(self.node_id(id)));
        }
        for (predicate, values) in &node.properties {
            if predicate == rdf::TYPE {
                let types = values
                    .iter()
                    .filter_map(|v| match v {
                        NodeValue::Ref(NodeRef::Iri(iri)) => Some(Value::String(self.compact_vocab(iri))),
                        NodeValue::Ref(blank) => Some(Value::String(self.node_id(blank))),
                        _ => None,
                    })
                    .collect();
                out.insert("@type".to_string(), one_or_many(types));
                continue;
            }

            let (key, def) = self.key_for(predicate, values);
            let rendered: Vec<Value> = values.iter().map(|v| self.value(v, def)).collect();
            let value = match def.and_then(|d| d.container) {
                Some(Container::List) => rendered
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| Value::Array(Vec::new())),
                Some(Container::Set) => Value::Array(rendered),
                None => one_or_many(rendered),
            };
            out.insert(key, value);
        }
        Value::Object(out)
    }

    /// Property key and the term definition its values are written for.
    ///
    /// A list-container term is only used for a single list value.
    fn key_for(&self, predicate: &str, values: &[NodeValue]) -> (String, Option<&'c TermDefinition>) {
        let single_list = matches!(values, [NodeValue::List(_)]);
        self.terms
            .iter()
            .find(|(_, def)| {
                def.id.as_deref() == Some(predicate)
                    && (def.container == Some(Container::List)) == single_list
            })
            .map(|(term, def)| (term.to_string(), Some(*def)))
            .unwrap_or_else(|| (self.compact_id(predicate), None))
    }

    fn node_id(&self, id: &NodeRef) -> String {
        match id {
            NodeRef::Iri(iri) => self.compact_id(iri),
            NodeRef::Blank(label) => format!("_:{label}"),
        }
    }

    fn value(&self, value: &NodeValue, def: Option<&TermDefinition>) -> Value {
        let coercion = def.and_then(|d| d.type_mapping.as_ref());
        match value {
            NodeValue::Ref(id) => match (coercion, id) {
                (Some(TypeMapping::Id), _) => Value::String(self.node_id(id)),
                (Some(TypeMapping::Vocab), NodeRef::Iri(iri)) => Value::String(self.compact_vocab(iri)),
                _ => json!({ "@id": self.node_id(id) }),
            },
            NodeValue::Literal(lit) => self.literal(lit, coercion),
            NodeValue::Object(inner) => self.node(inner),
            NodeValue::List(items) => {
                let items: Vec<Value> = items.iter().map(|item| self.value(item, def)).collect();
                if def.is_some_and(|d| d.container == Some(Container::List)) {
                    Value::Array(items)
                } else {
                    json!({ "@list": items })
                }
            }
        }
    }

    fn literal(&self, lit: &Literal, coercion: Option<&TypeMapping>) -> Value {
        let datatype = lit.datatype.as_deref();
        if let Some(TypeMapping::Datatype(dt)) = coercion {
            return if datatype == Some(dt.as_str()) {
                Value::String(lit.lexical.clone())
            } else {
                self.value_object(lit)
            };
        }
        match datatype {
            None => Value::String(lit.lexical.clone()),
            Some(xsd::INTEGER) => lit
                .lexical
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| self.value_object(lit)),
            Some(xsd::DOUBLE) => lit
                .lexical
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| self.value_object(lit)),
            Some(xsd::BOOLEAN) => match lit.lexical.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => self.value_object(lit),
            },
            Some(_) => self.value_object(lit),
        }
    }

    fn value_object(&self, lit: &Literal) -> Value {
        let mut map = Map::new();
        map.insert("@value".to_string(), Value::String(lit.lexical.clone()));
        if let Some(dt) = &lit.datatype {
            map.insert("@type".to_string(), Value::String(self.compact_vocab(dt)));
        }
        Value::Object(map)
    }
}

fn one_or_many(mut values: Vec<Value>) -> Value {
    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand_document;

    fn context() -> Value {
        json!({
            "cim": "http://cloudinformationmodel.org/model/",
            "rdf": "http://www.w3.org/1999/02/22-rdf-syntax-ns#",
            "rdfs": "http://www.w3.org/2000/01/rdf-schema#",
            "xsd": "http://www.w3.org/2001/XMLSchema#",
            "name": "rdfs:label",
            "domain": {"@id": "rdfs:domain", "@type": "@id"},
            "values": {"@id": "cim:values", "@container": "@list"}
        })
    }

    fn doc(source: &str, mut body: Value) -> NodeDocument {
        body["@context"] = context();
        expand_document(&body, source).unwrap()
    }

    #[test]
    fn nodes_merge_across_documents_and_keep_blank_labels_apart() {
        let docs = [
            doc("a", json!({"@graph": [
                {"@id": "cim:P1", "@type": "rdf:Property", "name": "one"},
                {"@id": "_:x", "name": "first"}
            ]})),
            doc("b", json!({"@graph": [
                {"@id": "cim:P1", "name": ["one", "uno"], "domain": "cim:C1"},
                {"@id": "_:x", "name": "second"}
            ]})),
        ];
        let map = NodeMap::from_documents(&docs);
        assert_eq!(map.len(), 3);

        let p1 = map.get("http://cloudinformationmodel.org/model/P1").unwrap();
        let names = p1
            .properties
            .iter()
            .find(|(p, _)| p.ends_with("#label"))
            .map(|(_, vs)| vs.len());
        assert_eq!(names, Some(2));
    }

    #[test]
    fn compaction_uses_terms_prefixes_and_native_values() {
        let active = ActiveContext::new().extend(&context()).unwrap();
        let docs = [doc("a", json!({
            "@id": "cim:P1",
            "@type": "rdf:Property",
            "name": "customerName",
            "domain": "cim:C1",
            "cim:required": true,
            "cim:order": 3,
            "values": ["a", "b"],
            "cim:note": {"@value": "x", "@type": "xsd:token"}
        }))];
        let map = NodeMap::from_documents(&docs);
        let compactor = Compactor::new(&active);
        let framed: Vec<Value> = map
            .of_type(rdf::PROPERTY)
            .map(|n| compactor.node(n))
            .collect();
        assert_eq!(
            framed,
            vec![json!({
                "@id": "cim:P1",
                "@type": "rdf:Property",
                "name": "customerName",
                "domain": "cim:C1",
                "cim:required": true,
                "cim:order": 3,
                "values": ["a", "b"],
                "cim:note": {"@value": "x", "@type": "xsd:token"}
            })]
        );
    }
}
