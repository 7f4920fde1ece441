//! JSON-LD (subset) to node documents.
//!
//! Handles what the vocabulary distribution uses: term definitions with
//! `@type` coercion and `@list` / `@set` containers, compact IRIs, `@vocab`,
//! `@base`, `@id`, `@type`, value objects, native numbers and booleans,
//! `@list`, `@set`, `@graph` and embedded contexts. Anything else is skipped
//! with a warning.

use cimgraph_factdb::document::is_absolute_iri;
use cimgraph_factdb::vocab::{rdf, xsd};
use cimgraph_factdb::{Literal, NodeDocument, NodeObject, NodeRef, NodeValue};
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::context::{ActiveContext, Container, TermDefinition, TypeMapping};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExpandError {
    pub message: String,
}

/// Expand one JSON-LD document into a node document.
///
/// `source` names the document in errors and logs. The document's own
/// `@context` (if any) is processed first.
pub fn expand_document(json: &Value, source: &str) -> Result<NodeDocument, ExpandError> {
    let mut expander = Expander {
        source,
        nodes: Vec::new(),
    };
    expander
        .top_level(json, &ActiveContext::new())
        .map_err(|message| ExpandError { message })?;
    Ok(NodeDocument {
        source: source.to_string(),
        nodes: expander.nodes,
    })
}

struct Expander<'a> {
    source: &'a str,
    nodes: Vec<NodeObject>,
}

impl Expander<'_> {
    fn top_level(&mut self, json: &Value, ctx: &ActiveContext) -> Result<(), String> {
        match json {
            Value::Array(items) => {
                for item in items {
                    self.top_level(item, ctx)?;
                }
                Ok(())
            }
            Value::Object(map) => {
                // A bare `{"@context", "@graph"}` wrapper yields only its graph nodes.
                let node = self.node(map, ctx)?;
                if !node.properties.is_empty() {
                    self.nodes.push(node);
                }
                Ok(())
            }
            Value::Null => Ok(()),
            other => Err(format!("top-level value must be an object or array, got {other}")),
        }
    }

    fn node(&mut self, map: &Map<String, Value>, ctx: &ActiveContext) -> Result<NodeObject, String> {
        let ctx = local_context(map, ctx)?;
        let mut node = NodeObject::new(None);

        if let Some(id) = map.get("@id") {
            let Some(id) = id.as_str() else {
                return Err(format!("@id must be a string, got {id}"));
            };
            node.id = self.reference(&ctx.expand_iri(id, false));
        }

        for (key, value) in map {
            match key.as_str() {
                "@context" | "@id" => {}
                "@type" => {
                    for ty in as_array(value) {
                        let Some(ty) = ty.as_str() else {
                            return Err(format!("@type must be a string, got {ty}"));
                        };
                        if let Some(r) = self.reference(&ctx.expand_iri(ty, true)) {
                            node.push(rdf::TYPE, NodeValue::Ref(r));
                        }
                    }
                }
                "@graph" => {
                    // Nested graphs are merged into the default graph.
                    self.top_level(value, &ctx)?;
                }
                k if k.starts_with('@') => {
                    warn!(source = self.source, keyword = k, "unsupported keyword skipped");
                }
                k => {
                    let def = ctx.term(k).cloned().unwrap_or_default();
                    if ctx.term(k).is_some_and(|d| d.id.is_none()) {
                        debug!(source = self.source, key = k, "term mapped to null dropped");
                        continue;
                    }
                    let predicate = ctx.expand_iri(k, true);
                    if !is_absolute_iri(&predicate) {
                        debug!(source = self.source, key = k, "key without IRI mapping dropped");
                        continue;
                    }
                    let values = self.values(value, &def, &ctx)?;
                    for v in values {
                        node.push(predicate.clone(), v);
                    }
                }
            }
        }
        Ok(node)
    }

    /// Values of one property, with arrays flattened unless the term is a list.
    fn values(
        &mut self,
        value: &Value,
        def: &TermDefinition,
        ctx: &ActiveContext,
    ) -> Result<Vec<NodeValue>, String> {
        if def.container == Some(Container::List) {
            if let Value::Array(items) = value {
                return Ok(vec![NodeValue::List(self.list_items(items, def, ctx)?)]);
            }
            if !is_list_object(value) {
                let items = self.values(value, &TermDefinition { container: None, ..def.clone() }, ctx)?;
                return Ok(vec![NodeValue::List(items)]);
            }
        }

        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.extend(self.values(item, def, ctx)?);
                }
                Ok(out)
            }
            Value::Object(map) => self.object_value(map, def, ctx),
            Value::String(s) => Ok(self.string_value(s, def, ctx).into_iter().collect()),
            Value::Number(n) => Ok(vec![NodeValue::Literal(number_literal(n, def))]),
            Value::Bool(b) => Ok(vec![NodeValue::Literal(match &def.type_mapping {
                Some(TypeMapping::Datatype(dt)) => Literal::typed(b.to_string(), dt.clone()),
                _ => Literal::boolean(*b),
            })]),
        }
    }

    fn list_items(
        &mut self,
        items: &[Value],
        def: &TermDefinition,
        ctx: &ActiveContext,
    ) -> Result<Vec<NodeValue>, String> {
        let item_def = TermDefinition {
            container: None,
            ..def.clone()
        };
        let mut out = Vec::new();
        for item in items {
            out.extend(self.values(item, &item_def, ctx)?);
        }
        Ok(out)
    }

    fn object_value(
        &mut self,
        map: &Map<String, Value>,
        def: &TermDefinition,
        ctx: &ActiveContext,
    ) -> Result<Vec<NodeValue>, String> {
        if let Some(v) = map.get("@value") {
            return Ok(value_object(v, map.get("@type"), ctx)?
                .map(NodeValue::Literal)
                .into_iter()
                .collect());
        }
        if let Some(list) = map.get("@list") {
            let items = match list {
                Value::Array(items) => self.list_items(items, def, ctx)?,
                single => self.list_items(std::slice::from_ref(single), def, ctx)?,
            };
            return Ok(vec![NodeValue::List(items)]);
        }
        if let Some(set) = map.get("@set") {
            let plain = TermDefinition {
                container: None,
                ..def.clone()
            };
            return self.values(set, &plain, ctx);
        }

        let is_reference = map.keys().all(|k| k == "@id");
        let node = self.node(map, ctx)?;
        if is_reference {
            return Ok(node.id.map(NodeValue::Ref).into_iter().collect());
        }
        Ok(vec![NodeValue::Object(node)])
    }

    fn string_value(&mut self, s: &str, def: &TermDefinition, ctx: &ActiveContext) -> Option<NodeValue> {
        match &def.type_mapping {
            Some(TypeMapping::Id) => self.reference(&ctx.expand_iri(s, false)).map(NodeValue::Ref),
            Some(TypeMapping::Vocab) => self.reference(&ctx.expand_iri(s, true)).map(NodeValue::Ref),
            Some(TypeMapping::Datatype(dt)) => {
                Some(NodeValue::Literal(Literal::typed(s.to_string(), dt.clone())))
            }
            None => Some(NodeValue::Literal(Literal::plain(s.to_string()))),
        }
    }

    /// Node reference for an expanded IRI; relative leftovers are dropped.
    fn reference(&self, expanded: &str) -> Option<NodeRef> {
        if let Some(label) = expanded.strip_prefix("_:") {
            return Some(NodeRef::Blank(label.to_string()));
        }
        if is_absolute_iri(expanded) {
            return Some(NodeRef::Iri(expanded.to_string()));
        }
        warn!(source = self.source, iri = expanded, "unresolvable IRI reference dropped");
        None
    }
}

fn local_context(map: &Map<String, Value>, ctx: &ActiveContext) -> Result<ActiveContext, String> {
    match map.get("@context") {
        Some(local) => ctx.extend(local),
        None => Ok(ctx.clone()),
    }
}

fn as_array(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        single => std::slice::from_ref(single),
    }
}

fn is_list_object(value: &Value) -> bool {
    value.as_object().is_some_and(|m| m.contains_key("@list"))
}

fn number_literal(n: &Number, def: &TermDefinition) -> Literal {
    if let Some(TypeMapping::Datatype(dt)) = &def.type_mapping {
        return Literal::typed(n.to_string(), dt.clone());
    }
    if n.is_i64() || n.is_u64() {
        Literal::typed(n.to_string(), xsd::INTEGER)
    } else {
        Literal::typed(n.to_string(), xsd::DOUBLE)
    }
}

fn value_object(
    value: &Value,
    datatype: Option<&Value>,
    ctx: &ActiveContext,
) -> Result<Option<Literal>, String> {
    let datatype = match datatype {
        None | Some(Value::Null) => None,
        Some(Value::String(dt)) => Some(ctx.expand_iri(dt, true)),
        Some(other) => return Err(format!("value object @type must be a string, got {other}")),
    };
    let lexical = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            let default = if n.is_i64() || n.is_u64() { xsd::INTEGER } else { xsd::DOUBLE };
            return Ok(Some(Literal::typed(
                n.to_string(),
                datatype.unwrap_or_else(|| default.to_string()),
            )));
        }
        Value::Bool(b) => {
            return Ok(Some(Literal::typed(
                b.to_string(),
                datatype.unwrap_or_else(|| xsd::BOOLEAN.to_string()),
            )))
        }
        other => return Err(format!("@value must be a scalar, got {other}")),
    };
    Ok(Some(Literal {
        lexical,
        datatype,
    }))
}
