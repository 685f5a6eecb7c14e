//! Template synthesis: the desired-state document handed to the engine.
//!
//! Output is canonical: `serde_json::Map` is backed by a `BTreeMap` (the
//! `preserve_order` feature is not enabled), so every object is emitted with
//! lexicographically sorted keys and two syntheses of the same stack are
//! byte-identical.

use crate::error::SynthError;
use crate::graph::ResourceGraph;
use crate::logical_id::LogicalId;
use crate::output::OutputSpec;
use crate::resource::Resource;
use crate::TEMPLATE_FORMAT_VERSION;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub description: Option<String>,
    pub resources: BTreeMap<LogicalId, Resource>,
    pub outputs: BTreeMap<String, OutputSpec>,
}

impl Template {
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(
            "AWSTemplateFormatVersion".to_owned(),
            Value::from(TEMPLATE_FORMAT_VERSION),
        );
        if let Some(d) = &self.description {
            doc.insert("Description".to_owned(), Value::from(d.as_str()));
        }
        let outputs: Map<String, Value> = self
            .outputs
            .iter()
            .map(|(name, o)| (name.clone(), o.to_json()))
            .collect();
        if !outputs.is_empty() {
            doc.insert("Outputs".to_owned(), Value::Object(outputs));
        }
        let resources: Map<String, Value> = self
            .resources
            .iter()
            .map(|(id, r)| (id.to_string(), r.to_json()))
            .collect();
        doc.insert("Resources".to_owned(), Value::Object(resources));
        Value::Object(doc)
    }

    /// Parse a synthesized template back. References must resolve inside the
    /// template and the dependency edges must be acyclic.
    pub fn from_json(value: &Value) -> Result<Self, SynthError> {
        let doc = value
            .as_object()
            .ok_or_else(|| SynthError::InvalidTemplate("template is not an object".to_owned()))?;

        let mut resources = BTreeMap::new();
        let raw_resources = doc
            .get("Resources")
            .and_then(Value::as_object)
            .ok_or_else(|| SynthError::InvalidTemplate("missing Resources section".to_owned()))?;
        for (raw_id, entry) in raw_resources {
            let id = LogicalId::parse(raw_id).ok_or_else(|| {
                SynthError::InvalidTemplate(format!("invalid logical id '{}'", raw_id))
            })?;
            resources.insert(id.clone(), Resource::from_json(id, entry)?);
        }

        let mut outputs = BTreeMap::new();
        if let Some(raw_outputs) = doc.get("Outputs").and_then(Value::as_object) {
            for (name, entry) in raw_outputs {
                outputs.insert(name.clone(), OutputSpec::from_json(name, entry)?);
            }
        }

        let template = Template {
            description: doc
                .get("Description")
                .and_then(Value::as_str)
                .map(str::to_owned),
            resources,
            outputs,
        };
        template.graph()?;
        Ok(template)
    }

    /// The validated dependency graph of the template's resources.
    pub fn graph(&self) -> Result<ResourceGraph, SynthError> {
        let mut graph = ResourceGraph::new();
        for r in self.resources.values() {
            graph.add(r.clone())?;
        }
        graph.validate()?;
        for output in self.outputs.values() {
            if !graph.contains(output.value.target()) {
                return Err(SynthError::DependencyResolution {
                    resource: format!("Outputs.{}", output.name),
                    target: output.value.target().to_string(),
                });
            }
        }
        Ok(graph)
    }
}

/// Compute SHA-256 etag from the compact JSON representation.
pub fn compute_etag(template: &Value) -> String {
    let canonical = template.to_string();
    let hash = Sha256::digest(canonical.as_bytes());
    format!("{:x}", hash)
}

/// Wrap a template in a manifest envelope carrying its etag, so the engine
/// can skip a deployment whose desired state did not change.
pub fn build_manifest(template: &Template) -> Value {
    let body = template.to_json();
    let etag = compute_etag(&body);
    let mut map = Map::new();
    map.insert("etag".to_owned(), Value::String(etag));
    map.insert("template".to_owned(), body);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Reference;
    use crate::resource::ResourceType;
    use serde_json::json;

    fn id(raw: &str) -> LogicalId {
        LogicalId::parse(raw).unwrap()
    }

    fn sample() -> Template {
        let table = Resource::new(id("Table"), ResourceType::Table, json!({"BillingMode": "PAY_PER_REQUEST"}));
        let url = Resource::new(
            id("Url"),
            ResourceType::FunctionUrl,
            json!({"TargetFunctionArn": {"Fn::GetAtt": ["Table", "Arn"]}}),
        );
        let out = OutputSpec {
            name: "Url".to_owned(),
            value: Reference::attribute_of(&id("Url"), "FunctionUrl"),
            description: None,
        };
        Template {
            description: Some("test".to_owned()),
            resources: BTreeMap::from([(id("Table"), table), (id("Url"), url)]),
            outputs: BTreeMap::from([("Url".to_owned(), out)]),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let t = sample();
        let back = Template::from_json(&t.to_json()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_output_to_unknown_resource_is_rejected() {
        let mut t = sample();
        t.outputs.get_mut("Url").unwrap().value = Reference::attribute_of(&id("Gone"), "FunctionUrl");
        let err = Template::from_json(&t.to_json()).unwrap_err();
        assert_eq!(err.kind(), "DependencyResolutionError");
    }

    #[test]
    fn test_missing_resources_section() {
        let err = Template::from_json(&json!({"AWSTemplateFormatVersion": "2010-09-09"})).unwrap_err();
        assert!(err.to_string().contains("Resources"));
    }

    #[test]
    fn test_manifest_etag_is_stable() {
        let a = build_manifest(&sample());
        let b = build_manifest(&sample());
        assert_eq!(a["etag"], b["etag"]);
        assert_eq!(a["etag"].as_str().unwrap().len(), 64);
        assert_eq!(a["template"]["AWSTemplateFormatVersion"], "2010-09-09");
    }
}
