//! Output exporter.

use crate::endpoint::EndpointSpec;
use crate::error::SynthError;
use crate::reference::Reference;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the output carrying the public endpoint URL.
pub const URL_OUTPUT: &str = "Url";

/// A declared stack output; its value is resolved after materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub name: String,
    pub value: Reference,
    pub description: Option<String>,
}

impl OutputSpec {
    pub fn to_json(&self) -> Value {
        let mut m = Map::new();
        if let Some(d) = &self.description {
            m.insert("Description".to_owned(), Value::from(d.as_str()));
        }
        m.insert("Value".to_owned(), self.value.to_json());
        Value::Object(m)
    }

    pub fn from_json(name: &str, value: &Value) -> Result<Self, SynthError> {
        let reference = value
            .get("Value")
            .and_then(Reference::from_json)
            .ok_or_else(|| {
                SynthError::InvalidTemplate(format!(
                    "output '{}' must have a Ref or Fn::GetAtt value",
                    name
                ))
            })?;
        Ok(OutputSpec {
            name: name.to_owned(),
            value: reference,
            description: value
                .get("Description")
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
    }
}

/// Export the endpoint URL as the `Url` output.
pub fn export_url(endpoint: &EndpointSpec) -> OutputSpec {
    OutputSpec {
        name: URL_OUTPUT.to_owned(),
        value: endpoint.url(),
        description: Some("Public invocation URL of the function".to_owned()),
    }
}

/// The user-facing result of a materialized stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub url: String,
}
