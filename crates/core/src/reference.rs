//! Symbolic cross-resource references.
//!
//! A reference is a typed placeholder for a value that only exists once the
//! target resource has been materialized: its physical name (`Ref`) or one of
//! its attributes (`Fn::GetAtt`). The builder never fabricates those values;
//! the provisioning engine substitutes them in dependency order.

use crate::logical_id::LogicalId;
use serde_json::{json, Value};

const REF_KEY: &str = "Ref";
const GET_ATT_KEY: &str = "Fn::GetAtt";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reference {
    /// The physical name of the target.
    Ref(LogicalId),
    /// A named attribute of the target (e.g. `Arn`, `FunctionUrl`).
    GetAtt {
        target: LogicalId,
        attribute: String,
    },
}

impl Reference {
    pub fn name_of(target: &LogicalId) -> Self {
        Reference::Ref(target.clone())
    }

    pub fn attribute_of(target: &LogicalId, attribute: &str) -> Self {
        Reference::GetAtt {
            target: target.clone(),
            attribute: attribute.to_owned(),
        }
    }

    /// The resource this reference points at.
    pub fn target(&self) -> &LogicalId {
        match self {
            Reference::Ref(target) => target,
            Reference::GetAtt { target, .. } => target,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Reference::Ref(target) => json!({ REF_KEY: target.as_str() }),
            Reference::GetAtt { target, attribute } => {
                json!({ GET_ATT_KEY: [target.as_str(), attribute] })
            }
        }
    }

    /// Recognize a reference node. Returns `None` for any other value,
    /// including a `Ref` whose target is not a valid logical id.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.len() != 1 {
            return None;
        }
        if let Some(target) = obj.get(REF_KEY) {
            return LogicalId::parse(target.as_str()?).map(Reference::Ref);
        }
        let parts = obj.get(GET_ATT_KEY)?.as_array()?;
        match parts.as_slice() {
            [target, attribute] => Some(Reference::GetAtt {
                target: LogicalId::parse(target.as_str()?)?,
                attribute: attribute.as_str()?.to_owned(),
            }),
            _ => None,
        }
    }
}

/// Collect every reference embedded in a property tree, in document order.
pub fn collect_references(value: &Value, out: &mut Vec<Reference>) {
    if let Some(reference) = Reference::from_json(value) {
        out.push(reference);
        return;
    }
    match value {
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_references(v, out)),
        _ => {}
    }
}
