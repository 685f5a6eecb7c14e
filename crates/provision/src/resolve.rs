//! Reference substitution against deployed state.

use cicd_stack_core::{LogicalId, Reference};
use serde_json::Value;

use crate::error::ProvisionError;
use crate::state::DeployedState;

/// Resolve one reference to its concrete value.
pub fn resolve_reference(
    reference: &Reference,
    state: &DeployedState,
    owner: &str,
) -> Result<String, ProvisionError> {
    let unresolved = |target: String| ProvisionError::UnresolvedReference {
        resource: owner.to_owned(),
        target,
    };
    let physical = state
        .physical(reference.target())
        .ok_or_else(|| unresolved(reference.target().to_string()))?;
    match reference {
        Reference::Ref(_) => Ok(physical.physical_id.clone()),
        Reference::GetAtt { target, attribute } => physical
            .attributes
            .get(attribute)
            .cloned()
            .ok_or_else(|| unresolved(format!("{}.{}", target, attribute))),
    }
}

/// Copy `value`, replacing every reference node with its concrete value.
pub fn resolve_properties(
    value: &Value,
    state: &DeployedState,
    owner: &LogicalId,
) -> Result<Value, ProvisionError> {
    if let Some(reference) = Reference::from_json(value) {
        return resolve_reference(&reference, state, owner.as_str()).map(Value::String);
    }
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| resolve_properties(v, state, owner))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), resolve_properties(v, state, owner)?)))
            .collect::<Result<serde_json::Map<_, _>, ProvisionError>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}
