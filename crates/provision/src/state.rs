//! Deployed state: what the engine has materialized so far.

use cicd_stack_core::{
    LogicalId, Resource, StackOutput, StackStatus, SynthError, URL_OUTPUT,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ProvisionError;

/// Provider-assigned identity of a materialized resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalResource {
    pub physical_id: String,
    /// Attributes readable through `Fn::GetAtt` (e.g. `Arn`, `FunctionUrl`).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// One materialized resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployedResource {
    pub physical: PhysicalResource,
    /// The template entry it was materialized from (symbolic form).
    pub template: Value,
    /// The properties actually sent to the provider, references substituted.
    pub resolved: Value,
}

impl DeployedResource {
    pub fn new(resource: &Resource, resolved: Value, physical: PhysicalResource) -> Self {
        DeployedResource {
            physical,
            template: resource.to_json(),
            resolved,
        }
    }

    /// The symbolic resource this record was materialized from.
    pub fn resource(&self, id: &LogicalId) -> Result<Resource, SynthError> {
        Resource::from_json(id.clone(), &self.template)
    }
}

/// A physical resource displaced by a replacement and not yet removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupersededResource {
    pub id: LogicalId,
    pub record: DeployedResource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployedState {
    pub stack_name: String,
    pub resources: BTreeMap<LogicalId, DeployedResource>,
    /// Replaced physical resources awaiting removal, oldest first. Drained
    /// at the end of a successful convergence.
    #[serde(default)]
    pub superseded: Vec<SupersededResource>,
    /// Resolved output values, filled in once convergence completes.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    /// Whether the last convergence finished.
    #[serde(default)]
    pub complete: bool,
}

impl DeployedState {
    pub fn new(stack_name: &str) -> Self {
        DeployedState {
            stack_name: stack_name.to_owned(),
            resources: BTreeMap::new(),
            superseded: Vec::new(),
            outputs: BTreeMap::new(),
            complete: false,
        }
    }

    pub fn status(&self) -> StackStatus {
        if self.complete {
            StackStatus::Materialized
        } else {
            StackStatus::Unmaterialized
        }
    }

    pub fn physical(&self, id: &LogicalId) -> Option<&PhysicalResource> {
        self.resources.get(id).map(|r| &r.physical)
    }

    /// Every physical resource the state accounts for, current and superseded.
    pub fn records(&self) -> impl Iterator<Item = (&LogicalId, &DeployedResource)> {
        self.resources
            .iter()
            .chain(self.superseded.iter().map(|s| (&s.id, &s.record)))
    }

    /// Symbolic resources of every deployed entry, for planning.
    pub fn desired_resources(&self) -> Result<BTreeMap<LogicalId, Resource>, SynthError> {
        self.resources
            .iter()
            .map(|(id, r)| Ok((id.clone(), r.resource(id)?)))
            .collect()
    }

    /// The user-facing result; only available once Materialized.
    pub fn stack_output(&self) -> Result<StackOutput, ProvisionError> {
        let not_materialized = || ProvisionError::NotMaterialized {
            stack: self.stack_name.clone(),
        };
        if self.status() != StackStatus::Materialized {
            return Err(not_materialized());
        }
        match self.outputs.get(URL_OUTPUT) {
            Some(url) if !url.is_empty() => Ok(StackOutput { url: url.clone() }),
            _ => Err(not_materialized()),
        }
    }
}
