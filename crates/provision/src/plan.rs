//! Change planning: diff previously deployed resources against a desired
//! template and classify each resource as create, update, replace, delete
//! or unchanged.

use cicd_stack_core::reference::collect_references;
use cicd_stack_core::{LogicalId, Resource, ResourceType, Template};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::ProvisionError;
use crate::state::DeployedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeAction {
    Create,
    Update,
    /// An immutable property changed; a new physical resource is created and
    /// the old one removed afterwards.
    Replace,
    Delete,
    NoChange,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Replace => "replace",
            ChangeAction::Delete => "delete",
            ChangeAction::NoChange => "no-change",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            ChangeAction::Create => "+",
            ChangeAction::Update => "~",
            ChangeAction::Replace => "-/+",
            ChangeAction::Delete => "-",
            ChangeAction::NoChange => "=",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A planned change to one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceChange {
    pub id: LogicalId,
    pub resource_type: ResourceType,
    pub action: ChangeAction,
    /// Top-level fields that differ (properties and resource attributes).
    pub fields: Vec<String>,
}

/// The result of diffing deployed resources against a desired template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    pub changes: Vec<ResourceChange>,
}

impl Plan {
    /// Returns true if applying the plan would change nothing.
    pub fn is_empty(&self) -> bool {
        self.changes
            .iter()
            .all(|c| c.action == ChangeAction::NoChange)
    }

    pub fn get(&self, id: &LogicalId) -> Option<&ResourceChange> {
        self.changes.iter().find(|c| &c.id == id)
    }

    pub fn count(&self, action: ChangeAction) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }

    /// Serialize the plan to a JSON value.
    pub fn to_json(&self) -> Value {
        let changes: Vec<Value> = self
            .changes
            .iter()
            .filter(|c| c.action != ChangeAction::NoChange)
            .map(|c| {
                json!({
                    "action": c.action.as_str(),
                    "fields": c.fields,
                    "id": c.id.as_str(),
                    "type": c.resource_type.as_str(),
                })
            })
            .collect();
        json!({
            "changes": changes,
            "unchanged": self.count(ChangeAction::NoChange),
        })
    }

    /// Format the plan as human-readable text.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();
        for c in self.changes.iter().filter(|c| c.action != ChangeAction::NoChange) {
            if c.fields.is_empty() {
                lines.push(format!("{} {} {}", c.action.symbol(), c.resource_type, c.id));
            } else {
                lines.push(format!(
                    "{} {} {} ({})",
                    c.action.symbol(),
                    c.resource_type,
                    c.id,
                    c.fields.join(", ")
                ));
            }
        }
        if lines.is_empty() {
            lines.push("No changes.".to_owned());
        }
        lines.join("\n")
    }
}

/// Diff two resource sets.
pub fn diff(
    previous: &BTreeMap<LogicalId, Resource>,
    desired: &BTreeMap<LogicalId, Resource>,
) -> Plan {
    let mut changes = Vec::new();

    for (id, want) in desired {
        let change = match previous.get(id) {
            None => ResourceChange {
                id: id.clone(),
                resource_type: want.resource_type,
                action: ChangeAction::Create,
                fields: Vec::new(),
            },
            Some(have) => classify(have, want),
        };
        changes.push(change);
    }

    for (id, have) in previous {
        if !desired.contains_key(id) {
            changes.push(ResourceChange {
                id: id.clone(),
                resource_type: have.resource_type,
                action: ChangeAction::Delete,
                fields: Vec::new(),
            });
        }
    }

    mark_replaced_dependents(&mut changes, desired);
    changes.sort_by(|a, b| a.id.cmp(&b.id));
    Plan { changes }
}

/// A replacement gets a new physical id and new attributes, so an unchanged
/// resource that references it is re-applied with the new values.
fn mark_replaced_dependents(changes: &mut [ResourceChange], desired: &BTreeMap<LogicalId, Resource>) {
    let replaced: BTreeSet<LogicalId> = changes
        .iter()
        .filter(|c| c.action == ChangeAction::Replace)
        .map(|c| c.id.clone())
        .collect();
    if replaced.is_empty() {
        return;
    }
    for change in changes
        .iter_mut()
        .filter(|c| c.action == ChangeAction::NoChange)
    {
        let Some(want) = desired.get(&change.id) else {
            continue;
        };
        let fields = fields_referencing(&want.properties, &replaced);
        if !fields.is_empty() {
            change.action = ChangeAction::Update;
            change.fields = fields;
        }
    }
}

/// Top-level property keys holding a reference to any of `targets`, sorted.
fn fields_referencing(properties: &Value, targets: &BTreeSet<LogicalId>) -> Vec<String> {
    let Some(map) = properties.as_object() else {
        return Vec::new();
    };
    map.iter()
        .filter(|(_, value)| {
            let mut refs = Vec::new();
            collect_references(value, &mut refs);
            refs.iter().any(|r| targets.contains(r.target()))
        })
        .map(|(key, _)| key.clone())
        .collect()
}

/// Plan a deployment of `desired` over `previous` (nothing deployed when `None`).
pub fn plan(previous: Option<&DeployedState>, desired: &Template) -> Result<Plan, ProvisionError> {
    desired.graph()?;
    let previous = match previous {
        Some(state) => state.desired_resources()?,
        None => BTreeMap::new(),
    };
    Ok(diff(&previous, &desired.resources))
}

fn classify(have: &Resource, want: &Resource) -> ResourceChange {
    let make = |action, fields| ResourceChange {
        id: want.id.clone(),
        resource_type: want.resource_type,
        action,
        fields,
    };
    if have.resource_type != want.resource_type {
        return make(ChangeAction::Replace, vec!["Type".to_owned()]);
    }

    let changed = changed_properties(&have.properties, &want.properties);
    let immutable = want.resource_type.immutable_properties();
    if changed.iter().any(|f| immutable.contains(&f.as_str())) {
        return make(ChangeAction::Replace, changed);
    }

    let mut fields = changed;
    if have.depends_on != want.depends_on {
        fields.push("DependsOn".to_owned());
    }
    if have.removal_policy != want.removal_policy {
        fields.push("DeletionPolicy".to_owned());
    }
    if fields.is_empty() {
        make(ChangeAction::NoChange, fields)
    } else {
        make(ChangeAction::Update, fields)
    }
}

/// Top-level property keys whose values differ, sorted.
fn changed_properties(have: &Value, want: &Value) -> Vec<String> {
    let empty = serde_json::Map::new();
    let have = have.as_object().unwrap_or(&empty);
    let want = want.as_object().unwrap_or(&empty);
    let keys: BTreeSet<&String> = have.keys().chain(want.keys()).collect();
    keys.into_iter()
        .filter(|k| have.get(*k) != want.get(*k))
        .cloned()
        .collect()
}
