//! The untyped resource node stored in the graph and in templates.
//!
//! Typed descriptors (`TableSpec`, `FunctionSpec`, ...) lower themselves into
//! a [`Resource`]; everything downstream (graph validation, synthesis,
//! planning, convergence) works on this one shape.

use crate::error::SynthError;
use crate::logical_id::LogicalId;
use crate::reference::{collect_references, Reference};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

// ──────────────────────────────────────────────
// Resource types
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    Table,
    Role,
    Policy,
    Function,
    FunctionUrl,
    Permission,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Table,
        ResourceType::Role,
        ResourceType::Policy,
        ResourceType::Function,
        ResourceType::FunctionUrl,
        ResourceType::Permission,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Table => "AWS::DynamoDB::Table",
            ResourceType::Role => "AWS::IAM::Role",
            ResourceType::Policy => "AWS::IAM::Policy",
            ResourceType::Function => "AWS::Lambda::Function",
            ResourceType::FunctionUrl => "AWS::Lambda::Url",
            ResourceType::Permission => "AWS::Lambda::Permission",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }

    /// Properties that cannot change in place; a change forces replacement.
    pub fn immutable_properties(&self) -> &'static [&'static str] {
        match self {
            ResourceType::Table => &["AttributeDefinitions", "KeySchema", "TableName"],
            ResourceType::Role => &["Path", "RoleName"],
            ResourceType::Policy => &[],
            ResourceType::Function => &["FunctionName"],
            ResourceType::FunctionUrl => &["TargetFunctionArn"],
            ResourceType::Permission => {
                &["Action", "FunctionName", "FunctionUrlAuthType", "Principal"]
            }
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to the physical resource when it leaves the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    Retain,
    Delete,
}

impl RemovalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Delete => "Delete",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Retain" => Some(RemovalPolicy::Retain),
            "Delete" => Some(RemovalPolicy::Delete),
            _ => None,
        }
    }
}

// ──────────────────────────────────────────────
// Resource
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: LogicalId,
    pub resource_type: ResourceType,
    pub properties: Value,
    /// Explicit ordering edges in addition to those implied by references.
    pub depends_on: BTreeSet<LogicalId>,
    pub removal_policy: Option<RemovalPolicy>,
}

impl Resource {
    pub fn new(id: LogicalId, resource_type: ResourceType, properties: Value) -> Self {
        Resource {
            id,
            resource_type,
            properties,
            depends_on: BTreeSet::new(),
            removal_policy: None,
        }
    }

    pub fn with_dependency(mut self, id: &LogicalId) -> Self {
        self.depends_on.insert(id.clone());
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    /// Symbolic references embedded in the properties.
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        collect_references(&self.properties, &mut refs);
        refs
    }

    /// Every resource this one must wait for: reference targets plus explicit `DependsOn`.
    pub fn dependencies(&self) -> BTreeSet<LogicalId> {
        let mut deps: BTreeSet<LogicalId> =
            self.references().into_iter().map(|r| r.target().clone()).collect();
        deps.extend(self.depends_on.iter().cloned());
        deps
    }

    /// Whether the physical resource is kept when the resource leaves the stack.
    pub fn retained(&self) -> bool {
        self.removal_policy == Some(RemovalPolicy::Retain)
    }

    /// Serialize to a template resource entry (keys sorted).
    pub fn to_json(&self) -> Value {
        let mut m = Map::new();
        if let Some(policy) = self.removal_policy {
            m.insert("DeletionPolicy".to_owned(), Value::from(policy.as_str()));
        }
        if !self.depends_on.is_empty() {
            let deps: Vec<Value> = self
                .depends_on
                .iter()
                .map(|d| Value::from(d.as_str()))
                .collect();
            m.insert("DependsOn".to_owned(), Value::Array(deps));
        }
        m.insert("Properties".to_owned(), self.properties.clone());
        m.insert(
            "Type".to_owned(),
            Value::from(self.resource_type.as_str()),
        );
        if let Some(policy) = self.removal_policy {
            m.insert("UpdateReplacePolicy".to_owned(), Value::from(policy.as_str()));
        }
        Value::Object(m)
    }

    /// Parse a template resource entry.
    pub fn from_json(id: LogicalId, value: &Value) -> Result<Self, SynthError> {
        let obj = value.as_object().ok_or_else(|| {
            SynthError::InvalidTemplate(format!("resource '{}' is not an object", id))
        })?;
        let type_str = obj.get("Type").and_then(Value::as_str).ok_or_else(|| {
            SynthError::InvalidTemplate(format!("resource '{}' has no Type", id))
        })?;
        let resource_type = ResourceType::parse(type_str).ok_or_else(|| {
            SynthError::InvalidTemplate(format!(
                "resource '{}' has unsupported type '{}'",
                id, type_str
            ))
        })?;
        let properties = obj
            .get("Properties")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let mut depends_on = BTreeSet::new();
        match obj.get("DependsOn") {
            None => {}
            Some(Value::String(dep)) => {
                depends_on.insert(parse_id(&id, dep)?);
            }
            Some(Value::Array(deps)) => {
                for dep in deps {
                    let dep = dep.as_str().ok_or_else(|| {
                        SynthError::InvalidTemplate(format!(
                            "resource '{}' has a non-string DependsOn entry",
                            id
                        ))
                    })?;
                    depends_on.insert(parse_id(&id, dep)?);
                }
            }
            Some(_) => {
                return Err(SynthError::InvalidTemplate(format!(
                    "resource '{}' has a malformed DependsOn",
                    id
                )))
            }
        }

        let removal_policy = match obj.get("DeletionPolicy").and_then(Value::as_str) {
            None => None,
            Some(raw) => Some(RemovalPolicy::parse(raw).ok_or_else(|| {
                SynthError::InvalidTemplate(format!(
                    "resource '{}' has unknown DeletionPolicy '{}'",
                    id, raw
                ))
            })?),
        };

        Ok(Resource {
            id,
            resource_type,
            properties,
            depends_on,
            removal_policy,
        })
    }
}

fn parse_id(owner: &LogicalId, raw: &str) -> Result<LogicalId, SynthError> {
    LogicalId::parse(raw).ok_or_else(|| {
        SynthError::InvalidTemplate(format!(
            "resource '{}' depends on invalid id '{}'",
            owner, raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(raw: &str) -> LogicalId {
        LogicalId::parse(raw).unwrap()
    }

    #[test]
    fn test_dependencies_merge_refs_and_depends_on() {
        let r = Resource::new(
            id("Fn1"),
            ResourceType::Function,
            json!({"Role": {"Fn::GetAtt": ["Role1", "Arn"]}}),
        )
        .with_dependency(&id("Policy1"));
        let dependencies = r.dependencies();
        let deps: Vec<&str> = dependencies.iter().map(|d| d.as_str()).collect();
        assert_eq!(deps, vec!["Policy1", "Role1"]);
    }

    #[test]
    fn test_json_roundtrip_keeps_policies() {
        let r = Resource::new(id("Table1"), ResourceType::Table, json!({"BillingMode": "PAY_PER_REQUEST"}))
            .with_removal_policy(RemovalPolicy::Retain);
        let v = r.to_json();
        assert_eq!(v["DeletionPolicy"], "Retain");
        assert_eq!(v["UpdateReplacePolicy"], "Retain");
        assert_eq!(v["Type"], "AWS::DynamoDB::Table");
        let back = Resource::from_json(id("Table1"), &v).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_from_json_accepts_single_depends_on() {
        let v = json!({"Type": "AWS::Lambda::Url", "DependsOn": "Fn1", "Properties": {}});
        let r = Resource::from_json(id("Url1"), &v).unwrap();
        assert!(r.depends_on.contains(&id("Fn1")));
    }

    #[test]
    fn test_from_json_rejects_unknown_type() {
        let v = json!({"Type": "AWS::S3::Bucket", "Properties": {}});
        let err = Resource::from_json(id("Bucket1"), &v).unwrap_err();
        assert!(err.to_string().contains("unsupported type"));
    }

    #[test]
    fn test_table_key_schema_is_immutable() {
        assert!(ResourceType::Table
            .immutable_properties()
            .contains(&"KeySchema"));
        assert!(!ResourceType::Table
            .immutable_properties()
            .contains(&"BillingMode"));
    }
}
