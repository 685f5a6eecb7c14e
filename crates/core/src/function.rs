//! Compute function and its execution role.

use crate::asset::CodeAsset;
use crate::logical_id::LogicalId;
use crate::reference::Reference;
use crate::resource::{Resource, ResourceType};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Managed policy granting log delivery to every function.
pub const BASIC_EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Service principal allowed to assume the execution role.
const LAMBDA_PRINCIPAL: &str = "lambda.amazonaws.com";

/// An environment value: fixed at synthesis time or resolved by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    Literal(String),
    Reference(Reference),
}

impl EnvValue {
    pub fn to_json(&self) -> Value {
        match self {
            EnvValue::Literal(s) => Value::from(s.as_str()),
            EnvValue::Reference(r) => r.to_json(),
        }
    }
}

// ──────────────────────────────────────────────
// Execution role
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRole {
    pub id: LogicalId,
}

impl ExecutionRole {
    pub fn new(id: LogicalId) -> Self {
        ExecutionRole { id }
    }

    pub fn arn(&self) -> Reference {
        Reference::attribute_of(&self.id, "Arn")
    }

    pub fn to_resource(&self) -> Resource {
        let properties = json!({
            "AssumeRolePolicyDocument": {
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": {"Service": LAMBDA_PRINCIPAL},
                }],
                "Version": "2012-10-17",
            },
            "ManagedPolicyArns": [BASIC_EXECUTION_POLICY_ARN],
        });
        Resource::new(self.id.clone(), ResourceType::Role, properties)
    }
}

// ──────────────────────────────────────────────
// Function
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    pub id: LogicalId,
    pub runtime: String,
    pub code: CodeAsset,
    /// Entry point, `module.function`.
    pub handler: String,
    pub environment: BTreeMap<String, EnvValue>,
    pub role: Reference,
    /// Bucket the packaged bundle is uploaded to.
    pub asset_bucket: String,
    pub depends_on: Vec<LogicalId>,
}

impl FunctionSpec {
    pub fn new(
        id: LogicalId,
        runtime: &str,
        code: CodeAsset,
        handler: &str,
        role: Reference,
        asset_bucket: &str,
    ) -> Self {
        FunctionSpec {
            id,
            runtime: runtime.to_owned(),
            code,
            handler: handler.to_owned(),
            environment: BTreeMap::new(),
            role,
            asset_bucket: asset_bucket.to_owned(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: EnvValue) -> Self {
        self.environment.insert(key.to_owned(), value);
        self
    }

    pub fn with_dependency(mut self, id: &LogicalId) -> Self {
        self.depends_on.push(id.clone());
        self
    }

    pub fn arn(&self) -> Reference {
        Reference::attribute_of(&self.id, "Arn")
    }

    pub fn to_resource(&self) -> Resource {
        let variables: Map<String, Value> = self
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        let properties = json!({
            "Code": {
                "S3Bucket": self.asset_bucket,
                "S3Key": self.code.object_key(),
            },
            "Environment": {"Variables": variables},
            "Handler": self.handler,
            "Role": self.role.to_json(),
            "Runtime": self.runtime,
        });
        self.depends_on.iter().fold(
            Resource::new(self.id.clone(), ResourceType::Function, properties),
            |r, dep| r.with_dependency(dep),
        )
    }
}
