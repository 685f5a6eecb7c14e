//! The stack: aggregate root of the resource graph.
//!
//! [`StackBuilder::build`] evaluates the configuration once and produces the
//! complete, linked graph:
//!
//! - table (name) -> function `TABLE_NAME`
//! - table (arn) + role (name) -> grant policy -> function (`DependsOn`)
//! - role (arn) -> function
//! - function (arn) -> function URL and public invoke permission
//! - function URL -> output `Url`
//!
//! Nothing is provisioned here; the result is Unmaterialized until an engine
//! converges it.

use crate::asset::CodeAsset;
use crate::config::StackConfig;
use crate::endpoint::{publish, EndpointSpec};
use crate::error::SynthError;
use crate::function::{EnvValue, ExecutionRole, FunctionSpec};
use crate::graph::ResourceGraph;
use crate::logical_id::LogicalId;
use crate::output::{export_url, OutputSpec};
use crate::permission::{grant_policy, resolve_grant, PermissionBinding};
use crate::table::{KeyType, PartitionKey, TableSpec};
use crate::template::Template;
use std::collections::BTreeMap;

pub const TABLE_CONSTRUCT: &str = "VisitorTimeTable";
pub const FUNCTION_CONSTRUCT: &str = "LambdaFunction";
pub const PARTITION_KEY: &str = "key";
pub const ENV_VERSION: &str = "VERSION";
pub const ENV_TABLE_NAME: &str = "TABLE_NAME";

/// Observable lifecycle states of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    /// Graph built, nothing provisioned.
    Unmaterialized,
    /// All resources exist and outputs are available.
    Materialized,
}

#[derive(Debug, Clone)]
pub struct Stack {
    pub name: String,
    pub description: Option<String>,
    pub table: TableSpec,
    pub role: ExecutionRole,
    pub function: FunctionSpec,
    pub grant: PermissionBinding,
    pub endpoint: EndpointSpec,
    pub outputs: Vec<OutputSpec>,
    graph: ResourceGraph,
}

impl Stack {
    pub fn status(&self) -> StackStatus {
        StackStatus::Unmaterialized
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Emit the desired-state template.
    pub fn synthesize(&self) -> Template {
        let template = Template {
            description: self.description.clone(),
            resources: self.graph.clone().into_resources(),
            outputs: self
                .outputs
                .iter()
                .map(|o| (o.name.clone(), o.clone()))
                .collect::<BTreeMap<_, _>>(),
        };
        tracing::info!(
            stack = %self.name,
            resources = template.resources.len(),
            outputs = template.outputs.len(),
            "synthesized template"
        );
        template
    }
}

pub struct StackBuilder {
    config: StackConfig,
}

impl StackBuilder {
    pub fn new(config: StackConfig) -> Self {
        StackBuilder { config }
    }

    /// Build and validate the full graph. Fails with a configuration error
    /// before any resource is declared when the bundle or version is bad.
    pub fn build(self) -> Result<Stack, SynthError> {
        let config = self.config;
        let code = CodeAsset::from_path(&config.code_bundle_path)?;
        let version = config.resolved_version()?;
        tracing::debug!(stack = %config.stack_name, %version, "building stack");

        let table = TableSpec::new(
            LogicalId::allocate(&[TABLE_CONSTRUCT]),
            PartitionKey::new(PARTITION_KEY, KeyType::String),
        );
        table.validate()?;

        let role = ExecutionRole::new(LogicalId::allocate(&[FUNCTION_CONSTRUCT, "ServiceRole"]));
        let policy_id =
            LogicalId::allocate(&[FUNCTION_CONSTRUCT, "ServiceRole", "DefaultPolicy"]);

        let function = FunctionSpec::new(
            LogicalId::allocate(&[FUNCTION_CONSTRUCT]),
            &config.runtime,
            code,
            &config.handler,
            role.arn(),
            &config.asset_bucket(),
        )
        .with_env(ENV_VERSION, EnvValue::Literal(version))
        .with_env(ENV_TABLE_NAME, EnvValue::Reference(table.table_name()))
        .with_dependency(&policy_id)
        .with_dependency(&role.id);

        let grant = PermissionBinding::read_write(&function.id, &table.id);
        let document = resolve_grant(&grant, &table.arn());

        let endpoint = publish(
            LogicalId::allocate(&[FUNCTION_CONSTRUCT, "FunctionUrl"]),
            &function.id,
        );
        let invoke = endpoint.public_invoke_permission(LogicalId::allocate(&[
            FUNCTION_CONSTRUCT,
            "invoke-function-url",
        ]));

        let mut graph = ResourceGraph::new();
        graph.add(table.to_resource())?;
        graph.add(role.to_resource())?;
        graph.add(grant_policy(&policy_id, &role.id, &document))?;
        graph.add(function.to_resource())?;
        graph.add(endpoint.to_resource())?;
        if let Some(permission) = invoke {
            graph.add(permission)?;
        }
        graph.validate()?;

        let outputs = vec![export_url(&endpoint)];
        for output in &outputs {
            if !graph.contains(output.value.target()) {
                return Err(SynthError::DependencyResolution {
                    resource: format!("Outputs.{}", output.name),
                    target: output.value.target().to_string(),
                });
            }
        }

        Ok(Stack {
            name: config.stack_name,
            description: config.description,
            table,
            role,
            function,
            grant,
            endpoint,
            outputs,
            graph,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;

    fn config_with_bundle(dir: &tempfile::TempDir) -> StackConfig {
        std::fs::write(dir.path().join("main.py"), "def handler(event, context):\n    pass\n")
            .unwrap();
        StackConfig {
            code_bundle_path: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_declares_all_resources() {
        let dir = tempfile::tempdir().unwrap();
        let stack = StackBuilder::new(config_with_bundle(&dir)).build().unwrap();
        let mut kinds: Vec<ResourceType> =
            stack.graph().resources().map(|r| r.resource_type).collect();
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                ResourceType::Table,
                ResourceType::Role,
                ResourceType::Policy,
                ResourceType::Function,
                ResourceType::FunctionUrl,
                ResourceType::Permission,
            ]
        );
        assert_eq!(stack.status(), StackStatus::Unmaterialized);
    }

    #[test]
    fn test_function_waits_for_grant() {
        let dir = tempfile::tempdir().unwrap();
        let stack = StackBuilder::new(config_with_bundle(&dir)).build().unwrap();
        let order = stack.graph().topological_order().unwrap();
        let pos = |id: &LogicalId| order.iter().position(|x| x == id).unwrap();
        let policy = LogicalId::allocate(&[FUNCTION_CONSTRUCT, "ServiceRole", "DefaultPolicy"]);
        assert!(pos(&policy) < pos(&stack.function.id));
        assert!(pos(&stack.function.id) < pos(&stack.endpoint.id));
    }

    #[test]
    fn test_description_carries_into_template() {
        let dir = tempfile::tempdir().unwrap();
        let config = StackConfig {
            description: Some("visitor counter".to_owned()),
            ..config_with_bundle(&dir)
        };
        let template = StackBuilder::new(config).build().unwrap().synthesize();
        assert_eq!(template.to_json()["Description"], "visitor counter");
    }
}
