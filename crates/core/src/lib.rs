//! cicd-stack-core: declarative resource graph for a minimal serverless backend.
//!
//! Builds the desired state of one stack (an on-demand table, a function
//! with its execution role, a read/write grant, a public function URL and
//! the `Url` output) and synthesizes it into a canonical template document.
//!
//! # Public API
//!
//! - [`StackBuilder`] -- evaluate a [`StackConfig`] into a validated [`Stack`]
//! - [`Stack::synthesize`] -- emit the [`Template`]
//! - [`ResourceGraph`] -- dependency edges, validation, creation order
//! - [`resolve_grant`] -- permission resolver
//! - [`publish`] -- endpoint publisher
//! - [`export_url`] -- output exporter
//! - [`SynthError`] -- synthesis error type

/// Template format version written at the top of every template.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

pub mod asset;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod function;
pub mod graph;
pub mod logical_id;
pub mod output;
pub mod permission;
pub mod reference;
pub mod resource;
pub mod stack;
pub mod table;
pub mod template;

// ── Convenience re-exports: key types ────────────────────────────────

pub use asset::CodeAsset;
pub use config::StackConfig;
pub use endpoint::{AuthType, CorsPolicy, EndpointSpec, HttpMethod};
pub use error::SynthError;
pub use function::{EnvValue, ExecutionRole, FunctionSpec};
pub use graph::ResourceGraph;
pub use logical_id::LogicalId;
pub use output::{OutputSpec, StackOutput, URL_OUTPUT};
pub use permission::{Action, PermissionBinding, PolicyDocument};
pub use reference::Reference;
pub use resource::{RemovalPolicy, Resource, ResourceType};
pub use stack::{Stack, StackBuilder, StackStatus};
pub use table::{BillingMode, KeyType, PartitionKey, TableSpec};
pub use template::{build_manifest, compute_etag, Template};

// ── Convenience re-exports: component entry points ───────────────────

pub use endpoint::publish;
pub use output::export_url;
pub use permission::resolve_grant;
