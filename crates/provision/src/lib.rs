//! cicd-stack-provision: the provisioning side of a stack deployment.
//!
//! - [`ResourceProvider`] -- single-resource operations against infrastructure
//! - [`plan()`] -- diff deployed state against a desired template
//! - [`converge()`] -- apply a plan in dependency order with retries
//! - [`DeployedState`] -- the Materialized stack and its outputs
//! - [`MemoryProvider`] -- in-memory provider for tests and dry runs

mod converge;
mod error;
pub mod memory;
pub mod plan;
mod resolve;
mod state;
mod traits;

pub use converge::{converge, RetryPolicy};
pub use error::{ConvergeError, ProvisionError};
pub use memory::{MemoryProvider, ProviderCall};
pub use plan::{diff, plan, ChangeAction, Plan, ResourceChange};
pub use resolve::{resolve_properties, resolve_reference};
pub use state::{DeployedResource, DeployedState, PhysicalResource, SupersededResource};
pub use traits::ResourceProvider;
