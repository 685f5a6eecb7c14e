use async_trait::async_trait;
use cicd_stack_core::{LogicalId, ResourceType};
use serde_json::Value;

use crate::error::ProvisionError;
use crate::state::PhysicalResource;

/// The provider side of the provisioning engine.
///
/// A `ResourceProvider` performs single-resource operations against real
/// infrastructure. It never sees symbolic references: the convergence driver
/// substitutes every `Ref` / `Fn::GetAtt` before calling it, and only calls
/// it once all of a resource's dependencies exist.
///
/// ## Errors
///
/// Return `ProvisionError::Transient` for failures worth retrying; the driver
/// backs off and retries those. Every other variant aborts convergence and is
/// surfaced to the operator unchanged.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` so a driver may issue independent
/// operations concurrently.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Create a resource and return its provider-assigned identity.
    async fn create(
        &self,
        resource_type: ResourceType,
        id: &LogicalId,
        properties: &Value,
    ) -> Result<PhysicalResource, ProvisionError>;

    /// Update mutable properties in place. The physical id is kept.
    async fn update(
        &self,
        resource_type: ResourceType,
        id: &LogicalId,
        current: &PhysicalResource,
        properties: &Value,
    ) -> Result<PhysicalResource, ProvisionError>;

    /// Delete a resource. Deleting something already gone is not an error.
    async fn delete(
        &self,
        resource_type: ResourceType,
        id: &LogicalId,
        current: &PhysicalResource,
    ) -> Result<(), ProvisionError>;
}
