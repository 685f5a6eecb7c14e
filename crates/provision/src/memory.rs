//! In-memory resource provider.
//!
//! Assigns physical ids and attributes the way the real provider would
//! shape them, keeps the live set in memory and records every call. Failures
//! can be injected per logical id.

use async_trait::async_trait;
use cicd_stack_core::reference::collect_references;
use cicd_stack_core::{LogicalId, ResourceType, SynthError};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::ProvisionError;
use crate::state::{DeployedState, PhysicalResource};
use crate::traits::ResourceProvider;

/// Account id used in fabricated ARNs.
const ACCOUNT_ID: &str = "000000000000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Create(LogicalId),
    Update(LogicalId),
    Delete(LogicalId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveResource {
    pub resource_type: ResourceType,
    pub logical_id: LogicalId,
    pub properties: Value,
}

#[derive(Default)]
struct Inner {
    serial: u64,
    live: BTreeMap<String, LiveResource>,
    calls: Vec<ProviderCall>,
    transient_failures: BTreeMap<LogicalId, u32>,
    permanent_failures: BTreeMap<LogicalId, String>,
}

pub struct MemoryProvider {
    stack_name: String,
    region: String,
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    pub fn new(stack_name: &str, region: &str) -> Self {
        MemoryProvider {
            stack_name: stack_name.to_owned(),
            region: region.to_owned(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Fail the next `times` operations on `id` with a transient error.
    pub fn fail_transiently(&self, id: &LogicalId, times: u32) {
        self.lock().transient_failures.insert(id.clone(), times);
    }

    /// Fail every operation on `id` with a non-retryable error.
    pub fn fail_permanently(&self, id: &LogicalId, message: &str) {
        self.lock()
            .permanent_failures
            .insert(id.clone(), message.to_owned());
    }

    /// Treat every resource in `state` (superseded ones included) as already
    /// live, so later updates and deletes against it succeed. The id counter
    /// moves past the highest serial found in the adopted physical ids.
    pub fn adopt(&self, state: &DeployedState) -> Result<(), SynthError> {
        let mut inner = self.lock();
        for (id, record) in state.records() {
            let resource = record.resource(id)?;
            let physical_id = &record.physical.physical_id;
            if let Some(serial) = serial_of(physical_id) {
                inner.serial = inner.serial.max(serial);
            }
            inner.live.insert(
                physical_id.clone(),
                LiveResource {
                    resource_type: resource.resource_type,
                    logical_id: id.clone(),
                    properties: record.resolved.clone(),
                },
            );
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Live resources keyed by physical id.
    pub fn live(&self) -> BTreeMap<String, LiveResource> {
        self.lock().live.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn attributes(
        &self,
        resource_type: ResourceType,
        physical_id: &str,
        properties: &Value,
    ) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        let region = &self.region;
        match resource_type {
            ResourceType::Table => {
                attrs.insert(
                    "Arn".to_owned(),
                    format!("arn:aws:dynamodb:{}:{}:table/{}", region, ACCOUNT_ID, physical_id),
                );
            }
            ResourceType::Role => {
                attrs.insert(
                    "Arn".to_owned(),
                    format!("arn:aws:iam::{}:role/{}", ACCOUNT_ID, physical_id),
                );
            }
            ResourceType::Function => {
                attrs.insert(
                    "Arn".to_owned(),
                    format!("arn:aws:lambda:{}:{}:function:{}", region, ACCOUNT_ID, physical_id),
                );
            }
            ResourceType::FunctionUrl => {
                let digest = format!("{:x}", Sha256::digest(physical_id.as_bytes()));
                attrs.insert(
                    "FunctionUrl".to_owned(),
                    format!("https://{}.lambda-url.{}.on.aws/", &digest[..32], region),
                );
                if let Some(arn) = properties.get("TargetFunctionArn").and_then(Value::as_str) {
                    attrs.insert("FunctionArn".to_owned(), arn.to_owned());
                }
            }
            ResourceType::Policy | ResourceType::Permission => {}
        }
        attrs
    }

    /// Apply injected failures and reject unresolved input.
    fn check(
        &self,
        inner: &mut Inner,
        id: &LogicalId,
        properties: &Value,
    ) -> Result<(), ProvisionError> {
        if let Some(message) = inner.permanent_failures.get(id) {
            return Err(ProvisionError::Rejected {
                resource: id.to_string(),
                message: message.clone(),
            });
        }
        if let Some(remaining) = inner.transient_failures.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ProvisionError::Transient {
                    resource: id.to_string(),
                    message: "rate exceeded".to_owned(),
                });
            }
        }
        let mut refs = Vec::new();
        collect_references(properties, &mut refs);
        if let Some(r) = refs.first() {
            return Err(ProvisionError::Rejected {
                resource: id.to_string(),
                message: format!("unresolved reference to '{}'", r.target()),
            });
        }
        Ok(())
    }
}

/// The trailing `-NNNN` counter of a physical id this provider assigned.
fn serial_of(physical_id: &str) -> Option<u64> {
    physical_id
        .rsplit_once('-')
        .and_then(|(_, serial)| serial.parse().ok())
}

#[async_trait]
impl ResourceProvider for MemoryProvider {
    async fn create(
        &self,
        resource_type: ResourceType,
        id: &LogicalId,
        properties: &Value,
    ) -> Result<PhysicalResource, ProvisionError> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Create(id.clone()));
        self.check(&mut inner, id, properties)?;

        inner.serial += 1;
        let physical_id = format!("{}-{}-{:04}", self.stack_name, id, inner.serial);
        inner.live.insert(
            physical_id.clone(),
            LiveResource {
                resource_type,
                logical_id: id.clone(),
                properties: properties.clone(),
            },
        );
        let attributes = self.attributes(resource_type, &physical_id, properties);
        Ok(PhysicalResource {
            physical_id,
            attributes,
        })
    }

    async fn update(
        &self,
        resource_type: ResourceType,
        id: &LogicalId,
        current: &PhysicalResource,
        properties: &Value,
    ) -> Result<PhysicalResource, ProvisionError> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Update(id.clone()));
        self.check(&mut inner, id, properties)?;

        let Some(live) = inner.live.get_mut(&current.physical_id) else {
            return Err(ProvisionError::Rejected {
                resource: id.to_string(),
                message: format!("'{}' does not exist", current.physical_id),
            });
        };
        live.properties = properties.clone();
        Ok(PhysicalResource {
            physical_id: current.physical_id.clone(),
            attributes: self.attributes(resource_type, &current.physical_id, properties),
        })
    }

    async fn delete(
        &self,
        _resource_type: ResourceType,
        id: &LogicalId,
        current: &PhysicalResource,
    ) -> Result<(), ProvisionError> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Delete(id.clone()));
        self.check(&mut inner, id, &Value::Null)?;
        inner.live.remove(&current.physical_id);
        Ok(())
    }
}
