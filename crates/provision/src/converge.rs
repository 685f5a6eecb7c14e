//! Convergence driver: bring deployed state in line with a desired template.
//!
//! Creates and updates run in dependency order with references substituted
//! from already-materialized resources. Deletions (removed resources, then
//! resources superseded by a replacement) run afterwards, dependents first.
//! Superseded resources are recorded in the state as soon as their
//! replacement exists, so a failed run leaves them for the next one.
//! Transient provider errors are retried with exponential backoff; anything
//! else stops the run and hands back the partially applied state.

use cicd_stack_core::{LogicalId, Resource, Template};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use crate::error::{ConvergeError, ProvisionError};
use crate::plan::{diff, ChangeAction};
use crate::resolve::{resolve_properties, resolve_reference};
use crate::state::{DeployedResource, DeployedState, SupersededResource};
use crate::traits::ResourceProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1), capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    id: &LogicalId,
    mut op: F,
) -> Result<T, ProvisionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProvisionError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(%id, attempt, ?delay, error = %e, "transient failure, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Converge `desired` over `previous` using `provider`.
///
/// On success the returned state is Materialized and carries resolved
/// outputs. On failure the error holds everything applied so far; there is
/// no rollback.
pub async fn converge<P>(
    provider: &P,
    stack_name: &str,
    desired: &Template,
    previous: Option<&DeployedState>,
    retry: &RetryPolicy,
) -> Result<DeployedState, ConvergeError>
where
    P: ResourceProvider + ?Sized,
{
    let mut state = previous
        .cloned()
        .unwrap_or_else(|| DeployedState::new(stack_name));
    state.complete = false;
    state.outputs.clear();

    let fail = |error: ProvisionError, state: DeployedState| ConvergeError {
        stack: stack_name.to_owned(),
        error,
        partial: Box::new(state),
    };

    let order = match desired.graph().and_then(|g| g.topological_order()) {
        Ok(order) => order,
        Err(e) => return Err(fail(e.into(), state)),
    };
    let previous_resources = match state.desired_resources() {
        Ok(r) => r,
        Err(e) => return Err(fail(e.into(), state)),
    };
    let plan = diff(&previous_resources, &desired.resources);
    tracing::info!(
        stack = stack_name,
        create = plan.count(ChangeAction::Create),
        update = plan.count(ChangeAction::Update),
        replace = plan.count(ChangeAction::Replace),
        delete = plan.count(ChangeAction::Delete),
        "converging"
    );

    for id in &order {
        let resource = &desired.resources[id];
        let action = plan
            .get(id)
            .map(|c| c.action)
            .unwrap_or(ChangeAction::Create);
        let resolved = match resolve_properties(&resource.properties, &state, id) {
            Ok(v) => v,
            Err(e) => return Err(fail(e, state)),
        };

        match action {
            ChangeAction::Create | ChangeAction::Replace => {
                let created = with_retry(retry, id, || {
                    provider.create(resource.resource_type, id, &resolved)
                })
                .await;
                let physical = match created {
                    Ok(p) => p,
                    Err(e) => return Err(fail(e, state)),
                };
                tracing::info!(%id, physical_id = %physical.physical_id, ?action, "materialized");
                let record = DeployedResource::new(resource, resolved, physical);
                if let Some(old) = state.resources.insert(id.clone(), record) {
                    state.superseded.push(SupersededResource {
                        id: id.clone(),
                        record: old,
                    });
                }
            }
            ChangeAction::Update | ChangeAction::NoChange => {
                let Some(current) = state.resources.get(id).cloned() else {
                    return Err(fail(
                        ProvisionError::UnresolvedReference {
                            resource: id.to_string(),
                            target: id.to_string(),
                        },
                        state,
                    ));
                };
                let physical = if current.resolved != resolved {
                    let updated = with_retry(retry, id, || {
                        provider.update(resource.resource_type, id, &current.physical, &resolved)
                    })
                    .await;
                    match updated {
                        Ok(p) => {
                            tracing::info!(%id, physical_id = %p.physical_id, "updated");
                            p
                        }
                        Err(e) => return Err(fail(e, state)),
                    }
                } else {
                    current.physical.clone()
                };
                state
                    .resources
                    .insert(id.clone(), DeployedResource::new(resource, resolved, physical));
            }
            ChangeAction::Delete => {}
        }
    }

    // Resources no longer in the template.
    let removed: BTreeMap<LogicalId, Resource> = previous_resources
        .iter()
        .filter(|(id, _)| !desired.resources.contains_key(*id))
        .map(|(id, r)| (id.clone(), r.clone()))
        .collect();
    for id in deletion_order(&removed) {
        let resource = &removed[&id];
        let Some(record) = state.resources.get(&id).cloned() else {
            continue;
        };
        if let Err(e) = remove(provider, retry, &id, resource, &record).await {
            return Err(fail(e, state));
        }
        state.resources.remove(&id);
    }

    // Old physical resources replaced in this run or left by a failed one,
    // newest first.
    while let Some(entry) = state.superseded.last().cloned() {
        let resource = match entry.record.resource(&entry.id) {
            Ok(r) => r,
            Err(e) => return Err(fail(e.into(), state)),
        };
        if let Err(e) = remove(provider, retry, &entry.id, &resource, &entry.record).await {
            return Err(fail(e, state));
        }
        state.superseded.pop();
    }

    for output in desired.outputs.values() {
        let owner = format!("Outputs.{}", output.name);
        match resolve_reference(&output.value, &state, &owner) {
            Ok(value) => {
                state.outputs.insert(output.name.clone(), value);
            }
            Err(e) => return Err(fail(e, state)),
        }
    }
    state.complete = true;
    tracing::info!(stack = stack_name, resources = state.resources.len(), "stack materialized");
    Ok(state)
}

async fn remove<P>(
    provider: &P,
    retry: &RetryPolicy,
    id: &LogicalId,
    resource: &Resource,
    record: &DeployedResource,
) -> Result<(), ProvisionError>
where
    P: ResourceProvider + ?Sized,
{
    if resource.retained() {
        tracing::info!(%id, physical_id = %record.physical.physical_id, "retained, not deleted");
        return Ok(());
    }
    with_retry(retry, id, || {
        provider.delete(resource.resource_type, id, &record.physical)
    })
    .await?;
    tracing::info!(%id, physical_id = %record.physical.physical_id, "deleted");
    Ok(())
}

/// Dependents before their dependencies; ties broken by logical id.
fn deletion_order(removed: &BTreeMap<LogicalId, Resource>) -> Vec<LogicalId> {
    let mut remaining: BTreeSet<&LogicalId> = removed.keys().collect();
    let mut order = Vec::new();
    while !remaining.is_empty() {
        let mut ready: Vec<&LogicalId> = remaining
            .iter()
            .filter(|id| {
                !remaining
                    .iter()
                    .any(|other| removed[*other].dependencies().contains(**id))
            })
            .copied()
            .collect();
        if ready.is_empty() {
            // Cyclic leftovers: delete in id order.
            ready = remaining.iter().copied().collect();
        }
        for id in ready {
            remaining.remove(id);
            order.push(id.clone());
        }
    }
    order
}
