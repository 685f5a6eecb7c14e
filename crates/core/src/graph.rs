//! The resource graph: resources keyed by logical id plus the dependency
//! edges implied by their references and explicit `DependsOn` entries.
//!
//! Edges point from a dependency to its dependent (table -> function), so a
//! topological order is a valid creation order. Independent resources may be
//! applied in parallel; `layers()` groups them into such waves.

use crate::error::SynthError;
use crate::logical_id::LogicalId;
use crate::resource::Resource;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceGraph {
    resources: BTreeMap<LogicalId, Resource>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        ResourceGraph::default()
    }

    pub fn add(&mut self, resource: Resource) -> Result<(), SynthError> {
        if self.resources.contains_key(&resource.id) {
            return Err(SynthError::DuplicateResource {
                id: resource.id.to_string(),
            });
        }
        tracing::debug!(id = %resource.id, kind = %resource.resource_type, "added resource");
        self.resources.insert(resource.id.clone(), resource);
        Ok(())
    }

    pub fn get(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &LogicalId) -> bool {
        self.resources.contains_key(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn into_resources(self) -> BTreeMap<LogicalId, Resource> {
        self.resources
    }

    /// All `(dependency, dependent)` edges, sorted.
    pub fn edges(&self) -> Vec<(LogicalId, LogicalId)> {
        let mut edges: Vec<(LogicalId, LogicalId)> = self
            .resources
            .values()
            .flat_map(|r| {
                r.dependencies()
                    .into_iter()
                    .map(move |dep| (dep, r.id.clone()))
            })
            .collect();
        edges.sort();
        edges
    }

    /// Check that every reference resolves inside the graph and that the
    /// edges are acyclic.
    pub fn validate(&self) -> Result<(), SynthError> {
        for r in self.resources.values() {
            for dep in r.dependencies() {
                if !self.resources.contains_key(&dep) {
                    return Err(SynthError::DependencyResolution {
                        resource: r.id.to_string(),
                        target: dep.to_string(),
                    });
                }
            }
        }
        self.layers().map(|_| ())
    }

    /// A creation order: every resource appears after all of its dependencies.
    /// Ties are broken by logical id, so the order is deterministic.
    pub fn topological_order(&self) -> Result<Vec<LogicalId>, SynthError> {
        Ok(self.layers()?.into_iter().flatten().collect())
    }

    /// Waves of mutually independent resources, in creation order.
    pub fn layers(&self) -> Result<Vec<Vec<LogicalId>>, SynthError> {
        let mut pending: BTreeMap<&LogicalId, BTreeSet<LogicalId>> = self
            .resources
            .iter()
            .map(|(id, r)| {
                let deps = r
                    .dependencies()
                    .into_iter()
                    .filter(|d| self.resources.contains_key(d))
                    .collect();
                (id, deps)
            })
            .collect();

        let mut layers = Vec::new();
        while !pending.is_empty() {
            let ready: Vec<LogicalId> = pending
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(id, _)| (*id).clone())
                .collect();
            if ready.is_empty() {
                return Err(SynthError::Cycle {
                    members: pending.keys().map(|id| id.to_string()).collect(),
                });
            }
            for id in &ready {
                pending.remove(id);
            }
            for deps in pending.values_mut() {
                for id in &ready {
                    deps.remove(id);
                }
            }
            layers.push(ready);
        }
        Ok(layers)
    }
}
