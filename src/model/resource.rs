//! Resources, their declarations, and the model that holds them for one run.

use super::condition::WaitCondition;
use crate::health::HealthCheckDescriptor;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identity of a resource within a [`ResourceModel`].
///
/// Resources are identified by their unique name. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Arc<str>);

impl ResourceId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&ResourceId> for ResourceId {
    fn from(value: &ResourceId) -> Self {
        value.clone()
    }
}

/// "This resource waits on `target` under `condition`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitDeclaration {
    pub target: ResourceId,
    pub condition: WaitCondition,
}

/// A managed entity with a lifecycle (service, database, job).
///
/// The parent is a back-reference used only to inherit health checks; it never owns the
/// child.
///
/// # Example
///
/// ```ignore
/// let db = Resource::new("db").with_parent("postgres");
/// let migrations = Resource::new("migrations").wait_for("db");
/// let api = Resource::new("api")
///     .wait_for("db")
///     .wait_for_completion("migrations");
/// ```
#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    parent: Option<ResourceId>,
    endpoint: Option<String>,
    health_check: Option<HealthCheckDescriptor>,
    waits: Vec<WaitDeclaration>,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            endpoint: None,
            health_check: None,
            waits: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<ResourceId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Address or connection string that health probes for this resource bind to.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Attaches a health check. A later call replaces the earlier one.
    pub fn with_health_check(mut self, descriptor: HealthCheckDescriptor) -> Self {
        self.health_check = Some(descriptor);
        self
    }

    /// Wait for `target` to be running (and healthy, if it has a health check).
    pub fn wait_for(self, target: impl Into<ResourceId>) -> Self {
        self.wait_on(target, WaitCondition::running())
    }

    /// Wait for `target` to run to completion.
    pub fn wait_for_completion(self, target: impl Into<ResourceId>) -> Self {
        self.wait_on(target, WaitCondition::completion())
    }

    /// Wait for `target` to report one of `states`.
    pub fn wait_for_states<I, S>(self, target: impl Into<ResourceId>, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wait_on(target, WaitCondition::states(states))
    }

    pub fn wait_on(mut self, target: impl Into<ResourceId>, condition: WaitCondition) -> Self {
        self.waits.push(WaitDeclaration {
            target: target.into(),
            condition,
        });
        self
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    pub fn parent(&self) -> Option<&ResourceId> {
        self.parent.as_ref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn health_check(&self) -> Option<&HealthCheckDescriptor> {
        self.health_check.as_ref()
    }

    pub fn waits(&self) -> &[WaitDeclaration] {
        &self.waits
    }
}

/// The full set of resources for one orchestrator run.
#[derive(Debug, Clone, Default)]
pub struct ResourceModel {
    resources: BTreeMap<ResourceId, Resource>,
}

impl ResourceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.add(resource);
        self
    }

    /// Adds a resource, returning the one it replaced if the id was already taken.
    pub fn add(&mut self, resource: Resource) -> Option<Resource> {
        self.resources.insert(resource.id.clone(), resource)
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
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

    /// The resource itself followed by its parent chain.
    ///
    /// Stops at the root, at a parent missing from the model, or after visiting as many
    /// resources as the model holds.
    pub fn ancestry<'a>(&'a self, id: &ResourceId) -> Ancestry<'a> {
        Ancestry {
            model: self,
            next: self.resources.get_key_value(id).map(|(key, _)| key),
            remaining: self.resources.len(),
        }
    }

    /// Nearest health check for `id`, walking up the parent chain.
    ///
    /// Returns the resource the descriptor is attached to, which is the one the probe binds
    /// to.
    pub fn find_health_check(
        &self,
        id: &ResourceId,
    ) -> Option<(&Resource, &HealthCheckDescriptor)> {
        self.ancestry(id).find_map(|resource| {
            resource
                .health_check
                .as_ref()
                .map(|descriptor| (resource, descriptor))
        })
    }
}

/// Iterator returned by [`ResourceModel::ancestry`].
pub struct Ancestry<'a> {
    model: &'a ResourceModel,
    next: Option<&'a ResourceId>,
    remaining: usize,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a Resource;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let resource = self.model.get(self.next?)?;
        self.next = resource.parent.as_ref();
        Some(resource)
    }
}
