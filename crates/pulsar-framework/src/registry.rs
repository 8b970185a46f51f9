//! Plug-in registry and scheduler profiles.

use crate::error::{FrameworkError, Result};
use crate::handle::FrameworkHandle;
use crate::plugin::SchedulingPlugin;
use crate::queue::SchedulingQueue;
use crate::store::{NodeLister, PodClient, PodLister};
use pulsar_core::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Host collaborators handed to every plug-in factory
#[derive(Clone)]
pub struct PluginDeps {
    pub handle: Arc<dyn FrameworkHandle>,
    pub pod_lister: Arc<dyn PodLister>,
    pub node_lister: Arc<dyn NodeLister>,
    pub pod_client: Arc<dyn PodClient>,
    pub clock: Arc<dyn Clock>,
}

/// Constructor for a registered plug-in
pub type PluginFactory =
    Box<dyn Fn(&PluginDeps) -> Result<Arc<dyn SchedulingPlugin>> + Send + Sync>;

/// Named plug-in factories, analogous to the host's out-of-tree registry
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, PluginFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(FrameworkError::PluginAlreadyRegistered { name });
        }
        info!(plugin = %name, "registering scheduling plugin");
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn build(&self, name: &str, deps: &PluginDeps) -> Result<Arc<dyn SchedulingPlugin>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| FrameworkError::PluginNotFound {
                name: name.to_string(),
            })?;
        factory(deps)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

/// A scheduler profile: one plug-in acting as the sole queue-sort plug-in
/// (and, when tagged, as pre-/filter/post-filter as well).
pub struct Profile {
    pub name: String,
    pub plugin: Arc<dyn SchedulingPlugin>,
}

impl Profile {
    /// Instantiate a profile from a registered plug-in
    pub fn from_registry(registry: &Registry, name: &str, deps: &PluginDeps) -> Result<Self> {
        let plugin = registry.build(name, deps)?;
        Ok(Self {
            name: name.to_string(),
            plugin,
        })
    }

    /// New scheduling queue ordered by this profile's plug-in
    pub fn new_queue(&self) -> Result<SchedulingQueue> {
        SchedulingQueue::new(self.plugin.clone())
    }
}
