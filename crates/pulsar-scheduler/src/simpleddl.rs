//! `SimpleDDL`: queue-sort-only profile ordering pods by priority, then
//! absolute deadline, then name.

use crate::deadline::{DeadlineConfig, DeadlineManager};
use async_trait::async_trait;
use pulsar_core::{workload, Clock};
use pulsar_framework::{CapabilitySet, PluginDeps, PluginFactory, QueuedPodInfo, SchedulingPlugin};
use std::sync::Arc;

/// Name of the plugin used in the plugin registry and configurations
pub const NAME: &str = "SimpleDDL";

/// Earliest-deadline-first queue ordering with a 10-minute fallback
/// deadline; no preemption machinery.
pub struct SimpleDdl {
    deadline_manager: Arc<DeadlineManager>,
}

impl SimpleDdl {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            deadline_manager: Arc::new(DeadlineManager::new(DeadlineConfig::simple(), clock)),
        }
    }

    /// Registry factory
    pub fn factory() -> PluginFactory {
        Box::new(|deps: &PluginDeps| {
            Ok(Arc::new(SimpleDdl::new(deps.clock.clone())) as Arc<dyn SchedulingPlugin>)
        })
    }
}

#[async_trait]
impl SchedulingPlugin for SimpleDdl {
    fn name(&self) -> &'static str {
        NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::QUEUE_SORT
    }

    /// Orders the scheduling queue by:
    ///  1. priority, descending
    ///  2. absolute deadline, ascending (upserted so later comparisons of
    ///     the same pod stay stable)
    ///  3. `namespace/name`, ascending
    fn less(&self, p1: &QueuedPodInfo, p2: &QueuedPodInfo) -> bool {
        let prio1 = workload::priority(&p1.pod);
        let prio2 = workload::priority(&p2.pod);
        if prio1 != prio2 {
            return prio1 > prio2;
        }
        let ddl1 = self.deadline_manager.upsert(&p1.pod);
        let ddl2 = self.deadline_manager.upsert(&p2.pod);
        if ddl1 == ddl2 {
            return workload::namespaced_name(&p1.pod) < workload::namespaced_name(&p2.pod);
        }
        ddl1 < ddl2
    }
}
