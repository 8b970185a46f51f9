//! The scheduling queue, ordered by the profile's queue-sort plug-in.

use crate::error::{FrameworkError, Result};
use crate::plugin::{CapabilitySet, QueuedPodInfo, SchedulingPlugin};
use k8s_openapi::api::core::v1::Pod;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Priority queue of pending pods. `pop` always yields the pod the sort
/// plug-in orders first; insertion order only matters as the final
/// tie-breaker of an ill-behaved comparator.
pub struct SchedulingQueue {
    sorter: Arc<dyn SchedulingPlugin>,
    items: Mutex<Vec<QueuedPodInfo>>,
}

impl std::fmt::Debug for SchedulingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulingQueue")
            .field("len", &self.items.lock().len())
            .finish()
    }
}

impl SchedulingQueue {
    /// Build a queue over the given sort plug-in. Fails when the plug-in
    /// does not declare the queue-sort capability.
    pub fn new(sorter: Arc<dyn SchedulingPlugin>) -> Result<Self> {
        if !sorter.capabilities().contains(CapabilitySet::QUEUE_SORT) {
            return Err(FrameworkError::MissingCapability {
                plugin: sorter.name().to_string(),
                hook: "QueueSort".to_string(),
            });
        }
        Ok(Self {
            sorter,
            items: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, pod: Pod) {
        debug!(pod = %pulsar_core::workload::namespaced_name(&pod), "enqueueing pod");
        self.items.lock().push(QueuedPodInfo::new(pod));
    }

    /// Re-queue a pod after a failed attempt
    pub fn requeue(&self, mut info: QueuedPodInfo) {
        info.attempts += 1;
        self.items.lock().push(info);
    }

    /// Remove and return the next pod in sort order
    pub fn pop(&self) -> Option<QueuedPodInfo> {
        let mut items = self.items.lock();
        if items.is_empty() {
            return None;
        }
        let mut best = 0;
        for i in 1..items.len() {
            if self.sorter.less(&items[i], &items[best]) {
                best = i;
            }
        }
        Some(items.remove(best))
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}
