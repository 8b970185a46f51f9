//! Pause/resume bookkeeping for soft preemption.
//!
//! The `pause-pod` annotation on the workload store is the source of truth;
//! the in-memory paused set is an acceleration index with a short TTL, so a
//! lagging entry is re-confirmed against the store before any transition is
//! written.

use crate::cache::TtlCache;
use crate::deadline::DeadlineManager;
use crate::error::{Result, SchedulerError};
use k8s_openapi::api::core::v1::{Node, Pod};
use pulsar_core::{annotations, workload};
use pulsar_framework::{NodeLister, PodClient, PodLister};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for the preemption manager
#[derive(Debug, Clone)]
pub struct PreemptionConfig {
    /// How long a paused-set entry lives. Deliberately short so scheduling
    /// decisions keep re-reading annotation state.
    pub paused_entry_ttl: Duration,
}

impl Default for PreemptionConfig {
    fn default() -> Self {
        Self {
            paused_entry_ttl: Duration::from_secs(5),
        }
    }
}

/// A resident picked for pausing (or found paused) on a node
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node_name: String,
    pub pod: Pod,
}

/// Maintains the set of paused pods per node and drives pause/resume
/// transitions through the workload store
pub struct PreemptionManager {
    paused: TtlCache<String>,
    deadline_manager: Arc<DeadlineManager>,
    pod_lister: Arc<dyn PodLister>,
    node_lister: Arc<dyn NodeLister>,
    pod_client: Arc<dyn PodClient>,
}

impl PreemptionManager {
    /// Create a preemption manager with the default config
    pub fn new(
        deadline_manager: Arc<DeadlineManager>,
        pod_lister: Arc<dyn PodLister>,
        node_lister: Arc<dyn NodeLister>,
        pod_client: Arc<dyn PodClient>,
    ) -> Self {
        Self::with_config(
            PreemptionConfig::default(),
            deadline_manager,
            pod_lister,
            node_lister,
            pod_client,
        )
    }

    /// Create a preemption manager with a custom config
    pub fn with_config(
        config: PreemptionConfig,
        deadline_manager: Arc<DeadlineManager>,
        pod_lister: Arc<dyn PodLister>,
        node_lister: Arc<dyn NodeLister>,
        pod_client: Arc<dyn PodClient>,
    ) -> Self {
        Self {
            paused: TtlCache::new(config.paused_entry_ttl),
            deadline_manager,
            pod_lister,
            node_lister,
            pod_client,
        }
    }

    /// Whether the pod carries the pause mark
    pub fn is_pod_marked_paused(&self, pod: &Pod) -> bool {
        annotations::is_marked_paused(pod)
    }

    /// Register a pod as paused on its node
    pub fn add_paused_pod(&self, candidate: &Candidate) {
        self.paused.insert(
            workload::namespaced_name(&candidate.pod),
            candidate.node_name.clone(),
        );
        self.deadline_manager.upsert(&candidate.pod);
    }

    /// Deregister a paused pod
    pub fn remove_paused_pod(&self, pod: &Pod) {
        self.paused.remove(&workload::namespaced_name(pod));
        self.paused.sweep();
        self.deadline_manager.remove(pod);
    }

    /// Node hosting a paused pod, per the paused set
    pub fn paused_pod_node(&self, pod: &Pod) -> Result<Node> {
        let key = workload::namespaced_name(pod);
        let node_name = self
            .paused
            .get(&key)
            .ok_or_else(|| SchedulerError::pod_not_found(&key))?;
        Ok(self.node_lister.get_node(&node_name)?)
    }

    /// The pause entry registered for the given node, re-read from the
    /// store, if any
    pub fn paused_candidate_on_node(&self, node_name: &str) -> Option<Candidate> {
        for (key, node) in self.paused.items() {
            if node != node_name {
                continue;
            }
            let Some((namespace, name)) = workload::split_key(&key) else {
                continue;
            };
            match self.pod_lister.get_pod(namespace, name) {
                Ok(pod) => {
                    return Some(Candidate {
                        node_name: node,
                        pod,
                    })
                }
                Err(err) => {
                    warn!(pod = %key, error = %err, "paused pod missing from store");
                    continue;
                }
            }
        }
        None
    }

    /// Resume one specific paused pod: verify the mark against the store,
    /// clear it, write back, and drop the pause entry.
    pub async fn resume_candidate(&self, candidate: &Candidate) -> Result<Candidate> {
        let key = workload::namespaced_name(&candidate.pod);
        let (namespace, name) = workload::split_key(&key)
            .ok_or_else(|| SchedulerError::pod_not_found(&key))?;
        let mut latest = self
            .pod_lister
            .get_pod(namespace, name)
            .map_err(|_| SchedulerError::pod_not_found(&key))?;
        if !annotations::is_marked_paused(&latest) {
            return Err(SchedulerError::pod_not_paused(&key));
        }
        annotations::set_pause_mark(&mut latest, false);
        self.pod_client
            .update_pod(&latest)
            .await
            .map_err(|err| SchedulerError::store_write(&key, err))?;
        self.remove_paused_pod(&latest);
        info!(pod = %key, node = %candidate.node_name, "resumed paused pod");
        Ok(Candidate {
            node_name: candidate.node_name.clone(),
            pod: latest,
        })
    }

    /// Scan the paused set for a pod the trigger may displace back in: the
    /// first resident whose deadline is no later than the trigger's is
    /// resumed. Returns `None` when nothing qualifies or every write fails.
    pub async fn resume_paused_pod(&self, trigger: &Pod) -> Option<Candidate> {
        let trigger_deadline = self.deadline_manager.get(trigger);
        for (key, node_name) in self.paused.items() {
            let Some((namespace, name)) = workload::split_key(&key) else {
                continue;
            };
            let paused = match self.pod_lister.get_pod(namespace, name) {
                Ok(pod) => pod,
                Err(err) => {
                    warn!(pod = %key, error = %err, "failed to read paused pod");
                    continue;
                }
            };
            if trigger_deadline < self.deadline_manager.get(&paused) {
                continue;
            }
            let candidate = Candidate {
                node_name,
                pod: paused,
            };
            match self.resume_candidate(&candidate).await {
                Ok(resumed) => return Some(resumed),
                Err(err) => {
                    warn!(pod = %key, error = %err, "failed to resume paused pod");
                    continue;
                }
            }
        }
        None
    }

    /// Pause the candidate pod: re-read it from the store, set the mark,
    /// write back, and register the pause entry.
    pub async fn pause_candidate(&self, candidate: &Candidate) -> Result<Candidate> {
        let key = workload::namespaced_name(&candidate.pod);
        let (namespace, name) = workload::split_key(&key)
            .ok_or_else(|| SchedulerError::pod_not_found(&key))?;
        let mut latest = self
            .pod_lister
            .get_pod(namespace, name)
            .map_err(|_| SchedulerError::pod_not_found(&key))?;
        annotations::set_pause_mark(&mut latest, true);
        self.pod_client
            .update_pod(&latest)
            .await
            .map_err(|err| SchedulerError::store_write(&key, err))?;
        let paused = Candidate {
            node_name: candidate.node_name.clone(),
            pod: latest,
        };
        self.add_paused_pod(&paused);
        info!(pod = %key, node = %paused.node_name, "paused pod");
        Ok(paused)
    }
}
