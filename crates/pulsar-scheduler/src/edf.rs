//! `EDFPreemptiveScheduling`: earliest-deadline-first ordering plus
//! pause/resume preemption across all four extension points.
//!
//! A tighter-deadline pod arriving at a full node pauses the slackest
//! resident instead of killing it; the paused pod keeps its node binding
//! and is resumed once a pod with a deadline no earlier than its own comes
//! through the queue.

use crate::deadline::{DeadlineConfig, DeadlineManager};
use crate::error::SchedulerError;
use crate::laxity::LaxityManager;
use crate::predictor::{LlspPredictor, Predictor, PredictorConfig};
use crate::preemption::{Candidate, PreemptionManager};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use pulsar_core::{annotations, workload};
use pulsar_framework::{
    fits, CapabilitySet, Code, FrameworkHandle, NodeInfo, NodeToStatus, PluginDeps, PluginFactory,
    PodLister, PostFilterResult, QueuedPodInfo, SchedulingPlugin, Status,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Name of the plugin used in the plugin registry and configurations
pub const NAME: &str = "EDFPreemptiveScheduling";

/// Soft real-time preemptive scheduling over pause/resume
pub struct EdfPreemptiveScheduling {
    handle: Arc<dyn FrameworkHandle>,
    pod_lister: Arc<dyn PodLister>,
    deadline_manager: Arc<DeadlineManager>,
    laxity_manager: Arc<LaxityManager>,
    preemption_manager: Arc<PreemptionManager>,
}

impl EdfPreemptiveScheduling {
    pub fn new(deps: &PluginDeps) -> Self {
        let deadline_manager = Arc::new(DeadlineManager::new(
            DeadlineConfig::preemptive(),
            deps.clock.clone(),
        ));
        let predictor: Arc<dyn Predictor> =
            Arc::new(LlspPredictor::new(PredictorConfig::default()));
        let laxity_manager = Arc::new(LaxityManager::new(
            deadline_manager.clone(),
            predictor,
            deps.clock.clone(),
        ));
        let preemption_manager = Arc::new(PreemptionManager::new(
            deadline_manager.clone(),
            deps.pod_lister.clone(),
            deps.node_lister.clone(),
            deps.pod_client.clone(),
        ));
        Self {
            handle: deps.handle.clone(),
            pod_lister: deps.pod_lister.clone(),
            deadline_manager,
            laxity_manager,
            preemption_manager,
        }
    }

    /// Registry factory
    pub fn factory() -> PluginFactory {
        Box::new(|deps: &PluginDeps| {
            Ok(Arc::new(EdfPreemptiveScheduling::new(deps)) as Arc<dyn SchedulingPlugin>)
        })
    }

    fn latest_pod(&self, pod: &Pod) -> Pod {
        self.pod_lister
            .get_pod(workload::namespace(pod), workload::name(pod))
            .unwrap_or_else(|_| pod.clone())
    }

    fn log_laxity(&self, pod: &Pod) {
        match self.laxity_manager.pod_laxity(pod) {
            Ok(laxity) => {
                debug!(pod = %workload::namespaced_name(pod), %laxity, "pod laxity")
            }
            Err(SchedulerError::BeyondEstimation { laxity }) => {
                debug!(
                    pod = %workload::namespaced_name(pod),
                    %laxity,
                    "pod ran beyond its execution estimate"
                )
            }
            Err(err) => debug!(pod = %workload::namespaced_name(pod), error = %err, "no laxity"),
        }
    }

    /// Pick the resident worth pausing on this node: the unpaused,
    /// preemptible resident with the latest deadline, provided that deadline
    /// is later than the incoming pod's and that removing the resident
    /// actually frees enough room.
    fn find_candidate_on_node(&self, pod: &Pod, node_info: &NodeInfo) -> Option<Pod> {
        let pod_deadline = self.deadline_manager.get(pod);
        let mut max_deadline = pod_deadline;
        let mut candidate: Option<Pod> = None;
        let mut unpaused: Vec<Pod> = Vec::new();

        let mut residents = node_info.pods.clone();
        residents.extend(self.handle.nominated_pods_for_node(node_info.name()));
        for resident in residents {
            let latest = self.latest_pod(&resident);
            if workload::uid(&latest) == workload::uid(pod) {
                continue;
            }
            if workload::is_paused(&latest) {
                continue;
            }
            unpaused.push(latest.clone());
            if !annotations::is_preemptible(&latest) {
                debug!(
                    pod = %workload::namespaced_name(&latest),
                    "skipping non-preemptible resident"
                );
                continue;
            }
            let deadline = self.deadline_manager.get(&latest);
            if deadline > max_deadline {
                max_deadline = deadline;
                candidate = Some(latest);
            }
        }

        let candidate = candidate?;
        let remaining: Vec<Pod> = unpaused
            .into_iter()
            .filter(|p| workload::uid(p) != workload::uid(&candidate))
            .collect();
        let after_preemption = node_info.with_pods(remaining);
        if !fits(pod, &after_preemption).is_empty() {
            info!(
                candidate = %workload::namespaced_name(&candidate),
                pod = %workload::namespaced_name(pod),
                node = node_info.name(),
                "not enough resources to run pod even after preemption"
            );
            return None;
        }
        Some(candidate)
    }

    /// Across all per-node candidates, pick the one with the latest deadline
    fn select_candidate<'a>(&self, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
        let mut best = candidates.first()?;
        let mut max_deadline = self.deadline_manager.get(&best.pod);
        for candidate in candidates {
            let deadline = self.deadline_manager.get(&candidate.pod);
            if deadline > max_deadline {
                max_deadline = deadline;
                best = candidate;
            }
        }
        Some(best)
    }
}

#[async_trait]
impl SchedulingPlugin for EdfPreemptiveScheduling {
    fn name(&self) -> &'static str {
        NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::QUEUE_SORT
            | CapabilitySet::PRE_FILTER
            | CapabilitySet::FILTER
            | CapabilitySet::POST_FILTER
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

    /// Gate for pods that re-enter the queue carrying the pause mark:
    /// resume them onto their own node when they hold the node's pause
    /// entry, otherwise reject or skip the cycle.
    async fn pre_filter(&self, pod: &Pod) -> Status {
        let latest = self.latest_pod(pod);
        if !self.preemption_manager.is_pod_marked_paused(&latest) {
            self.deadline_manager.upsert(&latest);
            return Status::success();
        }

        if self.handle.waiting_pod(workload::uid(&latest)).is_some()
            || workload::phase(&latest) == workload::PHASE_PENDING
        {
            info!(
                pod = %workload::namespaced_name(&latest),
                "pod marked to be paused and is currently at waiting stage"
            );
            return Status::skip();
        }

        let node_name = workload::node_name(&latest);
        let candidate = match self.preemption_manager.paused_candidate_on_node(node_name) {
            Some(candidate) => candidate,
            None => {
                info!(
                    pod = %workload::namespaced_name(&latest),
                    "pod marked paused but not found in preemption manager, attempting resume"
                );
                Candidate {
                    node_name: node_name.to_string(),
                    pod: latest.clone(),
                }
            }
        };
        if workload::uid(&candidate.pod) != workload::uid(&latest) {
            info!(
                pod = %workload::namespaced_name(&latest),
                candidate = %workload::namespaced_name(&candidate.pod),
                node = %candidate.node_name,
                "another paused pod on the node has higher priority"
            );
            return Status::with_reason(
                Code::UnschedulableAndUnresolvable,
                "rejected as another paused pod has higher priority",
            );
        }

        match self.preemption_manager.resume_candidate(&candidate).await {
            Ok(resumed) => {
                self.laxity_manager.start_pod_execution(&resumed.pod);
                self.log_laxity(&resumed.pod);
                info!(pod = %workload::namespaced_name(&resumed.pod), "successfully resumed pod");
                Status::with_reason(Code::Skip, "skipped because pod is resumed successfully")
            }
            Err(SchedulerError::PodNotPaused { .. }) => {
                info!(
                    pod = %workload::namespaced_name(&latest),
                    "pod was marked to be paused but is not paused"
                );
                Status::skip()
            }
            Err(err) => {
                error!(
                    pod = %workload::namespaced_name(&latest),
                    error = %err,
                    "failed to resume pod"
                );
                Status::new(Code::UnschedulableAndUnresolvable)
            }
        }
    }

    /// Per-node admission: paused pods only return to their own node, an
    /// earlier-deadline paused resident takes the slot back first, and the
    /// fit check ignores paused residents.
    async fn filter(&self, pod: &Pod, node_info: &NodeInfo) -> Status {
        let bound = workload::node_name(pod);
        if !bound.is_empty() && bound != node_info.name() {
            // a paused pod re-entering the queue must not move
            return Status::new(Code::UnschedulableAndUnresolvable);
        }

        if let Some(candidate) = self
            .preemption_manager
            .paused_candidate_on_node(node_info.name())
        {
            if self.deadline_manager.get(&candidate.pod) < self.deadline_manager.get(pod) {
                let msg = "found a paused pod on node that needs to be resumed";
                info!(
                    paused_pod = %workload::namespaced_name(&candidate.pod),
                    pod = %workload::namespaced_name(pod),
                    node = node_info.name(),
                    "found a paused pod on node that needs to be resumed"
                );
                match self.preemption_manager.resume_candidate(&candidate).await {
                    Ok(resumed) => {
                        self.laxity_manager.start_pod_execution(&resumed.pod);
                        info!(
                            candidate = %workload::namespaced_name(&resumed.pod),
                            node = %resumed.node_name,
                            "resumed candidate successfully"
                        );
                        return Status::with_reason(Code::UnschedulableAndUnresolvable, msg);
                    }
                    Err(err) => {
                        info!(
                            error = %err,
                            candidate = %workload::namespaced_name(&candidate.pod),
                            "failed to resume paused pod, continuing to schedule pod"
                        );
                    }
                }
            }
        }

        let unpaused: Vec<Pod> = node_info
            .pods
            .iter()
            .filter(|p| !workload::is_paused(p))
            .cloned()
            .collect();
        let view = node_info.with_pods(unpaused);
        let insufficient = fits(pod, &view);
        if !insufficient.is_empty() {
            return Status::unschedulable(
                insufficient.into_iter().map(|r| r.reason).collect(),
            );
        }
        Status::success()
    }

    /// Preemption: when every node rejected the pod, pause the slackest
    /// resident somewhere and nominate that node.
    async fn post_filter(
        &self,
        pod: &Pod,
        filtered: &NodeToStatus,
    ) -> (Option<PostFilterResult>, Status) {
        let mut candidates: Vec<Candidate> = Vec::new();
        for node_info in self.handle.node_infos() {
            // preemption cannot help on these nodes
            if filtered.code(node_info.name()) == Code::UnschedulableAndUnresolvable {
                info!(
                    pod = %workload::namespaced_name(pod),
                    node = node_info.name(),
                    "skipping unschedulable and unresolvable node"
                );
                continue;
            }
            if let Some(victim) = self.find_candidate_on_node(pod, &node_info) {
                candidates.push(Candidate {
                    node_name: node_info.name().to_string(),
                    pod: victim,
                });
            }
        }

        let Some(candidate) = self.select_candidate(&candidates) else {
            warn!(pod = %workload::namespaced_name(pod), "no preemptible candidates found");
            return (
                None,
                Status::with_reason(
                    Code::UnschedulableAndUnresolvable,
                    "no preemptible candidates found",
                ),
            );
        };
        info!(
            candidate = %workload::namespaced_name(&candidate.pod),
            pod = %workload::namespaced_name(pod),
            node = %candidate.node_name,
            "found candidate pod to pause on node"
        );

        match self.preemption_manager.pause_candidate(candidate).await {
            Ok(paused) => {
                self.laxity_manager.pause_pod_execution(&paused.pod);
                self.log_laxity(&paused.pod);
                (
                    Some(PostFilterResult::with_nominated_node(&paused.node_name)),
                    Status::success(),
                )
            }
            Err(err) => {
                error!(
                    candidate = %workload::namespaced_name(&candidate.pod),
                    pod = %workload::namespaced_name(pod),
                    node = %candidate.node_name,
                    error = %err,
                    "failed to pause pod on node"
                );
                (None, Status::from_error(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use pulsar_core::annotations::ANNOTATION_KEY_DDL;
    use pulsar_core::{Clock, FixedClock, SystemClock};
    use pulsar_framework::mock::{MockHandle, MockStore, PodBuilder};

    fn plugin() -> EdfPreemptiveScheduling {
        let store = Arc::new(MockStore::new());
        let deps = PluginDeps {
            handle: Arc::new(MockHandle::new()),
            pod_lister: store.clone(),
            node_lister: store.clone(),
            pod_client: store,
            clock: Arc::new(SystemClock),
        };
        EdfPreemptiveScheduling::new(&deps)
    }

    fn queued(pod: Pod) -> QueuedPodInfo {
        QueuedPodInfo::new(pod)
    }

    struct LessCase {
        name: &'static str,
        p1: QueuedPodInfo,
        p2: QueuedPodInfo,
        expected: bool,
    }

    #[test]
    fn test_less() {
        let now = Utc::now();
        let t = |offset: i64| now + TimeDelta::seconds(offset);
        let (low, high) = (10, 100);

        let cases = vec![
            LessCase {
                name: "p1.prio < p2.prio, p2 scheduled first",
                p1: queued(PodBuilder::new("ns1", "pod1").priority(low).build()),
                p2: queued(PodBuilder::new("ns2", "pod2").priority(high).build()),
                expected: false,
            },
            LessCase {
                name: "p1.prio > p2.prio, p1 scheduled first",
                p1: queued(PodBuilder::new("ns1", "pod1").priority(high).build()),
                p2: queued(PodBuilder::new("ns2", "pod2").priority(low).build()),
                expected: true,
            },
            LessCase {
                name: "equal prio, p1 ddl earlier, p1 scheduled first",
                p1: queued(
                    PodBuilder::new("ns1", "pod1")
                        .priority(low)
                        .creation_timestamp(t(0))
                        .annotation(ANNOTATION_KEY_DDL, "10s")
                        .build(),
                ),
                p2: queued(
                    PodBuilder::new("ns2", "pod2")
                        .priority(low)
                        .creation_timestamp(t(1))
                        .annotation(ANNOTATION_KEY_DDL, "20s")
                        .build(),
                ),
                expected: true,
            },
            LessCase {
                name: "equal prio, p1 ddl later, p2 scheduled first",
                p1: queued(
                    PodBuilder::new("ns1", "pod1")
                        .priority(low)
                        .creation_timestamp(t(0))
                        .annotation(ANNOTATION_KEY_DDL, "20s")
                        .build(),
                ),
                p2: queued(
                    PodBuilder::new("ns2", "pod2")
                        .priority(low)
                        .creation_timestamp(t(1))
                        .annotation(ANNOTATION_KEY_DDL, "10s")
                        .build(),
                ),
                expected: false,
            },
            LessCase {
                name: "equal prio, no ddl, p1 created earlier, p1 scheduled first",
                p1: queued(
                    PodBuilder::new("ns1", "pod1")
                        .priority(low)
                        .creation_timestamp(t(0))
                        .build(),
                ),
                p2: queued(
                    PodBuilder::new("ns2", "pod2")
                        .priority(low)
                        .creation_timestamp(t(1))
                        .build(),
                ),
                expected: true,
            },
            LessCase {
                name: "equal prio and deadline, name breaks the tie",
                p1: queued(
                    PodBuilder::new("ns1", "pod1")
                        .priority(low)
                        .creation_timestamp(t(0))
                        .build(),
                ),
                p2: queued(
                    PodBuilder::new("ns2", "pod2")
                        .priority(low)
                        .creation_timestamp(t(0))
                        .build(),
                ),
                expected: true,
            },
        ];

        for case in cases {
            let plugin = plugin();
            assert_eq!(
                plugin.less(&case.p1, &case.p2),
                case.expected,
                "{}",
                case.name
            );
        }
    }

    #[test]
    fn test_less_is_asymmetric() {
        let plugin = plugin();
        let now = Utc::now();
        let p1 = queued(
            PodBuilder::new("ns1", "pod1")
                .creation_timestamp(now)
                .annotation(ANNOTATION_KEY_DDL, "10s")
                .build(),
        );
        let p2 = queued(
            PodBuilder::new("ns2", "pod2")
                .creation_timestamp(now)
                .annotation(ANNOTATION_KEY_DDL, "20s")
                .build(),
        );

        assert!(plugin.less(&p1, &p2) != plugin.less(&p2, &p1));
    }

    #[tokio::test]
    async fn test_pre_filter_unmarked_pod_continues() {
        let plugin = plugin();
        let pod = PodBuilder::new("default", "p1")
            .creation_timestamp(Utc::now())
            .build();

        let status = plugin.pre_filter(&pod).await;
        assert!(status.is_success());
    }

    #[tokio::test]
    async fn test_pre_filter_pending_marked_pod_skips() {
        let plugin = plugin();
        let pod = PodBuilder::new("default", "p1")
            .creation_timestamp(Utc::now())
            .annotation(annotations::ANNOTATION_KEY_PAUSE_POD, "true")
            .phase(workload::PHASE_PENDING)
            .build();

        let status = plugin.pre_filter(&pod).await;
        assert!(status.is_skip());
    }

    #[tokio::test]
    async fn test_filter_rejects_foreign_node_for_bound_pod() {
        let plugin = plugin();
        let clock = FixedClock::new(Utc::now());
        let pod = PodBuilder::new("default", "p1")
            .creation_timestamp(clock.now())
            .node_name("node-a")
            .build();
        let node_info = NodeInfo::new(
            pulsar_framework::mock::NodeBuilder::new("node-b")
                .capacity("1", "1Gi", 32)
                .build(),
        );

        let status = plugin.filter(&pod, &node_info).await;
        assert_eq!(status.code(), Code::UnschedulableAndUnresolvable);
    }
}
