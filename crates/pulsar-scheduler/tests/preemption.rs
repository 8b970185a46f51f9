//! Pause/resume preemption scenarios for the EDFPreemptiveScheduling
//! profile: nodes sized to fit exactly one CPU-heavy pod.

use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;
use pulsar_core::annotations::{
    self, ANNOTATION_KEY_DDL, ANNOTATION_KEY_PAUSE_POD, ANNOTATION_KEY_PREEMPTIBLE,
};
use pulsar_core::{workload, Clock, FixedClock};
use pulsar_framework::mock::{MockHandle, MockStore, NodeBuilder, PodBuilder};
use pulsar_framework::{
    Code, FrameworkHandle, NodeInfo, NodeLister, NodeToStatus, PluginDeps, PodLister, Profile,
    Registry, SchedulingPlugin,
};
use pulsar_scheduler::register_plugins;
use std::sync::Arc;

struct Cluster {
    store: Arc<MockStore>,
    handle: Arc<MockHandle>,
    clock: Arc<FixedClock>,
    plugin: Arc<dyn SchedulingPlugin>,
}

impl Cluster {
    fn new() -> Self {
        let mut registry = Registry::new();
        register_plugins(&mut registry).unwrap();

        let store = Arc::new(MockStore::new());
        let handle = Arc::new(MockHandle::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let deps = PluginDeps {
            handle: handle.clone(),
            pod_lister: store.clone(),
            node_lister: store.clone(),
            pod_client: store.clone(),
            clock: clock.clone(),
        };
        let profile = Profile::from_registry(&registry, "EDFPreemptiveScheduling", &deps).unwrap();

        Self {
            store,
            handle,
            clock,
            plugin: profile.plugin,
        }
    }

    /// Single-slot node: exactly one CPU-heavy pod fits
    fn add_node(&self, name: &str, residents: Vec<Pod>) {
        let node = NodeBuilder::new(name).capacity("1", "1Gi", 32).build();
        self.store.add_node(node.clone());
        let mut info = NodeInfo::new(node);
        for resident in residents {
            self.store.add_pod(resident.clone());
            info.add_pod(resident);
        }
        self.handle.add_node_info(info);
    }

    /// CPU-heavy pod taking the whole node
    fn heavy_pod(&self, name: &str, ddl: &str) -> PodBuilder {
        PodBuilder::new("preemption-test", name)
            .creation_timestamp(self.clock.now())
            .annotation(ANNOTATION_KEY_DDL, ddl)
            .request("1", "100Mi")
    }

    /// Run the filter hook over the whole snapshot, as the host would
    async fn filter_all(&self, pod: &Pod) -> NodeToStatus {
        let mut statuses = NodeToStatus::new();
        for info in self.handle.node_infos() {
            let status = self.plugin.filter(pod, &info).await;
            statuses.insert(info.name().to_string(), status);
        }
        statuses
    }
}

// P1: a tighter-deadline arrival pauses the slack resident and the node is
// nominated; the next cycle fits the arrival onto the node.
#[tokio::test]
async fn test_urgent_pod_pauses_slack_resident() {
    let cluster = Cluster::new();
    let resident = cluster
        .heavy_pod("resident", "1h")
        .node_name("node-a")
        .phase(workload::PHASE_RUNNING)
        .build();
    cluster.add_node("node-a", vec![resident]);

    let urgent = cluster.heavy_pod("urgent", "1m").build();
    cluster.store.add_pod(urgent.clone());

    assert!(cluster.plugin.pre_filter(&urgent).await.is_success());

    let statuses = cluster.filter_all(&urgent).await;
    assert_eq!(statuses.code("node-a"), Code::Unschedulable);

    let (result, status) = cluster.plugin.post_filter(&urgent, &statuses).await;
    assert!(status.is_success());
    assert_eq!(result.unwrap().nominated_node, "node-a");

    let stored = cluster.store.get_pod("preemption-test", "resident").unwrap();
    assert!(annotations::is_marked_paused(&stored));

    // next cycle: the node agent has parked the resident, the snapshot
    // shows it paused, and the urgent pod now fits
    let mut paused = stored;
    paused.status.get_or_insert_with(Default::default).phase =
        Some(workload::PHASE_PAUSED.to_string());
    cluster.store.add_pod(paused.clone());
    let node = cluster.store.get_node("node-a").unwrap();
    let mut info = NodeInfo::new(node);
    info.add_pod(paused);
    cluster.handle.set_node_infos(vec![info.clone()]);

    let status = cluster.plugin.filter(&urgent, &info).await;
    assert!(status.is_success());
}

// P2: the resident's deadline is earlier than the arrival's, so there is
// nothing to preempt.
#[tokio::test]
async fn test_slack_pod_cannot_preempt_urgent_resident() {
    let cluster = Cluster::new();
    let resident = cluster
        .heavy_pod("resident", "1m")
        .node_name("node-a")
        .phase(workload::PHASE_RUNNING)
        .build();
    cluster.add_node("node-a", vec![resident]);

    let slack = cluster.heavy_pod("slack", "1h").build();
    cluster.store.add_pod(slack.clone());

    let statuses = cluster.filter_all(&slack).await;
    assert_eq!(statuses.code("node-a"), Code::Unschedulable);

    let (result, status) = cluster.plugin.post_filter(&slack, &statuses).await;
    assert!(result.is_none());
    assert_eq!(status.code(), Code::UnschedulableAndUnresolvable);
    assert_eq!(status.message(), "no preemptible candidates found");

    let stored = cluster.store.get_pod("preemption-test", "resident").unwrap();
    assert!(!annotations::is_marked_paused(&stored));
}

// P3: a previously paused pod re-pops while a different pod holds the
// node's pause entry; it must wait.
#[tokio::test]
async fn test_marked_pod_defers_to_registered_candidate() {
    let cluster = Cluster::new();
    let resident = cluster
        .heavy_pod("resident", "1h")
        .node_name("node-a")
        .phase(workload::PHASE_RUNNING)
        .build();
    let earlier_victim = cluster
        .heavy_pod("earlier-victim", "30m")
        .node_name("node-a")
        .phase(workload::PHASE_PAUSED)
        .annotation(ANNOTATION_KEY_PAUSE_POD, "true")
        .build();
    cluster.add_node("node-a", vec![resident, earlier_victim.clone()]);

    // a trigger pod pauses the running resident, registering it as the
    // node's pause entry
    let trigger = cluster.heavy_pod("trigger", "1m").build();
    cluster.store.add_pod(trigger.clone());
    let statuses = cluster.filter_all(&trigger).await;
    let (result, status) = cluster.plugin.post_filter(&trigger, &statuses).await;
    assert!(status.is_success());
    assert_eq!(result.unwrap().nominated_node, "node-a");

    // the earlier victim re-pops, but the resident holds the pause entry
    let status = cluster.plugin.pre_filter(&earlier_victim).await;
    assert_eq!(status.code(), Code::UnschedulableAndUnresolvable);
    assert_eq!(
        status.message(),
        "rejected as another paused pod has higher priority"
    );
}

// A marked pod with no pause entry for its node is resumed on the fly.
#[tokio::test]
async fn test_marked_pod_without_entry_resumes_on_the_fly() {
    let cluster = Cluster::new();
    let marked = cluster
        .heavy_pod("stray", "30m")
        .node_name("node-a")
        .phase(workload::PHASE_PAUSED)
        .annotation(ANNOTATION_KEY_PAUSE_POD, "true")
        .build();
    cluster.add_node("node-a", vec![marked.clone()]);

    let status = cluster.plugin.pre_filter(&marked).await;
    assert!(status.is_skip());
    assert_eq!(status.message(), "skipped because pod is resumed successfully");

    let stored = cluster.store.get_pod("preemption-test", "stray").unwrap();
    assert!(!annotations::is_marked_paused(&stored));
}

// A failing store write surfaces as UnschedulableAndUnresolvable for the
// cycle; the annotation state is untouched.
#[tokio::test]
async fn test_resume_write_failure_rejects_cycle() {
    let cluster = Cluster::new();
    let marked = cluster
        .heavy_pod("stray", "30m")
        .node_name("node-a")
        .phase(workload::PHASE_PAUSED)
        .annotation(ANNOTATION_KEY_PAUSE_POD, "true")
        .build();
    cluster.add_node("node-a", vec![marked.clone()]);
    cluster.store.fail_pod_updates(true);

    let status = cluster.plugin.pre_filter(&marked).await;
    assert_eq!(status.code(), Code::UnschedulableAndUnresolvable);

    let stored = cluster.store.get_pod("preemption-test", "stray").unwrap();
    assert!(annotations::is_marked_paused(&stored));
}

// Residents annotated preemptible=false are never paused.
#[tokio::test]
async fn test_non_preemptible_resident_is_never_paused() {
    let cluster = Cluster::new();
    let resident = cluster
        .heavy_pod("protected", "1h")
        .node_name("node-a")
        .phase(workload::PHASE_RUNNING)
        .annotation(ANNOTATION_KEY_PREEMPTIBLE, "false")
        .build();
    cluster.add_node("node-a", vec![resident]);

    let urgent = cluster.heavy_pod("urgent", "1m").build();
    cluster.store.add_pod(urgent.clone());

    let statuses = cluster.filter_all(&urgent).await;
    let (result, status) = cluster.plugin.post_filter(&urgent, &statuses).await;
    assert!(result.is_none());
    assert_eq!(status.code(), Code::UnschedulableAndUnresolvable);

    let stored = cluster.store.get_pod("preemption-test", "protected").unwrap();
    assert!(!annotations::is_marked_paused(&stored));
}

// Filter resumes an earlier-deadline paused resident before considering
// the incoming pod; the pod is reconsidered later.
#[tokio::test]
async fn test_filter_resumes_earlier_deadline_paused_resident() {
    let cluster = Cluster::new();
    let victim = cluster
        .heavy_pod("victim", "1m")
        .node_name("node-a")
        .phase(workload::PHASE_RUNNING)
        .build();
    cluster.add_node("node-a", vec![victim.clone()]);

    // pause the victim through the plug-in so the node's entry is registered
    let trigger = cluster.heavy_pod("trigger", "30s").build();
    cluster.store.add_pod(trigger.clone());
    let statuses = cluster.filter_all(&trigger).await;
    let (result, _) = cluster.plugin.post_filter(&trigger, &statuses).await;
    assert_eq!(result.unwrap().nominated_node, "node-a");

    // a slack pod arrives; the paused victim's earlier deadline wins the
    // slot back before the arrival is considered
    let slack = cluster.heavy_pod("slack", "1h").build();
    cluster.store.add_pod(slack.clone());
    let info = cluster.handle.node_info("node-a").unwrap();
    let status = cluster.plugin.filter(&slack, &info).await;
    assert_eq!(status.code(), Code::UnschedulableAndUnresolvable);
    assert_eq!(
        status.message(),
        "found a paused pod on node that needs to be resumed"
    );

    let stored = cluster.store.get_pod("preemption-test", "victim").unwrap();
    assert!(!annotations::is_marked_paused(&stored));
}
