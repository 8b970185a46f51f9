//! In-memory doubles of the host collaborators.
//!
//! `MockStore` and `MockHandle` back the plug-in test suites; the builders
//! keep fixture pods and nodes terse. This module is compiled into the
//! library (not test-gated) so downstream crates can drive their own tests
//! with it.

use crate::error::{FrameworkError, Result};
use crate::handle::FrameworkHandle;
use crate::node_info::NodeInfo;
use crate::store::{NodeLister, PodClient, PodLister};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Container, Node, Pod, PodSpec, PodStatus, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

fn pod_key(pod: &Pod) -> String {
    pulsar_core::workload::namespaced_name(pod)
}

/// In-memory pod and node store with write-failure injection
#[derive(Default)]
pub struct MockStore {
    pods: RwLock<HashMap<String, Pod>>,
    nodes: RwLock<HashMap<String, Node>>,
    fail_pod_updates: AtomicBool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pod(&self, pod: Pod) {
        self.pods.write().insert(pod_key(&pod), pod);
    }

    pub fn add_node(&self, node: Node) {
        let name = node.metadata.name.clone().unwrap_or_default();
        self.nodes.write().insert(name, node);
    }

    /// Make every subsequent pod update fail with WriteRejected
    pub fn fail_pod_updates(&self, fail: bool) {
        self.fail_pod_updates.store(fail, Ordering::SeqCst);
    }
}

impl PodLister for MockStore {
    fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        let key = format!("{}/{}", namespace, name);
        self.pods
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| FrameworkError::pod_not_found(key))
    }

    fn list_pods(&self) -> Vec<Pod> {
        self.pods.read().values().cloned().collect()
    }
}

impl NodeLister for MockStore {
    fn get_node(&self, name: &str) -> Result<Node> {
        self.nodes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FrameworkError::node_not_found(name))
    }

    fn list_nodes(&self) -> Vec<Node> {
        self.nodes.read().values().cloned().collect()
    }
}

#[async_trait]
impl PodClient for MockStore {
    async fn update_pod(&self, pod: &Pod) -> Result<()> {
        let key = pod_key(pod);
        if self.fail_pod_updates.load(Ordering::SeqCst) {
            return Err(FrameworkError::write_rejected(key, "injected failure"));
        }
        self.pods.write().insert(key, pod.clone());
        Ok(())
    }
}

/// In-memory framework handle: node snapshot, waiting set, nominations
#[derive(Default)]
pub struct MockHandle {
    nodes: RwLock<Vec<NodeInfo>>,
    waiting: RwLock<HashMap<String, Pod>>,
    nominated: RwLock<HashMap<String, Vec<Pod>>>,
}

impl MockHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node_info(&self, info: NodeInfo) {
        self.nodes.write().push(info);
    }

    /// Replace the whole snapshot, as a new scheduling cycle would observe
    pub fn set_node_infos(&self, infos: Vec<NodeInfo>) {
        *self.nodes.write() = infos;
    }

    pub fn set_waiting(&self, pod: Pod) {
        let uid = pulsar_core::workload::uid(&pod).to_string();
        self.waiting.write().insert(uid, pod);
    }

    pub fn nominate(&self, node_name: &str, pod: Pod) {
        self.nominated
            .write()
            .entry(node_name.to_string())
            .or_default()
            .push(pod);
    }
}

impl FrameworkHandle for MockHandle {
    fn node_infos(&self) -> Vec<NodeInfo> {
        self.nodes.read().clone()
    }

    fn node_info(&self, name: &str) -> Option<NodeInfo> {
        self.nodes.read().iter().find(|n| n.name() == name).cloned()
    }

    fn waiting_pod(&self, uid: &str) -> Option<Pod> {
        self.waiting.read().get(uid).cloned()
    }

    fn nominated_pods_for_node(&self, node_name: &str) -> Vec<Pod> {
        self.nominated
            .read()
            .get(node_name)
            .cloned()
            .unwrap_or_default()
    }
}

/// Fluent fixture pod builder
pub struct PodBuilder {
    pod: Pod,
}

impl PodBuilder {
    pub fn new(namespace: &str, name: &str) -> Self {
        let mut pod = Pod::default();
        pod.metadata.namespace = Some(namespace.to_string());
        pod.metadata.name = Some(name.to_string());
        pod.metadata.uid = Some(format!("uid-{}-{}", namespace, name));
        pod.spec = Some(PodSpec {
            containers: vec![Container {
                name: "main".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        });
        Self { pod }
    }

    pub fn uid(mut self, uid: &str) -> Self {
        self.pod.metadata.uid = Some(uid.to_string());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.pod.spec.as_mut().unwrap().priority = Some(priority);
        self
    }

    pub fn node_name(mut self, node: &str) -> Self {
        self.pod.spec.as_mut().unwrap().node_name = Some(node.to_string());
        self
    }

    pub fn phase(mut self, phase: &str) -> Self {
        self.pod
            .status
            .get_or_insert_with(PodStatus::default)
            .phase = Some(phase.to_string());
        self
    }

    pub fn creation_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.pod.metadata.creation_timestamp = Some(Time(at));
        self
    }

    pub fn annotation(mut self, key: &str, value: &str) -> Self {
        self.pod
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Resource requests on the first container
    pub fn request(mut self, cpu: &str, memory: &str) -> Self {
        let mut requests = BTreeMap::new();
        requests.insert("cpu".to_string(), Quantity(cpu.to_string()));
        requests.insert("memory".to_string(), Quantity(memory.to_string()));
        self.pod.spec.as_mut().unwrap().containers[0]
            .resources
            .get_or_insert_with(ResourceRequirements::default)
            .requests = Some(requests);
        self
    }

    /// Resource limits on the first container
    pub fn limit(mut self, cpu: &str, memory: &str) -> Self {
        let mut limits = BTreeMap::new();
        limits.insert("cpu".to_string(), Quantity(cpu.to_string()));
        limits.insert("memory".to_string(), Quantity(memory.to_string()));
        self.pod.spec.as_mut().unwrap().containers[0]
            .resources
            .get_or_insert_with(ResourceRequirements::default)
            .limits = Some(limits);
        self
    }

    pub fn build(self) -> Pod {
        self.pod
    }
}

/// Fluent fixture node builder
pub struct NodeBuilder {
    node: Node,
}

impl NodeBuilder {
    pub fn new(name: &str) -> Self {
        let mut node = Node::default();
        node.metadata.name = Some(name.to_string());
        Self { node }
    }

    pub fn capacity(mut self, cpu: &str, memory: &str, pods: i64) -> Self {
        let mut allocatable = BTreeMap::new();
        allocatable.insert("cpu".to_string(), Quantity(cpu.to_string()));
        allocatable.insert("memory".to_string(), Quantity(memory.to_string()));
        allocatable.insert("pods".to_string(), Quantity(pods.to_string()));
        self.node.status.get_or_insert_with(Default::default).allocatable = Some(allocatable);
        self
    }

    pub fn build(self) -> Node {
        self.node
    }
}
