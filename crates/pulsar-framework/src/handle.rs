//! Handle into the host scheduler's per-cycle state.

use crate::node_info::NodeInfo;
use k8s_openapi::api::core::v1::Pod;

/// What the host exposes to plug-ins during a scheduling cycle: the node
/// snapshot, pods parked at the permit stage, and pods the host has already
/// earmarked for a node this round.
pub trait FrameworkHandle: Send + Sync {
    /// Snapshot of every node with its residents
    fn node_infos(&self) -> Vec<NodeInfo>;

    /// Snapshot entry for one node
    fn node_info(&self, name: &str) -> Option<NodeInfo>;

    /// Pod held in the host's waiting set, if any
    fn waiting_pod(&self, uid: &str) -> Option<Pod>;

    /// Pods nominated onto the node in this round but not yet bound
    fn nominated_pods_for_node(&self, node_name: &str) -> Vec<Pod>;
}
