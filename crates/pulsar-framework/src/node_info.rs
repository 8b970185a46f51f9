//! Snapshot view of a node and its resident pods.

use k8s_openapi::api::core::v1::{Node, Pod};

/// A node plus the pods currently placed on it, as captured by the host's
/// scheduling snapshot. Virtual views (e.g. "this node without its paused
/// residents") are built with [`NodeInfo::with_pods`].
#[derive(Debug, Clone, Default)]
pub struct NodeInfo {
    pub node: Node,
    pub pods: Vec<Pod>,
}

impl NodeInfo {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            pods: Vec::new(),
        }
    }

    /// Same node, different resident set
    pub fn with_pods(&self, pods: Vec<Pod>) -> Self {
        Self {
            node: self.node.clone(),
            pods,
        }
    }

    pub fn add_pod(&mut self, pod: Pod) {
        self.pods.push(pod);
    }

    pub fn name(&self) -> &str {
        self.node.metadata.name.as_deref().unwrap_or_default()
    }
}
