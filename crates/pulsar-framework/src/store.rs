//! Workload and node store interfaces.
//!
//! Reads come from the host's informer caches and are synchronous; writes go
//! through the API client and may block, so they are the plug-in's only
//! store-side suspension points.

use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};

/// Read access to the pod cache
pub trait PodLister: Send + Sync {
    fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;
    fn list_pods(&self) -> Vec<Pod>;
}

/// Read access to the node cache
pub trait NodeLister: Send + Sync {
    fn get_node(&self, name: &str) -> Result<Node>;
    fn list_nodes(&self) -> Vec<Node>;
}

/// Write access to the workload store
#[async_trait]
pub trait PodClient: Send + Sync {
    /// Persist the given pod, replacing the stored object
    async fn update_pod(&self, pod: &Pod) -> Result<()>;
}
