//! Resource-fit arithmetic: can this pod run on this node view?

use crate::node_info::NodeInfo;
use k8s_openapi::api::core::v1::Pod;
use pulsar_core::resources::{node_allocatable, pod_requests, ResourceQuantities};
use tracing::debug;

/// One resource dimension that prevents the pod from fitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientResource {
    pub resource: &'static str,
    pub reason: String,
    pub requested: i64,
    pub used: i64,
    pub capacity: i64,
}

fn check(
    resource: &'static str,
    requested: i64,
    used: i64,
    capacity: i64,
) -> Option<InsufficientResource> {
    if requested == 0 || requested + used <= capacity {
        return None;
    }
    Some(InsufficientResource {
        resource,
        reason: format!("Insufficient {}", resource),
        requested,
        used,
        capacity,
    })
}

/// Check whether `pod` fits onto the given node view, returning one entry
/// per insufficient resource. An empty result means the pod fits.
pub fn fits(pod: &Pod, node_info: &NodeInfo) -> Vec<InsufficientResource> {
    let allocatable = node_allocatable(&node_info.node);
    let requested = pod_requests(pod);

    let mut used = ResourceQuantities::default();
    for resident in &node_info.pods {
        used.add(&pod_requests(resident));
    }

    debug!(
        node = node_info.name(),
        cpu_used = used.cpu_millicores,
        cpu_requested = requested.cpu_millicores,
        cpu_capacity = allocatable.cpu_millicores,
        "checking node fit"
    );

    let mut insufficient = Vec::new();
    if let Some(r) = check("pods", requested.pods, used.pods, allocatable.pods) {
        insufficient.push(r);
    }
    if let Some(r) = check(
        "cpu",
        requested.cpu_millicores,
        used.cpu_millicores,
        allocatable.cpu_millicores,
    ) {
        insufficient.push(r);
    }
    if let Some(r) = check(
        "memory",
        requested.memory_bytes,
        used.memory_bytes,
        allocatable.memory_bytes,
    ) {
        insufficient.push(r);
    }
    insufficient
}
