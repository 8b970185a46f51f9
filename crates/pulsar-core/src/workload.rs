//! Accessors over the core/v1 pod shape.
//!
//! The platform speaks the Kubernetes core/v1 vocabulary, so nearly every
//! field of interest is optional; these helpers centralise the defaults the
//! schedulers rely on.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;

/// Pod phases relevant to scheduling. Phase is an open string in core/v1;
/// `Paused` is the platform's extension for soft-preempted workloads.
pub const PHASE_PENDING: &str = "Pending";
pub const PHASE_RUNNING: &str = "Running";
pub const PHASE_PAUSED: &str = "Paused";
pub const PHASE_SUCCEEDED: &str = "Succeeded";
pub const PHASE_FAILED: &str = "Failed";

/// Stable identifier of a pod across its lifetime. Empty when the pod has
/// not been through the API server yet (test fixtures).
pub fn uid(pod: &Pod) -> &str {
    pod.metadata.uid.as_deref().unwrap_or("")
}

/// Human key `namespace/name`
pub fn namespaced_name(pod: &Pod) -> String {
    format!(
        "{}/{}",
        pod.metadata.namespace.as_deref().unwrap_or_default(),
        pod.metadata.name.as_deref().unwrap_or_default()
    )
}

/// Split a `namespace/name` key back into its parts
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('/')
}

pub fn namespace(pod: &Pod) -> &str {
    pod.metadata.namespace.as_deref().unwrap_or_default()
}

pub fn name(pod: &Pod) -> &str {
    pod.metadata.name.as_deref().unwrap_or_default()
}

/// Scheduling priority; unset means 0
pub fn priority(pod: &Pod) -> i32 {
    pod.spec.as_ref().and_then(|s| s.priority).unwrap_or(0)
}

/// Node the pod is bound to, empty if unbound
pub fn node_name(pod: &Pod) -> &str {
    pod.spec
        .as_ref()
        .and_then(|s| s.node_name.as_deref())
        .unwrap_or_default()
}

pub fn phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or_default()
}

pub fn is_paused(pod: &Pod) -> bool {
    phase(pod) == PHASE_PAUSED
}

/// Creation timestamp; `None` when unset or zero-valued
pub fn creation_timestamp(pod: &Pod) -> Option<DateTime<Utc>> {
    pod.metadata
        .creation_timestamp
        .as_ref()
        .map(|t| t.0)
        .filter(|t| t.timestamp() != 0)
}
