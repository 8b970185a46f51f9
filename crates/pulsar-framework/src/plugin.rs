//! The extension-point surface plug-ins implement.
//!
//! A plug-in is one object implementing [`SchedulingPlugin`] and tagging the
//! hooks it participates in through its [`CapabilitySet`]. The host only
//! dispatches tagged hooks; the defaults here are inert.

use crate::node_info::NodeInfo;
use crate::status::{NodeToStatus, PostFilterResult, Status};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use std::fmt;
use std::ops::BitOr;

/// Tagged set of extension points a plug-in implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const QUEUE_SORT: CapabilitySet = CapabilitySet(1 << 0);
    pub const PRE_FILTER: CapabilitySet = CapabilitySet(1 << 1);
    pub const FILTER: CapabilitySet = CapabilitySet(1 << 2);
    pub const POST_FILTER: CapabilitySet = CapabilitySet(1 << 3);

    pub fn contains(&self, other: CapabilitySet) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CapabilitySet {
    type Output = CapabilitySet;

    fn bitor(self, rhs: CapabilitySet) -> CapabilitySet {
        CapabilitySet(self.0 | rhs.0)
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::QUEUE_SORT) {
            names.push("QueueSort");
        }
        if self.contains(Self::PRE_FILTER) {
            names.push("PreFilter");
        }
        if self.contains(Self::FILTER) {
            names.push("Filter");
        }
        if self.contains(Self::POST_FILTER) {
            names.push("PostFilter");
        }
        f.write_str(&names.join("|"))
    }
}

/// A pod waiting in the scheduling queue
#[derive(Debug, Clone)]
pub struct QueuedPodInfo {
    pub pod: Pod,
    /// Number of scheduling attempts so far
    pub attempts: u32,
}

impl QueuedPodInfo {
    pub fn new(pod: Pod) -> Self {
        Self { pod, attempts: 0 }
    }
}

/// One scheduling plug-in. Hooks run in host-prescribed order within a
/// cycle: queue-sort, pre-filter, filter per node, then post-filter when
/// every node rejected the pod.
#[async_trait]
pub trait SchedulingPlugin: Send + Sync {
    /// Name used in profiles and logs
    fn name(&self) -> &'static str;

    /// Extension points this plug-in participates in
    fn capabilities(&self) -> CapabilitySet;

    /// Strict weak ordering over the scheduling queue; `true` means `p1`
    /// schedules before `p2`. Must be pure apart from thread-safe cache
    /// warm-up.
    fn less(&self, _p1: &QueuedPodInfo, _p2: &QueuedPodInfo) -> bool {
        false
    }

    /// Runs once per cycle before any node is considered
    async fn pre_filter(&self, _pod: &Pod) -> Status {
        Status::success()
    }

    /// Runs per candidate node
    async fn filter(&self, _pod: &Pod, _node_info: &NodeInfo) -> Status {
        Status::success()
    }

    /// Runs when every node rejected the pod at the filter stage
    async fn post_filter(
        &self,
        _pod: &Pod,
        _filtered: &NodeToStatus,
    ) -> (Option<PostFilterResult>, Status) {
        (
            None,
            Status::with_reason(
                crate::status::Code::Unschedulable,
                "post-filter not implemented",
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_set_union_and_contains() {
        let caps = CapabilitySet::QUEUE_SORT | CapabilitySet::FILTER;
        assert!(caps.contains(CapabilitySet::QUEUE_SORT));
        assert!(caps.contains(CapabilitySet::FILTER));
        assert!(!caps.contains(CapabilitySet::POST_FILTER));
        assert_eq!(caps.to_string(), "QueueSort|Filter");
    }
}
