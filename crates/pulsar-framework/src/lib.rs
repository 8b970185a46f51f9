//! Pulsar Framework - the host-scheduler surface consumed by plug-ins
//!
//! This crate provides:
//! - The `SchedulingPlugin` trait and its tagged capability set
//! - Extension-point statuses and the post-filter nomination result
//! - Node snapshot views and resource-fit arithmetic
//! - Workload/node store interfaces (sync listers, async writer)
//! - A scheduling queue and plug-in registry/profiles
//! - In-memory mocks and fixture builders for tests

pub mod error;
pub mod fits;
pub mod handle;
pub mod mock;
pub mod node_info;
pub mod plugin;
pub mod queue;
pub mod registry;
pub mod status;
pub mod store;

// Re-export commonly used types
pub use error::{FrameworkError, Result};
pub use fits::{fits, InsufficientResource};
pub use handle::FrameworkHandle;
pub use node_info::NodeInfo;
pub use plugin::{CapabilitySet, QueuedPodInfo, SchedulingPlugin};
pub use queue::SchedulingQueue;
pub use registry::{PluginDeps, PluginFactory, Profile, Registry};
pub use status::{Code, NodeToStatus, PostFilterResult, Status};
pub use store::{NodeLister, PodClient, PodLister};
