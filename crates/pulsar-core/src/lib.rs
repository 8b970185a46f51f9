//! Pulsar Core - shared vocabulary of the real-time scheduling plug-ins
//!
//! This crate provides:
//! - Annotation keys and typed accessors for the plug-in annotation surface
//! - Go-syntax duration parsing for deadline and execution-time values
//! - Resource quantity arithmetic over core/v1 pods and nodes
//! - A clock abstraction for deterministic time in tests
//! - Error types with miette diagnostics

pub mod annotations;
pub mod clock;
pub mod duration;
pub mod error;
pub mod resources;
pub mod workload;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use duration::parse_duration;
pub use error::{PulsarError, Result};
pub use resources::{node_allocatable, pod_limits, pod_requests, ResourceQuantities};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::{Node, Pod};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Serialize a resource to JSON
pub fn to_json<T: serde::Serialize>(resource: &T) -> Result<String> {
    serde_json::to_string(resource).map_err(|e| {
        PulsarError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a resource from JSON
pub fn from_json<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| {
        PulsarError::serialization_error(
            format!("Failed to deserialize from JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}
