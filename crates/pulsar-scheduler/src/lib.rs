//! Pulsar Scheduler - soft real-time preemptive scheduling plug-ins
//!
//! This crate provides:
//! - `SimpleDDL`: earliest-deadline-first queue ordering
//! - `EDFPreemptiveScheduling`: EDF ordering plus pause/resume preemption
//! - The deadline, laxity and preemption managers behind them
//! - An online least-squares execution-time predictor

pub mod deadline;
pub mod edf;
pub mod error;
pub mod laxity;
pub mod predictor;
pub mod preemption;
pub mod simpleddl;

mod cache;

// Re-export commonly used types
pub use deadline::{DeadlineConfig, DeadlineManager};
pub use edf::EdfPreemptiveScheduling;
pub use error::{Result, SchedulerError};
pub use laxity::LaxityManager;
pub use predictor::{LlspPredictor, Metrics, Predictor, PredictorConfig};
pub use preemption::{Candidate, PreemptionConfig, PreemptionManager};
pub use simpleddl::SimpleDdl;

use pulsar_framework::Registry;

/// Register both scheduling profiles' plug-ins into the host registry
pub fn register_plugins(registry: &mut Registry) -> pulsar_framework::Result<()> {
    registry.register(simpleddl::NAME, SimpleDdl::factory())?;
    registry.register(edf::NAME, EdfPreemptiveScheduling::factory())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsar_core::SystemClock;
    use pulsar_framework::mock::{MockHandle, MockStore};
    use pulsar_framework::{CapabilitySet, PluginDeps};
    use std::sync::Arc;

    fn deps() -> PluginDeps {
        let store = Arc::new(MockStore::new());
        PluginDeps {
            handle: Arc::new(MockHandle::new()),
            pod_lister: store.clone(),
            node_lister: store.clone(),
            pod_client: store,
            clock: Arc::new(SystemClock),
        }
    }

    #[test]
    fn test_register_plugins() {
        let mut registry = Registry::new();
        register_plugins(&mut registry).unwrap();

        let deps = deps();
        let simple = registry.build(simpleddl::NAME, &deps).unwrap();
        assert!(simple.capabilities().contains(CapabilitySet::QUEUE_SORT));
        assert!(!simple.capabilities().contains(CapabilitySet::POST_FILTER));

        let edf = registry.build(edf::NAME, &deps).unwrap();
        assert!(edf.capabilities().contains(
            CapabilitySet::QUEUE_SORT
                | CapabilitySet::PRE_FILTER
                | CapabilitySet::FILTER
                | CapabilitySet::POST_FILTER
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = Registry::new();
        register_plugins(&mut registry).unwrap();
        assert!(register_plugins(&mut registry).is_err());
    }
}
