// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use chrono::TimeDelta;
use miette::Diagnostic;
use pulsar_framework::FrameworkError;
use thiserror::Error;

/// Scheduler plug-in error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// Pod not found in a manager cache or the workload store
    #[error("Pod not found: {key}")]
    #[diagnostic(
        code(scheduler::pod_not_found),
        help("The pod may have completed or been deleted; treat as benign")
    )]
    PodNotFound {
        #[allow(unused)]
        key: String,
    },

    /// Resume attempted on a pod the store shows unmarked
    #[error("Pod is not marked paused: {key}")]
    #[diagnostic(
        code(scheduler::pod_not_paused),
        help("The pause annotation is the source of truth; this resume is a no-op")
    )]
    PodNotPaused {
        #[allow(unused)]
        key: String,
    },

    /// Pause/resume annotation write failed
    #[error("Failed to write pause state for {key}")]
    #[diagnostic(
        code(scheduler::store_write),
        help("Transient store failure; the cycle reports the pod unschedulable and retries")
    )]
    StoreWrite {
        #[allow(unused)]
        key: String,
        #[source]
        source: FrameworkError,
    },

    /// No preemptible resident found anywhere
    #[error("No preemptible candidates found")]
    #[diagnostic(
        code(scheduler::no_candidates),
        help("Every resident has an earlier deadline than the pod or is non-preemptible")
    )]
    NoCandidates,

    /// Accumulated execution exceeded the estimate; the carried laxity is
    /// still meaningful (and typically negative)
    #[error("Execution time beyond estimation, laxity {laxity}")]
    #[diagnostic(
        code(scheduler::beyond_estimation),
        help("The observation is fed back into the predictor to correct the model")
    )]
    BeyondEstimation { laxity: TimeDelta },

    /// Framework error outside the pause/resume write path
    #[error(transparent)]
    #[diagnostic(code(scheduler::framework))]
    Framework(#[from] FrameworkError),
}

/// Result type for scheduler plug-in operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create a PodNotFound error
    pub fn pod_not_found(key: impl Into<String>) -> Self {
        Self::PodNotFound { key: key.into() }
    }

    /// Create a PodNotPaused error
    pub fn pod_not_paused(key: impl Into<String>) -> Self {
        Self::PodNotPaused { key: key.into() }
    }

    /// Create a StoreWrite error
    pub fn store_write(key: impl Into<String>, source: FrameworkError) -> Self {
        Self::StoreWrite {
            key: key.into(),
            source,
        }
    }
}
