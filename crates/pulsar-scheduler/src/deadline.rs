//! Absolute-deadline bookkeeping.
//!
//! The absolute deadline of a pod is its creation timestamp plus the
//! relative deadline annotation. Entries are keyed by UID: a recreated pod
//! shares its `namespace/name` with its predecessor but never its UID, so
//! key collisions cannot resurrect a stale deadline.

use crate::cache::TtlCache;
use chrono::{DateTime, TimeDelta, Utc};
use k8s_openapi::api::core::v1::Pod;
use pulsar_core::{annotations, workload, Clock};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Configuration of a deadline manager, fixed per scheduler profile
#[derive(Debug, Clone)]
pub struct DeadlineConfig {
    /// Annotation key carrying the relative deadline
    pub annotation_key: &'static str,
    /// Fallback relative deadline when the annotation is absent or invalid
    pub default_relative: TimeDelta,
    /// How long a cached deadline lives before the annotation state is
    /// re-read
    pub entry_ttl: Duration,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            annotation_key: annotations::ANNOTATION_KEY_DDL,
            default_relative: TimeDelta::days(30),
            entry_ttl: Duration::from_secs(3600),
        }
    }
}

impl DeadlineConfig {
    /// Preemptive profile: 30-day fallback deadline
    pub fn preemptive() -> Self {
        Self::default()
    }

    /// Simple queue-sort profile: 10-minute fallback deadline
    pub fn simple() -> Self {
        Self {
            annotation_key: annotations::SIMPLE_DDL_ANNOTATION_KEY,
            default_relative: TimeDelta::minutes(10),
            ..Self::default()
        }
    }
}

/// Parses and caches absolute deadlines per pod UID
pub struct DeadlineManager {
    config: DeadlineConfig,
    clock: Arc<dyn Clock>,
    deadlines: TtlCache<DateTime<Utc>>,
}

impl DeadlineManager {
    pub fn new(config: DeadlineConfig, clock: Arc<dyn Clock>) -> Self {
        let deadlines = TtlCache::new(config.entry_ttl);
        Self {
            config,
            clock,
            deadlines,
        }
    }

    /// Compute the absolute deadline of a pod without touching the cache.
    ///
    /// Fallbacks, applied in order: missing/zero creation timestamp uses
    /// "now"; a missing, unparseable or negative relative deadline uses the
    /// profile default.
    pub fn parse(&self, pod: &Pod) -> DateTime<Utc> {
        let default_relative = self.config.default_relative;
        let creation = match workload::creation_timestamp(pod) {
            Some(t) => t,
            None => {
                warn!(
                    pod = %workload::namespaced_name(pod),
                    "invalid pod creation time, using current timestamp and default deadline"
                );
                return self.clock.now() + default_relative;
            }
        };
        let relative = match annotations::relative_deadline(pod, self.config.annotation_key) {
            None => {
                warn!(
                    pod = %workload::namespaced_name(pod),
                    default = %default_relative,
                    "deadline not defined in pod annotations, using default"
                );
                default_relative
            }
            Some(Err(err)) => {
                warn!(
                    pod = %workload::namespaced_name(pod),
                    error = %err,
                    default = %default_relative,
                    "failed to parse deadline annotation, using default"
                );
                default_relative
            }
            Some(Ok(relative)) if relative < TimeDelta::zero() => {
                warn!(
                    pod = %workload::namespaced_name(pod),
                    default = %default_relative,
                    "negative deadline annotation, using default"
                );
                default_relative
            }
            Some(Ok(relative)) => relative,
        };
        creation + relative
    }

    /// Cached read; a miss computes the deadline but does not store it
    pub fn get(&self, pod: &Pod) -> DateTime<Utc> {
        match self.deadlines.get(workload::uid(pod)) {
            Some(deadline) => deadline,
            None => self.parse(pod),
        }
    }

    /// Cached read that stores on miss, so subsequent comparisons of the
    /// same UID stay stable
    pub fn upsert(&self, pod: &Pod) -> DateTime<Utc> {
        let deadline = self.get(pod);
        self.deadlines.insert(workload::uid(pod), deadline);
        deadline
    }

    /// Drop the entry for this pod and sweep out expired entries
    pub fn remove(&self, pod: &Pod) {
        self.deadlines.remove(workload::uid(pod));
        self.deadlines.sweep();
    }
}
