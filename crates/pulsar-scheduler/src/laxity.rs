//! Laxity tracking: how much slack a pod has before its deadline given the
//! execution time it still needs.
//!
//! Laxity = deadline − now − remaining work, where remaining work is the
//! execution-time estimate minus what the pod has already run. Estimates
//! come from the declared annotation or, when enabled, the online
//! predictor; a pod that outruns its estimate corrects the model.

use crate::deadline::DeadlineManager;
use crate::error::{Result, SchedulerError};
use crate::predictor::{Metrics, Predictor};
use chrono::{DateTime, TimeDelta, Utc};
use k8s_openapi::api::core::v1::Pod;
use parking_lot::Mutex;
use pulsar_core::{annotations, pod_limits, pod_requests, workload, Clock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Estimates deviating from the declared execution time by more than this
/// relative error are treated as outliers and corrected.
const OUTLIER_RELATIVE_ERROR: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecutionState {
    Running,
    Paused,
}

/// Tracked execution of one pod
#[derive(Debug)]
struct PodExecution {
    deadline: DateTime<Utc>,
    est_exec_time: TimeDelta,
    accumulated: TimeDelta,
    last_start: Option<DateTime<Utc>>,
    state: ExecutionState,
}

impl PodExecution {
    fn new(deadline: DateTime<Utc>, est_exec_time: TimeDelta) -> Self {
        Self {
            deadline,
            est_exec_time,
            accumulated: TimeDelta::zero(),
            last_start: None,
            state: ExecutionState::Paused,
        }
    }

    fn start(&mut self, now: DateTime<Utc>) {
        if self.state == ExecutionState::Running {
            return;
        }
        self.state = ExecutionState::Running;
        self.last_start = Some(now);
    }

    fn pause(&mut self, now: DateTime<Utc>) {
        if self.state == ExecutionState::Paused {
            return;
        }
        if let Some(started) = self.last_start {
            self.accumulated += now - started;
        }
        self.state = ExecutionState::Paused;
        self.last_start = None;
    }

    /// Execution folded so far plus the live running span
    fn executed(&self, now: DateTime<Utc>) -> TimeDelta {
        match (self.state, self.last_start) {
            (ExecutionState::Running, Some(started)) => self.accumulated + (now - started),
            _ => self.accumulated,
        }
    }

    /// Returns `(laxity, beyond_estimation)`
    fn laxity(&self, now: DateTime<Utc>) -> (TimeDelta, bool) {
        let executed = self.executed(now);
        if executed > self.est_exec_time {
            return (self.deadline - now, true);
        }
        let remaining = self.est_exec_time - executed;
        (self.deadline - now - remaining, false)
    }
}

/// Feature vector of a pod for the predictor: requests, limits, relative
/// deadline when annotated, job completion index, then any extra metrics.
pub fn pod_metrics(pod: &Pod) -> Metrics {
    let requests = pod_requests(pod);
    let limits = pod_limits(pod);
    let mut metrics = vec![
        requests.cpu_cores(),
        requests.memory_bytes as f64,
        limits.cpu_cores(),
        limits.memory_bytes as f64,
    ];
    if let Some(Ok(relative)) =
        annotations::relative_deadline(pod, annotations::ANNOTATION_KEY_DDL)
    {
        metrics.push(relative.num_nanoseconds().unwrap_or(0) as f64);
    }
    metrics.push(annotations::job_index(pod) as f64);
    metrics.extend(annotations::extra_metrics(pod));
    metrics
}

/// Tracks accumulated execution per pod and derives laxity
pub struct LaxityManager {
    deadline_manager: Arc<DeadlineManager>,
    predictor: Arc<dyn Predictor>,
    clock: Arc<dyn Clock>,
    executions: Mutex<HashMap<String, PodExecution>>,
}

impl LaxityManager {
    pub fn new(
        deadline_manager: Arc<DeadlineManager>,
        predictor: Arc<dyn Predictor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            deadline_manager,
            predictor,
            clock,
            executions: Mutex::new(HashMap::new()),
        }
    }

    /// Initial estimate for a pod, reconciling the declared execution time
    /// with the predictor when the pod opts in.
    fn initial_estimate(&self, pod: &Pod) -> TimeDelta {
        let declared = annotations::declared_exec_time(pod).unwrap_or_else(TimeDelta::zero);
        if !annotations::atlas_enabled(pod) {
            return declared;
        }
        let metrics = pod_metrics(pod);
        let mut estimate = self.predictor.estimate_exec_time(&metrics);
        if declared != TimeDelta::zero() {
            let declared_ns = declared.num_nanoseconds().unwrap_or(i64::MAX) as f64;
            let estimate_ns = estimate.num_nanoseconds().unwrap_or(i64::MAX) as f64;
            if ((declared_ns - estimate_ns).abs() / declared_ns) > OUTLIER_RELATIVE_ERROR {
                // the model is off for this class of pod; teach it the
                // declared value and predict again
                self.predictor.add(&metrics, declared);
                estimate = self.predictor.estimate_exec_time(&metrics);
            }
        }
        debug!(
            pod = %workload::namespaced_name(pod),
            declared = %declared,
            estimate = %estimate,
            "estimated execution time"
        );
        estimate
    }

    fn with_execution<T>(&self, pod: &Pod, f: impl FnOnce(&mut PodExecution) -> T) -> T {
        let key = workload::namespaced_name(pod);
        let mut executions = self.executions.lock();
        let execution = executions.entry(key).or_insert_with(|| {
            PodExecution::new(self.deadline_manager.get(pod), self.initial_estimate(pod))
        });
        f(execution)
    }

    /// Mark the pod running from now on
    pub fn start_pod_execution(&self, pod: &Pod) {
        let now = self.clock.now();
        self.with_execution(pod, |execution| execution.start(now));
    }

    /// Fold the running span and mark the pod paused
    pub fn pause_pod_execution(&self, pod: &Pod) {
        let now = self.clock.now();
        self.with_execution(pod, |execution| execution.pause(now));
    }

    /// Current laxity of the pod.
    ///
    /// When the pod has already executed past its estimate the error carries
    /// the (deadline − now) laxity and the observation is fed back into the
    /// predictor to correct it.
    pub fn pod_laxity(&self, pod: &Pod) -> Result<TimeDelta> {
        let now = self.clock.now();
        let (laxity, beyond, executed) = self.with_execution(pod, |execution| {
            let (laxity, beyond) = execution.laxity(now);
            (laxity, beyond, execution.executed(now))
        });
        if beyond {
            debug!(
                pod = %workload::namespaced_name(pod),
                executed = %executed,
                "execution beyond estimate, correcting predictor"
            );
            self.predictor.add(&pod_metrics(pod), executed);
            return Err(SchedulerError::BeyondEstimation { laxity });
        }
        Ok(laxity)
    }

    /// Stop tracking the pod, publishing its total execution as a predictor
    /// observation
    pub fn remove_pod_execution(&self, pod: &Pod) {
        let now = self.clock.now();
        let key = workload::namespaced_name(pod);
        let mut executions = self.executions.lock();
        let Some(mut execution) = executions.remove(&key) else {
            return;
        };
        drop(executions);
        execution.pause(now);
        debug!(
            pod = %key,
            actual = %execution.accumulated,
            "pod execution finished, updating predictor"
        );
        self.predictor.add(&pod_metrics(pod), execution.accumulated);
    }
}
