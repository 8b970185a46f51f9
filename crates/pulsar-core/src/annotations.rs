//! Annotation surface of the real-time scheduling plug-ins.
//!
//! All durable plug-in state lives on pod annotations; the in-memory caches
//! elsewhere in the workspace are accelerations over what is recorded here.

use crate::duration::parse_duration;
use chrono::TimeDelta;
use k8s_openapi::api::core::v1::Pod;

/// Prefix of every annotation key owned by the preemptive profile
pub const ANNOTATION_KEY_PREFIX: &str = "rt-preemptive.scheduling.x-k8s.io/";
/// Relative deadline of a pod, Go duration syntax
pub const ANNOTATION_KEY_DDL: &str = "rt-preemptive.scheduling.x-k8s.io/ddl";
/// Declared expected execution time of a pod
pub const ANNOTATION_KEY_EXEC_TIME: &str = "rt-preemptive.scheduling.x-k8s.io/exec-time";
/// Whether a pod is marked to be paused
pub const ANNOTATION_KEY_PAUSE_POD: &str = "rt-preemptive.scheduling.x-k8s.io/pause-pod";
/// A pod annotated `"false"` here must never be paused
pub const ANNOTATION_KEY_PREEMPTIBLE: &str = "rt-preemptive.scheduling.x-k8s.io/preemptible";
/// Whether execution time should be estimated by the online predictor
pub const ANNOTATION_KEY_ATLAS_ENABLED: &str = "rt-preemptive.scheduling.x-k8s.io/atlas-enabled";
/// Extra predictor features, comma-separated floats
pub const ANNOTATION_KEY_ATLAS_METRICS: &str = "rt-preemptive.scheduling.x-k8s.io/metrics";

/// Relative deadline key of the simple (queue-sort only) profile
pub const SIMPLE_DDL_ANNOTATION_KEY: &str = "simpleddl.scheduling.x-k8s.io/ddl";

/// Completion index set by the batch controller on indexed jobs
pub const JOB_COMPLETION_INDEX_ANNOTATION: &str = "batch.kubernetes.io/job-completion-index";

/// Read a raw annotation value
pub fn get<'a>(pod: &'a Pod, key: &str) -> Option<&'a str> {
    pod.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(key))
        .map(String::as_str)
}

/// Whether the pod carries the pause mark
pub fn is_marked_paused(pod: &Pod) -> bool {
    get(pod, ANNOTATION_KEY_PAUSE_POD) == Some("true")
}

/// Whether the pod may be paused at all. Absent means preemptible.
pub fn is_preemptible(pod: &Pod) -> bool {
    get(pod, ANNOTATION_KEY_PREEMPTIBLE) != Some("false")
}

/// Whether the online execution-time predictor is enabled for this pod
pub fn atlas_enabled(pod: &Pod) -> bool {
    get(pod, ANNOTATION_KEY_ATLAS_ENABLED) == Some("true")
}

/// Declared expected execution time, if present and parseable
pub fn declared_exec_time(pod: &Pod) -> Option<TimeDelta> {
    get(pod, ANNOTATION_KEY_EXEC_TIME).and_then(|s| parse_duration(s).ok())
}

/// Relative deadline under the given key, if present and parseable.
/// Negative values are surfaced as-is; callers apply their own fallback.
pub fn relative_deadline(pod: &Pod, key: &str) -> Option<crate::Result<TimeDelta>> {
    get(pod, key).map(parse_duration)
}

/// Extra predictor features. Unparseable entries contribute `0.0` so the
/// feature vector keeps a stable length for a given annotation.
pub fn extra_metrics(pod: &Pod) -> Vec<f64> {
    match get(pod, ANNOTATION_KEY_ATLAS_METRICS) {
        Some(raw) => raw
            .split(',')
            .map(|token| token.trim().parse::<f64>().unwrap_or(0.0))
            .collect(),
        None => Vec::new(),
    }
}

/// Completion index of an indexed batch pod; absent or unparseable means 0
pub fn job_index(pod: &Pod) -> i64 {
    get(pod, JOB_COMPLETION_INDEX_ANNOTATION)
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0)
}

/// Set the pause mark on a pod, creating the annotation map if needed
pub fn set_pause_mark(pod: &mut Pod, paused: bool) {
    let annotations = pod.metadata.annotations.get_or_insert_with(Default::default);
    annotations.insert(
        ANNOTATION_KEY_PAUSE_POD.to_string(),
        if paused { "true" } else { "false" }.to_string(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn pod_with_annotations(entries: &[(&str, &str)]) -> Pod {
        let mut pod = Pod::default();
        let mut map = BTreeMap::new();
        for (k, v) in entries {
            map.insert(k.to_string(), v.to_string());
        }
        pod.metadata.annotations = Some(map);
        pod
    }

    #[test]
    fn test_pause_mark() {
        let pod = pod_with_annotations(&[(ANNOTATION_KEY_PAUSE_POD, "true")]);
        assert!(is_marked_paused(&pod));

        let pod = pod_with_annotations(&[(ANNOTATION_KEY_PAUSE_POD, "false")]);
        assert!(!is_marked_paused(&pod));

        let pod = Pod::default();
        assert!(!is_marked_paused(&pod));
    }

    #[test]
    fn test_set_pause_mark_creates_map() {
        let mut pod = Pod::default();
        set_pause_mark(&mut pod, true);
        assert!(is_marked_paused(&pod));

        set_pause_mark(&mut pod, false);
        assert!(!is_marked_paused(&pod));
    }

    #[test]
    fn test_preemptible_defaults_true() {
        assert!(is_preemptible(&Pod::default()));
        let pod = pod_with_annotations(&[(ANNOTATION_KEY_PREEMPTIBLE, "false")]);
        assert!(!is_preemptible(&pod));
    }

    #[test]
    fn test_extra_metrics() {
        let pod = pod_with_annotations(&[(ANNOTATION_KEY_ATLAS_METRICS, "1.5,2,oops,4")]);
        assert_eq!(extra_metrics(&pod), vec![1.5, 2.0, 0.0, 4.0]);
        assert!(extra_metrics(&Pod::default()).is_empty());
    }

    #[test]
    fn test_job_index() {
        let pod = pod_with_annotations(&[(JOB_COMPLETION_INDEX_ANNOTATION, "7")]);
        assert_eq!(job_index(&pod), 7);
        assert_eq!(job_index(&Pod::default()), 0);
    }

    #[test]
    fn test_declared_exec_time() {
        let pod = pod_with_annotations(&[(ANNOTATION_KEY_EXEC_TIME, "90s")]);
        assert_eq!(declared_exec_time(&pod), Some(TimeDelta::seconds(90)));

        let pod = pod_with_annotations(&[(ANNOTATION_KEY_EXEC_TIME, "soon")]);
        assert_eq!(declared_exec_time(&pod), None);
    }
}
