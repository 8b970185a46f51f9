//! Extension-point statuses returned by plug-in hooks.

use std::collections::HashMap;
use std::fmt;

/// Status code of an extension-point result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Code {
    /// The hook accepts the pod (or has nothing to say)
    #[default]
    Success,
    /// Internal plug-in error; the cycle is aborted
    Error,
    /// The pod cannot be scheduled right now but preemption may help
    Unschedulable,
    /// The pod cannot be scheduled and preemption will not help
    UnschedulableAndUnresolvable,
    /// Skip the rest of this scheduling cycle for the pod
    Skip,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Code::Success => "Success",
            Code::Error => "Error",
            Code::Unschedulable => "Unschedulable",
            Code::UnschedulableAndUnresolvable => "UnschedulableAndUnresolvable",
            Code::Skip => "Skip",
        };
        f.write_str(s)
    }
}

/// Result of one extension-point invocation
#[derive(Debug, Clone, Default)]
pub struct Status {
    code: Code,
    reasons: Vec<String>,
}

impl Status {
    pub fn new(code: Code) -> Self {
        Self {
            code,
            reasons: Vec::new(),
        }
    }

    pub fn with_reason(code: Code, reason: impl Into<String>) -> Self {
        Self {
            code,
            reasons: vec![reason.into()],
        }
    }

    pub fn success() -> Self {
        Self::new(Code::Success)
    }

    pub fn skip() -> Self {
        Self::new(Code::Skip)
    }

    /// Unschedulable with one failure reason per insufficient resource
    pub fn unschedulable(reasons: Vec<String>) -> Self {
        Self {
            code: Code::Unschedulable,
            reasons,
        }
    }

    /// Wrap an internal error into an Error status
    pub fn from_error(err: impl fmt::Display) -> Self {
        Self::with_reason(Code::Error, err.to_string())
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn message(&self) -> String {
        self.reasons.join(", ")
    }

    pub fn is_success(&self) -> bool {
        self.code == Code::Success
    }

    pub fn is_skip(&self) -> bool {
        self.code == Code::Skip
    }
}

/// Successful post-filter outcome: the node the host should retry on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilterResult {
    pub nominated_node: String,
}

impl PostFilterResult {
    pub fn with_nominated_node(node: impl Into<String>) -> Self {
        Self {
            nominated_node: node.into(),
        }
    }
}

/// Per-node filter outcomes handed to post-filter. Nodes absent from the
/// map count as Success.
#[derive(Debug, Clone, Default)]
pub struct NodeToStatus {
    statuses: HashMap<String, Status>,
}

impl NodeToStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: impl Into<String>, status: Status) {
        self.statuses.insert(node.into(), status);
    }

    pub fn get(&self, node: &str) -> Option<&Status> {
        self.statuses.get(node)
    }

    pub fn code(&self, node: &str) -> Code {
        self.statuses
            .get(node)
            .map(|s| s.code())
            .unwrap_or(Code::Success)
    }
}
