// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Framework error type
#[derive(Error, Debug, Diagnostic)]
pub enum FrameworkError {
    /// Pod not found in the workload store
    #[error("Pod not found: {key}")]
    #[diagnostic(
        code(framework::pod_not_found),
        help("The pod may have been deleted; treat as a benign cache miss")
    )]
    PodNotFound {
        #[allow(unused)]
        key: String,
    },

    /// Node not found in the node store
    #[error("Node not found: {name}")]
    #[diagnostic(
        code(framework::node_not_found),
        help("Verify the node name against the current snapshot")
    )]
    NodeNotFound {
        #[allow(unused)]
        name: String,
    },

    /// The workload store rejected a write
    #[error("Store write rejected for {key}: {message}")]
    #[diagnostic(
        code(framework::write_rejected),
        help("The write may be retried on the next scheduling cycle")
    )]
    WriteRejected {
        #[allow(unused)]
        key: String,
        #[allow(unused)]
        message: String,
    },

    /// A plug-in was asked for a hook it did not declare
    #[error("Plugin {plugin} does not implement the {hook} extension point")]
    #[diagnostic(
        code(framework::missing_capability),
        help("Check the plugin's capability set against the profile configuration")
    )]
    MissingCapability {
        #[allow(unused)]
        plugin: String,
        #[allow(unused)]
        hook: String,
    },

    /// Duplicate registration
    #[error("Plugin already registered: {name}")]
    #[diagnostic(
        code(framework::plugin_already_registered),
        help("Plugin names must be unique within a registry")
    )]
    PluginAlreadyRegistered {
        #[allow(unused)]
        name: String,
    },

    /// Unknown plugin name
    #[error("Plugin not registered: {name}")]
    #[diagnostic(
        code(framework::plugin_not_found),
        help("Register the plugin before referencing it from a profile")
    )]
    PluginNotFound {
        #[allow(unused)]
        name: String,
    },
}

/// Result type for framework operations
pub type Result<T> = std::result::Result<T, FrameworkError>;

impl FrameworkError {
    /// Create a PodNotFound error
    pub fn pod_not_found(key: impl Into<String>) -> Self {
        Self::PodNotFound { key: key.into() }
    }

    /// Create a NodeNotFound error
    pub fn node_not_found(name: impl Into<String>) -> Self {
        Self::NodeNotFound { name: name.into() }
    }

    /// Create a WriteRejected error
    pub fn write_rejected(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteRejected {
            key: key.into(),
            message: message.into(),
        }
    }
}
