// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for Pulsar operations
#[derive(Error, Debug, Diagnostic)]
pub enum PulsarError {
    /// Duration string could not be parsed
    #[error("Invalid duration: {input:?}")]
    #[diagnostic(
        code(pulsar::invalid_duration),
        help("Use Go-style duration syntax like '500ms', '10s', '1h30m'")
    )]
    InvalidDuration {
        #[allow(unused)]
        input: String,
    },

    /// Resource quantity string could not be parsed
    #[error("Invalid quantity for {resource}: {input:?}")]
    #[diagnostic(
        code(pulsar::invalid_quantity),
        help("CPU accepts '2', '0.5' or '500m'; memory accepts bytes or Ki/Mi/Gi suffixes")
    )]
    InvalidQuantity {
        #[allow(unused)]
        resource: String,
        #[allow(unused)]
        input: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(pulsar::serialization_error),
        help("Ensure the resource format is valid JSON")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for Pulsar core operations
pub type Result<T> = std::result::Result<T, PulsarError>;

impl PulsarError {
    /// Create an InvalidDuration error
    pub fn invalid_duration(input: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.into(),
        }
    }

    /// Create an InvalidQuantity error
    pub fn invalid_quantity(resource: impl Into<String>, input: impl Into<String>) -> Self {
        Self::InvalidQuantity {
            resource: resource.into(),
            input: input.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}
