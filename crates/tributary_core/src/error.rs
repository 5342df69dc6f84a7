//! Core error types for Tributary.
//!
//! Per-record validation failures are not errors; they are filtered out by
//! the validate stage. Everything here aborts the chain that raised it.

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The remote source could not be reached or its payload not understood
    #[error("Transport error for {resource}: {reason}")]
    Transport {
        /// Resource type being fetched
        resource: String,
        /// Underlying cause
        reason: String,
    },

    /// Malformed spec, pipeline config or graph
    #[error("Configuration error in {field}: {reason}")]
    Configuration {
        /// Offending field or entry
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Object storage or warehouse write failed
    #[error("Sink error in {sink}: {reason}")]
    Sink {
        /// Sink name (object store, warehouse)
        sink: String,
        /// Underlying cause
        reason: String,
    },

    /// Filesystem failure on an intermediate artifact
    #[error("IO error on {path}: {reason}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// Invalid encoding
    #[error("Invalid encoding: {reason}")]
    Encoding {
        /// Underlying cause
        reason: String,
    },

    /// Not found
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity
        kind: String,
        /// Identifier looked up
        id: String,
    },

    /// Already exists
    #[error("{kind} already exists: {id}")]
    AlreadyExists {
        /// Kind of entity
        kind: String,
        /// Duplicate identifier
        id: String,
    },

    /// Cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error (for unexpected errors)
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl CoreError {
    /// Shorthand for a configuration error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a sink error
    pub fn sink(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Sink {
            sink: sink.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an IO error on a path
    pub fn io(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Whether the host may retry the failed stage.
    ///
    /// Transport, sink and IO failures may be transient. Configuration and
    /// encoding problems will fail identically on every attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Sink { .. } | Self::Io { .. }
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding {
            reason: err.to_string(),
        }
    }
}
