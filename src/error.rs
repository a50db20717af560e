//! Error types for the facet engine

use thiserror::Error;

/// Main error type for the facet engine
#[derive(Error, Debug)]
pub enum Error {
    /// A request parameter cannot be satisfied (missing across, bad sort field, ...)
    #[error("Invalid parameter '{field}': {message}")]
    InvalidParameter {
        /// Name of the offending filter field
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// Search backend round-trip failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Relational store round-trip failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// One or more drill-down branches failed; the whole stacked call is aborted
    #[error("Failed to execute stack query for '{stack}': {failed} branch(es) failed, first: {source}")]
    StackFanOut {
        /// Drill-down dimension being processed
        stack: String,
        /// Number of failed branches
        failed: usize,
        /// First branch failure in parent-row order
        #[source]
        source: Box<Error>,
    },

    /// The dedicated stacking worker pool could not be created
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Search backend errors
#[derive(Error, Debug)]
pub enum BackendError {
    /// Request could not be delivered or the connection dropped
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("Backend returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, kept for logging only
        body: String,
    },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Response is well-formed but misses an expected aggregation
    #[error("Missing aggregation '{0}' in response")]
    MissingAggregation(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Relational store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Store is not reachable or refused the query
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Coarse classification used by callers to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller supplied something unsatisfiable; never retried
    Client,
    /// Backend, store or runtime failure
    Server,
}

impl Error {
    /// Build an invalid-parameter error for `field`
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 4xx vs 5xx classification
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidParameter { .. } => ErrorClass::Client,
            _ => ErrorClass::Server,
        }
    }

    /// Offending field name for client errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::InvalidParameter { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Message safe to hand to an end user.
    ///
    /// Server-class errors collapse to a generic text; their detail belongs in the log.
    pub fn public_message(&self) -> String {
        match self {
            Error::InvalidParameter { .. } => self.to_string(),
            Error::StackFanOut { stack, .. } => {
                format!("Failed to execute stack query for '{}'", stack)
            }
            _ => "Internal error while executing the aggregation".to_string(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_is_client_class() {
        let err = Error::invalid("across", "Across cant be missing for groupby query.");
        assert_eq!(err.class(), ErrorClass::Client);
        assert_eq!(err.field(), Some("across"));
        assert!(err.public_message().contains("across"));
    }

    #[test]
    fn test_backend_error_hides_details() {
        let err = Error::from(BackendError::Status {
            status: 500,
            body: "shard failure on node-7".to_string(),
        });
        assert_eq!(err.class(), ErrorClass::Server);
        assert!(err.field().is_none());
        assert!(!err.public_message().contains("node-7"));
    }

    #[test]
    fn test_stack_fan_out_names_phase() {
        let err = Error::StackFanOut {
            stack: "repo_id".to_string(),
            failed: 2,
            source: Box::new(Error::from(BackendError::Transport("reset".to_string()))),
        };
        assert_eq!(err.class(), ErrorClass::Server);
        assert!(err.to_string().contains("stack query"));
        assert!(err.public_message().contains("repo_id"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
