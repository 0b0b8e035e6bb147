//! Result and error types for shopsync.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for shopsync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while driving the storefront
#[derive(Debug, Error)]
pub enum SyncError {
    /// Locator resolved to nothing at time of use
    #[error("Element not found: {locator}")]
    ElementNotFound {
        /// Logical name of the locator
        locator: String,
    },

    /// Previously-resolved element is detached from the document
    #[error("Stale element reference: {locator}")]
    StaleReference {
        /// Logical name of the locator (or handle id)
        locator: String,
    },

    /// Native interaction was intercepted by another element
    #[error("Click on {locator} intercepted: {message}")]
    Intercepted {
        /// Target of the interaction
        locator: String,
        /// What the rendering engine reported
        message: String,
    },

    /// Element exists but cannot take input yet
    #[error("Element {locator} not interactable: {message}")]
    NotInteractable {
        /// Target of the interaction
        locator: String,
        /// What the rendering engine reported
        message: String,
    },

    /// Both native and fallback interaction paths failed
    #[error("Action {action} on {locator} blocked (native: {native}; fallback: {fallback})")]
    ActionBlocked {
        /// Target of the interaction
        locator: String,
        /// Action that was attempted
        action: String,
        /// Native path failure
        native: String,
        /// Fallback path failure
        fallback: String,
    },

    /// Bounded wait exceeded
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    WaitTimeout {
        /// Description of the awaited condition
        waited_for: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Verification predicate returned false
    #[error("Assertion failed: {what} (expected {expected}, observed {observed})")]
    AssertionFailure {
        /// What was checked
        what: String,
        /// Expected value
        expected: String,
        /// Observed value
        observed: String,
    },

    /// Bounded retries exhausted; wraps the last cause
    #[error("Gave up after {attempts} attempt(s): {last}")]
    RetryExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last underlying error
        last: Box<SyncError>,
    },

    /// Browser session transport error
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Fieldless classification of [`SyncError`], used in action results and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`SyncError::ElementNotFound`]
    ElementNotFound,
    /// See [`SyncError::StaleReference`]
    StaleReference,
    /// See [`SyncError::Intercepted`]
    Intercepted,
    /// See [`SyncError::NotInteractable`]
    NotInteractable,
    /// See [`SyncError::ActionBlocked`]
    ActionBlocked,
    /// See [`SyncError::WaitTimeout`]
    WaitTimeout,
    /// See [`SyncError::AssertionFailure`]
    AssertionFailure,
    /// See [`SyncError::RetryExhausted`]
    RetryExhausted,
    /// Transport, configuration and I/O faults
    Fault,
}

impl SyncError {
    /// Create an element-not-found error
    #[must_use]
    pub fn not_found(locator: impl Into<String>) -> Self {
        Self::ElementNotFound {
            locator: locator.into(),
        }
    }

    /// Create a stale-reference error
    #[must_use]
    pub fn stale(locator: impl Into<String>) -> Self {
        Self::StaleReference {
            locator: locator.into(),
        }
    }

    /// Create a session transport error
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an assertion failure carrying expected and observed values
    #[must_use]
    pub fn assertion(
        what: impl Into<String>,
        expected: impl ToString,
        observed: impl ToString,
    ) -> Self {
        Self::AssertionFailure {
            what: what.into(),
            expected: expected.to_string(),
            observed: observed.to_string(),
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            Self::StaleReference { .. } => ErrorKind::StaleReference,
            Self::Intercepted { .. } => ErrorKind::Intercepted,
            Self::NotInteractable { .. } => ErrorKind::NotInteractable,
            Self::ActionBlocked { .. } => ErrorKind::ActionBlocked,
            Self::WaitTimeout { .. } => ErrorKind::WaitTimeout,
            Self::AssertionFailure { .. } => ErrorKind::AssertionFailure,
            Self::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            Self::Session { .. }
            | Self::Config { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_) => ErrorKind::Fault,
        }
    }

    /// Whether the element went stale between resolution and use
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleReference { .. })
    }

    /// Whether the rendering engine rejected a native interaction
    #[must_use]
    pub const fn is_rejected_interaction(&self) -> bool {
        matches!(self, Self::Intercepted { .. } | Self::NotInteractable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(SyncError::not_found("x").kind(), ErrorKind::ElementNotFound);
        assert_eq!(SyncError::stale("x").kind(), ErrorKind::StaleReference);
        assert_eq!(SyncError::session("down").kind(), ErrorKind::Fault);
        assert_eq!(
            SyncError::assertion("count", 2, 3).kind(),
            ErrorKind::AssertionFailure
        );
    }

    #[test]
    fn test_assertion_display_carries_values() {
        let err = SyncError::assertion("product count", 2, 5);
        let msg = err.to_string();
        assert!(msg.contains("product count"));
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("observed 5"));
    }

    #[test]
    fn test_retry_exhausted_display_wraps_last() {
        let err = SyncError::RetryExhausted {
            attempts: 3,
            last: Box::new(SyncError::stale("product grid")),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempt(s)"));
        assert!(msg.contains("product grid"));
    }

    #[test]
    fn test_rejected_interaction() {
        let err = SyncError::Intercepted {
            locator: "btn".into(),
            message: "overlay".into(),
        };
        assert!(err.is_rejected_interaction());
        assert!(!SyncError::stale("btn").is_rejected_interaction());
        assert!(SyncError::stale("btn").is_stale());
    }
}
