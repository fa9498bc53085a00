//! Result and error types for Tenaz.
//!
//! Every error carries a [`ErrorClass`] that decides how the
//! [`ResilientActionRunner`](crate::ResilientActionRunner) treats it:
//! transient errors drive fallback progression, lifecycle errors end the
//! chain with a soft failure, contract errors are raised to the caller.

use std::time::Duration;
use thiserror::Error;

/// Result type for Tenaz operations
pub type TenazResult<T> = Result<T, TenazError>;

/// How the runner reacts to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Timeouts, non-interactable or detached elements: try the next strategy
    Transient,
    /// The page or context is gone: stop and soft-fail
    Lifecycle,
    /// Programmer error: raise immediately, never retried
    Contract,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Transient => "transient",
            Self::Lifecycle => "lifecycle",
            Self::Contract => "contract",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in Tenaz
#[derive(Debug, Error)]
pub enum TenazError {
    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// No element matched the locator
    #[error("No element matches {selector}")]
    ElementNotFound {
        /// Selector that failed to resolve
        selector: String,
    },

    /// Element exists but cannot receive the interaction
    #[error("Element {selector} is not interactable: {message}")]
    NotInteractable {
        /// Selector of the element
        selector: String,
        /// Error message
        message: String,
    },

    /// Element was removed from the DOM while being used
    #[error("Element {selector} was detached from the document")]
    Detached {
        /// Selector of the element
        selector: String,
    },

    /// The action ran but the expected state change did not happen
    #[error("Post-condition {expected} not met within {ms}ms (observed {observed})")]
    PostConditionNotMet {
        /// Description of the expected state
        expected: String,
        /// What was observed instead
        observed: String,
        /// Wait budget in milliseconds
        ms: u64,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Script evaluation error
    #[error("Evaluation failed: {message}")]
    EvaluationError {
        /// Error message
        message: String,
    },

    /// Generic page error reported by the driver
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// The page or browser context was closed
    #[error("Page context closed: {message}")]
    ContextClosed {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Malformed action specification
    #[error("Invalid action spec: {message}")]
    InvalidSpec {
        /// Error message
        message: String,
    },

    /// Primary attempt failed and the environment has no fallback policy
    #[error("No fallback policy for environment '{env}' (primary attempt failed: {source})")]
    MissingPolicy {
        /// Environment discriminator
        env: String,
        /// Failure of the primary attempt
        #[source]
        source: Box<TenazError>,
    },

    /// Invalid URL pattern
    #[error("Invalid URL pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// The enclosing test was cancelled while the chain was running
    #[error("Action cancelled before completion")]
    Cancelled,

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

impl TenazError {
    /// Create a timeout error from a duration
    #[must_use]
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout {
            ms: duration.as_millis() as u64,
        }
    }

    /// Create an invalid spec error
    #[must_use]
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }

    /// Create a context closed error
    #[must_use]
    pub fn closed(message: impl Into<String>) -> Self {
        Self::ContextClosed {
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

    /// Classify this error
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout { .. }
            | Self::ElementNotFound { .. }
            | Self::NotInteractable { .. }
            | Self::Detached { .. }
            | Self::PostConditionNotMet { .. }
            | Self::NavigationError { .. }
            | Self::EvaluationError { .. }
            | Self::PageError { .. } => ErrorClass::Transient,
            Self::ContextClosed { .. } => ErrorClass::Lifecycle,
            Self::BrowserLaunchError { .. }
            | Self::InvalidSpec { .. }
            | Self::MissingPolicy { .. }
            | Self::InvalidPattern { .. }
            | Self::Config { .. }
            | Self::Cancelled
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_) => ErrorClass::Contract,
        }
    }

    /// Whether this error should move the runner to the next strategy
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient)
    }

    /// Whether the page context is no longer usable
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(self.class(), ErrorClass::Lifecycle)
    }
}
