//! Error types for the fetchplan library.
//!
//! This module provides the error hierarchy for all operations in the
//! fetchplan library, using `thiserror` for ergonomic error handling. Every
//! failure is raised synchronously at the point of misuse; there is no retry
//! or background error channel anywhere in the crate.

use thiserror::Error;

/// Result type alias for operations that may fail with a fetchplan error.
///
/// # Examples
///
/// ```
/// use fetchplan::{Error, Result};
///
/// fn example_operation() -> Result<u32> {
///     Ok(8080)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the fetchplan library.
///
/// Callers should treat every variant except the schema/IO plumbing as a
/// programmer error signaling incorrect use of the scoping API, not as a
/// transient condition to retry.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation was attempted on a disposed fetch plan.
    #[error("fetch plan disposed: cannot {operation}")]
    Disposed {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// A state-changing operation was attempted in an invalid state.
    #[error("invalid plan state: {details}")]
    InvalidState {
        /// Details about the violated state requirement.
        details: String,
    },

    /// An invalid argument was provided.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// The argument that was invalid.
        name: String,
        /// The reason the argument is invalid.
        reason: String,
    },

    /// An activation scope was ended out of order.
    #[error("unbalanced activation scope: {details}")]
    UnbalancedScope {
        /// Details about the scoping violation.
        details: String,
    },

    /// A plan schema failed to parse as YAML.
    #[error("schema error: {0}")]
    Schema(#[from] serde_yaml::Error),

    /// A plan schema failed to parse as JSON.
    #[error("schema error: {0}")]
    SchemaJson(#[from] serde_json::Error),

    /// An I/O error occurred while loading a schema file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::ident::InvalidIdError> for Error {
    fn from(err: crate::ident::InvalidIdError) -> Self {
        Self::InvalidArgument {
            name: err.kind.to_string(),
            reason: format!("invalid identifier {}: {}", err.value, err.reason),
        }
    }
}

impl Error {
    /// Check if error indicates use of a disposed plan.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchplan::Error;
    ///
    /// let err = Error::Disposed { operation: "add_property" };
    /// assert!(err.is_disposed());
    /// ```
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed { .. })
    }

    /// Check if error indicates an invalid state transition.
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// Check if error indicates an unbalanced activation scope.
    #[must_use]
    pub fn is_unbalanced_scope(&self) -> bool {
        matches!(self, Self::UnbalancedScope { .. })
    }
}
