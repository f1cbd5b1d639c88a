//! Error types for askdb.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for askdb operations.
///
/// Expected domain failures (a translation that could not be produced, a
/// query the warehouse rejected) are surfaced to callers as tagged result
/// statuses by the lifecycle services; this enum is what travels when an
/// operation genuinely fails.
#[derive(Error, Debug)]
pub enum AskdbError {
    /// NL-to-SQL service errors (unreachable, timed out, malformed JSON).
    #[error("Translation error: {0}")]
    Translation(String),

    /// Warehouse execution errors (bad SQL, connection failure).
    #[error("Warehouse error: {0}")]
    Warehouse(String),

    /// A referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input (unknown feedback state, malformed arguments).
    #[error("Validation error: {0}")]
    Validation(String),

    /// State store errors (migration failure, constraint violation).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration errors (missing service URL, mock mode in production).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (invariant violations, bugs).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AskdbError {
    /// Creates a translation error with the given message.
    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation(msg.into())
    }

    /// Creates a warehouse error with the given message.
    pub fn warehouse(msg: impl Into<String>) -> Self {
        Self::Warehouse(msg.into())
    }

    /// Creates a not-found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a persistence error with the given message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Translation(_) => "Translation Error",
            Self::Warehouse(_) => "Warehouse Error",
            Self::NotFound(_) => "Not Found",
            Self::Validation(_) => "Validation Error",
            Self::Persistence(_) => "Persistence Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using AskdbError.
pub type Result<T> = std::result::Result<T, AskdbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_translation() {
        let err = AskdbError::translation("service unreachable at localhost:8080");
        assert_eq!(
            err.to_string(),
            "Translation error: service unreachable at localhost:8080"
        );
        assert_eq!(err.category(), "Translation Error");
    }

    #[test]
    fn test_error_display_warehouse() {
        let err = AskdbError::warehouse("column \"emal\" does not exist");
        assert_eq!(
            err.to_string(),
            "Warehouse error: column \"emal\" does not exist"
        );
        assert_eq!(err.category(), "Warehouse Error");
    }

    #[test]
    fn test_error_display_not_found() {
        let err = AskdbError::not_found("question 42");
        assert_eq!(err.to_string(), "Not found: question 42");
        assert_eq!(err.category(), "Not Found");
    }

    #[test]
    fn test_error_display_config() {
        let err = AskdbError::config("translator base URL is not set");
        assert_eq!(
            err.to_string(),
            "Configuration error: translator base URL is not set"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AskdbError>();
    }
}
