//! Error handling module
//!
//! Provides the unified error type for the moderation pipeline.

use thiserror::Error;
use tracing::error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum ModerationError {
    /// Invalid driver, resolver or modifier, or an unresolvable event getter.
    /// Always fatal, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A moderation could not be applied onto an entity
    #[error("Transition error: {message}")]
    Transition {
        message: String,
        /// Attribute names that made the transition impossible (may be empty)
        incompatibilities: Vec<String>,
    },

    #[error("Database error: {0}")]
    Storage(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModerationError {
    /// Attribute names attached to a transition failure
    pub fn incompatibilities(&self) -> &[String] {
        match self {
            ModerationError::Transition { incompatibilities, .. } => incompatibilities,
            _ => &[],
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ModerationError::Configuration(_))
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, ModerationError::Transition { .. })
    }
}

/// Result type alias for moderation operations
pub type ModerationResult<T> = Result<T, ModerationError>;

/// Helper function to create a configuration error
pub fn configuration_error(msg: impl Into<String>) -> ModerationError {
    let msg = msg.into();
    error!("Configuration error: {}", msg);
    ModerationError::Configuration(msg)
}

/// Helper function to create a transition error without offending attributes
pub fn transition_error(msg: impl Into<String>) -> ModerationError {
    ModerationError::Transition {
        message: msg.into(),
        incompatibilities: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_carries_attributes() {
        let err = ModerationError::Transition {
            message: "Incompatibility".to_string(),
            incompatibilities: vec!["subtitle".to_string(), "rank".to_string()],
        };

        assert!(err.is_transition());
        assert_eq!(err.incompatibilities(), ["subtitle", "rank"]);
        assert_eq!(err.to_string(), "Transition error: Incompatibility");
    }

    #[test]
    fn test_configuration_error_has_no_attributes() {
        let err = configuration_error("Driver [s3] not supported");

        assert!(err.is_configuration());
        assert!(err.incompatibilities().is_empty());
    }
}
