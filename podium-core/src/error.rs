//! Error types for podium-core.

use thiserror::Error;

/// Result type alias for podium operations.
pub type Result<T> = std::result::Result<T, PodiumError>;

/// Errors raised while building fields or configuring a run.
///
/// All of these are local to one competition or one configuration value.
/// Batch entry points record them per competition and keep going.
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PodiumError {
    /// No medal distribution can be produced for this field.
    #[error("Degenerate field: {reason}")]
    DegenerateField { reason: String },

    /// A raw score was negative or not finite.
    #[error("Invalid score {score} for entrant {entrant_id}")]
    InvalidScore { entrant_id: i64, score: f64 },

    /// The same entrant id appears twice in one field.
    #[error("Duplicate entrant ID {entrant_id} in field")]
    DuplicateEntrant { entrant_id: i64 },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl PodiumError {
    /// Create a degenerate field error.
    pub fn degenerate_field(reason: impl Into<String>) -> Self {
        Self::DegenerateField {
            reason: reason.into(),
        }
    }

    /// Create an invalid score error.
    pub fn invalid_score(entrant_id: i64, score: f64) -> Self {
        Self::InvalidScore { entrant_id, score }
    }

    /// Create an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateField { .. })
    }
}
