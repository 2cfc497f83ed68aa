use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

use crate::status::{Status, Vocabulary};

pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Debug, Error)]
pub enum BoardError {
    /// Transport failure or a non-success HTTP status other than 404.
    #[error("Network failure{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    NetworkFailure {
        status: Option<u16>,
        message: String,
    },

    #[error("Application {id} not found")]
    NotFound { id: String },

    #[error("Unknown status ordinal {ordinal} under vocabulary {vocabulary}")]
    UnknownStatusOrdinal { ordinal: i64, vocabulary: Vocabulary },

    #[error("Status {status} has no ordinal under vocabulary {vocabulary}")]
    UnmappedStatus { status: Status, vocabulary: Vocabulary },

    #[error("Invalid {field}: {message}")]
    ValidationFailure { field: &'static str, message: String },

    #[error("Invalid drag state: {0}")]
    InvalidDragState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Legacy statuses were already migrated at {completed_at} (marker {})", .marker.display())]
    AlreadyMigrated {
        marker: PathBuf,
        completed_at: DateTime<Utc>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BoardError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            status: None,
            message: message.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationFailure {
            field,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for BoardError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkFailure {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
