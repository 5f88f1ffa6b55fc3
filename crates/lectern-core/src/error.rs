//! Error types for the Lectern record store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Lectern workspace.
///
/// Variants are split so that callers can tell a rejected mutation or a
/// missing record apart from a storage fault and map each to a stable outcome.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum LecternError {
    /// The stored document is not an array of records.
    #[error("Corrupt document at {path}: {reason}")]
    CorruptDocument { path: String, reason: String },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (temp write, rename, snapshot, prune)
    #[error("IO error: {message}")]
    Io { message: String },

    /// The mutation logic rejected the operation. Nothing was written.
    #[error("Mutation rejected: {0}")]
    Rejected(String),

    /// Input failed field validation
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LecternError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a CorruptDocument error
    pub fn corrupt(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a Rejected error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if the stored document failed shape validation
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptDocument { .. })
    }

    /// Check if a mutator rejected the operation
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true when the failure happened before anything reached disk.
    ///
    /// NotFound and Rejected both come out of the mutator, so the
    /// serializer aborts those cycles without a snapshot or a write.
    pub fn is_mutator_failure(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Rejected(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for LecternError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for LecternError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for LecternError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, LecternError>`.
pub type Result<T> = std::result::Result<T, LecternError>;
