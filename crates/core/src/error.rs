//! Error type shared by every registry operation.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::models::VehicleField;

/// Result alias used throughout the registry.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Failures reported by [`crate::VehicleRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A supplied field value violates the record invariants.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Field that failed validation.
        field: VehicleField,
        /// Human readable explanation.
        reason: String,
    },
    /// No record exists with the requested identifier.
    #[error("vehicle '{0}' not found")]
    NotFound(String),
    /// The backing file could not be read or written.
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        /// Backing file involved in the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The backing file exists but its content is not a valid record list.
    #[error("malformed data in {}: {message}", .path.display())]
    Format {
        /// Backing file involved in the failure.
        path: PathBuf,
        /// Description of what could not be parsed.
        message: String,
    },
}

impl RegistryError {
    pub(crate) fn validation(field: VehicleField, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}
