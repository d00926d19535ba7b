//! Store-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during account store operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StoreError {
    /// Account with given ID not found
    #[error("Account not found: {id}")]
    NotFound {
        /// Unique identifier of the missing account
        id: String,
    },

    /// Account storage/filesystem error
    #[error("Account storage error: {message}")]
    Io {
        /// Description of the storage failure
        message: String,
    },

    /// Stored data could not be parsed
    #[error("Corrupt data for {path}: {message}")]
    Corrupt {
        /// File the parse failure occurred in
        path: String,
        /// Description of the parse failure
        message: String,
    },
}

impl StoreError {
    /// Check whether the error indicates recoverable index damage
    /// (missing or corrupt account files the index can be repaired around).
    pub const fn is_repairable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Corrupt { .. })
    }
}
