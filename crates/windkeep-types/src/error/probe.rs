//! Prober-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while probing a dormant usage window.
///
/// A probe failure is always absorbed by the caller (counted as
/// "not initialized"); these variants exist so the failure is logged with
/// enough shape to act on.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ProbeError {
    /// No valid access credential; the probe was abandoned before any
    /// network call
    #[error("No valid access token for account: {id}")]
    MissingToken {
        /// Unique identifier of the account
        id: String,
    },

    /// No egress path could be resolved for the account
    #[error("Egress path unavailable for {id}: {message}")]
    Egress {
        /// Unique identifier of the account
        id: String,
        /// Description of the egress failure
        message: String,
    },

    /// The probe request failed at the transport layer
    #[error("Probe transport error for {id}: {message}")]
    Transport {
        /// Unique identifier of the account
        id: String,
        /// Description of the transport failure
        message: String,
    },

    /// The provider answered with a non-success status
    #[error("Probe rejected for {id}: HTTP {status} - {body}")]
    UpstreamStatus {
        /// Unique identifier of the account
        id: String,
        /// HTTP status code returned by the provider
        status: u16,
        /// Response body, truncated for logging
        body: String,
    },

    /// The refreshed snapshot could not be persisted
    #[error("Failed to persist refreshed snapshot for {id}: {message}")]
    Persist {
        /// Unique identifier of the account
        id: String,
        /// Description of the persistence failure
        message: String,
    },
}

impl ProbeError {
    /// Check whether the failure happened before any quota was consumed.
    pub const fn before_request(&self) -> bool {
        matches!(self, Self::MissingToken { .. } | Self::Egress { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_request() {
        let no_token = ProbeError::MissingToken { id: "x".to_string() };
        let rejected =
            ProbeError::UpstreamStatus { id: "x".to_string(), status: 429, body: String::new() };

        assert!(no_token.before_request());
        assert!(!rejected.before_request());
    }

    #[test]
    fn test_error_display() {
        let err = ProbeError::UpstreamStatus {
            id: "acc-1".to_string(),
            status: 403,
            body: "forbidden".to_string(),
        };

        let msg = format!("{}", err);
        assert!(msg.contains("403"));
        assert!(msg.contains("forbidden"));
    }
}
