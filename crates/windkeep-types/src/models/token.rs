//! Token data model.

use serde::{Deserialize, Serialize};

/// OAuth token data.
///
/// Refreshing tokens is the job of an external collaborator; the poller only
/// reads the stored credential and checks expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenData {
    /// OAuth access token
    pub access_token: String,
    /// OAuth refresh token for renewing access
    pub refresh_token: String,
    /// Token validity duration in seconds
    pub expires_in: i64,
    /// Absolute timestamp when token expires
    pub expiry_timestamp: i64,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// Email associated with the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl TokenData {
    /// Create new token data.
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        email: Option<String>,
    ) -> Self {
        let expiry_timestamp = chrono::Utc::now().timestamp().saturating_add(expires_in);
        Self {
            access_token,
            refresh_token,
            expires_in,
            expiry_timestamp,
            token_type: "Bearer".to_string(),
            email,
        }
    }

    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() >= self.expiry_timestamp
    }

    /// Check if the token will expire within the given seconds.
    pub fn expires_within(&self, seconds: i64) -> bool {
        chrono::Utc::now().timestamp().saturating_add(seconds) >= self.expiry_timestamp
    }

    /// Get remaining validity in seconds (0 if already expired).
    pub fn remaining_seconds(&self) -> i64 {
        let remaining = self.expiry_timestamp.saturating_sub(chrono::Utc::now().timestamp());
        remaining.max(0)
    }
}
