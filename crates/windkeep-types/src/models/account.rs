//! Account model and related types.

use super::TokenData;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// OAuth scope granting read access to the account profile.
pub const SCOPE_PROFILE: &str = "user:profile";

/// OAuth scope granting inference access.
pub const SCOPE_INFERENCE: &str = "user:inference";

/// Account data structure representing a tracked provider account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Email address associated with the account
    pub email: String,
    /// Optional display name
    pub name: Option<String>,
    /// Authentication token data
    pub token: TokenData,
    /// Whether the account is disabled
    #[serde(default)]
    pub disabled: bool,
    /// Reason for disable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    /// Timestamp when account was disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_at: Option<i64>,
    /// OAuth capability scopes granted to the stored credential
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub scopes: HashSet<String>,
    /// Timestamp when account was created
    pub created_at: i64,
    /// Timestamp when account was last used
    pub last_used: i64,
}

impl Account {
    /// Create a new account with the given ID, email, and token.
    pub fn new(id: String, email: String, token: TokenData) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id,
            email,
            name: None,
            token,
            disabled: false,
            disabled_reason: None,
            disabled_at: None,
            scopes: HashSet::new(),
            created_at: now,
            last_used: now,
        }
    }

    /// Update the last used timestamp to now.
    pub fn update_last_used(&mut self) {
        self.last_used = chrono::Utc::now().timestamp();
    }

    /// Check if the account is enabled.
    pub const fn is_active(&self) -> bool {
        !self.disabled
    }

    /// Disable the account with a reason.
    pub fn disable(&mut self, reason: impl Into<String>) {
        self.disabled = true;
        self.disabled_reason = Some(reason.into());
        self.disabled_at = Some(chrono::Utc::now().timestamp());
    }

    /// Re-enable the account.
    pub fn enable(&mut self) {
        self.disabled = false;
        self.disabled_reason = None;
        self.disabled_at = None;
    }

    /// Check whether the credential carries a specific scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Check whether this is the kind of account the poller tracks:
    /// the credential must grant both profile read and inference access.
    pub fn is_trackable(&self) -> bool {
        self.has_scope(SCOPE_PROFILE) && self.has_scope(SCOPE_INFERENCE)
    }
}

/// Account summary for the index file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Unique identifier
    pub id: String,
    /// Email address
    pub email: String,
    /// Optional display name
    pub name: Option<String>,
    /// Creation timestamp
    pub created_at: i64,
    /// Last used timestamp
    pub last_used: i64,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            created_at: account.created_at,
            last_used: account.last_used,
        }
    }
}
