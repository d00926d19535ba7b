//! Access credential gateway.
//!
//! Token refresh is owned by an external collaborator; the poller only asks
//! for a currently-valid access token and treats "none" as a probe-stopping
//! condition.

use async_trait::async_trait;

use crate::error::AppResult;
use windkeep_types::Account;

// Tokens this close to expiry are not worth starting a probe with.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// Provides a valid access credential for an account, if one exists.
#[async_trait]
pub trait TokenGateway: Send + Sync {
    /// A usable access token for the account, or `None` when the stored
    /// credential is missing or (about to be) expired.
    async fn access_token(&self, account: &Account) -> AppResult<Option<String>>;
}

/// Gateway over the token already stored on the account record.
///
/// Never refreshes; an expired credential simply yields `None` until the
/// external refresh collaborator has written a new one.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoredTokenGateway;

impl StoredTokenGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenGateway for StoredTokenGateway {
    async fn access_token(&self, account: &Account) -> AppResult<Option<String>> {
        let token = &account.token;
        if token.access_token.is_empty() {
            return Ok(None);
        }
        if token.expires_within(EXPIRY_MARGIN_SECONDS) {
            tracing::debug!(
                "[Token] Stored token for {} expires in {}s, treating as unavailable",
                account.email,
                token.remaining_seconds()
            );
            return Ok(None);
        }
        Ok(Some(token.access_token.clone()))
    }
}
