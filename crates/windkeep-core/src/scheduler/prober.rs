//! Dormant-window probing.
//!
//! A usage window that has never seen traffic carries no reset timestamp,
//! which leaves the planner blind for that account. The prober issues one
//! minimal-cost inference request to start the window, waits a short settle
//! delay, then re-fetches usage to confirm the activation took. This is the
//! only intentionally quota-consuming operation in the system.

use std::sync::Arc;
use std::time::Duration;

use crate::modules::config::PollerConfig;
use crate::modules::fetcher::UsageFetcher;
use crate::modules::relay::{ProbeRequest, RelayGateway};
use crate::modules::store::AccountStore;
use crate::modules::token::TokenGateway;
use windkeep_types::{Account, ProbeError};

const BODY_SNIPPET_LEN: usize = 200;

fn truncate_body(body: &str) -> String {
    if body.len() <= BODY_SNIPPET_LEN {
        body.to_string()
    } else {
        let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
        format!("{}...", snippet)
    }
}

/// Issues a minimal-cost request to force a dormant usage window to
/// activate, then re-fetches usage to confirm.
pub struct WindowProber {
    store: Arc<dyn AccountStore>,
    fetcher: Arc<dyn UsageFetcher>,
    tokens: Arc<dyn TokenGateway>,
    relay: Arc<dyn RelayGateway>,
    config: PollerConfig,
}

impl WindowProber {
    pub fn new(
        store: Arc<dyn AccountStore>,
        fetcher: Arc<dyn UsageFetcher>,
        tokens: Arc<dyn TokenGateway>,
        relay: Arc<dyn RelayGateway>,
        config: PollerConfig,
    ) -> Self {
        Self { store, fetcher, tokens, relay, config }
    }

    /// Probe the account's 5h window. `true` means the activation was
    /// confirmed by the follow-up fetch. Failures never propagate.
    pub async fn probe(&self, account: &Account) -> bool {
        match self.try_probe(account).await {
            Ok(true) => {
                tracing::info!("[Prober] Activated 5h window for {}", account.email);
                true
            },
            Ok(false) => {
                tracing::info!(
                    "[Prober] Probe accepted for {} but window still dormant after settle delay",
                    account.email
                );
                false
            },
            Err(e) => {
                if e.before_request() {
                    tracing::info!("[Prober] Probe skipped for {}: {}", account.email, e);
                } else {
                    tracing::warn!("[Prober] Probe failed for {}: {}", account.email, e);
                }
                false
            },
        }
    }

    async fn try_probe(&self, account: &Account) -> Result<bool, ProbeError> {
        let access_token = match self.tokens.access_token(account).await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(ProbeError::MissingToken { id: account.id.clone() }),
            Err(e) => {
                tracing::debug!("[Prober] Token gateway error for {}: {}", account.email, e);
                return Err(ProbeError::MissingToken { id: account.id.clone() });
            },
        };

        let request = ProbeRequest::minimal(&self.config.probe_model, self.config.probe_max_tokens);

        let egress = self
            .relay
            .egress_path(&account.id)
            .await
            .map_err(|e| ProbeError::Egress { id: account.id.clone(), message: e.to_string() })?;

        let response = self
            .relay
            .send_probe(&request, &access_token, &egress, &account.id)
            .await
            .map_err(|e| ProbeError::Transport { id: account.id.clone(), message: e.to_string() })?;

        if !response.is_success() {
            return Err(ProbeError::UpstreamStatus {
                id: account.id.clone(),
                status: response.status,
                body: truncate_body(&response.body),
            });
        }

        // Give the provider time to materialize the window before checking.
        tokio::time::sleep(Duration::from_secs(self.config.settle_delay_secs)).await;

        let refreshed = self
            .fetcher
            .fetch_usage(account)
            .await
            .map_err(|e| ProbeError::Transport { id: account.id.clone(), message: e.to_string() })?;

        let Some(refreshed) = refreshed else {
            return Ok(false);
        };

        let activated = refreshed.five_hour.as_ref().is_some_and(|w| !w.is_dormant());
        if activated {
            self.store.put_snapshot(&account.id, &refreshed).await.map_err(|e| {
                ProbeError::Persist { id: account.id.clone(), message: e.to_string() }
            })?;
        }
        Ok(activated)
    }
}
