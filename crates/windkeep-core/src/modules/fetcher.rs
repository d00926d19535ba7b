//! Usage fetching from the remote provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::modules::config::PollerConfig;
use crate::modules::token::TokenGateway;
use crate::utils::http::create_client_for_account;
use windkeep_types::{Account, UsageSnapshot, UsageWindow};

const USAGE_ENDPOINT: &str = "/api/oauth/usage";
const OAUTH_BETA_HEADER: &str = "oauth-2025-04-20";
const FETCH_TIMEOUT_SECS: u64 = 15;
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

fn usage_user_agent() -> String {
    format!("windkeep/{}", env!("CARGO_PKG_VERSION"))
}

/// Retrieves current quota-window usage for one account.
#[async_trait]
pub trait UsageFetcher: Send + Sync {
    /// Fetch the account's current usage. `Err` on transport/provider
    /// failure; `Ok(None)` when the provider returned nothing usable.
    async fn fetch_usage(&self, account: &Account) -> AppResult<Option<UsageSnapshot>>;
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    five_hour: Option<WindowInfo>,
    seven_day: Option<WindowInfo>,
}

#[derive(Debug, Deserialize)]
struct WindowInfo {
    utilization: Option<f64>,
    resets_at: Option<String>,
}

impl WindowInfo {
    fn into_window(self, email: &str) -> UsageWindow {
        let resets_at = self.resets_at.as_deref().and_then(|raw| {
            match chrono::DateTime::parse_from_rfc3339(raw) {
                Ok(t) => Some(t.with_timezone(&chrono::Utc)),
                Err(e) => {
                    tracing::warn!("[Usage] [{}] Unparseable resets_at {:?}: {}", email, raw, e);
                    None
                },
            }
        });
        UsageWindow::new(self.utilization.unwrap_or(0.0), resets_at)
    }
}

/// Usage fetcher backed by the provider's OAuth usage endpoint.
pub struct HttpUsageFetcher {
    base_url: String,
    tokens: Arc<dyn TokenGateway>,
    config: PollerConfig,
}

impl HttpUsageFetcher {
    pub fn new(tokens: Arc<dyn TokenGateway>, config: PollerConfig) -> Self {
        Self { base_url: config.api_base_url.clone(), tokens, config }
    }

    fn parse_snapshot(response: UsageResponse, email: &str) -> UsageSnapshot {
        UsageSnapshot {
            five_hour: response.five_hour.map(|w| w.into_window(email)),
            seven_day: response.seven_day.map(|w| w.into_window(email)),
            last_updated: chrono::Utc::now().timestamp(),
        }
    }
}

#[async_trait]
impl UsageFetcher for HttpUsageFetcher {
    async fn fetch_usage(&self, account: &Account) -> AppResult<Option<UsageSnapshot>> {
        let access_token = self
            .tokens
            .access_token(account)
            .await?
            .ok_or_else(|| AppError::Token(format!("no valid access token for {}", account.email)))?;

        let client = create_client_for_account(
            FETCH_TIMEOUT_SECS,
            self.config.proxy_for(&account.id),
            self.config.enforce_proxy,
        )
        .map_err(AppError::Config)?;

        let url = format!("{}{}", self.base_url, USAGE_ENDPOINT);
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=MAX_RETRIES {
            match client
                .get(&url)
                .bearer_auth(&access_token)
                .header("anthropic-beta", OAUTH_BETA_HEADER)
                .header(reqwest::header::USER_AGENT, usage_user_agent())
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed: UsageResponse = response.json().await?;
                        return Ok(Some(Self::parse_snapshot(parsed, &account.email)));
                    }

                    // Auth failures will not improve on retry
                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        return Err(AppError::Token(format!(
                            "usage API rejected credentials for {}: {}",
                            account.email, status
                        )));
                    }

                    let text = response.text().await.unwrap_or_default();
                    tracing::warn!(
                        "[Usage] [{}] API error: {} - {} (attempt {}/{})",
                        account.email,
                        status,
                        text,
                        attempt,
                        MAX_RETRIES
                    );
                    last_error = Some(AppError::Unknown(format!("HTTP {} - {}", status, text)));
                },
                Err(e) => {
                    tracing::warn!(
                        "[Usage] [{}] Request failed: {} (attempt {}/{})",
                        account.email,
                        e,
                        attempt,
                        MAX_RETRIES
                    );
                    last_error = Some(AppError::Network(e));
                },
            }

            if attempt < MAX_RETRIES {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Unknown("Usage query failed".to_string())))
    }
}
