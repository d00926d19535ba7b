//! Egress resolution and the probe request primitive.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::modules::config::PollerConfig;
use crate::utils::http::create_client_for_account;

const MESSAGES_ENDPOINT: &str = "/v1/messages";
const OAUTH_BETA_HEADER: &str = "oauth-2025-04-20";
const PROBE_TIMEOUT_SECS: u64 = 30;

// Distinct from the regular client identity so probe traffic is separable
// in provider-side logs.
fn probe_user_agent() -> String {
    format!("windkeep-prober/{}", env!("CARGO_PKG_VERSION"))
}

/// Network egress path for one account's outbound traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EgressPath {
    /// Proxy URL, or `None` for a direct connection
    pub proxy_url: Option<String>,
}

/// Minimal-cost inference request body.
///
/// Shaped to consume negligible quota while still registering against the
/// usage window: smallest configured model, tiny response cap, trivial
/// content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ProbeMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeMessage {
    pub role: String,
    pub content: String,
}

impl ProbeRequest {
    /// The fixed tiny request shape used for every probe.
    pub fn minimal(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            messages: vec![ProbeMessage { role: "user".to_string(), content: "ping".to_string() }],
        }
    }
}

/// Raw result of a probe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub const fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Request execution through the account's egress path.
#[async_trait]
pub trait RelayGateway: Send + Sync {
    /// Resolve the egress path for an account.
    async fn egress_path(&self, account_id: &str) -> AppResult<EgressPath>;

    /// Issue a probe request on behalf of an account.
    async fn send_probe(
        &self,
        request: &ProbeRequest,
        access_token: &str,
        egress: &EgressPath,
        account_id: &str,
    ) -> AppResult<ProbeResponse>;
}

/// Relay backed by the provider's messages endpoint.
pub struct HttpRelay {
    base_url: String,
    config: PollerConfig,
}

impl HttpRelay {
    pub fn new(config: PollerConfig) -> Self {
        Self { base_url: config.api_base_url.clone(), config }
    }
}

#[async_trait]
impl RelayGateway for HttpRelay {
    async fn egress_path(&self, account_id: &str) -> AppResult<EgressPath> {
        let proxy_url = self.config.proxy_for(account_id).map(str::to_string);
        if proxy_url.is_none() && self.config.enforce_proxy {
            return Err(AppError::Config(format!(
                "enforce_proxy is enabled but account {} has no proxy configured",
                account_id
            )));
        }
        Ok(EgressPath { proxy_url })
    }

    async fn send_probe(
        &self,
        request: &ProbeRequest,
        access_token: &str,
        egress: &EgressPath,
        account_id: &str,
    ) -> AppResult<ProbeResponse> {
        let client = create_client_for_account(
            PROBE_TIMEOUT_SECS,
            egress.proxy_url.as_deref(),
            self.config.enforce_proxy,
        )
        .map_err(AppError::Config)?;

        tracing::debug!("[Relay] Sending probe for {} via {}", account_id, self.base_url);

        let response = client
            .post(format!("{}{}", self.base_url, MESSAGES_ENDPOINT))
            .bearer_auth(access_token)
            .header("anthropic-beta", OAUTH_BETA_HEADER)
            .header(reqwest::header::USER_AGENT, probe_user_agent())
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(ProbeResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn relay_for(server: &MockServer) -> HttpRelay {
        let config = PollerConfig { api_base_url: server.uri(), ..PollerConfig::default() };
        HttpRelay::new(config)
    }

    #[test]
    fn test_minimal_request_shape() {
        let request = ProbeRequest::minimal("claude-3-5-haiku-20241022", 1);
        assert_eq!(request.max_tokens, 1);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "claude-3-5-haiku-20241022");
        assert_eq!(json["max_tokens"], 1);
    }

    #[tokio::test]
    async fn test_send_probe_returns_status_and_body() {
        let server = MockServer::start().await;
        let request = ProbeRequest::minimal("claude-3-5-haiku-20241022", 1);

        Mock::given(method("POST"))
            .and(path(MESSAGES_ENDPOINT))
            .and(header("authorization", "Bearer tok-123"))
            .and(body_json(json!({
                "model": "claude-3-5-haiku-20241022",
                "max_tokens": 1,
                "messages": [{"role": "user", "content": "ping"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"msg_1"}"#))
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let egress = relay.egress_path("acc-1").await.unwrap();
        let response = relay.send_probe(&request, "tok-123", &egress, "acc-1").await.unwrap();

        assert!(response.is_success());
        assert!(response.body.contains("msg_1"));
    }

    #[tokio::test]
    async fn test_send_probe_surfaces_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MESSAGES_ENDPOINT))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let request = ProbeRequest::minimal("claude-3-5-haiku-20241022", 1);
        let response =
            relay.send_probe(&request, "tok-123", &EgressPath::default(), "acc-1").await.unwrap();

        assert!(!response.is_success());
        assert_eq!(response.status, 429);
        assert_eq!(response.body, "rate limited");
    }

    #[tokio::test]
    async fn test_enforce_proxy_without_entry_fails() {
        let config = PollerConfig { enforce_proxy: true, ..PollerConfig::default() };
        let relay = HttpRelay::new(config);

        assert!(matches!(relay.egress_path("acc-1").await, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_egress_uses_configured_proxy() {
        let mut config = PollerConfig::default();
        config
            .account_proxies
            .insert("acc-1".to_string(), "socks5://10.0.0.1:1080".to_string());
        let relay = HttpRelay::new(config);

        let egress = relay.egress_path("acc-1").await.unwrap();
        assert_eq!(egress.proxy_url.as_deref(), Some("socks5://10.0.0.1:1080"));
        assert_eq!(relay.egress_path("other").await.unwrap(), EgressPath::default());
    }
}
