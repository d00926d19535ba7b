//! Poller configuration: loading, saving, defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const CONFIG_FILE: &str = "poller_config.json";

fn default_base_interval_minutes() -> u64 {
    20
}

fn default_after_reset_minutes() -> u64 {
    5
}

fn default_reset_threshold_minutes() -> u64 {
    10
}

fn default_min_interval_minutes() -> u64 {
    1
}

fn default_account_delay_ms() -> u64 {
    1000
}

fn default_settle_delay_secs() -> u64 {
    2
}

fn default_api_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_probe_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_probe_max_tokens() -> u32 {
    1
}

/// Poller tunables, persisted as JSON in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollerConfig {
    /// Fallback polling interval when no usable reset time is known
    #[serde(default = "default_base_interval_minutes")]
    pub base_interval_minutes: u64,
    /// Settle margin added after a window reset before waking up
    #[serde(default = "default_after_reset_minutes")]
    pub after_reset_minutes: u64,
    /// Remaining-minutes threshold for logging an impending reset
    #[serde(default = "default_reset_threshold_minutes")]
    pub reset_threshold_minutes: u64,
    /// Floor preventing near-zero re-scheduling
    #[serde(default = "default_min_interval_minutes")]
    pub min_interval_minutes: u64,
    /// Mandatory delay between consecutive accounts in a pass
    #[serde(default = "default_account_delay_ms")]
    pub account_delay_ms: u64,
    /// Wait after a probe before re-checking activation
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
    /// Provider API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Model used for minimal-cost probe requests
    #[serde(default = "default_probe_model")]
    pub probe_model: String,
    /// Response-size cap for probe requests
    #[serde(default = "default_probe_max_tokens")]
    pub probe_max_tokens: u32,
    /// Per-account egress proxy URLs (account ID -> proxy URL)
    #[serde(default)]
    pub account_proxies: HashMap<String, String>,
    /// Refuse direct connections for accounts without a proxy entry
    #[serde(default)]
    pub enforce_proxy: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            base_interval_minutes: default_base_interval_minutes(),
            after_reset_minutes: default_after_reset_minutes(),
            reset_threshold_minutes: default_reset_threshold_minutes(),
            min_interval_minutes: default_min_interval_minutes(),
            account_delay_ms: default_account_delay_ms(),
            settle_delay_secs: default_settle_delay_secs(),
            api_base_url: default_api_base_url(),
            probe_model: default_probe_model(),
            probe_max_tokens: default_probe_max_tokens(),
            account_proxies: HashMap::new(),
            enforce_proxy: false,
        }
    }
}

impl PollerConfig {
    /// Egress proxy URL for an account, if one is configured.
    pub fn proxy_for(&self, account_id: &str) -> Option<&str> {
        self.account_proxies.get(account_id).map(String::as_str)
    }
}

/// Load the poller configuration from the data directory.
///
/// A missing file yields the defaults; a corrupt file is an error so a typo
/// never silently resets every tunable.
pub fn load_config(data_dir: &Path) -> Result<PollerConfig, String> {
    let config_path = data_dir.join(CONFIG_FILE);

    if !config_path.exists() {
        return Ok(PollerConfig::default());
    }

    let content =
        fs::read_to_string(&config_path).map_err(|e| format!("Failed to read config: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Save the poller configuration atomically.
pub fn save_config(data_dir: &Path, config: &PollerConfig) -> Result<(), String> {
    let config_path = data_dir.join(CONFIG_FILE);
    let temp_path = data_dir.join(format!("{}.tmp", CONFIG_FILE));

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    // Atomic write
    fs::write(&temp_path, content).map_err(|e| format!("Failed to write temp config: {}", e))?;
    fs::rename(&temp_path, &config_path).map_err(|e| format!("Failed to save config: {}", e))
}

/// Update specific fields in the config.
pub fn update_config<F>(data_dir: &Path, updater: F) -> Result<PollerConfig, String>
where
    F: FnOnce(&mut PollerConfig),
{
    let mut config = load_config(data_dir)?;
    updater(&mut config);
    save_config(data_dir, &config)?;
    Ok(config)
}
