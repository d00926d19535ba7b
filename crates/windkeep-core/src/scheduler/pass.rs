//! Update pass: one sequential sweep over all eligible accounts.

use std::sync::Arc;
use std::time::Duration;

use crate::error::AppResult;
use crate::modules::config::PollerConfig;
use crate::modules::fetcher::UsageFetcher;
use crate::modules::store::AccountStore;
use crate::scheduler::prober::WindowProber;
use windkeep_types::{Account, PassCounts, UsageWindow};

/// Iterates all eligible accounts once, refreshing snapshots and invoking
/// the prober when the 5h window is dormant.
///
/// Per-account failures are absorbed into counters; only the account
/// enumeration itself can fail the pass.
pub struct UpdatePass {
    store: Arc<dyn AccountStore>,
    fetcher: Arc<dyn UsageFetcher>,
    prober: Arc<WindowProber>,
    config: PollerConfig,
}

impl UpdatePass {
    pub fn new(
        store: Arc<dyn AccountStore>,
        fetcher: Arc<dyn UsageFetcher>,
        prober: Arc<WindowProber>,
        config: PollerConfig,
    ) -> Self {
        Self { store, fetcher, prober, config }
    }

    /// Run one pass over all accounts.
    pub async fn run(&self) -> AppResult<PassCounts> {
        let accounts = self.store.list_accounts().await?;

        let mut counts = PassCounts { total: accounts.len(), ..PassCounts::default() };

        for (i, account) in accounts.iter().enumerate() {
            if i > 0 {
                // Self-imposed pacing to stay under the provider's limits
                tokio::time::sleep(Duration::from_millis(self.config.account_delay_ms)).await;
            }

            if !account.is_active() || !account.is_trackable() {
                tracing::debug!(
                    "[Poller] Skipping {} (disabled or missing required scopes)",
                    account.email
                );
                counts.skipped += 1;
                continue;
            }

            match self.fetcher.fetch_usage(account).await {
                Ok(Some(snapshot)) => {
                    if let Err(e) = self.store.put_snapshot(&account.id, &snapshot).await {
                        tracing::warn!(
                            "[Poller] Failed to persist snapshot for {}: {}",
                            account.email,
                            e
                        );
                        counts.failed += 1;
                        continue;
                    }
                    if let Some(window) = snapshot.five_hour.as_ref() {
                        if self.check_window(account, window).await {
                            counts.initialized += 1;
                        }
                    }
                    counts.success += 1;
                },
                Ok(None) => {
                    tracing::warn!("[Poller] Provider returned no usage for {}", account.email);
                    counts.failed += 1;
                },
                Err(e) => {
                    tracing::warn!("[Poller] Usage fetch failed for {}: {}", account.email, e);
                    counts.failed += 1;
                },
            }
        }

        tracing::info!(
            "[Poller] Pass complete: {} ok, {} failed, {} skipped, {} initialized ({} total)",
            counts.success,
            counts.failed,
            counts.skipped,
            counts.initialized,
            counts.total
        );
        Ok(counts)
    }

    /// Dormant-window check.
    ///
    /// A window that has never started is probed; a window close to its
    /// reset is only observed. Returns whether an initialization occurred.
    pub(crate) async fn check_window(&self, account: &Account, window: &UsageWindow) -> bool {
        if window.is_dormant() {
            tracing::info!("[Poller] 5h window for {} has never started, probing", account.email);
            return self.prober.probe(account).await;
        }

        if let Some(remaining) = window.minutes_until_reset(chrono::Utc::now()) {
            if remaining <= self.config.reset_threshold_minutes as i64 {
                tracing::info!(
                    "[Poller] 5h window for {} resets in {}min ({}% quota remaining)",
                    account.email,
                    remaining,
                    window.remaining_percent()
                );
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::test_support::{
        test_config, trackable_account, MockRelay, MockStore, MockTokens, ScriptedFetcher,
    };
    use std::sync::atomic::Ordering;
    use windkeep_types::{UsageSnapshot, UsageWindow};

    struct Fixture {
        store: Arc<MockStore>,
        fetcher: Arc<ScriptedFetcher>,
        relay: Arc<MockRelay>,
        pass: UpdatePass,
    }

    fn fixture(accounts: Vec<Account>) -> Fixture {
        let store = Arc::new(MockStore::new(accounts));
        let fetcher = Arc::new(ScriptedFetcher::new());
        let relay = Arc::new(MockRelay::ok());
        let tokens = Arc::new(MockTokens { token: Some("tok".to_string()) });
        let prober = Arc::new(WindowProber::new(
            store.clone(),
            fetcher.clone(),
            tokens,
            relay.clone(),
            test_config(),
        ));
        let pass = UpdatePass::new(store.clone(), fetcher.clone(), prober, test_config());
        Fixture { store, fetcher, relay, pass }
    }

    fn active_snapshot(minutes_to_reset: i64) -> UsageSnapshot {
        UsageSnapshot {
            five_hour: Some(UsageWindow::new(
                0.5,
                Some(chrono::Utc::now() + chrono::Duration::minutes(minutes_to_reset)),
            )),
            seven_day: None,
            last_updated: 0,
        }
    }

    #[tokio::test]
    async fn test_failed_account_does_not_stop_the_pass() {
        let f = fixture(vec![
            trackable_account("acc-1", "a@example.com"),
            trackable_account("acc-2", "b@example.com"),
            trackable_account("acc-3", "c@example.com"),
        ]);
        f.fetcher.push("acc-1", Ok(Some(active_snapshot(120)))).await;
        f.fetcher.push("acc-2", Err("boom".to_string())).await;
        f.fetcher.push("acc-3", Ok(Some(active_snapshot(240)))).await;

        let counts = f.pass.run().await.unwrap();
        assert_eq!(counts.success, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.skipped, 0);
        assert_eq!(counts.total, 3);
        assert_eq!(f.store.puts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_and_unscoped_accounts_skipped() {
        let mut disabled = trackable_account("acc-1", "a@example.com");
        disabled.disable("manual");
        let mut unscoped = trackable_account("acc-2", "b@example.com");
        unscoped.scopes.clear();

        let f = fixture(vec![disabled, unscoped]);

        let counts = f.pass.run().await.unwrap();
        assert_eq!(counts.skipped, 2);
        assert_eq!(counts.success, 0);
        assert_eq!(f.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dormant_window_probes_exactly_once() {
        let f = fixture(vec![trackable_account("acc-1", "a@example.com")]);
        let dormant = UsageSnapshot {
            five_hour: Some(UsageWindow::dormant()),
            seven_day: None,
            last_updated: 0,
        };
        f.fetcher.push("acc-1", Ok(Some(dormant))).await;
        // Prober's confirmation re-fetch sees the activated window
        f.fetcher.push("acc-1", Ok(Some(active_snapshot(300)))).await;

        let counts = f.pass.run().await.unwrap();
        assert_eq!(counts.success, 1);
        assert_eq!(counts.initialized, 1);
        assert_eq!(f.relay.send_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_five_hour_window_not_checked() {
        let f = fixture(vec![trackable_account("acc-1", "a@example.com")]);
        f.fetcher
            .push("acc-1", Ok(Some(UsageSnapshot { last_updated: 0, ..Default::default() })))
            .await;

        let counts = f.pass.run().await.unwrap();
        assert_eq!(counts.success, 1);
        assert_eq!(counts.initialized, 0);
        assert_eq!(f.relay.send_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_fetch_counts_as_failed() {
        let f = fixture(vec![trackable_account("acc-1", "a@example.com")]);
        f.fetcher.push("acc-1", Ok(None)).await;

        let counts = f.pass.run().await.unwrap();
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.success, 0);
    }

    #[tokio::test]
    async fn test_enumeration_failure_aborts_pass() {
        let f = fixture(vec![]);
        f.store.fail_listing.store(true, Ordering::SeqCst);

        assert!(f.pass.run().await.is_err());
    }

    #[tokio::test]
    async fn test_check_window_near_reset_observes_only() {
        let f = fixture(vec![trackable_account("acc-1", "a@example.com")]);
        let account = trackable_account("acc-1", "a@example.com");
        // 3 minutes to reset, threshold 10: observe, never probe
        let window =
            UsageWindow::new(0.8, Some(chrono::Utc::now() + chrono::Duration::minutes(3)));

        assert!(!f.pass.check_window(&account, &window).await);
        assert_eq!(f.relay.send_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(window.remaining_percent(), 20);
    }

    #[tokio::test]
    async fn test_check_window_far_from_reset_is_silent_noop() {
        let f = fixture(vec![trackable_account("acc-1", "a@example.com")]);
        let account = trackable_account("acc-1", "a@example.com");
        let window =
            UsageWindow::new(0.2, Some(chrono::Utc::now() + chrono::Duration::minutes(90)));

        assert!(!f.pass.check_window(&account, &window).await);
        assert_eq!(f.relay.send_calls.load(Ordering::SeqCst), 0);
    }
}
