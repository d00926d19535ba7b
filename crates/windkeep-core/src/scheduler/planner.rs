//! Interval planning: align the next wake-up with the earliest window reset.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppResult;
use crate::modules::config::PollerConfig;
use crate::modules::store::AccountStore;
use windkeep_types::{ScheduleEntry, UsageSnapshot, WindowKind};

/// Collect every future wake-up candidate from the given snapshots.
///
/// Each window carrying a reset time yields one candidate at
/// `resets_at + after_reset`; candidates already in the past are dropped.
pub fn collect_candidates(
    snapshots: &[(String, UsageSnapshot)],
    after_reset: chrono::Duration,
    now: DateTime<Utc>,
) -> Vec<ScheduleEntry> {
    let mut candidates = Vec::new();
    for (email, snapshot) in snapshots {
        for kind in [WindowKind::FiveHour, WindowKind::SevenDay] {
            let Some(window) = snapshot.window(kind) else { continue };
            let Some(resets_at) = window.resets_at else { continue };
            let trigger_time = resets_at + after_reset;
            if trigger_time > now {
                candidates.push(ScheduleEntry {
                    account_email: email.clone(),
                    trigger_time,
                    window: kind,
                });
            }
        }
    }
    candidates
}

/// Pure planning over `(email, snapshot)` pairs.
///
/// Earliest future trigger wins; a trigger closer than the base interval
/// shortens the wait (floored at the minimum interval), anything else —
/// including no candidates at all — yields the base interval. Ties on equal
/// trigger times are broken arbitrarily, since only the time value is used.
pub fn plan_interval(
    snapshots: &[(String, UsageSnapshot)],
    now: DateTime<Utc>,
    config: &PollerConfig,
) -> Duration {
    let base = Duration::from_secs(config.base_interval_minutes * 60);
    let after_reset = chrono::Duration::minutes(config.after_reset_minutes as i64);

    let candidates = collect_candidates(snapshots, after_reset, now);
    let Some(next) = candidates.iter().min_by_key(|e| e.trigger_time) else {
        tracing::debug!("[Planner] No upcoming window resets, using base interval");
        return base;
    };

    let until = next.trigger_time - now;
    if until < chrono::Duration::minutes(config.base_interval_minutes as i64) {
        let floor = chrono::Duration::minutes(config.min_interval_minutes as i64);
        let wait = if until < floor { floor } else { until };
        tracing::info!(
            "[Planner] Next reset: {} ({}) in {}min, waking then",
            next.account_email,
            next.window,
            wait.num_minutes()
        );
        return wait.to_std().unwrap_or(base);
    }

    tracing::debug!(
        "[Planner] Earliest reset {}min away, staying on base interval",
        until.num_minutes()
    );
    base
}

/// Computes the duration until the next scheduling wake-up from persisted
/// snapshots. Always succeeds; internal errors degrade to the base interval.
pub struct IntervalPlanner {
    store: Arc<dyn AccountStore>,
    config: PollerConfig,
}

impl IntervalPlanner {
    pub fn new(store: Arc<dyn AccountStore>, config: PollerConfig) -> Self {
        Self { store, config }
    }

    /// Duration until the next wake-up.
    pub async fn next_interval(&self) -> Duration {
        match self.compute().await {
            Ok(interval) => interval,
            Err(e) => {
                tracing::warn!("[Planner] Planning failed: {}, using base interval", e);
                Duration::from_secs(self.config.base_interval_minutes * 60)
            },
        }
    }

    async fn compute(&self) -> AppResult<Duration> {
        let accounts = self.store.list_accounts().await?;

        let mut snapshots = Vec::new();
        for account in accounts.iter().filter(|a| a.is_active()) {
            if let Some(snapshot) = self.store.get_snapshot(&account.id).await? {
                snapshots.push((account.email.clone(), snapshot));
            }
        }

        Ok(plan_interval(&snapshots, Utc::now(), &self.config))
    }
}
