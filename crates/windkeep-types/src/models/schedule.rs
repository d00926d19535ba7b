//! Scheduling and pass-result models.

use super::WindowKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One candidate wake-up computed from a persisted snapshot.
///
/// Entries are transient: recomputed from snapshots every planning cycle and
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    /// Email of the account the candidate belongs to
    pub account_email: String,
    /// Moment the scheduler should wake up for this window
    pub trigger_time: DateTime<Utc>,
    /// Which window produced the candidate
    pub window: WindowKind,
}

/// Aggregate counters produced by one update pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PassCounts {
    /// Accounts whose snapshot was refreshed
    pub success: usize,
    /// Accounts skipped (disabled or missing required scopes)
    pub skipped: usize,
    /// Accounts whose dormant 5h window was activated this pass
    pub initialized: usize,
    /// Accounts whose fetch failed
    pub failed: usize,
    /// Accounts considered
    pub total: usize,
}

/// Run flag and tunables exposed for the operational control surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// Whether the scheduler loop is running
    pub is_running: bool,
    /// Fallback polling interval in minutes
    pub base_interval_minutes: u64,
    /// Settle margin added after a window reset, in minutes
    pub after_reset_minutes: u64,
    /// Impending-reset observation threshold, in minutes
    pub reset_threshold_minutes: u64,
}
