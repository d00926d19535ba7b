//! Usage window data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two rolling quota periods tracked per account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WindowKind {
    /// 5-hour rolling window
    FiveHour,
    /// 7-day rolling window
    SevenDay,
}

impl WindowKind {
    /// Short display label ("5h" / "7d").
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FiveHour => "5h",
            Self::SevenDay => "7d",
        }
    }
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one rolling quota window.
///
/// A window without a reset timestamp has never been activated by traffic
/// (dormant). Whenever `resets_at` is set, `utilization` is kept in `[0, 1]`;
/// the constructor clamps out-of-range input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageWindow {
    /// Cumulative utilization fraction of the window (0.0 - 1.0)
    pub utilization: f64,
    /// Time when the window resets; absent while the window is dormant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<DateTime<Utc>>,
}

impl UsageWindow {
    /// Create a window, clamping utilization into `[0, 1]`.
    pub fn new(utilization: f64, resets_at: Option<DateTime<Utc>>) -> Self {
        Self { utilization: utilization.clamp(0.0, 1.0), resets_at }
    }

    /// A window that has never been activated.
    pub fn dormant() -> Self {
        Self { utilization: 0.0, resets_at: None }
    }

    /// Check if the window has never been activated.
    pub const fn is_dormant(&self) -> bool {
        self.resets_at.is_none()
    }

    /// Remaining quota as a rounded percentage: `100 * (1 - utilization)`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::as_conversions,
        reason = "percentage calculation: f64 * 100.0 -> i32"
    )]
    pub fn remaining_percent(&self) -> i32 {
        ((1.0 - self.utilization) * 100.0).round() as i32
    }

    /// Whole minutes until the window resets, negative if the reset already
    /// passed. `None` while dormant.
    pub fn minutes_until_reset(&self, now: DateTime<Utc>) -> Option<i64> {
        self.resets_at.map(|t| (t - now).num_minutes())
    }
}

/// Last-fetched usage state for one account, persisted by the store gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UsageSnapshot {
    /// 5-hour window state, if the provider reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub five_hour: Option<UsageWindow>,
    /// 7-day window state, if the provider reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seven_day: Option<UsageWindow>,
    /// Last time the snapshot was updated
    #[serde(default)]
    pub last_updated: i64,
}

impl UsageSnapshot {
    /// Create an empty snapshot stamped with the current time.
    pub fn new() -> Self {
        Self { five_hour: None, seven_day: None, last_updated: chrono::Utc::now().timestamp() }
    }

    /// Get a window by kind.
    pub const fn window(&self, kind: WindowKind) -> Option<&UsageWindow> {
        match kind {
            WindowKind::FiveHour => self.five_hour.as_ref(),
            WindowKind::SevenDay => self.seven_day.as_ref(),
        }
    }

    /// Check whether the provider reported neither window.
    pub const fn is_empty(&self) -> bool {
        self.five_hour.is_none() && self.seven_day.is_none()
    }
}
