//! Adaptive Background Scheduler
//!
//! ## Update Pass
//! One sequential sweep over all eligible accounts: refresh each usage
//! snapshot, probe the 5h window when it has never been activated, and
//! aggregate success/skip/init/failure counters.
//!
//! ## Interval Planner
//! Examines persisted snapshots and aligns the next wake-up with the
//! earliest expected window reset (plus a settle margin), bounded by the
//! base interval.
//!
//! ## Poller Service
//! Drives repeated (update pass -> planner -> sleep) cycles from a single
//! loop task with a cancellable one-shot deadline. Exposes start/stop
//! lifecycle and status introspection.

mod pass;
mod planner;
mod prober;
mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use pass::UpdatePass;
pub use planner::{collect_candidates, plan_interval, IntervalPlanner};
pub use prober::WindowProber;
pub use service::PollerService;
