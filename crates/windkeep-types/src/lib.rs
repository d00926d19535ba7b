//! # Windkeep Types
//!
//! Core types, models, and error definitions for Windkeep.
//!
//! This crate provides the foundational type system for the Windkeep poller:
//!
//! - **`error`** - Typed error taxonomy for the store and the window prober
//! - **`models`** - Domain models (Account, Token, UsageWindow, Schedule)
//!
//! `windkeep-types` sits at the bottom of the dependency graph; both
//! `windkeep-core` and `windkeep-server` build on it. All types are designed
//! to be:
//! - **Serializable** via serde for persistence and status payloads
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ProbeError, StoreError};

// Re-export core model types
pub use models::{
    Account, AccountSummary, PassCounts, ScheduleEntry, SchedulerStatus, TokenData, UsageSnapshot,
    UsageWindow, WindowKind, SCOPE_INFERENCE, SCOPE_PROFILE,
};
