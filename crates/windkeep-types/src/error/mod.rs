//! Typed error definitions for Windkeep.
//!
//! Structured error types for the two domains where callers need to match on
//! failure shape: the account/snapshot store and the window prober. All
//! errors are:
//!
//! - **Serializable** for status payloads via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants
//! - **Composable** via thiserror derive macros

mod probe;
mod store;

pub use probe::ProbeError;
pub use store::StoreError;
