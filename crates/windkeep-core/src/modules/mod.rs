//! Gateway modules.
//!
//! Each collaborator the scheduler depends on is modeled as an injected
//! trait with one production implementation:
//!
//! - [`store::AccountStore`] / [`store::FileAccountStore`] — account listing
//!   and snapshot persistence
//! - [`fetcher::UsageFetcher`] / [`fetcher::HttpUsageFetcher`] — current
//!   usage from the provider
//! - [`token::TokenGateway`] / [`token::StoredTokenGateway`] — access
//!   credentials (refresh stays external)
//! - [`relay::RelayGateway`] / [`relay::HttpRelay`] — egress resolution and
//!   the probe request primitive

pub mod config;
pub mod fetcher;
pub mod relay;
pub mod store;
pub mod token;

pub use config::PollerConfig;
pub use fetcher::{HttpUsageFetcher, UsageFetcher};
pub use relay::{EgressPath, HttpRelay, ProbeRequest, ProbeResponse, RelayGateway};
pub use store::{AccountStore, FileAccountStore};
pub use token::{StoredTokenGateway, TokenGateway};
