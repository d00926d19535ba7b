//! # Windkeep Core
//!
//! Core business logic for the Windkeep poller.
//!
//! ```text
//! windkeep-core/src/
//! ├── modules/          # Gateways: store, config, token, fetcher, relay
//! ├── scheduler/        # Adaptive scheduler: pass, prober, planner, service
//! └── utils/            # HTTP client construction with proxy support
//! ```
//!
//! The scheduler consumes its collaborators through the gateway traits in
//! `modules/`, so every network- or disk-touching piece can be substituted
//! in tests.

pub mod error;
pub mod modules;
pub mod scheduler;
pub mod utils;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use modules::{AccountStore, RelayGateway, TokenGateway, UsageFetcher};
pub use scheduler::PollerService;
