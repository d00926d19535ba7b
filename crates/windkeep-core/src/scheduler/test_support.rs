//! Mock gateways for scheduler tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::modules::config::PollerConfig;
use crate::modules::relay::{EgressPath, ProbeRequest, ProbeResponse, RelayGateway};
use crate::modules::store::AccountStore;
use crate::modules::token::TokenGateway;
use crate::modules::fetcher::UsageFetcher;
use windkeep_types::{Account, TokenData, UsageSnapshot, SCOPE_INFERENCE, SCOPE_PROFILE};

/// Defaults with pacing delays zeroed so tests don't sleep.
pub(crate) fn test_config() -> PollerConfig {
    PollerConfig { account_delay_ms: 0, settle_delay_secs: 0, ..PollerConfig::default() }
}

pub(crate) fn trackable_account(id: &str, email: &str) -> Account {
    let token = TokenData::new("tok".to_string(), "refresh".to_string(), 3600, None);
    let mut account = Account::new(id.to_string(), email.to_string(), token);
    account.scopes =
        [SCOPE_PROFILE, SCOPE_INFERENCE].iter().map(|s| (*s).to_string()).collect();
    account
}

pub(crate) struct MockStore {
    pub accounts: Mutex<Vec<Account>>,
    pub snapshots: Mutex<HashMap<String, UsageSnapshot>>,
    pub fail_listing: AtomicBool,
    pub puts: AtomicUsize,
}

impl MockStore {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            snapshots: Mutex::new(HashMap::new()),
            fail_listing: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AccountStore for MockStore {
    async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(AppError::Unknown("enumeration failed".to_string()));
        }
        Ok(self.accounts.lock().await.clone())
    }

    async fn get_snapshot(&self, account_id: &str) -> AppResult<Option<UsageSnapshot>> {
        Ok(self.snapshots.lock().await.get(account_id).cloned())
    }

    async fn put_snapshot(&self, account_id: &str, snapshot: &UsageSnapshot) -> AppResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.snapshots.lock().await.insert(account_id.to_string(), snapshot.clone());
        Ok(())
    }
}

/// Fetcher that replays a scripted queue of responses per account and
/// panics when a test makes an unplanned call.
pub(crate) struct ScriptedFetcher {
    responses: Mutex<HashMap<String, VecDeque<Result<Option<UsageSnapshot>, String>>>>,
    pub calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self { responses: Mutex::new(HashMap::new()), calls: AtomicUsize::new(0) }
    }

    pub async fn push(&self, account_id: &str, response: Result<Option<UsageSnapshot>, String>) {
        self.responses
            .lock()
            .await
            .entry(account_id.to_string())
            .or_default()
            .push_back(response);
    }
}

#[async_trait]
impl UsageFetcher for ScriptedFetcher {
    async fn fetch_usage(&self, account: &Account) -> AppResult<Option<UsageSnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .await
            .get_mut(&account.id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| panic!("unscripted fetch_usage call for {}", account.id));
        next.map_err(AppError::Unknown)
    }
}

/// Fetcher that always returns the same snapshot; for loop-driving tests.
pub(crate) struct StaticFetcher {
    pub snapshot: UsageSnapshot,
    pub calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new(snapshot: UsageSnapshot) -> Self {
        Self { snapshot, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl UsageFetcher for StaticFetcher {
    async fn fetch_usage(&self, _account: &Account) -> AppResult<Option<UsageSnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.snapshot.clone()))
    }
}

pub(crate) struct MockTokens {
    pub token: Option<String>,
}

#[async_trait]
impl TokenGateway for MockTokens {
    async fn access_token(&self, _account: &Account) -> AppResult<Option<String>> {
        Ok(self.token.clone())
    }
}

pub(crate) struct MockRelay {
    pub response: Mutex<ProbeResponse>,
    pub send_calls: AtomicUsize,
}

impl MockRelay {
    pub fn ok() -> Self {
        Self {
            response: Mutex::new(ProbeResponse { status: 200, body: "{}".to_string() }),
            send_calls: AtomicUsize::new(0),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            response: Mutex::new(ProbeResponse { status, body: body.to_string() }),
            send_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RelayGateway for MockRelay {
    async fn egress_path(&self, _account_id: &str) -> AppResult<EgressPath> {
        Ok(EgressPath::default())
    }

    async fn send_probe(
        &self,
        _request: &ProbeRequest,
        _access_token: &str,
        _egress: &EgressPath,
        _account_id: &str,
    ) -> AppResult<ProbeResponse> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.lock().await.clone())
    }
}
