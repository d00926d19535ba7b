//! Account and snapshot storage.
//!
//! The scheduler consumes storage through the [`AccountStore`] trait; the
//! production implementation keeps a JSON index plus one JSON file per
//! account and per usage snapshot under the data directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use windkeep_types::{Account, AccountSummary, StoreError, UsageSnapshot};

// Directory and file names
const DATA_DIR: &str = ".windkeep";
const ACCOUNTS_INDEX: &str = "accounts.json";
const ACCOUNTS_DIR: &str = "accounts";
const USAGE_DIR: &str = "usage";

/// Read access to tracked accounts and their persisted usage snapshots,
/// write access to persist a new snapshot.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// List all tracked accounts.
    async fn list_accounts(&self) -> AppResult<Vec<Account>>;

    /// Load the persisted usage snapshot for an account, if any.
    async fn get_snapshot(&self, account_id: &str) -> AppResult<Option<UsageSnapshot>>;

    /// Persist a usage snapshot for an account.
    async fn put_snapshot(&self, account_id: &str, snapshot: &UsageSnapshot) -> AppResult<()>;
}

/// Account index data structure (accounts.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreIndex {
    /// Schema version
    version: String,
    /// List of account summaries
    accounts: Vec<AccountSummary>,
}

impl StoreIndex {
    fn new() -> Self {
        Self { version: "1.0".to_string(), accounts: Vec::new() }
    }
}

impl Default for StoreIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON-file-backed account store.
pub struct FileAccountStore {
    data_dir: PathBuf,
    // Serializes index mutations; snapshot writes are per-account files and
    // need no coordination.
    index_lock: Mutex<()>,
}

impl FileAccountStore {
    /// Open a store rooted at the given data directory, creating the layout
    /// if needed.
    pub fn new(data_dir: PathBuf) -> AppResult<Self> {
        for dir in [data_dir.clone(), data_dir.join(ACCOUNTS_DIR), data_dir.join(USAGE_DIR)] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir).map_err(|e| StoreError::Io {
                    message: format!("Failed to create {}: {}", dir.display(), e),
                })?;
            }
        }
        Ok(Self { data_dir, index_lock: Mutex::new(()) })
    }

    /// Open the store at the default location (`~/.windkeep`).
    pub fn open_default() -> AppResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| StoreError::Io { message: "Cannot get home directory".to_string() })?;
        Self::new(home.join(DATA_DIR))
    }

    /// The data directory this store is rooted at.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    fn index_path(&self) -> PathBuf {
        self.data_dir.join(ACCOUNTS_INDEX)
    }

    fn account_path(&self, account_id: &str) -> PathBuf {
        self.data_dir.join(ACCOUNTS_DIR).join(format!("{}.json", account_id))
    }

    fn usage_path(&self, account_id: &str) -> PathBuf {
        self.data_dir.join(USAGE_DIR).join(format!("{}.json", account_id))
    }

    async fn load_index(&self) -> AppResult<StoreIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(StoreIndex::new());
        }

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| StoreError::Io {
            message: format!("Failed to read account index: {}", e),
        })?;

        let index = serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(index)
    }

    async fn save_index(&self, index: &StoreIndex) -> AppResult<()> {
        let content = serde_json::to_string_pretty(index)?;
        self.write_atomic(&self.index_path(), content).await
    }

    /// Write content to `path` via a temp file and rename.
    async fn write_atomic(&self, path: &PathBuf, content: String) -> AppResult<()> {
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content).await.map_err(|e| StoreError::Io {
            message: format!("Failed to write {}: {}", temp_path.display(), e),
        })?;
        tokio::fs::rename(&temp_path, path).await.map_err(|e| StoreError::Io {
            message: format!("Failed to replace {}: {}", path.display(), e),
        })?;
        Ok(())
    }

    /// Load a single account by ID.
    pub async fn load_account(&self, account_id: &str) -> AppResult<Account> {
        let path = self.account_path(account_id);
        if !path.exists() {
            return Err(StoreError::NotFound { id: account_id.to_string() }.into());
        }

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| StoreError::Io {
            message: format!("Failed to read account data: {}", e),
        })?;

        let account = serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(account)
    }

    /// Save a single account.
    pub async fn save_account(&self, account: &Account) -> AppResult<()> {
        let content = serde_json::to_string_pretty(account)?;
        self.write_atomic(&self.account_path(&account.id), content).await
    }

    /// Add or update an account (upsert, keyed by email).
    pub async fn upsert_account(&self, account: Account) -> AppResult<Account> {
        let _lock = self.index_lock.lock().await;
        let mut index = self.load_index().await?;

        let mut account = account;
        account.update_last_used();
        if let Some(summary) = index.accounts.iter_mut().find(|s| s.email == account.email) {
            // Keep the stable ID; refresh the rest
            account.id = summary.id.clone();
            *summary = AccountSummary::from(&account);
        } else {
            index.accounts.push(AccountSummary::from(&account));
        }

        self.save_account(&account).await?;
        self.save_index(&index).await?;
        Ok(account)
    }

    /// Remove an account and its snapshot.
    pub async fn remove_account(&self, account_id: &str) -> AppResult<()> {
        let _lock = self.index_lock.lock().await;
        let mut index = self.load_index().await?;

        let original_len = index.accounts.len();
        index.accounts.retain(|s| s.id != account_id);
        if index.accounts.len() == original_len {
            return Err(StoreError::NotFound { id: account_id.to_string() }.into());
        }
        self.save_index(&index).await?;

        for path in [self.account_path(account_id), self.usage_path(account_id)] {
            if path.exists() {
                tokio::fs::remove_file(&path).await.map_err(|e| StoreError::Io {
                    message: format!("Failed to delete {}: {}", path.display(), e),
                })?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for FileAccountStore {
    async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        let mut index = self.load_index().await?;
        let mut accounts = Vec::new();
        let mut invalid_ids = Vec::new();

        for summary in &index.accounts {
            match self.load_account(&summary.id).await {
                Ok(account) => accounts.push(account),
                Err(AppError::Store(e)) if e.is_repairable() => {
                    tracing::error!("[Store] Failed to load account {}: {}", summary.id, e);
                    invalid_ids.push(summary.id.clone());
                },
                Err(e) => return Err(e),
            }
        }

        // Auto-repair index by removing missing or corrupted accounts
        if !invalid_ids.is_empty() {
            tracing::warn!(
                "[Store] Found {} invalid account indices, cleaning up...",
                invalid_ids.len()
            );

            let _lock = self.index_lock.lock().await;
            index.accounts.retain(|s| !invalid_ids.contains(&s.id));
            if let Err(e) = self.save_index(&index).await {
                tracing::error!("[Store] Failed to save cleaned index: {}", e);
            } else {
                tracing::info!("[Store] Index cleanup complete");
            }
        }

        Ok(accounts)
    }

    async fn get_snapshot(&self, account_id: &str) -> AppResult<Option<UsageSnapshot>> {
        let path = self.usage_path(account_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| StoreError::Io {
            message: format!("Failed to read snapshot: {}", e),
        })?;

        match serde_json::from_str(&content) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                // Self-healing: a corrupt snapshot is dropped and re-fetched
                // on the next pass rather than poisoning planning.
                tracing::warn!("[Store] Corrupt snapshot for {}: {}", account_id, e);
                Ok(None)
            },
        }
    }

    async fn put_snapshot(&self, account_id: &str, snapshot: &UsageSnapshot) -> AppResult<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        self.write_atomic(&self.usage_path(account_id), content).await
    }
}
