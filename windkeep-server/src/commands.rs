//! One-shot CLI commands.

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use windkeep_core::modules::{AccountStore, FileAccountStore};
use windkeep_core::PollerService;
use windkeep_types::{Account, TokenData, UsageWindow, SCOPE_INFERENCE, SCOPE_PROFILE};

pub async fn run_pass_once(service: &PollerService) -> Result<()> {
    println!("{}", "Running update pass...".cyan());

    let counts = service.run_pass().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    println!(
        "{} {} refreshed, {} initialized, {} skipped, {} failed ({} total)",
        "✓".green(),
        counts.success.to_string().green(),
        counts.initialized,
        counts.skipped,
        if counts.failed > 0 {
            counts.failed.to_string().red().to_string()
        } else {
            counts.failed.to_string()
        },
        counts.total
    );
    Ok(())
}

pub async fn show_status(service: &PollerService, store: &Arc<FileAccountStore>) -> Result<()> {
    let status = service.status();
    println!(
        "Scheduler: {} (base {}min, settle {}min, reset threshold {}min)",
        if status.is_running { "running".green() } else { "stopped".yellow() },
        status.base_interval_minutes,
        status.after_reset_minutes,
        status.reset_threshold_minutes
    );

    let accounts = store.list_accounts().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    if accounts.is_empty() {
        println!("{}", "No accounts found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Email", "Name", "5h", "7d", "Status"]);

    for acc in &accounts {
        let snapshot = store
            .get_snapshot(&acc.id)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?
            .unwrap_or_default();

        let status = if !acc.is_active() {
            Cell::new("Disabled").fg(Color::Red)
        } else if !acc.is_trackable() {
            Cell::new("Untracked").fg(Color::Yellow)
        } else {
            Cell::new("Active").fg(Color::Green)
        };

        table.add_row(vec![
            Cell::new(&acc.email),
            Cell::new(acc.name.as_deref().unwrap_or("-")),
            Cell::new(describe_window(snapshot.five_hour.as_ref())),
            Cell::new(describe_window(snapshot.seven_day.as_ref())),
            status,
        ]);
    }

    println!("{table}");
    println!("\n{} accounts total", accounts.len());
    Ok(())
}

fn describe_window(window: Option<&UsageWindow>) -> String {
    match window {
        None => "-".to_string(),
        Some(w) if w.is_dormant() => "dormant".to_string(),
        Some(w) => match w.minutes_until_reset(chrono::Utc::now()) {
            Some(minutes) if minutes >= 0 => {
                format!("{}% left, resets in {}m", w.remaining_percent(), minutes)
            },
            _ => format!("{}% left, reset due", w.remaining_percent()),
        },
    }
}

pub async fn list_accounts(store: &Arc<FileAccountStore>, json: bool) -> Result<()> {
    let accounts = store.list_accounts().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("{}", "No accounts found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Email", "Name", "Scopes", "Status"]);

    for acc in &accounts {
        let status = if acc.is_active() {
            Cell::new("Active").fg(Color::Green)
        } else {
            Cell::new("Disabled").fg(Color::Red)
        };
        let mut scopes: Vec<&str> = acc.scopes.iter().map(String::as_str).collect();
        scopes.sort_unstable();

        table.add_row(vec![
            Cell::new(&acc.id),
            Cell::new(&acc.email),
            Cell::new(acc.name.as_deref().unwrap_or("-")),
            Cell::new(scopes.join(" ")),
            status,
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Credential import format for `account add`.
#[derive(Debug, Deserialize)]
struct CredentialFile {
    email: String,
    #[serde(default)]
    name: Option<String>,
    access_token: String,
    refresh_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default)]
    scopes: Vec<String>,
}

fn default_expires_in() -> i64 {
    3600
}

pub async fn add_account(store: &Arc<FileAccountStore>, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path).context("Failed to read credential file")?;
    let credential: CredentialFile =
        serde_json::from_str(&content).context("Failed to parse credential JSON")?;

    let token = TokenData::new(
        credential.access_token,
        credential.refresh_token,
        credential.expires_in,
        Some(credential.email.clone()),
    );

    let mut account =
        Account::new(uuid::Uuid::new_v4().to_string(), credential.email, token);
    account.name = credential.name;
    account.scopes = if credential.scopes.is_empty() {
        [SCOPE_PROFILE, SCOPE_INFERENCE].iter().map(|s| (*s).to_string()).collect()
    } else {
        credential.scopes.into_iter().collect()
    };

    let account =
        store.upsert_account(account).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    println!("{} Account added: {}", "✓".green(), account.email.green());
    Ok(())
}

pub async fn remove_account(store: &Arc<FileAccountStore>, identifier: &str) -> Result<()> {
    let accounts = store.list_accounts().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let account = accounts
        .iter()
        .find(|a| a.email == identifier || a.id == identifier)
        .context("Account not found")?;

    store.remove_account(&account.id).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    println!("{} Account removed: {}", "✓".green(), account.email.green());
    Ok(())
}
