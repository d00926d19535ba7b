use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "windkeep",
    about = "Windkeep - adaptive usage-window poller",
    version = env!("CARGO_PKG_VERSION"),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "WINDKEEP_DATA_DIR", help = "Override the data directory")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the poller daemon (default if no command specified)")]
    Run,

    #[command(about = "Run a single update pass and print the counters")]
    Pass,

    #[command(about = "Show scheduler tunables and per-account window state")]
    Status,

    #[command(subcommand, about = "Manage tracked accounts")]
    Account(AccountCommands),
}

#[derive(Subcommand)]
pub enum AccountCommands {
    #[command(about = "List all accounts with window status")]
    List {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Add or update an account from a credential JSON file")]
    Add {
        #[arg(help = "Path to credential JSON file")]
        file: PathBuf,
    },

    #[command(about = "Remove an account")]
    Remove {
        #[arg(help = "Email or account ID to remove")]
        identifier: String,
    },
}
