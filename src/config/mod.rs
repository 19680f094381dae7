pub mod toml_config;

pub use toml_config::{AppConfig, SmtpConfig};

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "closures")]
#[command(about = "Report and alert on service closures")]
pub struct CliConfig {
    #[arg(long, short, default_value = "closures.toml")]
    pub config: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Closures for one service on a day
    Status {
        #[arg(long)]
        code: String,

        /// Day to report (YYYY-MM-DD); defaults to the display day
        #[arg(long)]
        date: Option<chrono::NaiveDate>,

        #[arg(long)]
        emergency_only: bool,

        #[arg(long)]
        json: bool,
    },
    /// Every service in name order
    Services {
        #[arg(long)]
        json: bool,
    },
    /// Alert moderators about unconfirmed emergency closures
    Overdue {
        #[arg(long = "moderator", required = true)]
        moderators: Vec<String>,

        /// Print the alert instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
    /// Email subscribers about one closure
    Notify {
        #[arg(long)]
        code: String,

        #[arg(long = "closure")]
        closure_id: i32,

        /// JSON array of subscriptions
        #[arg(long)]
        subscriptions: PathBuf,

        /// Print the emails instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Mark an emergency closure as re-confirmed and save the document
    Confirm {
        #[arg(long)]
        code: String,

        #[arg(long = "closure")]
        closure_id: i32,
    },
}
