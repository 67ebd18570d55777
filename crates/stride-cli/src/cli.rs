use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use stride_core::{Collection, LocalId};

#[derive(Parser)]
#[command(name = "stride")]
#[command(about = "Track cravings, progress and tasks offline; sync when online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Treat the remote service as unreachable
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log a craving
    Craving {
        /// Strength from 1 to 10
        #[arg(short, long)]
        intensity: u8,
        /// What set it off
        #[arg(short, long)]
        trigger: Option<String>,
        /// The craving was resisted
        #[arg(long)]
        resisted: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record a daily progress check-in
    Progress {
        /// Mood from 1 to 10
        #[arg(short, long)]
        mood: u8,
        /// Day described (defaults to today, YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Log an amount consumed
    Consumption {
        #[arg(short, long)]
        quantity: f64,
        /// Unit of the quantity (e.g. cups, cigarettes)
        #[arg(short, long)]
        unit: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List records of a collection, newest first
    List {
        #[arg(value_enum)]
        collection: CollectionArg,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a record
    #[command(alias = "rm")]
    Remove {
        #[arg(value_enum)]
        collection: CollectionArg,
        /// Local record id
        id: LocalId,
    },
    /// Push pending changes to the remote service
    Sync {
        /// Keep running and sync in the background until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Show sync queue status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete acknowledged sync entries older than the retention window
    Cleanup {
        /// Retention window in days (defaults to the configured value)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Delete all local data, including unsynced changes
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task
    Add {
        title: Vec<String>,
        /// Due date (defaults to today, YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Mark a task as completed
    Done {
        /// Local task id
        id: LocalId,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Remote service base URL
        #[arg(long, value_name = "URL")]
        remote_url: Option<String>,
        /// Owner id attached to new records
        #[arg(long, value_name = "ID")]
        owner: Option<String>,
        /// Background sync interval in seconds (0 disables periodic passes)
        #[arg(long, value_name = "SECS")]
        sync_interval: Option<u64>,
        /// Days to keep acknowledged sync entries
        #[arg(long, value_name = "DAYS")]
        retention_days: Option<u32>,
        /// Attempts after which an entry is reported as failed
        #[arg(long, value_name = "N")]
        failure_threshold: Option<u32>,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CollectionArg {
    Progress,
    Cravings,
    Tasks,
    Consumption,
}

impl From<CollectionArg> for Collection {
    fn from(value: CollectionArg) -> Self {
        match value {
            CollectionArg::Progress => Self::Progress,
            CollectionArg::Cravings => Self::Cravings,
            CollectionArg::Tasks => Self::Tasks,
            CollectionArg::Consumption => Self::Consumption,
        }
    }
}

