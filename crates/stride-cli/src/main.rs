//! Stride CLI - offline-first habit tracking from the terminal
//!
//! Every write lands in the local store first; `stride sync` pushes the
//! queued changes once the remote is reachable.

mod cli;
mod commands;
mod config;
mod error;
mod probe;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, TaskCommands};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::list::run_list;
use crate::commands::maintenance::{run_cleanup, run_reset};
use crate::commands::records::{
    run_consumption, run_craving, run_progress, run_task_add, run_task_done,
};
use crate::commands::remove::run_remove;
use crate::commands::sync::{run_status, run_sync};
use crate::config::{CliConfig, Context};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stride=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        command,
        db_path,
        offline,
    } = Cli::parse();
    let context = || -> Result<Context, CliError> {
        let config = CliConfig::load().map_err(CliError::Config)?;
        Context::resolve(db_path.clone(), offline, &config).map_err(CliError::Config)
    };

    match command {
        Commands::Craving {
            intensity,
            trigger,
            resisted,
            notes,
        } => run_craving(&context()?, intensity, trigger, resisted, notes).await,
        Commands::Progress { mood, date, notes } => {
            run_progress(&context()?, mood, date, notes).await
        }
        Commands::Task { command } => match command {
            TaskCommands::Add { title, due } => run_task_add(&context()?, &title, due).await,
            TaskCommands::Done { id } => run_task_done(&context()?, &id).await,
        },
        Commands::Consumption {
            quantity,
            unit,
            notes,
        } => run_consumption(&context()?, quantity, unit, notes).await,
        Commands::List {
            collection,
            from,
            to,
            json,
        } => run_list(&context()?, collection, from, to, json).await,
        Commands::Remove { collection, id } => run_remove(&context()?, collection, &id).await,
        Commands::Sync { watch } => run_sync(&context()?, watch).await,
        Commands::Status { json } => run_status(&context()?, json).await,
        Commands::Cleanup { days } => run_cleanup(&context()?, days).await,
        Commands::Reset { yes } => run_reset(&context()?, yes).await,
        Commands::Config { command } => run_config(command),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
    }
}
