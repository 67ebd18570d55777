use crate::commands::common::open_service;
use crate::config::Context;
use crate::error::CliError;

pub async fn run_cleanup(context: &Context, days: Option<u32>) -> Result<(), CliError> {
    let days = days.unwrap_or(context.settings.retention_days);
    let service = open_service(context).await?;
    let removed = service.cleanup_old_sync_items(days).await?;
    println!("Removed {removed} synced entries older than {days} days");
    Ok(())
}

pub async fn run_reset(context: &Context, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ResetNotConfirmed);
    }

    let service = open_service(context).await?;
    let pending = service.get_sync_status().await?.pending;
    service.clear_all_data().await?;

    if pending > 0 {
        println!("All local data deleted ({pending} unsynced changes discarded)");
    } else {
        println!("All local data deleted");
    }
    Ok(())
}
