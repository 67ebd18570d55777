use stride_core::LocalId;

use crate::cli::CollectionArg;
use crate::commands::common::open_service;
use crate::config::Context;
use crate::error::CliError;

pub async fn run_remove(
    context: &Context,
    collection: CollectionArg,
    id: &LocalId,
) -> Result<(), CliError> {
    let service = open_service(context).await?;
    match collection {
        CollectionArg::Progress => service.progress().remove_by_id(id).await?,
        CollectionArg::Cravings => service.cravings().remove_by_id(id).await?,
        CollectionArg::Tasks => service.tasks().remove_by_id(id).await?,
        CollectionArg::Consumption => service.consumption().remove_by_id(id).await?,
    }

    println!("Removed {id}");
    Ok(())
}
