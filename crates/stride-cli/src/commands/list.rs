use chrono::NaiveDate;
use stride_core::{DateRange, Repository};

use crate::cli::CollectionArg;
use crate::commands::common::{format_record_lines, open_service, RecordSummary};
use crate::config::Context;
use crate::error::CliError;

pub async fn run_list(
    context: &Context,
    collection: CollectionArg,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    as_json: bool,
) -> Result<(), CliError> {
    let service = open_service(context).await?;
    let range = DateRange::between_dates(from, to);
    let owner_id = context.owner_id.as_str();

    match collection {
        CollectionArg::Progress => print_records(&service.progress(), owner_id, range, as_json).await,
        CollectionArg::Cravings => print_records(&service.cravings(), owner_id, range, as_json).await,
        CollectionArg::Tasks => print_records(&service.tasks(), owner_id, range, as_json).await,
        CollectionArg::Consumption => {
            print_records(&service.consumption(), owner_id, range, as_json).await
        }
    }
}

async fn print_records<R: RecordSummary>(
    repository: &Repository<R>,
    owner_id: &str,
    range: DateRange,
    as_json: bool,
) -> Result<(), CliError> {
    let records = repository.list(owner_id, range).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No {} recorded.", repository.collection());
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}
