use chrono::{NaiveDate, Utc};
use stride_core::util::normalize_text_option;
use stride_core::{ConsumptionLog, CravingLog, LocalId, ProgressEntry, SyncRecord, Task};

use crate::commands::common::open_service;
use crate::config::Context;
use crate::error::CliError;

pub async fn run_craving(
    context: &Context,
    intensity: u8,
    trigger: Option<String>,
    resisted: bool,
    notes: Option<String>,
) -> Result<(), CliError> {
    let mut craving = CravingLog::new(&context.owner_id, intensity);
    if let Some(trigger) = normalize_text_option(trigger) {
        craving = craving.with_trigger(trigger);
    }
    craving.resisted = resisted;
    craving.notes = normalize_text_option(notes).unwrap_or_default();

    let service = open_service(context).await?;
    let saved = service.cravings().save(craving).await?;
    print_saved(&saved);
    Ok(())
}

pub async fn run_progress(
    context: &Context,
    mood: u8,
    date: Option<NaiveDate>,
    notes: Option<String>,
) -> Result<(), CliError> {
    let mut entry = ProgressEntry::new(&context.owner_id, date.unwrap_or_else(today), mood);
    if let Some(notes) = normalize_text_option(notes) {
        entry = entry.with_notes(notes);
    }

    let service = open_service(context).await?;
    let saved = service.progress().save(entry).await?;
    print_saved(&saved);
    Ok(())
}

pub async fn run_task_add(
    context: &Context,
    title: &[String],
    due: Option<NaiveDate>,
) -> Result<(), CliError> {
    let title = normalize_title(title).ok_or(CliError::EmptyTitle)?;
    let task = Task::new(&context.owner_id, title, due.unwrap_or_else(today));

    let service = open_service(context).await?;
    let saved = service.tasks().save(task).await?;
    print_saved(&saved);
    Ok(())
}

pub async fn run_task_done(context: &Context, id: &LocalId) -> Result<(), CliError> {
    let service = open_service(context).await?;
    let tasks = service.tasks();
    let mut task = tasks
        .get(id)
        .await?
        .ok_or_else(|| CliError::RecordNotFound(format!("Task {id}")))?;

    if task.completed {
        println!("Task {id} is already done");
        return Ok(());
    }
    task.completed = true;
    let saved = tasks.save(task).await?;
    print_saved(&saved);
    Ok(())
}

pub async fn run_consumption(
    context: &Context,
    quantity: f64,
    unit: String,
    notes: Option<String>,
) -> Result<(), CliError> {
    let mut log = ConsumptionLog::new(&context.owner_id, quantity, unit.trim());
    log.notes = normalize_text_option(notes).unwrap_or_default();

    let service = open_service(context).await?;
    let saved = service.consumption().save(log).await?;
    print_saved(&saved);
    Ok(())
}

pub fn normalize_title(parts: &[String]) -> Option<String> {
    normalize_text_option(Some(parts.join(" ")))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn print_saved<R: SyncRecord>(record: &R) {
    if let Some(local_id) = record.meta().local_id {
        println!("{local_id}");
    }
}
