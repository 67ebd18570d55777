use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap_complete::Shell;
use pretty_assertions::assert_eq;
use stride_core::sync::SkipReason;
use stride_core::{
    Collection, CravingLog, DateRange, EngineSettings, LocalId, Operation, SyncOutcome,
    SyncReport, SyncStatus,
};

use crate::cli::{Cli, CollectionArg, Commands, TaskCommands};
use crate::commands::common::{format_record_line, open_service, sync_state};
use crate::commands::completions::render_completions;
use crate::commands::config::{apply_config_update, ConfigUpdate};
use crate::commands::maintenance::run_reset;
use crate::commands::records::{normalize_title, run_craving, run_task_add, run_task_done};
use crate::commands::sync::{format_status_lines, format_sync_outcome, run_sync};
use crate::config::{
    CliConfig, Context, ENV_DB_PATH, ENV_OWNER, ENV_REMOTE_TOKEN, ENV_REMOTE_URL,
};
use crate::error::CliError;
use crate::probe::health_url;

fn local_context(dir: &tempfile::TempDir) -> Context {
    Context {
        db_path: dir.path().join("stride.db"),
        owner_id: "tester".to_string(),
        remote_url: None,
        remote_token: None,
        force_offline: true,
        settings: EngineSettings::default(),
    }
}

#[test]
fn config_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = CliConfig {
        version: 1,
        remote_base_url: Some(" https://api.example.com/ ".to_string()),
        owner_id: Some("  user-7 ".to_string()),
        sync_interval_secs: Some(120),
        retention_days: Some(14),
        failure_threshold: None,
    };
    config.save_to_path(&path).unwrap();

    let loaded = CliConfig::load_from_path(&path).unwrap();
    assert_eq!(
        loaded,
        CliConfig {
            version: 1,
            remote_base_url: Some("https://api.example.com".to_string()),
            owner_id: Some("user-7".to_string()),
            sync_interval_secs: Some(120),
            retention_days: Some(14),
            failure_threshold: None,
        }
    );
}

#[test]
fn missing_config_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = CliConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
    assert_eq!(loaded, CliConfig::default());
}

#[test]
fn malformed_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(CliConfig::load_from_path(&path)
        .unwrap_err()
        .contains("Failed to parse config"));
}

#[test]
fn engine_settings_follow_config_values() {
    let config = CliConfig {
        sync_interval_secs: Some(0),
        retention_days: Some(3),
        failure_threshold: Some(9),
        ..CliConfig::default()
    };
    let settings = config.engine_settings();
    assert_eq!(settings.sync_interval, None);
    assert_eq!(settings.retention_days, 3);
    assert_eq!(settings.failure_threshold, 9);

    let periodic = CliConfig {
        sync_interval_secs: Some(15),
        ..CliConfig::default()
    }
    .engine_settings();
    assert_eq!(periodic.sync_interval, Some(Duration::from_secs(15)));
    assert_eq!(periodic.failure_threshold, 5);
}

#[test]
fn context_prefers_flags_then_env_then_file() {
    let config = CliConfig {
        remote_base_url: Some("https://file.example.com".to_string()),
        owner_id: Some("file-owner".to_string()),
        ..CliConfig::default()
    };
    let env = |key: &str| match key {
        ENV_DB_PATH => Some("/tmp/env.db".to_string()),
        ENV_REMOTE_URL => Some("https://env.example.com/".to_string()),
        ENV_REMOTE_TOKEN => Some("secret".to_string()),
        _ => None,
    };

    let context = Context::resolve_with_env(
        Some(PathBuf::from("/tmp/flag.db")),
        false,
        &config,
        env,
    )
    .unwrap();
    assert_eq!(context.db_path, PathBuf::from("/tmp/flag.db"));
    assert_eq!(context.remote_url.as_deref(), Some("https://env.example.com"));
    assert_eq!(context.remote_token.as_deref(), Some("secret"));
    assert_eq!(context.owner_id, "file-owner");

    let from_env = Context::resolve_with_env(None, true, &config, env).unwrap();
    assert_eq!(from_env.db_path, PathBuf::from("/tmp/env.db"));
    assert!(from_env.force_offline);
}

#[test]
fn context_defaults_owner_and_rejects_bad_remote() {
    let config = CliConfig::default();
    let context = Context::resolve_with_env(None, false, &config, |_| None).unwrap();
    assert_eq!(context.owner_id, "local");
    assert_eq!(context.remote_url, None);

    let env = |key: &str| match key {
        ENV_REMOTE_URL => Some("api.example.com".to_string()),
        ENV_OWNER => Some("env-owner".to_string()),
        _ => None,
    };
    assert!(Context::resolve_with_env(None, false, &config, env).is_err());
}

#[test]
fn config_update_validates_and_merges() {
    let mut config = CliConfig {
        owner_id: Some("kept".to_string()),
        retention_days: Some(30),
        ..CliConfig::default()
    };

    apply_config_update(
        &mut config,
        ConfigUpdate {
            remote_url: Some("https://api.example.com/v1/".to_string()),
            sync_interval: Some(45),
            ..ConfigUpdate::default()
        },
    )
    .unwrap();
    assert_eq!(
        config.remote_base_url.as_deref(),
        Some("https://api.example.com/v1")
    );
    assert_eq!(config.owner_id.as_deref(), Some("kept"));
    assert_eq!(config.sync_interval_secs, Some(45));
    assert_eq!(config.retention_days, Some(30));

    let bad_url = apply_config_update(
        &mut config,
        ConfigUpdate {
            remote_url: Some("ftp://example.com".to_string()),
            ..ConfigUpdate::default()
        },
    );
    assert!(matches!(bad_url, Err(CliError::Config(_))));

    let zero_threshold = apply_config_update(
        &mut config,
        ConfigUpdate {
            failure_threshold: Some(0),
            ..ConfigUpdate::default()
        },
    );
    assert!(matches!(zero_threshold, Err(CliError::Config(_))));
}

#[test]
fn health_url_joins_base() {
    assert_eq!(
        health_url("https://api.example.com/v1/"),
        "https://api.example.com/v1/health"
    );
}

#[test]
fn sync_outcome_formatting() {
    let report = SyncReport {
        attempted: 3,
        succeeded: 2,
        failed: 1,
        deferred: 1,
        remaining: 2,
    };
    assert_eq!(
        format_sync_outcome(&SyncOutcome::Completed(report)),
        "Sync completed: 2 sent, 1 failed, 1 deferred, 2 pending"
    );
    assert!(format_sync_outcome(&SyncOutcome::Incomplete(report)).starts_with("Sync interrupted"));
    assert_eq!(
        format_sync_outcome(&SyncOutcome::Skipped {
            reason: SkipReason::Offline
        }),
        "Sync skipped: offline"
    );
}

#[test]
fn status_lines_mention_threshold_and_remote() {
    let status = SyncStatus {
        total: 4,
        pending: 2,
        failed: 1,
    };
    let lines = format_status_lines(&status, 5, None);
    assert_eq!(lines[0], "Pending: 2");
    assert_eq!(lines[1], "Failed:  1 (>= 5 attempts)");
    assert!(lines[3].contains("local only"));
}

#[test]
fn record_lines_show_sync_state() {
    let mut craving = CravingLog::new("tester", 6).with_trigger("coffee");
    craving.meta.local_id = Some(LocalId::new());
    craving.meta.pending_operation = Some(Operation::Update);
    assert_eq!(sync_state(&craving), "pending update");

    let line = format_record_line(&craving);
    assert!(line.contains("craving 6/10, trigger: coffee"));
    assert!(line.ends_with("[pending update]"));

    craving.meta.synced = true;
    craving.meta.pending_operation = None;
    assert_eq!(sync_state(&craving), "synced");
}

#[test]
fn normalize_title_joins_words() {
    let parts = vec!["  buy".to_string(), "water ".to_string()];
    assert_eq!(normalize_title(&parts), Some("buy water".to_string()));
    assert_eq!(normalize_title(&[]), None);
}

#[test]
fn cli_parses_record_commands() {
    let cli = Cli::try_parse_from([
        "stride",
        "craving",
        "--intensity",
        "7",
        "--trigger",
        "stress",
        "--offline",
    ])
    .unwrap();
    assert!(cli.offline);
    assert!(matches!(
        cli.command,
        Commands::Craving {
            intensity: 7,
            resisted: false,
            ..
        }
    ));

    let id = LocalId::new();
    let id_text = id.to_string();
    let cli = Cli::try_parse_from(["stride", "task", "done", id_text.as_str()]).unwrap();
    assert!(matches!(cli.command, Commands::Task {
        command: TaskCommands::Done { id: parsed }
    } if parsed == id));
}

#[test]
fn cli_parses_list_filters() {
    let cli = Cli::try_parse_from([
        "stride",
        "list",
        "cravings",
        "--from",
        "2024-05-01",
        "--json",
    ])
    .unwrap();
    let Commands::List {
        collection,
        from,
        to,
        json,
    } = cli.command
    else {
        panic!("expected list command");
    };
    assert_eq!(Collection::from(collection), Collection::Cravings);
    assert_eq!(from.map(|date| date.to_string()).as_deref(), Some("2024-05-01"));
    assert_eq!(to, None);
    assert!(json);

    assert!(Cli::try_parse_from(["stride", "list", "sync_queue"]).is_err());
    assert!(Cli::try_parse_from(["stride", "remove", "tasks", "not-a-uuid"]).is_err());
    assert_eq!(
        Collection::from(CollectionArg::Consumption).name(),
        "consumption"
    );
}

#[test]
fn completions_render_for_stride() {
    let bash = String::from_utf8(render_completions(Shell::Bash)).unwrap();
    assert!(bash.contains("stride"));

    let fish = String::from_utf8(render_completions(Shell::Fish)).unwrap();
    assert!(fish.contains("complete -c stride"));
}

#[test]
fn completions_command_accepts_clap_shells() {
    let cli = Cli::try_parse_from(["stride", "completions", "powershell"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Completions {
            shell: Shell::PowerShell,
            output: None
        }
    ));
}

#[tokio::test]
async fn craving_command_writes_locally_and_queues() {
    let dir = tempfile::tempdir().unwrap();
    let context = local_context(&dir);

    run_craving(&context, 7, Some("stress".to_string()), true, None)
        .await
        .unwrap();

    let service = open_service(&context).await.unwrap();
    let cravings = service
        .cravings()
        .list("tester", DateRange::default())
        .await
        .unwrap();
    assert_eq!(cravings.len(), 1);
    assert_eq!(cravings[0].intensity, 7);
    assert!(cravings[0].resisted);
    assert!(!cravings[0].meta.synced);
    assert_eq!(service.get_sync_status().await.unwrap().pending, 1);
}

#[tokio::test]
async fn task_commands_validate_input() {
    let dir = tempfile::tempdir().unwrap();
    let context = local_context(&dir);

    let empty = run_task_add(&context, &["  ".to_string()], None).await;
    assert!(matches!(empty, Err(CliError::EmptyTitle)));

    let missing = run_task_done(&context, &LocalId::new()).await;
    assert!(matches!(missing, Err(CliError::RecordNotFound(_))));
}

#[tokio::test]
async fn sync_requires_remote_and_reset_requires_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let context = local_context(&dir);

    assert!(matches!(
        run_sync(&context, false).await,
        Err(CliError::SyncNotConfigured)
    ));
    assert!(matches!(
        run_reset(&context, false).await,
        Err(CliError::ResetNotConfirmed)
    ));

    run_craving(&context, 3, None, false, None).await.unwrap();
    run_reset(&context, true).await.unwrap();

    let service = open_service(&context).await.unwrap();
    assert_eq!(service.get_sync_status().await.unwrap(), SyncStatus::default());
}
