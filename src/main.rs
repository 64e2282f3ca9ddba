//! drive_tasks CLI - Run Google Drive tasks and print their result as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drive_tasks::tasks::{
    self, DeleteInput, DownloadInput, DownloadOptions, ListInput, UploadInput, UploadOptions,
};

/// Run Google Drive list, upload, download and delete tasks.
#[derive(Parser)]
#[command(name = "drive_tasks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Service account key: inline JSON or path to the JSON file.
    #[arg(long, env = "GOOGLE_SERVICE_ACCOUNT_KEY", hide_env_values = true)]
    service_account_key: Option<String>,

    /// Log level (logs go to stderr).
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List files matching a query.
    List {
        /// Drive query, e.g. "name contains 'report'".
        #[arg(long, short = 'q')]
        query: Option<String>,

        #[arg(long)]
        include_shared_drives: bool,
    },

    /// Permanently delete files matching a query.
    Delete {
        /// Drive query selecting the files to delete.
        #[arg(long, short = 'q')]
        query: Option<String>,

        #[arg(long)]
        include_shared_drives: bool,
    },

    /// Download files matching a query into a local directory.
    Download {
        /// Drive query selecting the files to download.
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// Local destination directory.
        #[arg(long, short = 't')]
        to: PathBuf,

        /// Create the destination directory if missing.
        #[arg(long)]
        create_destination: bool,

        /// Record failed downloads and keep going instead of stopping.
        #[arg(long)]
        continue_on_failure: bool,

        #[arg(long)]
        include_shared_drives: bool,
    },

    /// Upload files from a local directory.
    Upload {
        /// Local source directory (top level only).
        #[arg(long, short = 'f')]
        from: PathBuf,

        /// Filemask such as *.pdf or ?_file.*.
        #[arg(long, short = 'm', default_value = "*")]
        mask: String,

        /// Destination folder ID.
        #[arg(long, short = 't')]
        target_folder: Option<String>,

        /// Fail when the mask matches no file.
        #[arg(long)]
        fail_if_no_match: bool,

        /// Record failed uploads and keep going instead of stopping.
        #[arg(long)]
        continue_on_failure: bool,

        #[arg(long)]
        include_shared_drives: bool,
    },

    /// Run a task from a JSON record of the form {"Input": {..}, "Options": {..}}.
    Invoke {
        #[arg(long, value_enum)]
        task: TaskKind,

        /// Path to the JSON record.
        #[arg(long, short = 'i')]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TaskKind {
    List,
    Delete,
    Download,
    Upload,
}

/// Task record as passed by a workflow engine.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Invocation<I, O> {
    input: I,
    #[serde(default)]
    options: O,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("drive_tasks={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let key = cli.service_account_key.unwrap_or_default();

    let succeeded = match cli.command {
        Commands::List {
            query,
            include_shared_drives,
        } => {
            let input = ListInput {
                service_account_key_json: key,
                file_query: query,
                include_shared_drives,
            };
            let result = tasks::list(&input, &cancel)
                .await
                .context("List task failed")?;
            emit(&result, result.success)?
        }

        Commands::Delete {
            query,
            include_shared_drives,
        } => {
            let input = DeleteInput {
                file_query: query,
                service_account_key_json: key,
                include_shared_drives,
            };
            let result = tasks::delete(&input, &cancel)
                .await
                .context("Delete task failed")?;
            emit(&result, result.success)?
        }

        Commands::Download {
            query,
            to,
            create_destination,
            continue_on_failure,
            include_shared_drives,
        } => {
            let input = DownloadInput {
                service_account_key_json: key,
                file_query: query,
                destination_directory: to,
                include_shared_drives,
            };
            let options = DownloadOptions {
                throw_error_on_failure: !continue_on_failure,
                create_destination_folder: create_destination,
            };
            run_download(input, options, &cancel).await?
        }

        Commands::Upload {
            from,
            mask,
            target_folder,
            fail_if_no_match,
            continue_on_failure,
            include_shared_drives,
        } => {
            let input = UploadInput {
                source_directory: from,
                file_mask: Some(mask),
                target_folder_id: target_folder,
                service_account_key_json: key,
                include_shared_drives,
            };
            let options = UploadOptions {
                throw_error_on_failure: !continue_on_failure,
                throw_error_if_no_match: fail_if_no_match,
            };
            run_upload(input, options, &cancel).await?
        }

        Commands::Invoke { task, input } => invoke(task, &input, key, &cancel).await?,
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

async fn run_download(
    input: DownloadInput,
    options: DownloadOptions,
    cancel: &CancellationToken,
) -> Result<bool> {
    let result = tasks::download(&input, &options, cancel)
        .await
        .with_context(|| {
            format!(
                "Download task failed (destination: {:?})",
                input.destination_directory
            )
        })?;
    emit(&result, result.success)
}

async fn run_upload(
    input: UploadInput,
    options: UploadOptions,
    cancel: &CancellationToken,
) -> Result<bool> {
    let result = tasks::upload(&input, &options, cancel)
        .await
        .with_context(|| format!("Upload task failed (source: {:?})", input.source_directory))?;
    emit(&result, result.success)
}

async fn invoke(
    task: TaskKind,
    path: &Path,
    key: String,
    cancel: &CancellationToken,
) -> Result<bool> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task record from {:?}", path))?;
    info!(path = %path.display(), "Loaded task record");

    match task {
        TaskKind::List => {
            let mut record: Invocation<ListInput, Ignored> = parse_record(&content)?;
            fill_key(&mut record.input.service_account_key_json, key);
            let result = tasks::list(&record.input, cancel)
                .await
                .context("List task failed")?;
            emit(&result, result.success)
        }
        TaskKind::Delete => {
            let mut record: Invocation<DeleteInput, Ignored> = parse_record(&content)?;
            fill_key(&mut record.input.service_account_key_json, key);
            let result = tasks::delete(&record.input, cancel)
                .await
                .context("Delete task failed")?;
            emit(&result, result.success)
        }
        TaskKind::Download => {
            let mut record: Invocation<DownloadInput, DownloadOptions> = parse_record(&content)?;
            fill_key(&mut record.input.service_account_key_json, key);
            run_download(record.input, record.options, cancel).await
        }
        TaskKind::Upload => {
            let mut record: Invocation<UploadInput, UploadOptions> = parse_record(&content)?;
            fill_key(&mut record.input.service_account_key_json, key);
            run_upload(record.input, record.options, cancel).await
        }
    }
}

/// Placeholder for tasks that take no options.
#[derive(Default, Deserialize)]
struct Ignored {}

fn parse_record<T: DeserializeOwned>(content: &str) -> Result<T> {
    serde_json::from_str(content).context("Invalid task record JSON")
}

/// Use the CLI/env key when the record does not carry one.
fn fill_key(record_key: &mut String, cli_key: String) {
    if record_key.trim().is_empty() {
        *record_key = cli_key;
    }
}

fn emit<T: Serialize>(result: &T, success: bool) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_key_wins_over_cli_key() {
        let mut key = "{\"inline\": true}".to_string();
        fill_key(&mut key, "/path/from/env.json".to_string());
        assert_eq!(key, "{\"inline\": true}");
    }

    #[test]
    fn cli_key_fills_blank_record_key() {
        let mut key = String::new();
        fill_key(&mut key, "/path/from/env.json".to_string());
        assert_eq!(key, "/path/from/env.json");
    }

    #[test]
    fn parses_upload_record() {
        let record: Invocation<UploadInput, UploadOptions> = parse_record(
            r#"{
                "Input": {"SourceDirectory": "/tmp/out", "FileMask": "*.jpg"},
                "Options": {"ThrowErrorOnFailure": false}
            }"#,
        )
        .unwrap();

        assert_eq!(record.input.file_mask.as_deref(), Some("*.jpg"));
        assert!(!record.options.throw_error_on_failure);
        assert!(!record.options.throw_error_if_no_match);
    }

    #[test]
    fn options_may_be_omitted() {
        let record: Invocation<DownloadInput, DownloadOptions> =
            parse_record(r#"{"Input": {"DestinationDirectory": "/tmp/in"}}"#).unwrap();
        assert!(record.options.throw_error_on_failure);
    }

    #[test]
    fn cli_parses_upload_flags() {
        let cli = Cli::try_parse_from([
            "drive_tasks",
            "--service-account-key",
            "key.json",
            "upload",
            "--from",
            "/tmp/out",
            "--mask",
            "*.jpg",
            "--continue-on-failure",
        ])
        .unwrap();

        match cli.command {
            Commands::Upload {
                mask,
                continue_on_failure,
                fail_if_no_match,
                ..
            } => {
                assert_eq!(mask, "*.jpg");
                assert!(continue_on_failure);
                assert!(!fail_if_no_match);
            }
            _ => panic!("expected upload command"),
        }
    }
}
