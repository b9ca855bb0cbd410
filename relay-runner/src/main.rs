//! Relay Runner
//!
//! Refreshes Redash query results for scheduled reports and announces the
//! finished reports in chat.
//!
//! Architecture:
//! - Configuration: Load settings from environment
//! - Repositories: Redash jobs, result files, task spreadsheet, webhooks
//! - Services: Business logic (failure recording, reports, message dispatch)
//! - Scheduler: Query polling, batch fan-out, pipeline and daily schedule
//!
//! Each batch submits every selected query concurrently, polls the jobs until
//! they finish, writes the results to CSV and posts a consolidated report.

mod config;
mod repository;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relay_client::RedashClient;
use std::fs::File;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::repository::{
    CsvResultSink, Notifier, RedashJobService, SpreadsheetTaskSource, TaskSource, WebhookNotifier,
};
use crate::scheduler::{BatchOrchestrator, Pipeline, ScheduleLoop};
use crate::service::MessageDispatcher;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Redash report relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the given tasks now
    Run {
        /// Task name (repeatable)
        #[arg(long = "task", required = true)]
        tasks: Vec<String>,

        /// Only send the report messages
        #[arg(long)]
        skip_queries: bool,
    },
    /// Run the tasks marked in the `once` column, queries included
    Once,
    /// Send the messages of the tasks marked in the `quick` column
    Quick,
    /// Run the daily schedule until stopped
    Schedule,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;

    init_logging(&config)?;
    info!(
        "Loaded configuration: redash_domain={}, data_path={}",
        config.redash_domain,
        config.data_path.display()
    );

    let source: Arc<dyn TaskSource> = Arc::new(SpreadsheetTaskSource::new(config.tasks.clone()));
    let pipeline = Arc::new(build_pipeline(&config, Arc::clone(&source)));

    let ok = match cli.command {
        Command::Run {
            tasks,
            skip_queries,
        } => pipeline.run(&tasks, !skip_queries).await,
        Command::Once => {
            let table = source.schedule().await.context("Failed to read schedule")?;
            pipeline.run(&table.once, true).await
        }
        Command::Quick => {
            let table = source.schedule().await.context("Failed to read schedule")?;
            pipeline.run(&table.quick, false).await
        }
        Command::Schedule => {
            let table = source.schedule().await.context("Failed to read schedule")?;
            ScheduleLoop::new(pipeline, table).run().await;
            true
        }
    };

    if !ok {
        anyhow::bail!("Report run failed");
    }
    Ok(())
}

/// Console logging, plus a per-run log file when `LOG_PATH` is set
fn init_logging(config: &Config) -> Result<()> {
    let file_layer = match config.log_file(chrono::Local::now().naive_local()) {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_runner=info,relay_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

/// Wires the repositories and services into a pipeline
fn build_pipeline(config: &Config, source: Arc<dyn TaskSource>) -> Pipeline {
    let client = Arc::new(RedashClient::new(config.redash_domain.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(config.webhook_url.clone()));

    let orchestrator = BatchOrchestrator::new(
        Arc::clone(&source),
        Arc::new(RedashJobService::new(client)),
        Arc::new(CsvResultSink::new(config.data_path.clone())),
        Arc::clone(&notifier),
        config.poll_policy(),
    );
    let dispatcher = MessageDispatcher::new(source, Arc::clone(&notifier));

    Pipeline::new(orchestrator, dispatcher, notifier, config.sync_delay)
}
