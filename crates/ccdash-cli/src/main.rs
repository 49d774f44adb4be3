//! ccdash CLI
//!
//! Command-line interface for producing call-center reports from a local
//! SQLite record store

mod args;

use anyhow::Context;
use args::{Channel, Cli, Commands, RangeArgs, ReportCommand};
use ccdash_config_file::AppConfig;
use ccdash_core::{DateRange, QueueNormalizer, RecordStore};
use ccdash_engine::{ReportService, RequestContext};
use ccdash_observability::{Metrics, init_tracing};
use ccdash_store_sqlite::{SqliteRecordStore, import_jsonl};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    config.merge_env();
    if let Some(db) = &cli.db {
        config.database.path = db.to_string_lossy().to_string();
    }
    config.validate()?;

    init_tracing(&config.logging.level, config.logging.log_sql_queries)?;
    debug!(?config, "Configuration loaded");

    let metrics = Arc::new(Metrics::new()?);
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight report");
                cancel.cancel();
            }
        });
    }

    let result = run(&cli, &config, metrics.clone(), cancel).await;

    if cli.metrics {
        eprintln!("{}", metrics.gather_text()?);
    }
    result
}

async fn run(
    cli: &Cli,
    config: &AppConfig,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let db_path = config.db_path();

    let store = match SqliteRecordStore::open(&db_path, config.database.max_connections).await {
        Ok(store) => Some(
            store
                .with_report_offset(config.report_offset()?)
                .with_observer(metrics.clone()),
        ),
        Err(e) if matches!(cli.command, Commands::Status) => {
            warn!("Failed to open {}: {}", db_path.display(), e);
            None
        }
        Err(e) => {
            return Err(e).with_context(|| format!("opening database {}", db_path.display()));
        }
    };

    let normalizer = QueueNormalizer::new(config.queues.clone());
    let service = match &store {
        Some(store) => {
            let store: Arc<dyn RecordStore> = Arc::new(store.clone());
            ReportService::new(store, normalizer)
        }
        None => ReportService::disconnected(normalizer),
    }
    .with_observer(metrics)
    .with_sl_threshold(config.reporting.sl_threshold_secs)
    .with_query_timeout(config.query_timeout());

    let ctx = RequestContext::new().with_cancel(cancel);

    match &cli.command {
        Commands::Report { report } => run_report(&service, &ctx, report, cli.pretty).await?,
        Commands::Import {
            kind,
            strict,
            files,
        } => {
            let Some(store) = &store else {
                anyhow::bail!("record store not available");
            };
            let kind = kind.parse()?;
            let mut results = Vec::with_capacity(files.len());
            for file in files {
                let stats = import_jsonl(store, file, kind, *strict)
                    .await
                    .with_context(|| format!("importing {}", file.display()))?;
                results.push(serde_json::json!({
                    "file": file.display().to_string(),
                    "kind": kind.to_string(),
                    "imported": stats.imported,
                    "skipped": stats.skipped,
                }));
            }
            print(&results, cli.pretty)?;
        }
        Commands::QueueStats { range } => {
            let report = service.queue_stats(&ctx, range.date_range()?).await?;
            print(&report, cli.pretty)?;
        }
        Commands::Status => {
            let status = service.store_status(&ctx).await;
            info!(available = status.available, "Store status checked");
            print(&status, cli.pretty)?;
        }
    }

    if let Some(store) = store {
        store.close().await;
    }
    Ok(())
}

async fn run_report(
    service: &ReportService,
    ctx: &RequestContext,
    report: &ReportCommand,
    pretty: bool,
) -> anyhow::Result<()> {
    fn window(args: &RangeArgs) -> anyhow::Result<(DateRange, &str)> {
        Ok((args.date_range()?, args.queue.as_str()))
    }

    match report {
        ReportCommand::Daily(args) => {
            let (range, queue) = window(args)?;
            print(&service.daily(ctx, range, queue).await?, pretty)
        }
        ReportCommand::Monthly(args) => {
            let (range, queue) = window(args)?;
            print(&service.monthly(ctx, range, queue).await?, pretty)
        }
        ReportCommand::Hourly { range, metric } => {
            let (range, queue) = window(range)?;
            print(&service.hourly(ctx, range, queue, metric).await?, pretty)
        }
        ReportCommand::Classifiers { range, channel } => {
            let (range, queue) = window(range)?;
            let report = match channel {
                Channel::Call => service.call_classifiers(ctx, range, queue).await?,
                Channel::Chat => service.chat_classifiers(ctx, range, queue).await?,
                Channel::Overall => service.overall_classifiers(ctx, range, queue).await?,
            };
            print(&report, pretty)
        }
        ReportCommand::Topics(args) => {
            let (range, queue) = window(args)?;
            print(&service.topics(ctx, range, queue).await?, pretty)
        }
        ReportCommand::AvailableTopics(args) => {
            let (range, queue) = window(args)?;
            print(&service.available_topics(ctx, range, queue).await?, pretty)
        }
        ReportCommand::Subtopics { range, topic } => {
            let (range, queue) = window(range)?;
            print(
                &service.subtopics_daily(ctx, range, queue, topic).await?,
                pretty,
            )
        }
    }
}

fn print<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}
