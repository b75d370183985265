use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{Duration as DateDuration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod error;
mod kpi;
mod loader;
mod models;
mod pipeline;
mod ranking;
mod render;
mod report;
mod sink;
mod targets;

use kpi::KpiEngine;
use models::{Kpi, Period};
use pipeline::{ArtifactStatus, Pipeline, RunConfig};
use render::format_currency;
use sink::{CsvBackupSink, MailSink, OutboxMailSink, PreviewMailSink};
use targets::TargetRegistry;

#[derive(Parser)]
#[command(name = "store-onepager")]
#[command(about = "Daily store KPI one-pagers and revenue rankings", long_about = None)]
struct Cli {
    /// Directory holding stores.csv, products.csv, sales.csv and emails.csv
    #[arg(long, global = true, default_value = "data_sources")]
    data_dir: PathBuf,
    /// Day to report on (YYYY-MM-DD); defaults to yesterday
    #[arg(long, global = true)]
    run_date: Option<NaiveDate>,
    /// TOML file overriding the built-in targets
    #[arg(long, global = true)]
    targets: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute KPIs, back up extracts and dispatch every report
    Run {
        #[arg(long, default_value = "store_backup_files")]
        backup_dir: PathBuf,
        #[arg(long, default_value = "outbox")]
        outbox: PathBuf,
        #[arg(long, env = "EMAIL_FROM")]
        email_from: Option<String>,
        /// Log mails instead of queueing them
        #[arg(long)]
        preview: bool,
        #[arg(long, default_value_t = 30)]
        sink_timeout_secs: u64,
        /// Write the run summary as JSON
        #[arg(long)]
        summary_out: Option<PathBuf>,
    },
    /// Print the KPI table for every store
    Kpis,
    /// Print the revenue ranking
    Rank {
        #[arg(long, value_enum, default_value_t = Period::Daily)]
        period: Period,
        /// List worst performers first
        #[arg(long)]
        worst: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn yesterday() -> NaiveDate {
    Utc::now().date_naive() - DateDuration::days(1)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let run_date = cli.run_date.unwrap_or_else(yesterday);
    let targets = match &cli.targets {
        Some(path) => TargetRegistry::load(path)?,
        None => TargetRegistry::default(),
    };
    let engine = KpiEngine::new(targets);
    let tables = loader::load_tables(&cli.data_dir)
        .with_context(|| format!("failed to load tables from {}", cli.data_dir.display()))?;

    match cli.command {
        Commands::Run {
            backup_dir,
            outbox,
            email_from,
            preview,
            sink_timeout_secs,
            summary_out,
        } => {
            let email_from = email_from
                .context("EMAIL_FROM must be set to the sender address for reports")?;
            let mail: Arc<dyn MailSink> = if preview {
                Arc::new(PreviewMailSink)
            } else {
                Arc::new(OutboxMailSink::new(outbox))
            };
            let pipeline = Pipeline::new(
                engine,
                Arc::new(CsvBackupSink::new(backup_dir)),
                mail,
                RunConfig {
                    run_date,
                    email_from,
                    sink_timeout: Duration::from_secs(sink_timeout_secs.max(1)),
                },
            );

            let output = pipeline.run(tables).await?;
            let summary = &output.summary;
            tracing::info!(
                kpi_records = output.kpis.len(),
                ranked_daily = output.daily_ranking.len(),
                ranked_ytd = output.ytd_ranking.len(),
                payloads = output.payloads.len(),
                "run output ready"
            );

            println!("Run {} for {}:", summary.run_id, summary.run_date);
            for ranking in [&output.daily_ranking, &output.ytd_ranking] {
                if let (Some(best), Some(worst)) = (ranking.best(), ranking.worst()) {
                    println!(
                        "{} top: {} {}, bottom: {} {}",
                        ranking.period,
                        best.store_id,
                        format_currency(best.revenue),
                        worst.store_id,
                        format_currency(worst.revenue)
                    );
                }
            }
            for outcome in &summary.artifacts {
                match &outcome.status {
                    ArtifactStatus::Succeeded { reference } => println!(
                        "- {} ok{}",
                        outcome.artifact,
                        reference
                            .as_deref()
                            .map(|r| format!(" ({r})"))
                            .unwrap_or_default()
                    ),
                    ArtifactStatus::Failed { reason } => {
                        println!("- {} FAILED: {reason}", outcome.artifact)
                    }
                }
            }

            if let Some(path) = summary_out {
                let json = serde_json::to_string_pretty(summary)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("failed to write summary to {}", path.display()))?;
                println!("Summary written to {}.", path.display());
            }

            if !summary.is_success() {
                anyhow::bail!(
                    "{} of {} artifacts failed",
                    summary.failures().count(),
                    summary.artifacts.len()
                );
            }
        }
        Commands::Kpis => {
            let records =
                engine.compute(&tables.sales, &tables.products, &tables.stores, run_date)?;

            println!("KPIs for {run_date}:");
            for store in &tables.stores {
                println!("{} ({})", store.name, store.store_id);
                for period in Period::ALL {
                    let Some(record) = records.get(&(store.store_id.clone(), period)) else {
                        continue;
                    };
                    let cells: Vec<String> = Kpi::ALL
                        .into_iter()
                        .map(|kpi| {
                            let pct = record
                                .pct(kpi)
                                .map(|pct| format!("{:.0}%", pct * 100.0))
                                .unwrap_or_else(|| "n/a".to_string());
                            let actual = if kpi.is_currency() {
                                format_currency(record.actual(kpi))
                            } else {
                                format!("{:.0}", record.actual(kpi))
                            };
                            format!("{} {actual} ({pct})", kpi.display_name())
                        })
                        .collect();
                    let idle = if record.no_activity { " [no activity]" } else { "" };
                    println!("  {:<5} {}{idle}", period.to_string(), cells.join(", "));
                }
            }
        }
        Commands::Rank {
            period,
            worst,
            limit,
        } => {
            let records =
                engine.compute(&tables.sales, &tables.products, &tables.stores, run_date)?;
            let ranking = ranking::rank(&records, period);
            if ranking.is_empty() {
                println!("No stores to rank.");
                return Ok(());
            }

            let entries: Vec<_> = if worst {
                ranking.worst_first().collect()
            } else {
                ranking.entries.iter().collect()
            };
            let limit = limit.unwrap_or(entries.len());

            println!("{period} revenue ranking for {run_date}:");
            for entry in entries.into_iter().take(limit) {
                let name = tables
                    .stores
                    .iter()
                    .find(|store| store.store_id == entry.store_id)
                    .map(|store| store.name.as_str())
                    .unwrap_or(entry.store_id.as_str());
                println!(
                    "{:>3}. {} ({}) {}",
                    entry.rank,
                    name,
                    entry.store_id,
                    format_currency(entry.revenue)
                );
            }
        }
    }

    Ok(())
}
