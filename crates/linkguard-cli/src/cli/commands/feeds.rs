//! `linkguard feeds` - Local threat feed management.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use linkguard::{refresh_all, FeedStatus, FeedStore, RefreshOutcome};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::{FeedsArgs, FeedsCommands};
use crate::output::OutputFormat;

#[derive(Debug, Serialize, Tabled)]
struct RefreshRow {
    #[tabled(rename = "Feed")]
    feed: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Entries")]
    entries: usize,
    #[tabled(rename = "Version")]
    version: u64,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&RefreshOutcome> for RefreshRow {
    fn from(outcome: &RefreshOutcome) -> Self {
        match outcome {
            RefreshOutcome::Updated {
                source_name,
                entries,
                version,
            } => Self {
                feed: source_name.clone(),
                result: String::from("updated"),
                entries: *entries,
                version: *version,
                reason: String::new(),
            },
            RefreshOutcome::Failed {
                source_name,
                reason,
            } => Self {
                feed: source_name.clone(),
                result: String::from("failed"),
                entries: 0,
                version: 0,
                reason: reason.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    #[tabled(rename = "Feed")]
    feed: String,
    #[tabled(rename = "Entries")]
    entries: usize,
    #[tabled(rename = "Version")]
    version: u64,
    #[tabled(rename = "Fetched")]
    fetched: String,
    #[tabled(rename = "Stale")]
    stale: bool,
    #[tabled(rename = "Failures")]
    failures: u32,
    #[tabled(rename = "Last error")]
    last_error: String,
}

impl From<FeedStatus> for StatusRow {
    fn from(status: FeedStatus) -> Self {
        Self {
            feed: status.source_name,
            entries: status.entries,
            version: status.version,
            fetched: status.fetched_at.map_or_else(|| String::from("never"), format_time),
            stale: status.stale,
            failures: status.consecutive_failures,
            last_error: status.last_error.unwrap_or_default(),
        }
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub async fn execute(ctx: Context, args: FeedsArgs) -> Result<()> {
    match args.command {
        FeedsCommands::Refresh => refresh(ctx).await,
        FeedsCommands::Status => status(&ctx),
    }
}

/// Download every enabled feed into `store`
pub(crate) async fn refresh_feeds(ctx: &Context, store: &FeedStore) -> Vec<RefreshOutcome> {
    let fetchers = ctx.feed_fetchers();
    refresh_all(store, &fetchers).await
}

async fn refresh(ctx: Context) -> Result<()> {
    let store = ctx.feed_store()?;
    let outcomes = refresh_feeds(&ctx, &store).await;
    if outcomes.is_empty() {
        bail!("No feeds are enabled. Add one to the [[sources.feeds]] section of the config.");
    }

    let rows: Vec<RefreshRow> = outcomes.iter().map(RefreshRow::from).collect();
    print_rows(&ctx, &rows)?;

    if outcomes.iter().all(|o| !o.is_updated()) {
        bail!("no feed could be refreshed; previous snapshots are still in use");
    }
    Ok(())
}

fn status(ctx: &Context) -> Result<()> {
    let store = ctx.feed_store()?;
    let rows: Vec<StatusRow> = store.status().into_iter().map(StatusRow::from).collect();
    print_rows(ctx, &rows)?;

    if ctx.output_format == OutputFormat::Pretty {
        println!();
        println!("{} {}", "Snapshots:".bold(), ctx.data_dir.display());
    }
    Ok(())
}

fn print_rows<T: Serialize + Tabled>(ctx: &Context, rows: &[T]) -> Result<()> {
    match ctx.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(rows)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        OutputFormat::Pretty => {
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{table}");
        }
    }
    Ok(())
}
