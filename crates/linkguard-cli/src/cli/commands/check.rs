//! `linkguard check` - Assess one URL.

use anyhow::Result;
use colored::Colorize;
use linkguard::AssessOptions;
use tracing::debug;

use super::feeds::refresh_feeds;
use super::Context;
use crate::cli::args::CheckArgs;
use crate::output::{self, OutputFormat};

pub async fn execute(ctx: Context, args: CheckArgs) -> Result<()> {
    let store = ctx.feed_store()?;
    if args.refresh_feeds {
        let outcomes = refresh_feeds(&ctx, &store).await;
        debug!(feeds = outcomes.len(), "feeds refreshed before check");
    }

    let engine = ctx.engine(store);
    if ctx.verbose {
        eprintln!(
            "{} {}",
            "Sources:".bold(),
            engine.adapters().configured_names().join(", ")
        );
    }

    let options = AssessOptions::new()
        .force_refresh(args.force)
        .allow_deep(!args.no_deep)
        .request_deep(args.deep);
    let verdict = engine.assess(&args.url, options).await?;

    let mut stdout = std::io::stdout().lock();
    output::write_verdict(&mut stdout, &verdict, ctx.output_format)?;

    if ctx.output_format == OutputFormat::Pretty && !engine.adapters().has_external() {
        eprintln!();
        eprintln!(
            "{}",
            "No API keys configured: only local feeds and heuristics were consulted.".dimmed()
        );
        eprintln!(
            "{}",
            "Set VT_API_KEY or GOOGLE_SAFE_BROWSING_API_KEY, or run 'linkguard config set'."
                .dimmed()
        );
    }

    Ok(())
}
