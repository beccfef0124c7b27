//! `linkguard config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;
use linkguard::ApiSourceConfig;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::OutputFormat;

pub fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Set { key, value } => set_config(&ctx, &key, &value),
        ConfigCommands::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = ctx.config.redacted();

    match ctx.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&config)?),
        OutputFormat::Csv | OutputFormat::Pretty => {
            println!("{}", "Current Configuration:".bold());
            println!();
            println!("  {} {}", "config file:".bold(), ctx.config_path.display());
            println!("  {} {}", "data_dir:".bold(), ctx.data_dir.display());
            println!(
                "  {} {}",
                "output_format:".bold(),
                config.output_format.unwrap_or_default()
            );
            println!();

            let feeds: Vec<&str> = config
                .sources
                .enabled_feeds()
                .map(|f| f.name.as_str())
                .collect();
            println!("  {} {}", "feeds:".bold(), feeds.join(", "));
            println!("  {} {}", "heuristics:".bold(), config.sources.heuristics);
            print_source("virustotal", &config.sources.virustotal);
            print_source("safe_browsing", &config.sources.safe_browsing);
            print_source("urlscan", &config.sources.urlscan);
        }
    }

    Ok(())
}

fn print_source(name: &str, source: &ApiSourceConfig) {
    let state = match (source.enabled, source.api_key.as_deref()) {
        (false, _) => "disabled".dimmed().to_string(),
        (true, None) => "(not set)".dimmed().to_string(),
        (true, Some(key)) => key.to_string(),
    };
    println!("  {} {}", format!("{name}:").bold(), state);
}

fn set_config(ctx: &Context, key: &str, value: &str) -> Result<()> {
    // Environment overrides must not be written back, so start from the file.
    let mut config = Config::load_from(&ctx.config_path)?;
    config.set(key, value)?;
    config.save_to(&ctx.config_path)?;

    let shown = if key.ends_with("api_key") {
        crate::config::mask_key(value)
    } else {
        value.to_string()
    };
    println!("{} {} set to {}.", "Success:".green().bold(), key, shown.cyan());
    Ok(())
}
