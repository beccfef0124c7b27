//! Output formatting for different formats.

use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use linkguard::{verdict_to_human_text, CompositeVerdict, RiskTier};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// CSV output, one row per source
    Csv,
    /// YAML output
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unknown output format: {s}\n\
                 Valid formats: pretty, json, csv, yaml"
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// Color a tier label by severity
pub fn tier_label(tier: RiskTier, text: &str) -> ColoredString {
    match tier {
        RiskTier::Low => text.green().bold(),
        RiskTier::Medium => text.yellow().bold(),
        RiskTier::High => text.red().bold(),
        RiskTier::Critical => text.on_red().white().bold(),
    }
}

/// Write a verdict to `out` in the requested format
pub fn write_verdict(
    out: &mut impl Write,
    verdict: &CompositeVerdict,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(verdict)?)?,
        OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(verdict)?)?,
        OutputFormat::Csv => write_verdict_csv(out, verdict)?,
        OutputFormat::Pretty => {
            let text = verdict_to_human_text(verdict);
            let (headline, rest) = text.split_once('\n').unwrap_or((text.as_str(), ""));
            writeln!(out, "{}", tier_label(verdict.tier, headline))?;
            write!(out, "{rest}")?;
            if !rest.ends_with('\n') {
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

fn write_verdict_csv(out: &mut impl Write, verdict: &CompositeVerdict) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "url",
        "tier",
        "score",
        "source",
        "kind",
        "risk",
        "confidence",
        "weight",
        "contribution",
        "detail",
    ])?;
    for c in &verdict.contributions {
        let v = &c.verdict;
        let detail = v.unavailable.as_deref().or(v.detail.as_deref());
        writer.write_record([
            verdict.url.to_string(),
            verdict.tier.to_string(),
            format!("{:.2}", verdict.score),
            v.source.clone(),
            v.kind.to_string(),
            v.risk.to_string(),
            format!("{:.2}", v.confidence),
            format!("{:.2}", c.weight),
            format!("{:.2}", c.contribution),
            detail.unwrap_or_default().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard::{
        AdapterSet, AssessOptions, Engine, EngineConfig, SourceAdapter, SourceKind, Unconfigured,
    };
    use std::sync::Arc;

    async fn sample() -> Arc<CompositeVerdict> {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(Unconfigured::new(
            "virustotal",
            SourceKind::Reputation,
            "not configured",
        ))];
        let deep = Arc::new(Unconfigured::new(
            "urlscan",
            SourceKind::DeepAnalysis,
            "not configured",
        ));
        let engine = Engine::new(AdapterSet::new(adapters, deep), EngineConfig::default());
        engine
            .assess("example.com/a", AssessOptions::default())
            .await
            .unwrap()
    }

    fn render(verdict: &CompositeVerdict, format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_verdict(&mut buf, verdict, format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn parses_format_aliases() {
        assert_eq!("YML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[tokio::test]
    async fn csv_has_one_row_per_source() {
        let verdict = sample().await;
        let text = render(&verdict, OutputFormat::Csv);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("url,tier,score,source"));
        assert!(lines[1].starts_with("https://example.com/a,LOW,0.00,virustotal,reputation,unknown"));
        assert!(lines[1].ends_with("not configured"));
    }

    #[tokio::test]
    async fn json_is_the_serialized_verdict() {
        let verdict = sample().await;
        let value: serde_json::Value =
            serde_json::from_str(&render(&verdict, OutputFormat::Json)).unwrap();
        assert_eq!(value["tier"], "low");
        assert_eq!(value["insufficient_data"], true);
    }

    #[tokio::test]
    async fn pretty_starts_with_the_headline() {
        colored::control::set_override(false);
        let verdict = sample().await;
        let text = render(&verdict, OutputFormat::Pretty);
        assert!(text.starts_with("Risk: LOW (insufficient data)\n"));
        assert!(text.contains("URL: https://example.com/a"));
    }
}
