//! Human-readable explanations.

use linkguard_core::{CompositeVerdict, Contribution, DeepAnalysisStatus, RiskTier};
use std::fmt::Write as _;

use crate::scoring::Scored;

/// Build the explanation stored on a verdict.
///
/// One line per source in contribution order, then a summary of who
/// answered and who did not, then the deep-analysis status.
pub(crate) fn explanation(scored: &Scored, deep: &DeepAnalysisStatus) -> String {
    let mut lines: Vec<String> = scored.contributions.iter().map(source_line).collect();

    let contributing = scored
        .contributions
        .iter()
        .filter(|c| c.contribution > 0.0)
        .count();
    let responded = scored
        .contributions
        .iter()
        .filter(|c| c.verdict.responded())
        .count();
    let unavailable: Vec<String> = scored
        .contributions
        .iter()
        .filter(|c| !c.verdict.responded())
        .map(|c| {
            format!(
                "{} ({})",
                c.verdict.source,
                c.verdict.unavailable.as_deref().unwrap_or("no answer")
            )
        })
        .collect();

    lines.push(format!(
        "{responded} of {} sources responded, {contributing} contributing",
        scored.contributions.len()
    ));
    if unavailable.is_empty() {
        lines.push(String::from("Unavailable: none"));
    } else {
        lines.push(format!(
            "Unavailable ({}): {}",
            unavailable.len(),
            unavailable.join(", ")
        ));
    }

    if scored.insufficient_data {
        lines.push(String::from(
            "Insufficient data: no external source answered and nothing was flagged",
        ));
    }

    lines.push(deep_line(deep));
    lines.join("\n")
}

fn source_line(c: &Contribution) -> String {
    let v = &c.verdict;
    if !v.responded() {
        return format!(
            "{} → unavailable: {}",
            v.source,
            v.unavailable.as_deref().unwrap_or("no answer")
        );
    }

    let mut line = format!(
        "{} → {} ({:.2}) → {:+.2}",
        v.source, v.risk, v.confidence, c.contribution
    );
    if let Some(category) = &v.category {
        let _ = write!(line, " [{category}]");
    }
    if v.stale {
        line.push_str(" (stale feed)");
    }
    line
}

fn deep_line(deep: &DeepAnalysisStatus) -> String {
    match deep {
        DeepAnalysisStatus::NotRun => String::from("Deep analysis: not run"),
        DeepAnalysisStatus::Completed => String::from("Deep analysis: completed"),
        DeepAnalysisStatus::Inconclusive { reason } => {
            format!("Deep analysis: attempted, inconclusive ({reason})")
        }
    }
}

/// Render a verdict for people: headline, confidence, per-source details and
/// the stored explanation
#[must_use]
pub fn verdict_to_human_text(verdict: &CompositeVerdict) -> String {
    let mut out = String::new();

    let headline = if verdict.insufficient_data {
        format!("Risk: {} (insufficient data)", verdict.tier)
    } else {
        format!("Risk: {} (score {:.2})", verdict.tier, verdict.score)
    };
    let _ = writeln!(out, "{headline}");
    let _ = writeln!(out, "URL: {}", verdict.url);
    if verdict.url.is_idn() {
        let _ = writeln!(out, "Host (IDN): {}", verdict.url.display_host());
    }
    let _ = writeln!(
        out,
        "Confidence: {} ({:.2})",
        verdict.confidence_level(),
        verdict.confidence
    );

    let findings: Vec<String> = verdict
        .responders()
        .filter(|v| v.risk.is_flagged())
        .map(|v| {
            let what = v
                .category
                .as_ref()
                .map_or_else(|| v.risk.to_string(), ToString::to_string);
            match &v.detail {
                Some(detail) => format!("{}: {what} ({detail})", v.source),
                None => format!("{}: {what}", v.source),
            }
        })
        .collect();
    if !findings.is_empty() {
        let _ = writeln!(out, "Findings:");
        for finding in findings {
            let _ = writeln!(out, "  - {finding}");
        }
    }

    let _ = writeln!(out);
    out.push_str(&verdict.explanation);
    out.push('\n');

    if verdict.tier >= RiskTier::High || verdict.any_malicious() {
        out.push_str("\nDo not open this link or enter any credentials.\n");
    } else if verdict.insufficient_data {
        out.push_str("\nNo source could vouch for this link; treat it with care.\n");
    }
    out
}
