//! Markdown and JSON report generation.
//!
//! This module renders the analysis report. Missing values are always
//! shown as `N/A`, never as zero.

use crate::models::{
    ConfusionSummary, Extremes, FamilySummary, FieldStats, GroupStats, Report, ReportMetadata,
    RunRecord,
};
use anyhow::Result;
use std::path::Path;

const MISSING: &str = "N/A";

/// Format an optional number with fixed decimals.
pub fn fmt_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => MISSING.to_string(),
    }
}

/// Format an optional number followed by its unit, or `N/A`.
fn fmt_with_unit(value: Option<f64>, decimals: usize, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.*}{}", decimals, v, unit),
        None => MISSING.to_string(),
    }
}

fn fmt_count(value: Option<u32>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

fn fmt_range(stats: &FieldStats, unit: &str) -> String {
    match (stats.min, stats.max) {
        (Some(min), Some(max)) => format!("{:.2} to {:.2}{}", min, max, unit),
        _ => MISSING.to_string(),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", report.metadata.title));
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents());
    output.push_str(&generate_results_section(&report.records));
    output.push_str(&generate_statistics_section(&report.overall));
    output.push_str(&generate_families_section(&report.families));
    output.push_str(&generate_confusion_section(&report.confusion));
    output.push_str(&generate_discussion_section(&report.extremes, &report.confusion));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Data Directory:** `{}`\n", metadata.data_dir));
    section.push_str(&format!("- **Runs:** {}\n", metadata.runs));
    section.push_str(&format!("- **Capture Events:** {}\n", metadata.capture_rows));
    section.push_str(&format!(
        "- **Snapshot Rows:** {} ({} columns)\n",
        metadata.snapshot_rows,
        metadata.snapshot_columns.len()
    ));
    if metadata.files_skipped > 0 {
        section.push_str(&format!("- **Files Skipped:** {}\n", metadata.files_skipped));
    }
    if !metadata.charts.is_empty() {
        let charts: Vec<String> = metadata.charts.iter().map(|c| format!("`{}`", c)).collect();
        section.push_str(&format!("- **Charts:** {}\n", charts.join(", ")));
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_table_of_contents() -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [1. Conditions and Results](#1-conditions-and-results)\n");
    toc.push_str("- [2. Summary Statistics](#2-summary-statistics)\n");
    toc.push_str("- [3. Trends by Experiment Family](#3-trends-by-experiment-family)\n");
    toc.push_str("- [4. Confusion Effect](#4-confusion-effect)\n");
    toc.push_str("- [5. Discussion](#5-discussion)\n\n");

    toc
}

/// Generate the results table, one row per run in the given order.
fn generate_results_section(records: &[RunRecord]) -> String {
    let mut section = String::new();

    section.push_str("## 1. Conditions and Results\n\n");
    section.push_str(
        "| Condition | Initial Boids | First Kill (s) | Capture Rate (/min) | Duration (s) |\n",
    );
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");

    for record in records {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            record.condition,
            fmt_count(record.initial_count),
            fmt_value(record.first_kill_time, 2),
            fmt_value(record.capture_rate, 2),
            fmt_value(record.total_duration, 2),
        ));
    }
    section.push('\n');

    section
}

fn generate_statistics_section(overall: &GroupStats) -> String {
    let mut section = String::new();

    section.push_str("## 2. Summary Statistics\n\n");
    section.push_str(&format!(
        "- **Time to first kill:** mean {}, std {} (n = {})\n",
        fmt_with_unit(overall.first_kill_time.mean, 2, "s"),
        fmt_with_unit(overall.first_kill_time.std, 2, "s"),
        overall.first_kill_time.count,
    ));
    section.push_str(&format!(
        "- **Capture rate:** mean {}, std {} (n = {})\n\n",
        fmt_with_unit(overall.capture_rate.mean, 2, "/min"),
        fmt_with_unit(overall.capture_rate.std, 2, "/min"),
        overall.capture_rate.count,
    ));

    section
}

fn generate_families_section(families: &[FamilySummary]) -> String {
    let mut section = String::new();

    section.push_str("## 3. Trends by Experiment Family\n\n");

    for summary in families {
        section.push_str(&format!("### {}\n\n", summary.family));

        if summary.is_empty() {
            section.push_str(&format!(
                "_No data for {}._\n\n",
                summary.family.prefix()
            ));
            continue;
        }

        section.push_str(&format!(
            "- Conditions: {} ({})\n",
            summary.conditions.len(),
            summary.conditions.join(", ")
        ));
        section.push_str(&format!(
            "- Time to first kill: {}\n",
            fmt_range(&summary.stats.first_kill_time, "s")
        ));
        section.push_str(&format!(
            "- Capture rate: {}\n\n",
            fmt_range(&summary.stats.capture_rate, "/min")
        ));
    }

    section
}

fn generate_confusion_section(confusion: &ConfusionSummary) -> String {
    let mut section = String::new();

    section.push_str("## 4. Confusion Effect\n\n");

    if confusion.median_in_view.is_none() {
        section.push_str("No `boids_in_view` values were recorded.\n\n");
        return section;
    }

    section.push_str(&format!(
        "- Boids in view at capture (median): {}\n",
        fmt_value(confusion.median_in_view, 0)
    ));
    section.push_str(&format!(
        "- Boids in view range: {} to {}\n",
        fmt_value(confusion.min_in_view, 0),
        fmt_value(confusion.max_in_view, 0)
    ));

    match confusion.trend {
        Some(trend) => section.push_str(&format!(
            "- Trend of time to next capture vs. boids in view: slope {:.3}s per boid, intercept {:.2}s (n = {})\n\n",
            trend.slope, trend.intercept, trend.points
        )),
        None => section.push_str(
            "- Too few inter-capture intervals to fit a trend line (at least 3 needed).\n\n",
        ),
    }

    section
}

fn generate_discussion_section(extremes: &Extremes, confusion: &ConfusionSummary) -> String {
    let mut section = String::new();

    section.push_str("## 5. Discussion\n\n");
    section.push_str("### 5.1 Overall Trends\n\n");

    let best = &extremes.most_efficient;
    let worst = &extremes.least_efficient;
    section.push_str(&format!(
        "- Most efficient condition: **{}** ({}/min)\n",
        best.condition,
        fmt_value(best.capture_rate, 2)
    ));
    section.push_str(&format!(
        "- Least efficient condition: **{}** ({}/min)\n",
        worst.condition,
        fmt_value(worst.capture_rate, 2)
    ));
    match extremes.percent_difference() {
        Some(percent) => section.push_str(&format!(
            "- Efficiency gap: {}/min ({:.1}% difference)\n\n",
            fmt_value(extremes.rate_difference(), 2),
            percent
        )),
        None => section.push_str(&format!(
            "- Efficiency gap: {}/min\n\n",
            fmt_value(extremes.rate_difference(), 2)
        )),
    }

    section.push_str("### 5.2 On the Confusion Effect\n\n");
    section.push_str(
        "The more boids a predator sees at once, the more it is expected to be confused, \
         lowering its capture efficiency. Relating the number of boids in view to the \
         interval until the next capture tests this effect directly.",
    );
    if let Some(trend) = confusion.trend {
        let direction = if trend.slope > 0.0 {
            "longer"
        } else {
            "shorter or unchanged"
        };
        section.push_str(&format!(
            " In this data set, more boids in view went with {} intervals to the next capture.",
            direction
        ));
    }
    section.push_str("\n\n");

    section.push_str("### 5.3 Future Work\n\n");
    section.push_str("- Repeat each condition several times to confirm reproducibility\n");
    section.push_str("- Vary parameters in finer steps to map their influence in detail\n");
    section.push_str(
        "- Relate the evolution of flock density and polarization to predation success\n\n",
    );

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by flockreport v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate the console results table.
pub fn generate_console_table(records: &[RunRecord]) -> String {
    let rule = "=".repeat(70);
    let mut table = String::new();

    table.push_str(&format!("\n{}\n", rule));
    table.push_str("Experiment Results Summary\n");
    table.push_str(&format!("{}\n", rule));
    table.push_str(&format!(
        "{:<10} {:>13} {:>15} {:>14} {:>13}\n",
        "Condition", "Initial Boids", "First Kill (s)", "Rate (/min)", "Duration (s)"
    ));
    for record in records {
        table.push_str(&format!(
            "{:<10} {:>13} {:>15} {:>14} {:>13}\n",
            record.condition,
            fmt_count(record.initial_count),
            fmt_value(record.first_kill_time, 2),
            fmt_value(record.capture_rate, 2),
            fmt_value(record.total_duration, 2),
        ));
    }
    table.push_str(&rule);
    table.push('\n');

    table
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    use anyhow::Context;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
