//! Grouping, statistics and derived metrics.
//!
//! This module provides the aggregation primitives used to build an
//! analysis: grouping runs by condition and family, descriptive statistics,
//! inter-capture deltas, the confusion-effect trend and extremal selection.

use crate::error::AnalysisError;
use crate::models::{
    CaptureEvent, ConfusionSummary, ExperimentFamily, Extremes, FamilySummary, FieldStats,
    GroupStats, RunRecord, TrendLine,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Minimum number of points for a trend line.
pub const MIN_TREND_POINTS: usize = 3;

/// Sort run records by condition label (run name breaks ties).
pub fn sort_by_condition(records: &mut [RunRecord]) {
    records.sort_by(|a, b| {
        a.condition
            .cmp(&b.condition)
            .then_with(|| a.run_name.cmp(&b.run_name))
    });
}

/// Group run records by condition label.
pub fn group_by_condition(records: &[RunRecord]) -> BTreeMap<String, Vec<&RunRecord>> {
    let mut grouped: BTreeMap<String, Vec<&RunRecord>> = BTreeMap::new();

    for record in records {
        grouped
            .entry(record.condition.clone())
            .or_default()
            .push(record);
    }

    grouped
}

/// Run records whose condition starts with `prefix`, sorted by condition.
///
/// An unknown prefix simply yields an empty group.
pub fn filter_by_prefix(records: &[RunRecord], prefix: char) -> Vec<&RunRecord> {
    let mut group: Vec<&RunRecord> = records
        .iter()
        .filter(|r| r.condition.starts_with(prefix))
        .collect();
    group.sort_by(|a, b| a.condition.cmp(&b.condition));
    group
}

/// Descriptive statistics over the present values.
pub fn field_stats<I>(values: I) -> FieldStats
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: Vec<f64> = values.into_iter().flatten().collect();
    let count = present.len();
    if count == 0 {
        return FieldStats::default();
    }

    let mean = present.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let ss: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    FieldStats {
        count,
        mean: Some(mean),
        std,
        min: present.iter().copied().reduce(f64::min),
        max: present.iter().copied().reduce(f64::max),
    }
}

/// Statistics over a group of run records.
pub fn group_stats(label: &str, records: &[&RunRecord]) -> GroupStats {
    GroupStats {
        label: label.to_string(),
        runs: records.len(),
        initial_count: field_stats(records.iter().map(|r| r.initial_count.map(f64::from))),
        first_kill_time: field_stats(records.iter().map(|r| r.first_kill_time)),
        capture_rate: field_stats(records.iter().map(|r| r.capture_rate)),
        total_duration: field_stats(records.iter().map(|r| r.total_duration)),
    }
}

/// One summary per known family, in family order, including empty ones.
pub fn family_summaries(records: &[RunRecord]) -> Vec<FamilySummary> {
    ExperimentFamily::ALL
        .into_iter()
        .map(|family| {
            let group = filter_by_prefix(records, family.prefix());
            let mut conditions: Vec<String> = group.iter().map(|r| r.condition.clone()).collect();
            conditions.dedup();

            FamilySummary {
                family,
                conditions,
                stats: group_stats(&family.prefix().to_string(), &group),
            }
        })
        .collect()
}

/// Statistics per condition label, sorted by label.
pub fn condition_stats(records: &[RunRecord]) -> Vec<GroupStats> {
    group_by_condition(records)
        .iter()
        .map(|(condition, group)| group_stats(condition, group))
        .collect()
}

/// Fill in the time since the previous capture of the same condition.
///
/// Rows are taken in their existing order (not re-sorted). The first row
/// of each condition, and any row whose own or predecessor's time is
/// missing, gets no delta. Rows without a condition belong to no series
/// and never get a delta.
pub fn compute_time_deltas(events: &mut [CaptureEvent]) {
    let mut previous: HashMap<String, Option<f64>> = HashMap::new();

    for event in events.iter_mut() {
        if event.condition.is_empty() {
            event.time_delta = None;
            continue;
        }
        let last = previous.insert(event.condition.clone(), event.time_sec);
        event.time_delta = match (last.flatten(), event.time_sec) {
            (Some(prev), Some(now)) => Some(now - prev),
            _ => None,
        };
    }
}

/// Capture events grouped by condition, sorted by label.
///
/// Events without a condition are left out.
pub fn captures_by_condition(events: &[CaptureEvent]) -> BTreeMap<&str, Vec<&CaptureEvent>> {
    let mut grouped: BTreeMap<&str, Vec<&CaptureEvent>> = BTreeMap::new();

    for event in events.iter().filter(|e| !e.condition.is_empty()) {
        grouped
            .entry(event.condition.as_str())
            .or_default()
            .push(event);
    }

    grouped
}

/// `(boids_in_view, time_delta)` pairs where both are defined.
pub fn trend_points(events: &[CaptureEvent]) -> Vec<(f64, f64)> {
    events
        .iter()
        .filter_map(|e| Some((f64::from(e.boids_in_view?), e.time_delta?)))
        .collect()
}

/// Least-squares line through `points`.
///
/// Returns `None` below [`MIN_TREND_POINTS`] points, or when every x is
/// identical and the slope is undefined.
pub fn fit_trend(points: &[(f64, f64)]) -> Option<TrendLine> {
    if points.len() < MIN_TREND_POINTS {
        debug!("Skipping trend line: only {} points", points.len());
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    let sxy: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    if sxx == 0.0 {
        debug!("Skipping trend line: no variance in boids_in_view");
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    (slope.is_finite() && intercept.is_finite()).then_some(TrendLine {
        slope,
        intercept,
        points: points.len(),
    })
}

/// Median of the given values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// View-size statistics and latency trend over capture events.
///
/// Events must already carry their deltas.
pub fn confusion_summary(events: &[CaptureEvent]) -> ConfusionSummary {
    let in_view: Vec<f64> = events
        .iter()
        .filter_map(|e| e.boids_in_view.map(f64::from))
        .collect();

    ConfusionSummary {
        median_in_view: median(&in_view),
        min_in_view: in_view.iter().copied().reduce(f64::min),
        max_in_view: in_view.iter().copied().reduce(f64::max),
        trend: fit_trend(&trend_points(events)),
    }
}

/// Select the runs with the highest and lowest capture rate.
///
/// Records are considered in condition order and the first occurrence
/// wins a tie. Runs without a capture rate are ignored.
pub fn select_extremes(records: &[RunRecord]) -> Result<Extremes, AnalysisError> {
    if records.is_empty() {
        return Err(AnalysisError::NoRunRecords);
    }

    let mut sorted: Vec<&RunRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.condition.cmp(&b.condition));

    let mut best: Option<(&RunRecord, f64)> = None;
    let mut worst: Option<(&RunRecord, f64)> = None;

    for record in sorted {
        let Some(rate) = record.capture_rate else {
            continue;
        };
        if best.map_or(true, |(_, b)| rate.partial_cmp(&b) == Some(Ordering::Greater)) {
            best = Some((record, rate));
        }
        if worst.map_or(true, |(_, w)| rate.partial_cmp(&w) == Some(Ordering::Less)) {
            worst = Some((record, rate));
        }
    }

    match (best, worst) {
        (Some((best, _)), Some((worst, _))) => Ok(Extremes {
            most_efficient: best.clone(),
            least_efficient: worst.clone(),
        }),
        _ => Err(AnalysisError::NoCaptureRates),
    }
}
