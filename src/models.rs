//! Data models for the experiment analyzer.
//!
//! This module contains the core data structures used throughout
//! the application for representing runs, capture events, loaded tables,
//! group statistics and the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Experiment family, identified by the first character of a condition label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentFamily {
    /// "A" conditions - population size effects
    Population,
    /// "B" conditions - cohesion strength effects
    Cohesion,
    /// "C" conditions - confusion intensity effects
    Confusion,
}

impl ExperimentFamily {
    /// All known families in report order.
    pub const ALL: [ExperimentFamily; 3] = [
        ExperimentFamily::Population,
        ExperimentFamily::Cohesion,
        ExperimentFamily::Confusion,
    ];

    /// Condition prefix for this family.
    pub fn prefix(&self) -> char {
        match self {
            ExperimentFamily::Population => 'A',
            ExperimentFamily::Cohesion => 'B',
            ExperimentFamily::Confusion => 'C',
        }
    }

    /// Human-readable name of the varied parameter.
    pub fn parameter(&self) -> &'static str {
        match self {
            ExperimentFamily::Population => "Population Size",
            ExperimentFamily::Cohesion => "Cohesion Strength",
            ExperimentFamily::Confusion => "Confusion Intensity",
        }
    }

    pub fn from_prefix(prefix: char) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.prefix() == prefix)
    }

    /// Family of a condition label, `None` for unknown or empty labels.
    pub fn from_condition(condition: &str) -> Option<Self> {
        condition.chars().next().and_then(Self::from_prefix)
    }
}

impl fmt::Display for ExperimentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Experiment {}: {}", self.prefix(), self.parameter())
    }
}

/// One experiment execution, parsed from a `*_summary.txt` artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run name taken from the artifact file name.
    pub run_name: String,
    /// Experiment condition label (e.g. "A1").
    pub condition: String,
    /// Number of boids at the start of the run.
    pub initial_count: Option<u32>,
    /// Seconds until the first kill; `None` when no kill was recorded.
    pub first_kill_time: Option<f64>,
    /// Kills per minute.
    pub capture_rate: Option<f64>,
    /// Run duration in seconds.
    pub total_duration: Option<f64>,
    /// Kills recorded over the run.
    pub total_kills: Option<u32>,
    /// Keys the parser does not interpret, kept verbatim.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub extra: BTreeMap<String, String>,
}

impl RunRecord {
    /// Creates a record with only identity fields set.
    pub fn new(run_name: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
            condition: condition.into(),
            initial_count: None,
            first_kill_time: None,
            capture_rate: None,
            total_duration: None,
            total_kills: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Structural union of CSV artifacts.
///
/// Columns are kept in first-seen order; a row that came from a file
/// without some column holds `None` in that position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Append another table, widening the column set as needed.
    ///
    /// Row order is preserved: existing rows first, then `other`'s rows in
    /// their original order. No deduplication takes place.
    pub fn append(&mut self, other: Table) {
        let mapping: Vec<usize> = other
            .columns
            .iter()
            .map(|name| match self.column_index(name) {
                Some(idx) => idx,
                None => {
                    self.columns.push(name.clone());
                    for row in &mut self.rows {
                        row.push(None);
                    }
                    self.columns.len() - 1
                }
            })
            .collect();

        let width = self.columns.len();
        for row in other.rows {
            let mut widened = vec![None; width];
            for (value, &target) in row.into_iter().zip(&mapping) {
                widened[target] = value;
            }
            self.rows.push(widened);
        }
    }
}

/// One predation event from a `*_captures.csv` artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub condition: String,
    pub time_sec: Option<f64>,
    /// 1-based kill sequence index.
    pub kill_number: Option<u32>,
    /// Boids in the predator's view at the moment of capture.
    pub boids_in_view: Option<u32>,
    /// Seconds since the previous capture in the same condition.
    pub time_delta: Option<f64>,
}

/// Descriptive statistics over one numeric field; `None` when undefined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Number of non-missing values.
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1); undefined below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Statistics over a group of run records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Group key (a condition label, a family prefix, or "all").
    pub label: String,
    /// Number of run records in the group.
    pub runs: usize,
    pub initial_count: FieldStats,
    pub first_kill_time: FieldStats,
    pub capture_rate: FieldStats,
    pub total_duration: FieldStats,
}

/// Per-family grouping with its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilySummary {
    pub family: ExperimentFamily,
    /// Sorted condition labels in this family.
    pub conditions: Vec<String>,
    pub stats: GroupStats,
}

impl FamilySummary {
    pub fn is_empty(&self) -> bool {
        self.stats.runs == 0
    }
}

/// Most and least efficient runs by capture rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extremes {
    pub most_efficient: RunRecord,
    pub least_efficient: RunRecord,
}

impl Extremes {
    /// Absolute capture-rate difference in kills per minute.
    pub fn rate_difference(&self) -> Option<f64> {
        Some(self.most_efficient.capture_rate? - self.least_efficient.capture_rate?)
    }

    /// Relative difference in percent; undefined when the lowest rate is zero.
    pub fn percent_difference(&self) -> Option<f64> {
        let high = self.most_efficient.capture_rate?;
        let low = self.least_efficient.capture_rate?;
        if low == 0.0 {
            return None;
        }
        Some((high / low - 1.0) * 100.0)
    }
}

/// First-degree least-squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    /// Number of points the line was fitted on.
    pub points: usize,
}

impl TrendLine {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// View-size statistics at capture time, plus the latency trend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionSummary {
    pub median_in_view: Option<f64>,
    pub min_in_view: Option<f64>,
    pub max_in_view: Option<f64>,
    /// Trend of inter-capture delta against boids in view.
    pub trend: Option<TrendLine>,
}

/// Metadata about the analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report title.
    pub title: String,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Data directory the artifacts were read from.
    pub data_dir: String,
    /// Number of run records parsed.
    pub runs: usize,
    /// Number of capture rows loaded.
    pub capture_rows: usize,
    /// Number of snapshot rows loaded.
    pub snapshot_rows: usize,
    /// Columns present in the snapshot union.
    pub snapshot_columns: Vec<String>,
    /// Artifacts that could not be read or parsed.
    pub files_skipped: usize,
    /// Chart files written alongside the report.
    pub charts: Vec<String>,
    /// Duration of the analysis in seconds.
    pub duration_seconds: f64,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Run records sorted by condition.
    pub records: Vec<RunRecord>,
    /// Statistics over all runs.
    pub overall: GroupStats,
    /// One entry per known family, possibly empty.
    pub families: Vec<FamilySummary>,
    /// Statistics per condition label.
    pub conditions: Vec<GroupStats>,
    pub confusion: ConfusionSummary,
    pub extremes: Extremes,
    /// Capture events with inter-event deltas.
    pub captures: Vec<CaptureEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| Some(v.to_string())).collect())
                .collect(),
        }
    }

    #[test]
    fn test_family_from_condition() {
        assert_eq!(
            ExperimentFamily::from_condition("A1"),
            Some(ExperimentFamily::Population)
        );
        assert_eq!(
            ExperimentFamily::from_condition("B3"),
            Some(ExperimentFamily::Cohesion)
        );
        assert_eq!(
            ExperimentFamily::from_condition("C2"),
            Some(ExperimentFamily::Confusion)
        );
        assert_eq!(ExperimentFamily::from_condition("D1"), None);
        assert_eq!(ExperimentFamily::from_condition(""), None);
    }

    #[test]
    fn test_family_display() {
        assert_eq!(
            ExperimentFamily::Cohesion.to_string(),
            "Experiment B: Cohesion Strength"
        );
    }

    #[test]
    fn test_table_append_widens_columns() {
        let mut base = table(&["condition", "time_sec"], &[&["A1", "1.0"]]);
        let other = table(&["time_sec", "condition", "extra"], &[&["2.0", "B1", "x"]]);

        base.append(other);

        assert_eq!(base.columns, vec!["condition", "time_sec", "extra"]);
        assert_eq!(base.len(), 2);
        assert_eq!(base.value(0, "extra"), None);
        assert_eq!(base.value(1, "condition"), Some("B1"));
        assert_eq!(base.value(1, "time_sec"), Some("2.0"));
        assert_eq!(base.value(1, "extra"), Some("x"));
    }

    #[test]
    fn test_table_append_into_empty() {
        let mut base = Table::default();
        base.append(table(&["a"], &[&["1"], &["2"]]));
        base.append(table(&["a"], &[&["1"]]));

        // Duplicates are kept
        assert_eq!(base.len(), 3);
        assert_eq!(base.value(2, "a"), Some("1"));
    }

    #[test]
    fn test_extremes_differences() {
        let mut fast = RunRecord::new("run_a2", "A2");
        fast.capture_rate = Some(6.0);
        let mut slow = RunRecord::new("run_b1", "B1");
        slow.capture_rate = Some(2.0);

        let extremes = Extremes {
            most_efficient: fast,
            least_efficient: slow.clone(),
        };
        assert_eq!(extremes.rate_difference(), Some(4.0));
        assert_eq!(extremes.percent_difference(), Some(200.0));

        let mut zero = slow;
        zero.capture_rate = Some(0.0);
        let extremes = Extremes {
            least_efficient: zero,
            ..extremes
        };
        assert_eq!(extremes.percent_difference(), None);
    }

    #[test]
    fn test_trend_predict() {
        let trend = TrendLine {
            slope: 2.0,
            intercept: 1.0,
            points: 3,
        };
        assert_eq!(trend.predict(3.0), 7.0);
    }
}
