//! Aggregation and derived-metric engine.
//!
//! [`Analysis::build`] turns the loaded run records and capture events into
//! everything the renderers consume; the renderers perform no aggregation
//! of their own.

pub mod aggregator;

pub use aggregator::*;

use crate::error::AnalysisError;
use crate::models::{
    CaptureEvent, ConfusionSummary, Extremes, FamilySummary, GroupStats, Report, ReportMetadata,
    RunRecord,
};

/// Aggregated view of one batch of experiment artifacts.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Run records sorted by condition.
    pub records: Vec<RunRecord>,
    /// Capture events in load order, with deltas filled in.
    pub captures: Vec<CaptureEvent>,
    pub overall: GroupStats,
    pub families: Vec<FamilySummary>,
    pub conditions: Vec<GroupStats>,
    pub confusion: ConfusionSummary,
    pub extremes: Extremes,
}

impl Analysis {
    /// Aggregate loaded tables.
    ///
    /// Fails only when no extremal run can be selected, i.e. there are no
    /// run records or none of them has a capture rate.
    pub fn build(
        mut records: Vec<RunRecord>,
        mut captures: Vec<CaptureEvent>,
    ) -> Result<Self, AnalysisError> {
        sort_by_condition(&mut records);
        compute_time_deltas(&mut captures);

        let extremes = select_extremes(&records)?;
        let all: Vec<&RunRecord> = records.iter().collect();

        Ok(Self {
            overall: group_stats("all", &all),
            families: family_summaries(&records),
            conditions: condition_stats(&records),
            confusion: confusion_summary(&captures),
            extremes,
            records,
            captures,
        })
    }

    /// Attach metadata to produce the final report model.
    pub fn into_report(self, metadata: ReportMetadata) -> Report {
        Report {
            metadata,
            records: self.records,
            overall: self.overall,
            families: self.families,
            conditions: self.conditions,
            confusion: self.confusion,
            extremes: self.extremes,
            captures: self.captures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(condition: &str, first_kill: Option<f64>, rate: f64) -> RunRecord {
        let mut r = RunRecord::new(format!("exp_{}", condition), condition);
        r.first_kill_time = first_kill;
        r.capture_rate = Some(rate);
        r
    }

    #[test]
    fn test_build_sorts_and_aggregates() {
        let records = vec![
            record("B1", Some(10.0), 2.0),
            record("A2", Some(4.0), 6.0),
            record("A1", None, 4.0),
        ];
        let captures = vec![
            CaptureEvent {
                condition: "A1".to_string(),
                time_sec: Some(2.0),
                kill_number: Some(1),
                boids_in_view: Some(10),
                time_delta: None,
            },
            CaptureEvent {
                condition: "A1".to_string(),
                time_sec: Some(5.0),
                kill_number: Some(2),
                boids_in_view: Some(12),
                time_delta: None,
            },
        ];

        let analysis = Analysis::build(records, captures).unwrap();

        let order: Vec<_> = analysis.records.iter().map(|r| r.condition.as_str()).collect();
        assert_eq!(order, vec!["A1", "A2", "B1"]);
        assert_eq!(analysis.overall.runs, 3);
        assert_eq!(analysis.overall.first_kill_time.count, 2);
        assert_eq!(analysis.overall.first_kill_time.mean, Some(7.0));
        assert_eq!(analysis.captures[1].time_delta, Some(3.0));
        assert_eq!(analysis.extremes.most_efficient.condition, "A2");
        assert_eq!(analysis.extremes.least_efficient.condition, "B1");
        assert_eq!(analysis.families[0].stats.runs, 2);
        assert_eq!(analysis.conditions.len(), 3);
    }

    #[test]
    fn test_build_without_records_fails() {
        let err = Analysis::build(Vec::new(), Vec::new()).unwrap_err();
        assert_eq!(err, AnalysisError::NoRunRecords);
    }
}
