//! Parser for `*_summary.txt` run artifacts.
//!
//! A summary is a list of `Key: Value` lines, optionally framed by
//! separator lines containing `===`. Values are cleaned of their unit
//! suffixes at parse time and coerced to numbers when the record is built.

use crate::models::RunRecord;
use crate::scanner::{ArtifactKind, ScanConfig};
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const KEY_CONDITION: &str = "Condition";
pub const KEY_INITIAL_COUNT: &str = "Initial Boid Count";
pub const KEY_FIRST_KILL_TIME: &str = "First Kill Time";
pub const KEY_CAPTURE_RATE: &str = "Capture Rate";
pub const KEY_TOTAL_DURATION: &str = "Total Duration";
pub const KEY_TOTAL_KILLS: &str = "Total Kills";

const KNOWN_KEYS: [&str; 6] = [
    KEY_CONDITION,
    KEY_INITIAL_COUNT,
    KEY_FIRST_KILL_TIME,
    KEY_CAPTURE_RATE,
    KEY_TOTAL_DURATION,
    KEY_TOTAL_KILLS,
];

const SEPARATOR: &str = "===";
const MISSING_TOKEN: &str = "N/A";
const RATE_SUFFIX: &str = "per minute";

/// Raw key/value pairs of one summary artifact.
pub type SummaryFields = BTreeMap<String, String>;

/// Parse summary text into cleaned key/value pairs.
///
/// Separator lines and lines without a colon are skipped. Each remaining
/// line is split on its first colon only. A repeated key keeps its last
/// value.
pub fn parse_summary(text: &str) -> SummaryFields {
    let mut fields = SummaryFields::new();

    for line in text.lines() {
        if line.contains(SEPARATOR) {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        fields.insert(key.to_string(), clean_value(value));
    }

    fields
}

/// Strip unit suffixes anchored at the end of a value.
///
/// `"3.5 per minute"` becomes `"3.5"` and `"42.0s"` becomes `"42.0"`. A
/// trailing `s` is only removed when what precedes it is a number, so
/// text values pass through untouched.
pub fn clean_value(raw: &str) -> String {
    let value = raw.trim();
    let value = value
        .strip_suffix(RATE_SUFFIX)
        .map(str::trim_end)
        .unwrap_or(value);

    if let Some(number) = value.strip_suffix('s') {
        let number = number.trim_end();
        if number.parse::<f64>().is_ok() {
            return number.to_string();
        }
    }

    value.to_string()
}

/// Best-effort numeric coercion; invalid or non-finite input is missing.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a non-negative whole number, accepting forms like `"50.0"`.
pub fn coerce_count(raw: &str) -> Option<u32> {
    coerce_number(raw)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32)
}

/// Coerce a first-kill time, where `N/A` marks a run without kills.
pub fn coerce_first_kill_time(raw: &str) -> Option<f64> {
    coerce_number(&raw.replace(MISSING_TOKEN, ""))
}

/// Build a typed run record from parsed fields.
pub fn record_from_fields(run_name: &str, fields: &SummaryFields) -> RunRecord {
    let get = |key: &str| fields.get(key).map(String::as_str);

    let condition = match get(KEY_CONDITION) {
        Some(c) => c.to_string(),
        None => {
            warn!("Run {} has no {} entry", run_name, KEY_CONDITION);
            String::new()
        }
    };

    let mut record = RunRecord::new(run_name, condition);
    record.initial_count = get(KEY_INITIAL_COUNT).and_then(coerce_count);
    record.first_kill_time = get(KEY_FIRST_KILL_TIME).and_then(coerce_first_kill_time);
    record.capture_rate = get(KEY_CAPTURE_RATE).and_then(coerce_number);
    record.total_duration = get(KEY_TOTAL_DURATION).and_then(coerce_number);
    record.total_kills = get(KEY_TOTAL_KILLS).and_then(coerce_count);

    for (key, value) in fields {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            debug!("Run {}: keeping unrecognized key '{}'", run_name, key);
            record.extra.insert(key.clone(), value.clone());
        }
    }

    record
}

/// Result of loading all summary artifacts.
#[derive(Debug, Default)]
pub struct SummaryLoad {
    pub records: Vec<RunRecord>,
    /// Files that could not be read.
    pub skipped: Vec<PathBuf>,
}

/// Read and parse every summary artifact.
///
/// Unreadable files are logged and skipped; files yielding no key/value
/// pairs are dropped.
pub fn load_summaries(
    paths: &[PathBuf],
    config: &ScanConfig,
    progress: &ProgressBar,
) -> SummaryLoad {
    let mut load = SummaryLoad::default();

    for path in paths {
        let run_name = config.run_name(path, ArtifactKind::Summary);
        progress.set_message(run_name.clone());
        progress.inc(1);

        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                load.skipped.push(path.clone());
                continue;
            }
        };

        let fields = parse_summary(&text);
        if fields.is_empty() {
            debug!("No key/value pairs in {}, dropping", path.display());
            continue;
        }

        load.records.push(record_from_fields(&run_name, &fields));
    }

    load
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "=== Experiment Summary ===\n\
Condition: A1\n\
Initial Boid Count: 50\n\
First Kill Time: 12.5s\n\
Capture Rate: 3.5 per minute\n\
Total Duration: 205.7s\n\
Total Kills: 12\n\
==========\n";

    #[test]
    fn test_separator_with_colon_is_skipped() {
        let fields = parse_summary("=== Run: A1 ===\nCondition: A1\n");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("Condition").map(String::as_str), Some("A1"));
        assert!(!fields.keys().any(|k| k.contains("===")));
    }

    #[test]
    fn test_split_on_first_colon_only() {
        let fields = parse_summary("Started At: 12:30:05\n");
        assert_eq!(
            fields.get("Started At").map(String::as_str),
            Some("12:30:05")
        );
    }

    #[test]
    fn test_lines_without_colon_are_ignored() {
        let fields = parse_summary("just text\n\nCondition: B2\n");
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_clean_value_strips_units() {
        assert_eq!(clean_value(" 42.0s "), "42.0");
        assert_eq!(clean_value("3.5 per minute"), "3.5");
        assert_eq!(clean_value("N/A"), "N/A");
        // Text values are not corrupted
        assert_eq!(clean_value("Boids"), "Boids");
        assert_eq!(clean_value("Cs"), "Cs");
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&clean_value("42.0s")), Some(42.0));
        assert_eq!(coerce_number(&clean_value("3.5 per minute")), Some(3.5));
        assert_eq!(coerce_number("abc"), None);
        assert_eq!(coerce_number(""), None);
        assert_eq!(coerce_number("NaN"), None);
    }

    #[test]
    fn test_first_kill_time_na_is_missing() {
        assert_eq!(coerce_first_kill_time("N/A"), None);
        assert_eq!(coerce_first_kill_time("7.25"), Some(7.25));
    }

    #[test]
    fn test_coerce_count() {
        assert_eq!(coerce_count("50"), Some(50));
        assert_eq!(coerce_count("50.0"), Some(50));
        assert_eq!(coerce_count("50.5"), None);
        assert_eq!(coerce_count("-1"), None);
    }

    #[test]
    fn test_record_from_sample() {
        let fields = parse_summary(SAMPLE);
        let record = record_from_fields("exp_A1", &fields);

        assert_eq!(record.run_name, "exp_A1");
        assert_eq!(record.condition, "A1");
        assert_eq!(record.initial_count, Some(50));
        assert_eq!(record.first_kill_time, Some(12.5));
        assert_eq!(record.capture_rate, Some(3.5));
        assert_eq!(record.total_duration, Some(205.7));
        assert_eq!(record.total_kills, Some(12));
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_record_with_invalid_values() {
        let fields = parse_summary("Condition: C1\nCapture Rate: fast\nFirst Kill Time: N/A\nSeed: 7\n");
        let record = record_from_fields("exp_C1", &fields);

        assert_eq!(record.capture_rate, None);
        assert_eq!(record.first_kill_time, None);
        assert_eq!(record.extra.get("Seed").map(String::as_str), Some("7"));
    }

    #[test]
    fn test_load_summaries_drops_empty_files() {
        let temp_dir = TempDir::new().unwrap();
        let full = temp_dir.path().join("exp_A1_summary.txt");
        let empty = temp_dir.path().join("exp_A2_summary.txt");
        let missing = temp_dir.path().join("exp_A3_summary.txt");
        std::fs::write(&full, SAMPLE).unwrap();
        std::fs::write(&empty, "==========\n\n").unwrap();

        let load = load_summaries(
            &[full, empty, missing],
            &ScanConfig::default(),
            &ProgressBar::hidden(),
        );

        assert_eq!(load.records.len(), 1);
        assert_eq!(load.records[0].run_name, "exp_A1");
        assert_eq!(load.skipped.len(), 1);
    }
}
