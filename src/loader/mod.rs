//! Tabular loader for CSV run artifacts.
//!
//! Each CSV file is parsed independently and the successful ones are
//! concatenated into a single structural union. A file that fails to
//! parse is logged and skipped; it never aborts the batch.

use crate::error::LoadError;
use crate::models::{CaptureEvent, Table};
use crate::parser::{coerce_count, coerce_number};
use indicatif::ProgressBar;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const COL_CONDITION: &str = "condition";
pub const COL_TIME_SEC: &str = "time_sec";
pub const COL_KILL_NUMBER: &str = "kill_number";
pub const COL_BOIDS_IN_VIEW: &str = "boids_in_view";

/// Result of loading a set of CSV artifacts.
#[derive(Debug, Default)]
pub struct TableLoad {
    pub table: Table,
    /// Files that failed to load.
    pub skipped: Vec<PathBuf>,
}

/// Parse one CSV file with a header row.
///
/// Empty cells become missing values. Short rows are padded with missing
/// values; rows with more fields than the header are an error, as is a
/// file without a header row.
pub fn read_table(path: &Path) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(String::from)
        .collect();
    if columns.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    let width = columns.len();
    let mut table = Table::new(columns);

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        if record.len() > width {
            return Err(LoadError::TooManyFields {
                path: path.to_path_buf(),
                // 1-based, counting the header line
                line: index + 2,
                expected: width,
                found: record.len(),
            });
        }

        let mut row: Vec<Option<String>> = record
            .iter()
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
            .collect();
        row.resize(width, None);
        table.rows.push(row);
    }

    Ok(table)
}

/// Load and concatenate CSV artifacts in the given order.
pub fn load_tables(paths: &[PathBuf], progress: &ProgressBar) -> TableLoad {
    let mut load = TableLoad::default();

    for path in paths {
        progress.set_message(display_name(path));
        match read_table(path) {
            Ok(table) => {
                if table.is_empty() {
                    debug!("{} has a header but no rows", path.display());
                } else {
                    debug!("Loaded {} rows from {}", table.len(), path.display());
                }
                load.table.append(table);
            }
            Err(e) => {
                warn!("Error loading {}: {}", path.display(), e);
                load.skipped.push(path.clone());
            }
        }
        progress.inc(1);
    }

    load
}

/// Project a capture union table onto typed capture events.
///
/// Absent columns or unparseable cells become missing values; the delta
/// column is left unset.
pub fn captures_from_table(table: &Table) -> Vec<CaptureEvent> {
    (0..table.len())
        .map(|row| CaptureEvent {
            condition: table
                .value(row, COL_CONDITION)
                .unwrap_or_default()
                .to_string(),
            time_sec: table.value(row, COL_TIME_SEC).and_then(coerce_number),
            kill_number: table.value(row, COL_KILL_NUMBER).and_then(coerce_count),
            boids_in_view: table.value(row, COL_BOIDS_IN_VIEW).and_then(coerce_count),
            time_delta: None,
        })
        .collect()
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            temp_dir.path(),
            "a_captures.csv",
            "condition,time_sec,kill_number,boids_in_view\nA1,2.0,1,14\nA1,5.0,2,\n",
        );

        let table = read_table(&path).unwrap();
        assert_eq!(table.columns.len(), 4);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "boids_in_view"), Some("14"));
        assert_eq!(table.value(1, "boids_in_view"), None);
    }

    #[test]
    fn test_read_table_rejects_long_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(temp_dir.path(), "bad.csv", "a,b\n1,2,3\n");

        let err = read_table(&path).unwrap_err();
        assert!(matches!(err, LoadError::TooManyFields { line: 2, .. }));
    }

    #[test]
    fn test_load_tables_skips_bad_files() {
        let temp_dir = TempDir::new().unwrap();
        let first = write(temp_dir.path(), "r1_captures.csv", "condition,time_sec\nA1,1.0\nA1,2.0\n");
        let bad = write(temp_dir.path(), "r2_captures.csv", "condition,time_sec\nB1,1.0,9,9\n");
        let second = write(temp_dir.path(), "r3_captures.csv", "condition,time_sec\nC1,3.0\n");
        let missing = temp_dir.path().join("r4_captures.csv");

        let load = load_tables(&[first, bad, second, missing], &ProgressBar::hidden());

        assert_eq!(load.table.len(), 3);
        assert_eq!(load.skipped.len(), 2);
        // Concatenation order follows input order
        assert_eq!(load.table.value(0, "condition"), Some("A1"));
        assert_eq!(load.table.value(2, "condition"), Some("C1"));
    }

    #[test]
    fn test_empty_file_is_skipped_but_header_only_is_not() {
        let temp_dir = TempDir::new().unwrap();
        let blank = write(temp_dir.path(), "r1_captures.csv", "");
        let header_only = write(temp_dir.path(), "r2_captures.csv", "condition,time_sec\n");

        assert!(matches!(read_table(&blank), Err(LoadError::Empty { .. })));

        let load = load_tables(&[blank.clone(), header_only], &ProgressBar::hidden());
        assert_eq!(load.skipped, vec![blank]);
        assert!(load.table.is_empty());
        assert_eq!(load.table.columns, vec!["condition", "time_sec"]);
    }

    #[test]
    fn test_load_tables_empty_input() {
        let load = load_tables(&[], &ProgressBar::hidden());
        assert!(load.table.is_empty());
        assert!(load.table.columns.is_empty());
        assert!(load.skipped.is_empty());
    }

    #[test]
    fn test_captures_from_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            temp_dir.path(),
            "r_captures.csv",
            "condition,time_sec,kill_number,boids_in_view\nB2,3.5,1,20\nB2,oops,2,7\n",
        );
        let table = read_table(&path).unwrap();
        let events = captures_from_table(&table);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].condition, "B2");
        assert_eq!(events[0].time_sec, Some(3.5));
        assert_eq!(events[0].kill_number, Some(1));
        assert_eq!(events[0].boids_in_view, Some(20));
        assert_eq!(events[1].time_sec, None);
        assert_eq!(events[1].time_delta, None);
    }

    #[test]
    fn test_captures_from_table_without_view_column() {
        let mut table = Table::new(vec!["condition".to_string(), "time_sec".to_string()]);
        table.rows.push(vec![Some("A1".to_string()), Some("1.0".to_string())]);

        let events = captures_from_table(&table);
        assert_eq!(events[0].boids_in_view, None);
        assert_eq!(events[0].kill_number, None);
    }
}
