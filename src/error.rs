//! Domain error types.
//!
//! Per-artifact failures are represented by [`LoadError`] and are always
//! caught by the loader; [`AnalysisError`] marks precondition violations
//! that make a report impossible.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a single tabular artifact.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is empty (no header row)")]
    Empty { path: PathBuf },

    #[error("{path}: line {line} has {found} fields, header has {expected}")]
    TooManyFields {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Precondition violations raised by the aggregation engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("no run records available; at least one summary artifact is required")]
    NoRunRecords,

    #[error("no run record has a numeric capture rate")]
    NoCaptureRates,
}
