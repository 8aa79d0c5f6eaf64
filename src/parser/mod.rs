//! Parsers for per-run text artifacts.

pub mod summary;

pub use summary::*;
