//! Report and chart rendering.

pub mod charts;
pub mod generator;

pub use charts::ChartRenderer;
pub use generator::*;
