//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.flockreport.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".flockreport.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input artifact settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Chart rendering settings.
    #[serde(default)]
    pub charts: ChartConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output directory for charts and reports (defaults to the data directory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Input artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory containing the simulator's per-run artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_summary_suffix")]
    pub summary_suffix: String,

    #[serde(default = "default_captures_suffix")]
    pub captures_suffix: String,

    #[serde(default = "default_snapshots_suffix")]
    pub snapshots_suffix: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            summary_suffix: default_summary_suffix(),
            captures_suffix: default_captures_suffix(),
            snapshots_suffix: default_snapshots_suffix(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("Assets/ExperimentData")
}

fn default_summary_suffix() -> String {
    "_summary.txt".to_string()
}

fn default_captures_suffix() -> String {
    "_captures.csv".to_string()
}

fn default_snapshots_suffix() -> String {
    "_snapshots.csv".to_string()
}

/// Chart rendering settings, handed to the chart renderer at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Render charts at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Font family for captions and labels.
    #[serde(default = "default_font_family")]
    pub font_family: String,

    #[serde(default = "default_caption_font_size")]
    pub caption_font_size: u32,

    #[serde(default = "default_label_font_size")]
    pub label_font_size: u32,

    /// Width of a single chart panel in pixels.
    #[serde(default = "default_panel_width")]
    pub panel_width: u32,

    /// Height of a single chart panel in pixels.
    #[serde(default = "default_panel_height")]
    pub panel_height: u32,

    /// Bins in the boids-in-view histogram.
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            font_family: default_font_family(),
            caption_font_size: default_caption_font_size(),
            label_font_size: default_label_font_size(),
            panel_width: default_panel_width(),
            panel_height: default_panel_height(),
            histogram_bins: default_histogram_bins(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

fn default_caption_font_size() -> u32 {
    20
}

fn default_label_font_size() -> u32 {
    14
}

fn default_panel_width() -> u32 {
    600
}

fn default_panel_height() -> u32 {
    500
}

fn default_histogram_bins() -> usize {
    20
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report title.
    #[serde(default = "default_title")]
    pub title: String,

    /// File name of the Markdown report.
    #[serde(default = "default_markdown_file")]
    pub markdown_file: String,

    /// File name of the JSON report.
    #[serde(default = "default_json_file")]
    pub json_file: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            markdown_file: default_markdown_file(),
            json_file: default_json_file(),
        }
    }
}

fn default_title() -> String {
    "Predation Experiment Analysis Report".to_string()
}

fn default_markdown_file() -> String {
    "analysis_report.md".to_string()
}

fn default_json_file() -> String {
    "analysis_report.json".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.data.data_dir = data_dir.clone();
        }

        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = Some(output_dir.clone());
        }

        if args.no_charts {
            self.charts.enabled = false;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Directory that charts and reports are written to.
    pub fn output_dir(&self) -> &Path {
        self.general
            .output_dir
            .as_deref()
            .unwrap_or(&self.data.data_dir)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
