//! FlockReport - predator/prey boid experiment analyzer
//!
//! A CLI tool that loads the per-run summaries and CSV logs written by the
//! flocking simulator, aggregates them by experiment condition, and writes
//! comparison charts and an analysis report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad config, no usable run summaries, write failure, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod parser;
mod report;
mod scanner;

use analysis::Analysis;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use models::ReportMetadata;
use scanner::{ArtifactScanner, ArtifactSet, ScanConfig};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Configuration decides verbosity, so it is read before logging starts
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config)?;

    info!("FlockReport v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run_analysis(args, config) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .flockreport.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to set the data directory, chart fonts and report names.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the complete analysis with a merged configuration. Returns the exit code.
fn run_analysis(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let data_dir = config.data.data_dir.clone();
    let scan_config = ScanConfig::from(&config.data);

    // Step 1: Locate artifacts
    println!("📂 Loading experiment data from {}", data_dir.display());
    let artifact_scanner = ArtifactScanner::new(data_dir.clone(), scan_config.clone());
    let artifacts = artifact_scanner.scan();
    info!(
        "Found {} summaries, {} capture logs, {} snapshot logs",
        artifacts.summaries.len(),
        artifacts.captures.len(),
        artifacts.snapshots.len()
    );

    if args.dry_run {
        return handle_dry_run(&artifacts);
    }

    // Step 2: Parse and load
    let progress = make_progress(artifacts.len(), args.quiet);
    let summaries = parser::load_summaries(&artifacts.summaries, &scan_config, &progress);
    let captures = loader::load_tables(&artifacts.captures, &progress);
    let snapshots = loader::load_tables(&artifacts.snapshots, &progress);
    progress.finish_and_clear();

    let skipped: Vec<_> = summaries
        .skipped
        .iter()
        .chain(&captures.skipped)
        .chain(&snapshots.skipped)
        .collect();
    for path in &skipped {
        println!("   ⚠️  Skipped {}", path.display());
    }

    let mut conditions: Vec<&str> = summaries
        .records
        .iter()
        .map(|r| r.condition.as_str())
        .collect();
    conditions.sort_unstable();
    conditions.dedup();
    println!("   Loaded {} experiments", summaries.records.len());
    println!("   Conditions: {}", conditions.join(", "));

    // Step 3: Aggregate
    let capture_events = loader::captures_from_table(&captures.table);
    let analysis = Analysis::build(summaries.records, capture_events)
        .with_context(|| format!("Cannot analyze data in {}", data_dir.display()))?;

    if !args.quiet {
        print!("{}", report::generate_console_table(&analysis.records));
    }

    // Step 4: Render charts
    let output_dir = config.output_dir().to_path_buf();
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            output_dir.display()
        )
    })?;

    let charts = if config.charts.enabled {
        println!("\n📊 Generating charts...");
        let renderer = report::ChartRenderer::new(config.charts.clone(), output_dir.clone());
        let written = renderer.render_all(&analysis);
        for name in &written {
            println!("   Saved: {}", name);
        }
        written
    } else {
        debug!("Chart rendering disabled");
        Vec::new()
    };

    // Step 5: Build and save the report
    println!("\n📝 Generating report...");

    let metadata = ReportMetadata {
        title: config.report.title.clone(),
        analysis_date: Utc::now(),
        data_dir: data_dir.display().to_string(),
        runs: analysis.records.len(),
        capture_rows: captures.table.len(),
        snapshot_rows: snapshots.table.len(),
        snapshot_columns: snapshots.table.columns.clone(),
        files_skipped: skipped.len(),
        charts,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = analysis.into_report(metadata);

    let (output, file_name) = match args.format {
        OutputFormat::Json => (
            report::generate_json_report(&report)?,
            &config.report.json_file,
        ),
        OutputFormat::Markdown => (
            report::generate_markdown_report(&report),
            &config.report.markdown_file,
        ),
    };
    let output_path = output_dir.join(file_name);
    report::write_report(&output, &output_path)?;

    if !skipped.is_empty() {
        warn!("{} artifact(s) were skipped", skipped.len());
    }

    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        output_path.display()
    );

    Ok(0)
}

/// Handle --dry-run: print located artifacts, exit.
fn handle_dry_run(artifacts: &ArtifactSet) -> Result<i32> {
    println!("\n🔍 Dry run: listing artifacts (nothing is parsed)...\n");

    if artifacts.is_empty() {
        println!("   No matching artifacts found.");
    } else {
        for (label, paths) in [
            ("Summaries", &artifacts.summaries),
            ("Capture logs", &artifacts.captures),
            ("Snapshot logs", &artifacts.snapshots),
        ] {
            println!("   {} ({}):", label, paths.len());
            for path in paths {
                println!("     📄 {}", path.display());
            }
        }
        println!("\n   Total: {} files", artifacts.len());
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Progress bar over artifact loading; hidden in quiet mode.
fn make_progress(len: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Where the active configuration came from.
#[derive(Debug)]
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    Defaults,
    /// The default file exists but could not be read.
    Fallback(String),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => {
                info!("Loaded default config from {}", config::CONFIG_FILE)
            }
            ConfigSource::Defaults => debug!("No config file found, using defaults"),
            ConfigSource::Fallback(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// An explicit `--config` path must load; a broken default file falls
/// back to the built-in defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => Ok((Config::default(), ConfigSource::Fallback(format!("{:#}", e)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/ExperimentData")
    }

    fn make_args(data_dir: PathBuf, output_dir: PathBuf) -> Args {
        Args {
            data_dir: Some(data_dir),
            output_dir: Some(output_dir),
            config: None,
            format: OutputFormat::Markdown,
            no_charts: true,
            verbose: false,
            quiet: true,
            dry_run: false,
            init_config: false,
        }
    }

    fn run(args: Args) -> Result<i32> {
        let mut config = Config::default();
        config.merge_with_args(&args);
        run_analysis(args, config)
    }

    #[test]
    fn test_markdown_report_from_fixtures() {
        let out = TempDir::new().unwrap();
        let args = make_args(fixture_dir(), out.path().to_path_buf());

        assert_eq!(run(args).unwrap(), 0);

        let report = std::fs::read_to_string(out.path().join("analysis_report.md")).unwrap();
        let conditions = ["A1", "A2", "B1", "B2", "B3", "C1"];
        let mut last = 0;
        for condition in conditions {
            let row = format!("| {} |", condition);
            assert_eq!(report.matches(&row).count(), 1, "row for {}", condition);
            let pos = report.find(&row).unwrap();
            assert!(pos > last, "{} out of order", condition);
            last = pos;
        }

        assert!(report.contains("Most efficient condition: **A2**"));
        assert!(report.contains("Least efficient condition: **B3** (0.00/min)"));
        // Zero minimum rate: no percentage
        assert!(report.contains("- Efficiency gap: 6.50/min\n"));
        assert!(report.contains("- **Files Skipped:** 1"));
        // B3 never recorded a kill
        assert!(report.contains("| B3 | 50 | N/A | 0.00 | 180.00 |"));
        assert!(report.contains("- **Snapshot Rows:** 4 (4 columns)"));
    }

    #[test]
    fn test_json_report_from_fixtures() {
        let out = TempDir::new().unwrap();
        let mut args = make_args(fixture_dir(), out.path().to_path_buf());
        args.format = OutputFormat::Json;

        assert_eq!(run(args).unwrap(), 0);

        let json = std::fs::read_to_string(out.path().join("analysis_report.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["records"].as_array().map(Vec::len), Some(6));
        assert_eq!(value["metadata"]["capture_rows"], 7);
        assert_eq!(value["captures"][0]["time_delta"], serde_json::Value::Null);
        assert_eq!(value["captures"][1]["time_delta"], 3.0);
        assert!(value["confusion"]["trend"]["slope"].is_number());
    }

    #[test]
    fn test_empty_directory_fails_loudly() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let args = make_args(data.path().to_path_buf(), out.path().to_path_buf());

        let err = run(args).unwrap_err();
        assert!(format!("{:#}", err).contains("no run records"));
        assert!(!out.path().join("analysis_report.md").exists());
    }

    #[test]
    fn test_config_file_verbose_raises_log_level() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(config::CONFIG_FILE);
        std::fs::write(&path, "[general]\nverbose = true\n").unwrap();

        let mut args = make_args(temp_dir.path().to_path_buf(), temp_dir.path().to_path_buf());
        args.quiet = false;
        args.config = Some(path.clone());

        let (mut config, source) = load_config(&args).unwrap();
        config.merge_with_args(&args);
        assert!(matches!(source, ConfigSource::Explicit(p) if p == path));
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::ERROR);
    }

    #[test]
    fn test_explicit_config_must_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = make_args(temp_dir.path().to_path_buf(), temp_dir.path().to_path_buf());
        args.config = Some(temp_dir.path().join("absent.toml"));

        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let out = TempDir::new().unwrap();
        let mut args = make_args(fixture_dir(), out.path().to_path_buf());
        args.dry_run = true;

        assert_eq!(run(args).unwrap(), 0);
        assert!(!out.path().join("analysis_report.md").exists());
    }
}
