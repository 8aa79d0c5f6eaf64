//! Artifact locator for experiment output directories.
//!
//! This module enumerates the per-run files written by the simulator
//! (`*_summary.txt`, `*_captures.csv`, `*_snapshots.csv`) in a single
//! data directory.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Kind of per-run artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Summary,
    Captures,
    Snapshots,
}

/// File-name suffixes identifying each artifact kind.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub summary_suffix: String,
    pub captures_suffix: String,
    pub snapshots_suffix: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            summary_suffix: "_summary.txt".to_string(),
            captures_suffix: "_captures.csv".to_string(),
            snapshots_suffix: "_snapshots.csv".to_string(),
        }
    }
}

impl From<&crate::config::DataConfig> for ScanConfig {
    fn from(config: &crate::config::DataConfig) -> Self {
        Self {
            summary_suffix: config.summary_suffix.clone(),
            captures_suffix: config.captures_suffix.clone(),
            snapshots_suffix: config.snapshots_suffix.clone(),
        }
    }
}

impl ScanConfig {
    /// Suffix for an artifact kind.
    pub fn suffix(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Summary => &self.summary_suffix,
            ArtifactKind::Captures => &self.captures_suffix,
            ArtifactKind::Snapshots => &self.snapshots_suffix,
        }
    }

    /// Classify a file name, if it matches any artifact suffix.
    pub fn classify(&self, file_name: &str) -> Option<ArtifactKind> {
        [
            ArtifactKind::Summary,
            ArtifactKind::Captures,
            ArtifactKind::Snapshots,
        ]
        .into_iter()
        .find(|&kind| {
            let suffix = self.suffix(kind);
            file_name.len() > suffix.len() && file_name.ends_with(suffix)
        })
    }

    /// Run name of an artifact: its file name without the kind suffix.
    pub fn run_name(&self, path: &Path, kind: ArtifactKind) -> String {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        file_name
            .strip_suffix(self.suffix(kind))
            .map(String::from)
            .unwrap_or(file_name)
    }
}

/// Located artifacts, one list per kind.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    pub summaries: Vec<PathBuf>,
    pub captures: Vec<PathBuf>,
    pub snapshots: Vec<PathBuf>,
}

impl ArtifactSet {
    /// Total number of located files.
    pub fn len(&self) -> usize {
        self.summaries.len() + self.captures.len() + self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, kind: ArtifactKind, path: PathBuf) {
        match kind {
            ArtifactKind::Summary => self.summaries.push(path),
            ArtifactKind::Captures => self.captures.push(path),
            ArtifactKind::Snapshots => self.snapshots.push(path),
        }
    }
}

/// Read-only scanner over one data directory.
pub struct ArtifactScanner {
    config: ScanConfig,
    data_dir: PathBuf,
}

impl ArtifactScanner {
    /// Create a new scanner for a data directory.
    pub fn new(data_dir: PathBuf, config: ScanConfig) -> Self {
        Self { config, data_dir }
    }

    /// Scan the data directory (non-recursively) for artifacts.
    ///
    /// A missing or unreadable directory yields an empty set. Paths are
    /// sorted within each kind so that runs are always reported in the
    /// same order.
    pub fn scan(&self) -> ArtifactSet {
        let mut set = ArtifactSet::default();

        if !self.data_dir.is_dir() {
            warn!("Data directory not found: {}", self.data_dir.display());
            return set;
        }

        let walker = WalkDir::new(&self.data_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Cannot read entry in {}: {}", self.data_dir.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if let Some(kind) = self.config.classify(&name) {
                debug!("Found {:?} artifact: {}", kind, entry.path().display());
                set.push(kind, entry.into_path());
            }
        }

        set.summaries.sort();
        set.captures.sort();
        set.snapshots.sort();

        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_classifies_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("run1_summary.txt"), "Condition: A1").unwrap();
        std::fs::write(dir.join("run1_captures.csv"), "condition,time_sec").unwrap();
        std::fs::write(dir.join("run1_snapshots.csv"), "t").unwrap();
        std::fs::write(dir.join("run2_summary.txt"), "Condition: B1").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignore me").unwrap();

        let scanner = ArtifactScanner::new(dir.to_path_buf(), ScanConfig::default());
        let set = scanner.scan();

        assert_eq!(set.summaries.len(), 2);
        assert_eq!(set.captures.len(), 1);
        assert_eq!(set.snapshots.len(), 1);
        assert_eq!(set.len(), 4);
        assert!(set.summaries[0].ends_with("run1_summary.txt"));
    }

    #[test]
    fn test_scan_is_not_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("old");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("run1_summary.txt"), "Condition: A1").unwrap();

        let scanner =
            ArtifactScanner::new(temp_dir.path().to_path_buf(), ScanConfig::default());
        assert!(scanner.scan().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_symlinked_artifacts() {
        let source_dir = TempDir::new().unwrap();
        let data_dir = TempDir::new().unwrap();
        let target = source_dir.path().join("exp_A1_summary.txt");
        std::fs::write(&target, "Condition: A1").unwrap();
        std::os::unix::fs::symlink(&target, data_dir.path().join("exp_A1_summary.txt")).unwrap();

        let scanner = ArtifactScanner::new(data_dir.path().to_path_buf(), ScanConfig::default());
        let set = scanner.scan();

        assert_eq!(set.summaries.len(), 1);
        assert!(set.summaries[0].ends_with("exp_A1_summary.txt"));
        assert_eq!(
            std::fs::read_to_string(&set.summaries[0]).unwrap(),
            "Condition: A1"
        );
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = ArtifactScanner::new(temp_dir.path().join("absent"), ScanConfig::default());
        let set = scanner.scan();

        assert!(set.is_empty());
        assert!(set.summaries.is_empty());
        assert!(set.captures.is_empty());
        assert!(set.snapshots.is_empty());
    }

    #[test]
    fn test_classify_requires_run_name() {
        let config = ScanConfig::default();
        assert_eq!(config.classify("_summary.txt"), None);
        assert_eq!(config.classify("x_summary.txt"), Some(ArtifactKind::Summary));
        assert_eq!(config.classify("x_captures.csv"), Some(ArtifactKind::Captures));
        assert_eq!(config.classify("x_summary.csv"), None);
    }

    #[test]
    fn test_run_name() {
        let config = ScanConfig::default();
        let name = config.run_name(Path::new("/data/exp_A1_summary.txt"), ArtifactKind::Summary);
        assert_eq!(name, "exp_A1");
    }
}
