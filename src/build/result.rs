//! Build result types.
//!
//! Outcomes of individual entry builds and of a whole run.

use std::path::PathBuf;
use std::time::Duration;

/// Status of a single entry build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Bundle written
    Success,
    /// Build failed with error
    Failed(String),
}

impl BuildStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildStatus::Failed(_))
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "success"),
            BuildStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of building a single entry point.
#[derive(Debug, Clone)]
pub struct EntryResult {
    /// Entry point that was built
    pub entry: PathBuf,
    /// Build status
    pub status: BuildStatus,
    /// Files written (bundle first, then assets)
    pub outputs: Vec<PathBuf>,
    /// Source files the bundle was produced from
    pub dependencies: Vec<PathBuf>,
    /// Build duration
    pub duration: Duration,
}

impl EntryResult {
    /// Create a successful result.
    pub fn success(entry: PathBuf, outputs: Vec<PathBuf>, dependencies: Vec<PathBuf>, duration: Duration) -> Self {
        Self { entry, status: BuildStatus::Success, outputs, dependencies, duration }
    }

    /// Create a failed result.
    pub fn failed(entry: PathBuf, error: String, duration: Duration) -> Self {
        Self { entry, status: BuildStatus::Failed(error), outputs: vec![], dependencies: vec![], duration }
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete run over every entry point.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Results for each entry, in the order they completed
    pub entries: Vec<EntryResult>,
    /// Total run duration
    pub total_duration: Duration,
}

impl RunSummary {
    /// Create a new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry result.
    pub fn add_result(&mut self, result: EntryResult) {
        self.entries.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Get the number of successful entries.
    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|r| r.status.is_success()).count()
    }

    /// Get the number of failed entries.
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the run succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Process exit code for the run: 1 if any entry failed, else 0.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Result for a given entry, if it was built.
    pub fn get(&self, entry: &std::path::Path) -> Option<&EntryResult> {
        self.entries.iter().find(|r| r.entry == entry)
    }

    /// Get failed entry results.
    pub fn failures(&self) -> Vec<&EntryResult> {
        self.entries.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a one-line summary for diagnostics.
    pub fn summary(&self) -> String {
        let total = self.entries.len();
        if self.is_success() {
            format!("{} of {} entries built in {:?}", self.success_count(), total, self.total_duration)
        } else {
            format!("{} of {} entries failed", self.failed_count(), total)
        }
    }
}
