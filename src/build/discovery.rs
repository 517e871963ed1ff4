//! Entry point discovery for the build system.
//!
//! Finds the stylesheets to compile by matching a glob pattern against
//! the project root.

use glob::glob;
use std::path::{Path, PathBuf};

/// Error during entry point discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
}

/// Discover entry points matching `pattern` under `base_dir`.
///
/// Returns regular files in the order the glob enumerates them. Content is
/// not inspected. A missing directory or no matches yields an empty list.
///
/// # Example
/// ```ignore
/// let entries = discover_entry_points(&root, "app/assets/stylesheets/*.scss")?;
/// ```
pub fn discover_entry_points(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let full_pattern = base_dir.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let paths =
        glob(&pattern_str).map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => {
                // Log but continue on unreadable entries
                tracing::warn!("error reading path: {}", e);
            }
        }
    }

    tracing::debug!(pattern = %pattern_str, count = files.len(), "discovered entry points");
    Ok(files)
}

/// Directory to watch for a pattern: the longest leading run of path
/// components without glob metacharacters.
pub fn pattern_base(base_dir: &Path, pattern: &str) -> PathBuf {
    let mut dir = base_dir.to_path_buf();
    let components: Vec<&str> = pattern.split('/').collect();
    // The last component names files, never a directory to descend into.
    for component in components.iter().take(components.len().saturating_sub(1)) {
        if component.contains(&['*', '?', '[', '{'][..]) {
            break;
        }
        dir.push(component);
    }
    dir
}
