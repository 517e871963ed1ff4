//! Configuration loading and discovery for `cssbundle.toml`
//!
//! Provides functions to find and load configuration.

use super::schema::BundleConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "cssbundle.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse cssbundle.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// Find cssbundle.toml by walking up from the current working directory.
///
/// # Returns
/// - `Some(path)` if a config file is found
/// - `None` if no config file is found
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find cssbundle.toml in `start` or the nearest ancestor that has one.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(CONFIG_FILE_NAME)).find(|candidate| candidate.is_file())
}

/// Load configuration from a cssbundle.toml file.
///
/// If a path is provided, loads from that file (which must exist).
/// Otherwise, uses `find_config()` to locate the config file and falls
/// back to the default configuration when none is found.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("site/cssbundle.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<BundleConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<BundleConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: BundleConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Configuration used when no cssbundle.toml is found.
pub fn default_config() -> BundleConfig {
    BundleConfig::default()
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the cssbundle.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
