//! Configuration schema types for `cssbundle.toml`
//!
//! Every section is optional. Missing values fall back to the conventional
//! Rails asset layout, so a project without a config file builds
//! `app/assets/stylesheets/*.scss` into `app/assets/builds`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where entry points come from and where bundles go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Glob pattern for entry points, relative to the project root
    #[serde(default = "default_entries")]
    pub entries: String,
    /// Output directory for bundles and copied assets
    #[serde(default = "default_out")]
    pub out: PathBuf,
    /// Ordered Sass include paths used to resolve module-style imports
    #[serde(default = "default_include")]
    pub include: Vec<PathBuf>,
}

fn default_entries() -> String {
    "app/assets/stylesheets/*.scss".to_string()
}

fn default_out() -> PathBuf {
    PathBuf::from("app/assets/builds")
}

fn default_include() -> Vec<PathBuf> {
    vec![PathBuf::from("node_modules"), PathBuf::from("node_modules/.pnpm/node_modules")]
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { entries: default_entries(), out: default_out(), include: default_include() }
    }
}

/// Sass compiler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SassConfig {
    /// Suppress warnings coming from imported dependencies
    #[serde(default = "default_true")]
    pub quiet_deps: bool,
    /// Regex matched against paths read during compilation; matching reads
    /// are reported as `Compiling <path>`
    #[serde(default = "default_resolve_filter")]
    pub resolve_filter: String,
}

fn default_true() -> bool {
    true
}

fn default_resolve_filter() -> String {
    r"app/assets/stylesheets.*scss".to_string()
}

impl Default for SassConfig {
    fn default() -> Self {
        Self { quiet_deps: true, resolve_filter: default_resolve_filter() }
    }
}

/// Loader rules for static assets referenced from stylesheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Extensions copied through verbatim (without leading dot)
    #[serde(default = "default_file_extensions")]
    pub file: Vec<String>,
}

fn default_file_extensions() -> Vec<String> {
    ["ttf", "otf", "svg", "eot", "woff", "woff2", "png", "jpg", "gif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { file: default_file_extensions() }
    }
}

/// Minimum browser major versions used for prefixing and downleveling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowsersConfig {
    #[serde(default)]
    pub android: Option<u32>,
    #[serde(default)]
    pub chrome: Option<u32>,
    #[serde(default)]
    pub edge: Option<u32>,
    #[serde(default)]
    pub firefox: Option<u32>,
    #[serde(default)]
    pub ie: Option<u32>,
    #[serde(default)]
    pub ios_saf: Option<u32>,
    #[serde(default)]
    pub opera: Option<u32>,
    #[serde(default)]
    pub safari: Option<u32>,
    #[serde(default)]
    pub samsung: Option<u32>,
}

impl Default for BrowsersConfig {
    fn default() -> Self {
        Self {
            android: None,
            chrome: Some(80),
            edge: Some(88),
            firefox: Some(78),
            ie: None,
            ios_saf: Some(13),
            opera: None,
            safari: Some(13),
            samsung: None,
        }
    }
}

impl BrowsersConfig {
    /// Whether at least one browser is targeted
    pub fn is_empty(&self) -> bool {
        [
            self.android,
            self.chrome,
            self.edge,
            self.firefox,
            self.ie,
            self.ios_saf,
            self.opera,
            self.safari,
            self.samsung,
        ]
        .iter()
        .all(Option::is_none)
    }
}

/// Utility-class framework invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilitiesConfig {
    /// Command used to expand framework directives. The input file is
    /// appended as `--input <path>`; generated CSS is read from stdout.
    #[serde(default = "default_utility_command")]
    pub command: Vec<String>,
}

fn default_utility_command() -> Vec<String> {
    vec!["tailwindcss".to_string()]
}

impl Default for UtilitiesConfig {
    fn default() -> Self {
        Self { command: default_utility_command() }
    }
}

/// Watch mode settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Extra directories whose changes trigger a rebuild of every entry
    /// (content scanned by the utility-class framework)
    #[serde(default = "default_watch_paths")]
    pub paths: Vec<PathBuf>,
}

fn default_debounce_ms() -> u32 {
    100
}

fn default_watch_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("app/views"), PathBuf::from("app/helpers"), PathBuf::from("app/javascript")]
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), paths: default_watch_paths() }
    }
}

/// Complete cssbundle.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub sass: SassConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub browsers: BrowsersConfig,
    #[serde(default)]
    pub utilities: UtilitiesConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "watch.debounce_ms")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cssbundle.toml: '{}' {}", self.field, self.message)
    }
}

impl BundleConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.paths.entries.trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "paths.entries".to_string(),
                message: "must be a non-empty glob pattern".to_string(),
            });
        } else if let Err(e) = glob::Pattern::new(&self.paths.entries) {
            errors.push(ConfigValidationError {
                field: "paths.entries".to_string(),
                message: format!("is not a valid glob pattern: {}", e),
            });
        }

        if self.paths.out.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "paths.out".to_string(),
                message: "must be a non-empty path".to_string(),
            });
        }

        if let Err(e) = regex::Regex::new(&self.sass.resolve_filter) {
            errors.push(ConfigValidationError {
                field: "sass.resolve_filter".to_string(),
                message: format!("is not a valid regex: {}", e),
            });
        }

        for ext in &self.loader.file {
            if ext.is_empty() || ext.starts_with('.') {
                errors.push(ConfigValidationError {
                    field: "loader.file".to_string(),
                    message: format!("extension '{}' must be non-empty without a leading dot", ext),
                });
            }
        }

        if self.browsers.is_empty() {
            errors.push(ConfigValidationError {
                field: "browsers".to_string(),
                message: "must target at least one browser".to_string(),
            });
        }

        if self.utilities.command.is_empty() || self.utilities.command[0].trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "utilities.command".to_string(),
                message: "must name an executable".to_string(),
            });
        }

        if self.watch.debounce_ms < 10 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be at least 10".to_string(),
            });
        }

        errors
    }
}
