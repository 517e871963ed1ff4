//! Build context: configuration and process flags for one run.

use crate::config::BundleConfig;
use crate::transform::{browser_targets, ChainOptions};
use std::path::{Path, PathBuf};

/// Immutable settings shared by every build in a run.
///
/// Process flags (`--minify`, `--watch`) and the `DEBUG` environment
/// variable are read once at startup and stored here; nothing downstream
/// consults argv or the environment again.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: BundleConfig,
    /// Project root directory; relative config paths resolve against it
    project_root: PathBuf,
    /// Include the minify stage
    minify: bool,
    /// Keep running and rebuild on changes
    watch: bool,
    /// Raise diagnostic verbosity
    debug: bool,
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// # Arguments
    /// - `config` - The loaded configuration
    /// - `project_root` - The project root directory
    pub fn new(config: BundleConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, minify: false, watch: false, debug: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Entry point glob pattern, relative to the project root.
    pub fn entry_pattern(&self) -> &str {
        &self.config.paths.entries
    }

    /// Get the output directory (resolved to absolute path).
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.out)
    }

    /// Sass include paths, resolved against the project root, in order.
    pub fn include_paths(&self) -> Vec<PathBuf> {
        self.config.paths.include.iter().map(|p| self.resolve_path(p)).collect()
    }

    /// Whether minification is enabled.
    pub fn is_minify(&self) -> bool {
        self.minify
    }

    /// Whether watch mode is enabled.
    pub fn is_watch(&self) -> bool {
        self.watch
    }

    /// Whether debug diagnostics are enabled.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Set minify mode.
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Set watch mode.
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Set debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Options for the transform chain of this run.
    pub fn chain_options(&self) -> ChainOptions {
        ChainOptions {
            minify: self.minify,
            browsers: browser_targets(&self.config.browsers),
            utility_command: self.config.utilities.command.clone(),
            project_root: self.project_root.clone(),
        }
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        crate::config::loader::resolve_path(&self.project_root, path)
    }
}

/// Interpret the `DEBUG` environment variable.
///
/// Any non-empty value other than `0` or `false` enables debug output.
pub fn debug_enabled(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) => !(v == "0" || v.eq_ignore_ascii_case("false")),
    }
}
