//! Per-entry build configuration.
//!
//! A [`BuildConfig`] describes everything needed to bundle one entry
//! point. It is created once per entry at startup, never mutated, and
//! owned by the build of that entry.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::build::{BuildContext, BuildError};

/// Platform the bundle is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Browser,
}

/// How a referenced non-stylesheet file is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loader {
    /// Copy the file verbatim into the output directory and point the
    /// reference at the copy
    File,
}

/// Verbosity of the bundler's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Debug,
}

impl LogLevel {
    pub fn from_debug(debug: bool) -> Self {
        if debug {
            LogLevel::Debug
        } else {
            LogLevel::Error
        }
    }

    pub fn is_debug(self) -> bool {
        self == LogLevel::Debug
    }

    /// Matching tracing level.
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Debug => tracing::Level::DEBUG,
        }
    }
}

/// Sass loader settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SassOptions {
    /// Ordered include paths for module-style imports
    pub include_paths: Vec<PathBuf>,
    /// Suppress warnings from imported dependencies
    pub quiet_deps: bool,
}

/// Plugins attached to a build, applied in order.
#[derive(Debug, Clone)]
pub enum Plugin {
    /// Reports every stylesheet read whose path matches `filter`.
    /// Observes only; it has no say in how imports resolve.
    ResolveLogger { filter: Regex },
    /// Compiles Sass sources and runs the transform chain on the result
    Sass(SassOptions),
}

/// Configuration for bundling a single entry point.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Entry stylesheet
    pub entry: PathBuf,
    /// Output directory
    pub out_dir: PathBuf,
    /// Inline imports into one bundle (always set)
    pub bundle: bool,
    /// Target platform
    pub platform: Platform,
    /// Whether the run minifies
    pub minify: bool,
    /// Bundler diagnostic level
    pub log_level: LogLevel,
    /// Whether the run keeps watching for changes
    pub watch: bool,
    /// Loader rule per file extension (lowercase, without dot)
    pub loaders: BTreeMap<String, Loader>,
    /// Ordered plugins
    pub plugins: Vec<Plugin>,
}

impl BuildConfig {
    /// Assemble the configuration for `entry` from the run's context.
    pub fn for_entry(ctx: &BuildContext, entry: PathBuf) -> Result<Self, BuildError> {
        let config = ctx.config();
        let filter = Regex::new(&config.sass.resolve_filter)?;

        let loaders = config
            .loader
            .file
            .iter()
            .map(|ext| (ext.to_ascii_lowercase(), Loader::File))
            .collect();

        Ok(Self {
            entry,
            out_dir: ctx.out_dir(),
            bundle: true,
            platform: Platform::Browser,
            minify: ctx.is_minify(),
            log_level: LogLevel::from_debug(ctx.is_debug()),
            watch: ctx.is_watch(),
            loaders,
            plugins: vec![
                Plugin::ResolveLogger { filter },
                Plugin::Sass(SassOptions {
                    include_paths: ctx.include_paths(),
                    quiet_deps: config.sass.quiet_deps,
                }),
            ],
        })
    }

    /// Loader rule for a file extension, if any.
    pub fn loader_for(&self, extension: &str) -> Option<Loader> {
        self.loaders.get(&extension.to_ascii_lowercase()).copied()
    }

    /// The Sass plugin's settings.
    pub fn sass_options(&self) -> Option<&SassOptions> {
        self.plugins.iter().find_map(|p| match p {
            Plugin::Sass(options) => Some(options),
            _ => None,
        })
    }

    /// Filters of every resolution logger, in plugin order.
    pub fn resolve_filters(&self) -> impl Iterator<Item = &Regex> {
        self.plugins.iter().filter_map(|p| match p {
            Plugin::ResolveLogger { filter } => Some(filter),
            _ => None,
        })
    }

    /// Name of the bundle: the entry's file stem.
    pub fn bundle_name(&self) -> String {
        self.entry.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "bundle".to_string())
    }

    /// Path the bundled CSS is written to.
    pub fn output_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}.css", self.bundle_name()))
    }

    /// Directory relative references in the entry resolve against.
    pub fn resolve_dir(&self) -> &Path {
        self.entry.parent().unwrap_or_else(|| Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    fn context() -> BuildContext {
        BuildContext::new(default_config(), PathBuf::from("/project"))
    }

    fn entry() -> PathBuf {
        PathBuf::from("/project/app/assets/stylesheets/application.scss")
    }

    #[test]
    fn test_for_entry_defaults() {
        let config = BuildConfig::for_entry(&context(), entry()).unwrap();
        assert!(config.bundle);
        assert_eq!(config.platform, Platform::Browser);
        assert!(!config.minify);
        assert!(!config.watch);
        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(config.out_dir, PathBuf::from("/project/app/assets/builds"));
    }

    #[test]
    fn test_for_entry_copies_flags() {
        let ctx = context().with_minify(true).with_watch(true).with_debug(true);
        let config = BuildConfig::for_entry(&ctx, entry()).unwrap();
        assert!(config.minify);
        assert!(config.watch);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_file_loader_extensions() {
        let config = BuildConfig::for_entry(&context(), entry()).unwrap();
        for ext in ["ttf", "otf", "svg", "eot", "woff", "woff2", "png", "jpg", "gif"] {
            assert_eq!(config.loader_for(ext), Some(Loader::File), "{}", ext);
        }
        assert_eq!(config.loader_for("PNG"), Some(Loader::File));
        assert_eq!(config.loader_for("webp"), None);
    }

    #[test]
    fn test_plugin_order() {
        let config = BuildConfig::for_entry(&context(), entry()).unwrap();
        assert!(matches!(config.plugins[0], Plugin::ResolveLogger { .. }));
        assert!(matches!(config.plugins[1], Plugin::Sass(_)));

        let sass = config.sass_options().unwrap();
        assert!(sass.quiet_deps);
        assert_eq!(sass.include_paths[0], PathBuf::from("/project/node_modules"));
        assert_eq!(sass.include_paths[1], PathBuf::from("/project/node_modules/.pnpm/node_modules"));
    }

    #[test]
    fn test_resolve_filter_matches_stylesheets() {
        let config = BuildConfig::for_entry(&context(), entry()).unwrap();
        let filters: Vec<_> = config.resolve_filters().collect();
        assert_eq!(filters.len(), 1);
        assert!(filters[0].is_match("/project/app/assets/stylesheets/application.scss"));
        assert!(!filters[0].is_match("/project/node_modules/bootstrap/scss/_grid.scss"));
    }

    #[test]
    fn test_output_path() {
        let config = BuildConfig::for_entry(&context(), entry()).unwrap();
        assert_eq!(config.output_path(), PathBuf::from("/project/app/assets/builds/application.css"));
        assert_eq!(config.resolve_dir(), Path::new("/project/app/assets/stylesheets"));
    }
}
