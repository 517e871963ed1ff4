//! Build command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use super::{Cli, EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_SUCCESS};
use crate::build::{debug_enabled, BuildContext, LogLevel, Orchestrator};
use crate::config::loader::{find_config_from, load_config, project_root};
use crate::config::{BundleConfig, ConfigError};
use crate::report::ConsoleReporter;

/// Process-wide settings, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub minify: bool,
    pub watch: bool,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub root: Option<PathBuf>,
}

impl RunOptions {
    /// Combine parsed arguments with the `DEBUG` environment value.
    pub fn from_cli(cli: &Cli, debug_var: Option<&str>) -> Self {
        Self {
            minify: cli.minify,
            watch: cli.watch,
            debug: debug_enabled(debug_var),
            config: cli.config.clone(),
            root: cli.root.clone(),
        }
    }
}

/// Diagnostics filter: `RUST_LOG` when set, else the level `debug` selects.
fn env_filter(debug: bool, rust_log: Option<&str>) -> EnvFilter {
    match rust_log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::default().add_directive(LogLevel::from_debug(debug).as_tracing_level().into()),
    }
}

/// Install the stderr diagnostics subscriber.
///
/// `RUST_LOG` replaces the `DEBUG`-derived level entirely when set.
pub fn init_tracing(debug: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug, rust_log.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the configuration and pick the project root.
///
/// The root is `--root` when given, else the directory of the config file,
/// else `cwd`.
pub fn resolve_project(options: &RunOptions, cwd: &Path) -> Result<(BundleConfig, PathBuf), ConfigError> {
    let search_from = options.root.clone().unwrap_or_else(|| cwd.to_path_buf());
    let config_path = match &options.config {
        Some(path) => Some(crate::config::loader::resolve_path(cwd, path)),
        None => find_config_from(search_from.clone()),
    };

    let config = match &config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using config");
            load_config(Some(path))?
        }
        None => {
            tracing::debug!("no cssbundle.toml found, using defaults");
            crate::config::default_config()
        }
    };

    let root = match (&options.root, &config_path) {
        (Some(root), _) => crate::config::loader::resolve_path(cwd, root),
        (None, Some(path)) => project_root(path).map(Path::to_path_buf).unwrap_or(search_from),
        (None, None) => search_from,
    };

    Ok((config, root))
}

/// Run the build command
pub fn run_build(options: &RunOptions) -> ExitCode {
    let cwd = std::env::current_dir().unwrap_or_default();
    let (config, root) = match resolve_project(options, &cwd) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_INVALID_CONFIG);
        }
    };

    let context = BuildContext::new(config, root)
        .with_minify(options.minify)
        .with_watch(options.watch)
        .with_debug(options.debug);
    let orchestrator = Orchestrator::new(context, Arc::new(ConsoleReporter::new()));

    let summary = match orchestrator.run() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_CONFIG);
        }
    };

    if !summary.is_success() {
        return ExitCode::from(EXIT_ERROR);
    }

    if options.watch {
        if let Err(e) = crate::watch::watch_and_rebuild(&orchestrator, &summary) {
            eprintln!("Watch error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}
