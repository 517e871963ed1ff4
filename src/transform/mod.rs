//! CSS transform chain.
//!
//! Compiled stylesheet text runs through a fixed sequence of stages:
//!
//! 1. `nesting` - flatten nested selectors
//! 2. `vendor-prefixes` - add prefixes required by the target browsers
//! 3. `utility-classes` - expand utility-framework directives
//! 4. `minify` - only present when the run minifies
//! 5. `flexbox-fixes` - rewrite flex shorthands known to misbehave
//! 6. `downlevel` - lower modern syntax for the target browsers
//!
//! A chain is built once per run and shared read-only by every entry
//! point. Stages that do not apply are left out of the list, so the
//! relative order never changes.

mod flexbugs;
mod lightning;
mod utilities;

pub use flexbugs::FlexbugsStage;
pub use lightning::{browser_targets, DownlevelStage, MinifyStage, NestingStage, PrefixStage};
pub use utilities::{has_framework_directives, UtilityStage};

use lightningcss::targets::Browsers;
use std::path::PathBuf;
use std::time::Instant;

pub const NESTING: &str = "nesting";
pub const VENDOR_PREFIXES: &str = "vendor-prefixes";
pub const UTILITY_CLASSES: &str = "utility-classes";
pub const MINIFY: &str = "minify";
pub const FLEXBOX_FIXES: &str = "flexbox-fixes";
pub const DOWNLEVEL: &str = "downlevel";

/// Error raised by a single stage.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StageError {
    /// CSS could not be parsed, transformed or printed
    #[error("{0}")]
    Css(String),
    /// The utility framework executable could not be started
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The utility framework executable reported a failure
    #[error("'{command}' failed: {message}")]
    Utility { command: String, message: String },
    /// Temporary file handling failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl<T: std::fmt::Display> From<lightningcss::error::Error<T>> for StageError {
    fn from(e: lightningcss::error::Error<T>) -> Self {
        StageError::Css(e.to_string())
    }
}

/// Failure of the chain as a whole; names the stage that failed.
#[derive(Debug, thiserror::Error)]
#[error("{stage}: {source}")]
pub struct ChainError {
    /// Name of the failing stage
    pub stage: &'static str,
    /// The stage's own error
    #[source]
    pub source: StageError,
}

/// One CSS-text-to-CSS-text transform.
pub trait Stage: Send + Sync {
    /// Stable stage name used in errors and diagnostics.
    fn name(&self) -> &'static str;

    /// Transform the given CSS.
    fn run(&self, css: &str) -> Result<String, StageError>;
}

/// Settings the standard chain is built from.
#[derive(Debug, Clone)]
pub struct ChainOptions {
    /// Include the minify stage and print compact output
    pub minify: bool,
    /// Browsers targeted by prefixing, minification and downleveling
    pub browsers: Browsers,
    /// Utility framework command (program followed by arguments)
    pub utility_command: Vec<String>,
    /// Working directory for the utility framework (its config lives here)
    pub project_root: PathBuf,
}

/// Ordered list of stages.
pub struct TransformChain {
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformChain").field("stages", &self.stage_names()).finish()
    }
}

impl TransformChain {
    /// Build the standard chain, with the utility stage running the
    /// configured framework command.
    pub fn new(options: &ChainOptions) -> Self {
        let utility = UtilityStage::new(options.utility_command.clone(), options.project_root.clone());
        Self::with_utility_stage(options, Box::new(utility))
    }

    /// Build the standard chain around a caller-supplied utility stage.
    pub fn with_utility_stage(options: &ChainOptions, utility: Box<dyn Stage>) -> Self {
        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(NestingStage::new()),
            Box::new(PrefixStage::new(options.browsers)),
            utility,
        ];
        if options.minify {
            stages.push(Box::new(MinifyStage::new(options.browsers)));
        }
        stages.push(Box::new(FlexbugsStage::new()));
        stages.push(Box::new(DownlevelStage::new(options.browsers, options.minify)));
        Self { stages }
    }

    /// Build a chain from an explicit stage list.
    pub fn from_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Names of the stages, in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order. The first failure aborts the chain.
    pub fn run(&self, source: &str) -> Result<String, ChainError> {
        let mut css = source.to_string();
        for stage in &self.stages {
            let start = Instant::now();
            css = stage.run(&css).map_err(|source| ChainError { stage: stage.name(), source })?;
            tracing::debug!(stage = stage.name(), elapsed_ms = start.elapsed().as_millis() as u64, "stage finished");
        }
        Ok(css)
    }
}
