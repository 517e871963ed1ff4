//! Run orchestration.
//!
//! Discovers the entry points, builds each one on its own scoped thread and
//! collects the outcomes on the calling thread.
//!
//! # How It Works
//!
//! 1. Every entry gets a `BuildConfig` and a task; tasks announce
//!    themselves with a `Starting` event
//! 2. Tasks send their outcome over a channel as soon as they finish
//! 3. The calling thread receives outcomes in completion order, reports
//!    `Success` or `Error` for each, and records them in a [`RunSummary`]
//! 4. The exit code is taken from the summary once every task has reported

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use crate::build::{
    bundler, discover_entry_points, BuildConfig, BuildContext, BuildError, BundleOutput, EntryResult, RunSummary,
};
use crate::report::{CompilationEvent, EventReporter};
use crate::transform::TransformChain;

/// Drives the builds of one run.
pub struct Orchestrator {
    context: BuildContext,
    chain: Arc<TransformChain>,
    reporter: Arc<dyn EventReporter>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator").field("context", &self.context).field("chain", &self.chain).finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the standard transform chain.
    pub fn new(context: BuildContext, reporter: Arc<dyn EventReporter>) -> Self {
        let chain = TransformChain::new(&context.chain_options());
        Self::with_chain(context, chain, reporter)
    }

    /// Create an orchestrator with a caller-supplied chain.
    pub fn with_chain(context: BuildContext, chain: TransformChain, reporter: Arc<dyn EventReporter>) -> Self {
        tracing::debug!(stages = ?chain.stage_names(), "transform chain");
        Self { context, chain: Arc::new(chain), reporter }
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Get the reporter.
    pub fn reporter(&self) -> &Arc<dyn EventReporter> {
        &self.reporter
    }

    /// Find the entry points of this run.
    pub fn discover(&self) -> Result<Vec<PathBuf>, BuildError> {
        Ok(discover_entry_points(self.context.project_root(), self.context.entry_pattern())?)
    }

    /// Discover and build every entry point.
    pub fn run(&self) -> Result<RunSummary, BuildError> {
        let entries = self.discover()?;
        Ok(self.build_entries(&entries))
    }

    /// Build the given entry points concurrently.
    ///
    /// Each failure is reported exactly once and no `Success` follows it for
    /// the same entry.
    pub fn build_entries(&self, entries: &[PathBuf]) -> RunSummary {
        let start = Instant::now();
        let mut summary = RunSummary::new();
        if entries.is_empty() {
            tracing::debug!("no entry points found");
            return summary.with_duration(start.elapsed());
        }

        let (tx, rx) = mpsc::channel::<(PathBuf, Result<BundleOutput, BuildError>, std::time::Duration)>();
        let chain: &TransformChain = &self.chain;
        let reporter: &dyn EventReporter = &*self.reporter;
        let context = &self.context;

        std::thread::scope(|s| {
            for entry in entries {
                let tx = tx.clone();
                s.spawn(move || {
                    let task_start = Instant::now();
                    reporter.report(CompilationEvent::Starting(Some(entry.clone())));
                    let outcome = BuildConfig::for_entry(context, entry.clone())
                        .and_then(|config| bundler::build(&config, chain, reporter));
                    // Receiver lives until every task is done.
                    let _ = tx.send((entry.clone(), outcome, task_start.elapsed()));
                });
            }
            drop(tx);

            for (entry, outcome, duration) in rx {
                match outcome {
                    Ok(output) => {
                        reporter.report(CompilationEvent::Success(Some(entry.clone())));
                        let mut outputs = vec![output.output];
                        outputs.extend(output.assets);
                        summary.add_result(EntryResult::success(entry, outputs, output.dependencies, duration));
                    }
                    Err(e) => {
                        let message = e.to_string();
                        reporter.report(CompilationEvent::Error(message.clone()));
                        summary.add_result(EntryResult::failed(entry, message, duration));
                    }
                }
            }
        });

        let summary = summary.with_duration(start.elapsed());
        tracing::debug!("{}", summary.summary());
        summary
    }
}
