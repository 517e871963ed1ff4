//! Watch mode for automatic rebuilds on file changes
//!
//! Provides debounced file system watching for `cssbundle --watch`. A change
//! to a file some entry was built from rebuilds just those entries; any
//! other relevant change rebuilds everything.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::build::{pattern_base, BuildContext, Orchestrator, RunSummary};

/// Error during watch mode
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch {}: {source}", path.display())]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    ChannelError(String),
    /// Stylesheet directory not found
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
}

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Which source files each entry point was built from
#[derive(Debug, Default)]
pub struct DependencyGraph {
    deps: HashMap<PathBuf, BTreeSet<PathBuf>>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dependencies of every entry in a run.
    ///
    /// A failed entry keeps what it depended on last time, and always
    /// depends on itself.
    pub fn update(&mut self, summary: &RunSummary) {
        for result in &summary.entries {
            let set = self.deps.entry(result.entry.clone()).or_default();
            if result.is_success() {
                set.clear();
                set.extend(result.dependencies.iter().map(|p| normalize(p)));
            }
            set.insert(normalize(&result.entry));
        }
    }

    /// Drop entries that no longer exist in `entries`
    pub fn retain(&mut self, entries: &[PathBuf]) {
        self.deps.retain(|entry, _| entries.contains(entry));
    }

    /// Entries affected by the changed files.
    ///
    /// Returns `None` when a change touches a file no entry depends on, in
    /// which case every entry should be rebuilt.
    pub fn affected(&self, changed: &[PathBuf]) -> Option<Vec<PathBuf>> {
        let mut affected = BTreeSet::new();
        for path in changed {
            let path = normalize(path);
            let mut hit = false;
            for (entry, deps) in &self.deps {
                if deps.contains(&path) {
                    affected.insert(entry.clone());
                    hit = true;
                }
            }
            if !hit {
                return None;
            }
        }
        Some(affected.into_iter().collect())
    }

    /// Number of entries tracked
    pub fn len(&self) -> usize {
        self.deps.len()
    }

    /// Whether no entry is tracked
    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }
}

/// Directories to watch: the entry pattern's base directory followed by
/// every configured watch path that exists.
///
/// A missing base directory is replaced by its closest existing ancestor
/// inside the project, so entries created later are still picked up.
pub fn watch_roots(ctx: &BuildContext) -> Vec<PathBuf> {
    let base = pattern_base(ctx.project_root(), ctx.entry_pattern());
    let base = match base.ancestors().find(|p| p.starts_with(ctx.project_root()) && p.exists()) {
        Some(existing) => existing.to_path_buf(),
        None => base,
    };
    let mut roots = vec![base];
    for path in &ctx.config().watch.paths {
        let resolved = ctx.resolve_path(path);
        if resolved.exists() && !roots.contains(&resolved) {
            roots.push(resolved);
        }
    }
    roots
}

/// Check if a changed path should trigger a rebuild
pub fn is_relevant_file(path: &Path, out_dir: &Path) -> bool {
    if path.starts_with(out_dir) {
        return false;
    }
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    // Editor swap and backup files
    !(name.starts_with(".#")
        || name.ends_with('~')
        || name.ends_with(".swp")
        || name.ends_with(".swx")
        || name == "4913")
}

/// Rebuild the entries affected by `changed` and record their new
/// dependencies.
///
/// A change no entry depends on triggers rediscovery and a rebuild of every
/// entry. Returns `None` when discovery fails.
pub fn rebuild_changed(
    orchestrator: &Orchestrator,
    graph: &mut DependencyGraph,
    changed: &[PathBuf],
) -> Option<RunSummary> {
    let entries = match graph.affected(changed) {
        Some(entries) => entries,
        None => match orchestrator.discover() {
            Ok(entries) => {
                graph.retain(&entries);
                entries
            }
            Err(e) => {
                tracing::error!("{}", e);
                return None;
            }
        },
    };

    let summary = orchestrator.build_entries(&entries);
    graph.update(&summary);
    Some(summary)
}

/// Watch for file changes and rebuild automatically.
///
/// `initial` is the run that preceded watching; its dependencies seed the
/// graph. Rebuild failures are reported like any build failure and
/// watching continues. This function blocks until interrupted.
pub fn watch_and_rebuild(orchestrator: &Orchestrator, initial: &RunSummary) -> Result<(), WatchError> {
    let ctx = orchestrator.context();
    let roots = watch_roots(ctx);
    if !roots[0].exists() {
        return Err(WatchError::SourceNotFound(roots[0].clone()));
    }
    let out_dirs = [ctx.out_dir(), normalize(&ctx.out_dir())];

    let mut graph = DependencyGraph::new();
    graph.update(initial);

    let (tx, rx) = channel();
    let debounce_duration = Duration::from_millis(ctx.config().watch.debounce_ms as u64);
    let mut debouncer = new_debouncer(debounce_duration, tx).map_err(WatchError::WatcherInit)?;

    for root in &roots {
        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::WatchPath { path: root.clone(), source })?;
        tracing::debug!(path = %root.display(), "watching");
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<PathBuf> = events
                    .iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous))
                    .map(|e| e.path.clone())
                    .filter(|p| out_dirs.iter().all(|out| is_relevant_file(p, out)))
                    .collect();

                if changed.is_empty() {
                    continue;
                }
                for path in &changed {
                    tracing::debug!(path = %path.display(), "changed");
                }

                rebuild_changed(orchestrator, &mut graph, &changed);
            }
            Ok(Err(error)) => {
                // Non-fatal, keep watching
                tracing::error!("watch error: {:?}", error);
            }
            Err(e) => {
                return Err(WatchError::ChannelError(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::EntryResult;
    use crate::config::default_config;
    use crate::report::{CompilationEvent, EventReporter};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn summary(results: Vec<EntryResult>) -> RunSummary {
        let mut summary = RunSummary::new();
        for r in results {
            summary.add_result(r);
        }
        summary
    }

    #[test]
    fn test_affected_by_partial() {
        let mut graph = DependencyGraph::new();
        graph.update(&summary(vec![
            EntryResult::success(
                PathBuf::from("/p/app.scss"),
                vec![],
                vec![PathBuf::from("/p/app.scss"), PathBuf::from("/p/_colors.scss")],
                Duration::ZERO,
            ),
            EntryResult::success(PathBuf::from("/p/admin.scss"), vec![], vec![PathBuf::from("/p/admin.scss")], Duration::ZERO),
        ]));

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.affected(&[PathBuf::from("/p/_colors.scss")]), Some(vec![PathBuf::from("/p/app.scss")]));
        assert_eq!(graph.affected(&[PathBuf::from("/p/admin.scss")]), Some(vec![PathBuf::from("/p/admin.scss")]));
    }

    #[test]
    fn test_unknown_file_rebuilds_all() {
        let mut graph = DependencyGraph::new();
        graph.update(&summary(vec![EntryResult::success(
            PathBuf::from("/p/app.scss"),
            vec![],
            vec![PathBuf::from("/p/app.scss")],
            Duration::ZERO,
        )]));

        assert_eq!(graph.affected(&[PathBuf::from("/p/views/index.html.erb")]), None);
        assert_eq!(graph.affected(&[PathBuf::from("/p/app.scss"), PathBuf::from("/p/_new.scss")]), None);
    }

    #[test]
    fn test_failed_entry_still_depends_on_itself() {
        let mut graph = DependencyGraph::new();
        graph.update(&summary(vec![EntryResult::failed(
            PathBuf::from("/p/broken.scss"),
            "x".to_string(),
            Duration::ZERO,
        )]));
        assert_eq!(graph.affected(&[PathBuf::from("/p/broken.scss")]), Some(vec![PathBuf::from("/p/broken.scss")]));
    }

    #[test]
    fn test_retain_drops_removed_entries() {
        let mut graph = DependencyGraph::new();
        graph.update(&summary(vec![
            EntryResult::failed(PathBuf::from("/p/a.scss"), "x".to_string(), Duration::ZERO),
            EntryResult::failed(PathBuf::from("/p/b.scss"), "x".to_string(), Duration::ZERO),
        ]));
        graph.retain(&[PathBuf::from("/p/a.scss")]);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_is_relevant_file() {
        let out = Path::new("/p/app/assets/builds");
        assert!(is_relevant_file(Path::new("/p/app/assets/stylesheets/app.scss"), out));
        assert!(is_relevant_file(Path::new("/p/app/views/index.html.erb"), out));
        assert!(!is_relevant_file(Path::new("/p/app/assets/builds/app.css"), out));
        assert!(!is_relevant_file(Path::new("/p/app/assets/stylesheets/.app.scss.swp"), out));
        assert!(!is_relevant_file(Path::new("/p/app/assets/stylesheets/app.scss~"), out));
    }

    #[test]
    fn test_watch_roots_skip_missing_paths() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("app/views")).unwrap();
        std::fs::create_dir_all(temp.path().join("app/assets/stylesheets")).unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());

        let roots = watch_roots(&ctx);
        assert_eq!(roots, vec![temp.path().join("app/assets/stylesheets"), temp.path().join("app/views")]);
    }

    #[test]
    fn test_watch_roots_fall_back_to_existing_ancestor() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("app/assets")).unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());

        assert_eq!(watch_roots(&ctx)[0], temp.path().join("app/assets"));
    }

    #[derive(Default)]
    struct Recorder(std::sync::Mutex<Vec<CompilationEvent>>);

    impl Recorder {
        fn take(&self) -> Vec<CompilationEvent> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl EventReporter for Recorder {
        fn report(&self, event: CompilationEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    struct Project {
        temp: TempDir,
        reporter: Arc<Recorder>,
        orchestrator: Orchestrator,
        graph: DependencyGraph,
    }

    impl Project {
        /// `app.scss` imports `parts/_colors.scss`; `other.scss` stands alone.
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let styles = temp.path().join("app/assets/stylesheets");
            std::fs::create_dir_all(styles.join("parts")).unwrap();
            std::fs::write(styles.join("parts/_colors.scss"), "$brand: red;").unwrap();
            std::fs::write(styles.join("app.scss"), "@import 'parts/colors';\na { color: $brand; }").unwrap();
            std::fs::write(styles.join("other.scss"), "b { color: blue; }").unwrap();

            let reporter = Arc::new(Recorder::default());
            let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
            let orchestrator =
                Orchestrator::with_chain(ctx, crate::transform::TransformChain::from_stages(vec![]), reporter.clone());

            let mut graph = DependencyGraph::new();
            let initial = orchestrator.run().unwrap();
            assert!(initial.is_success());
            graph.update(&initial);
            reporter.take();

            Self { temp, reporter, orchestrator, graph }
        }

        fn style(&self, name: &str) -> PathBuf {
            self.temp.path().join("app/assets/stylesheets").join(name)
        }

        fn change(&mut self, path: PathBuf) -> RunSummary {
            rebuild_changed(&self.orchestrator, &mut self.graph, &[path]).unwrap()
        }
    }

    #[test]
    fn test_rebuild_changed_partial_rebuilds_importer_only() {
        let mut project = Project::new();
        std::fs::write(project.style("parts/_colors.scss"), "$brand: green;").unwrap();

        let summary = project.change(project.style("parts/_colors.scss"));
        assert_eq!(summary.entries.len(), 1);
        assert!(summary.get(&project.style("app.scss")).unwrap().is_success());

        let events = project.reporter.take();
        assert_eq!(
            events,
            vec![
                CompilationEvent::Starting(Some(project.style("app.scss"))),
                CompilationEvent::Success(Some(project.style("app.scss"))),
            ]
        );
        let css = std::fs::read_to_string(project.temp.path().join("app/assets/builds/app.css")).unwrap();
        assert!(css.contains("green"));
    }

    #[test]
    fn test_rebuild_changed_failure_then_recovery() {
        let mut project = Project::new();
        std::fs::write(project.style("parts/_colors.scss"), "$brand: $undefined;").unwrap();

        let summary = project.change(project.style("parts/_colors.scss"));
        assert_eq!(summary.exit_code(), 1);
        let events = project.reporter.take();
        assert!(events.iter().any(|e| matches!(e, CompilationEvent::Error(_))));
        assert!(!events.iter().any(|e| matches!(e, CompilationEvent::Success(_))));

        // The failed entry still tracks the partial, so fixing it rebuilds.
        std::fs::write(project.style("parts/_colors.scss"), "$brand: navy;").unwrap();
        let summary = project.change(project.style("parts/_colors.scss"));
        assert!(summary.is_success());
        assert_eq!(project.reporter.take().last(), Some(&CompilationEvent::Success(Some(project.style("app.scss")))));
    }

    #[test]
    fn test_rebuild_changed_unknown_file_rebuilds_all() {
        let mut project = Project::new();
        let view = project.temp.path().join("app/views/index.html.erb");

        let summary = project.change(view);
        assert_eq!(summary.entries.len(), 2);
        assert!(summary.get(&project.style("app.scss")).is_some());
        assert!(summary.get(&project.style("other.scss")).is_some());

        let starts = project.reporter.take().iter().filter(|e| matches!(e, CompilationEvent::Starting(_))).count();
        assert_eq!(starts, 2);
    }

    #[test]
    fn test_rebuild_changed_picks_up_new_entry() {
        let mut project = Project::new();
        std::fs::write(project.style("admin.scss"), "i { color: red; }").unwrap();

        let summary = project.change(project.style("admin.scss"));
        assert_eq!(summary.entries.len(), 3);
        assert_eq!(project.graph.len(), 3);
    }

    #[test]
    fn test_watch_error_source_not_found() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().join("gone"));
        let orchestrator = Orchestrator::with_chain(
            ctx,
            crate::transform::TransformChain::from_stages(vec![]),
            Arc::new(Recorder::default()),
        );

        let result = watch_and_rebuild(&orchestrator, &RunSummary::new());
        assert!(matches!(result, Err(WatchError::SourceNotFound(_))));
    }
}
