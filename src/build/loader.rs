//! Sass source loading.
//!
//! Compiles an entry stylesheet with `grass`, inlining its imports. Every
//! file grass reads goes through [`ObservedFs`], which records it as a
//! dependency of the entry and hands the path to a read-only observer.

use grass::{Fs, Options, OutputStyle, StdFs};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::build::SassOptions;

/// Error while compiling a stylesheet source.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// Syntax error, unresolved import, or any other compiler failure
    #[error("{0}")]
    Sass(String),
}

/// Compiled source plus every file read to produce it.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    /// Fully assembled CSS text
    pub css: String,
    /// Files read during compilation (entry first), without duplicates
    pub dependencies: Vec<PathBuf>,
}

/// Filesystem that reports reads to an observer.
struct ObservedFs<'a> {
    observer: &'a dyn Fn(&Path),
    reads: Mutex<Vec<PathBuf>>,
}

impl std::fmt::Debug for ObservedFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservedFs").finish()
    }
}

impl Fs for ObservedFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        StdFs.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        StdFs.is_file(path)
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let bytes = StdFs.read(path)?;
        let first_read = match self.reads.lock() {
            Ok(mut reads) if !reads.iter().any(|p| p == path) => {
                reads.push(path.to_path_buf());
                true
            }
            _ => false,
        };
        if first_read {
            (self.observer)(path);
        }
        Ok(bytes)
    }
}

/// Compiles entry points with the configured include paths.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    options: SassOptions,
    show_warnings: bool,
}

impl SourceLoader {
    pub fn new(options: SassOptions) -> Self {
        Self { options, show_warnings: false }
    }

    /// Print compiler warnings even when dependencies are quiet.
    pub fn with_warnings(mut self, show: bool) -> Self {
        self.show_warnings = show;
        self
    }

    /// Compile `entry`, calling `on_read` for every file read.
    pub fn load(&self, entry: &Path, on_read: &dyn Fn(&Path)) -> Result<LoadedSource, LoaderError> {
        let fs = ObservedFs { observer: on_read, reads: Mutex::new(Vec::new()) };
        let quiet = self.options.quiet_deps && !self.show_warnings;

        let options = Options::default()
            .fs(&fs)
            .style(OutputStyle::Expanded)
            .load_paths(&self.options.include_paths)
            .quiet(quiet);

        let css = grass::from_path(entry, &options).map_err(|e| LoaderError::Sass(e.to_string()))?;
        let dependencies = fs.reads.into_inner().unwrap_or_default();
        tracing::debug!(entry = %entry.display(), files = dependencies.len(), "compiled sass");

        Ok(LoadedSource { css, dependencies })
    }
}
