//! Bundling of a single entry point.
//!
//! Runs source loading, the transform chain and asset copying for one
//! [`BuildConfig`], then writes `<out_dir>/<stem>.css`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::build::{AssetCopier, AssetError, BuildConfig, DiscoveryError, LoaderError, SourceLoader};
use crate::report::{CompilationEvent, EventReporter};
use crate::transform::{ChainError, TransformChain};

/// Error that fails a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Transform(#[from] ChainError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid resolve filter: {0}")]
    InvalidFilter(#[from] regex::Error),
}

/// Everything a successful build produced.
#[derive(Debug, Clone)]
pub struct BundleOutput {
    /// Entry point that was built
    pub entry: PathBuf,
    /// Bundled stylesheet
    pub output: PathBuf,
    /// Assets copied next to the bundle
    pub assets: Vec<PathBuf>,
    /// Every source file the bundle depends on (stylesheets and assets)
    pub dependencies: Vec<PathBuf>,
    /// Wall time of the build
    pub duration: Duration,
}

/// Build one entry point.
///
/// Resolution events for reads matching the config's resolve filters are
/// sent to `reporter` while the source compiles. Status events are left to
/// the caller.
pub fn build(
    config: &BuildConfig,
    chain: &TransformChain,
    reporter: &dyn EventReporter,
) -> Result<BundleOutput, BuildError> {
    let start = Instant::now();

    let sass = config.sass_options().cloned().unwrap_or_else(|| crate::build::SassOptions {
        include_paths: Vec::new(),
        quiet_deps: true,
    });
    let loader = SourceLoader::new(sass).with_warnings(config.log_level.is_debug());

    let on_read = |path: &Path| {
        let text = path.to_string_lossy();
        if config.resolve_filters().any(|filter| filter.is_match(&text)) {
            reporter.report(CompilationEvent::Resolving(path.to_path_buf()));
        }
    };
    let loaded = loader.load(&config.entry, &on_read)?;

    let css = chain.run(&loaded.css)?;

    std::fs::create_dir_all(&config.out_dir)
        .map_err(|source| BuildError::Io { path: config.out_dir.clone(), source })?;
    let assets = AssetCopier::new(config).process(&css)?;

    let output = config.output_path();
    std::fs::write(&output, &assets.css).map_err(|source| BuildError::Io { path: output.clone(), source })?;

    let mut dependencies = loaded.dependencies;
    dependencies.extend(assets.sources);

    let duration = start.elapsed();
    tracing::debug!(entry = %config.entry.display(), output = %output.display(), ?duration, "bundle written");

    Ok(BundleOutput { entry: config.entry.clone(), output, assets: assets.copied, dependencies, duration })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildContext;
    use crate::config::default_config;
    use crate::transform::{Stage, StageError};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<CompilationEvent>>);

    impl EventReporter for Recorder {
        fn report(&self, event: CompilationEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    struct Upper;

    impl Stage for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn run(&self, css: &str) -> Result<String, StageError> {
            Ok(css.replace("red", "RED"))
        }
    }

    struct Broken;

    impl Stage for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn run(&self, _css: &str) -> Result<String, StageError> {
            Err(StageError::Css("unexpected token".to_string()))
        }
    }

    fn project(source: &str) -> (TempDir, BuildConfig) {
        let temp = TempDir::new().unwrap();
        let styles = temp.path().join("app/assets/stylesheets");
        fs::create_dir_all(&styles).unwrap();
        let entry = styles.join("application.scss");
        fs::write(&entry, source).unwrap();

        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let config = BuildConfig::for_entry(&ctx, entry).unwrap();
        (temp, config)
    }

    #[test]
    fn test_build_writes_output() {
        let (temp, config) = project("a { color: red; }");
        let chain = TransformChain::from_stages(vec![Box::new(Upper)]);
        let reporter = Recorder::default();

        let out = build(&config, &chain, &reporter).unwrap();
        assert_eq!(out.output, temp.path().join("app/assets/builds/application.css"));
        let written = fs::read_to_string(&out.output).unwrap();
        assert!(written.contains("RED"));
        assert_eq!(out.dependencies, vec![config.entry.clone()]);
    }

    #[test]
    fn test_build_reports_resolved_stylesheets() {
        let (_temp, config) = project("a { color: red; }");
        let chain = TransformChain::from_stages(vec![]);
        let reporter = Recorder::default();

        build(&config, &chain, &reporter).unwrap();
        let events = reporter.0.into_inner().unwrap();
        assert_eq!(events, vec![CompilationEvent::Resolving(config.entry.clone())]);
    }

    #[test]
    fn test_build_stage_failure_writes_nothing() {
        let (_temp, config) = project("a { color: red; }");
        let chain = TransformChain::from_stages(vec![Box::new(Broken)]);

        let err = build(&config, &chain, &Recorder::default()).unwrap_err();
        assert!(matches!(err, BuildError::Transform(ref e) if e.stage == "broken"));
        assert_eq!(err.to_string(), "broken: unexpected token");
        assert!(!config.output_path().exists());
    }

    #[test]
    fn test_build_sass_failure() {
        let (_temp, config) = project("@import 'nowhere';");
        let chain = TransformChain::from_stages(vec![]);

        let err = build(&config, &chain, &Recorder::default()).unwrap_err();
        assert!(matches!(err, BuildError::Loader(_)));
    }

    #[test]
    fn test_build_copies_assets() {
        let (temp, config) = project(".a { background: url('logo.png'); }");
        fs::write(temp.path().join("app/assets/stylesheets/logo.png"), b"png").unwrap();
        let chain = TransformChain::from_stages(vec![]);

        let out = build(&config, &chain, &Recorder::default()).unwrap();
        assert_eq!(out.assets.len(), 1);
        assert!(out.assets[0].exists());
        assert_eq!(out.dependencies.len(), 2);
        let written = fs::read_to_string(&out.output).unwrap();
        assert!(written.contains("url(\"./logo-"));
    }
}
