//! Build pipeline for cssbundle
//!
//! Turns stylesheet entry points into bundled CSS files.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Find entry points using the glob pattern from config
//! - **Configuration**: Derive a [`BuildConfig`] for each entry
//! - **Bundling**: Compile Sass, run the transform chain, copy assets and
//!   write the bundle
//! - **Orchestration**: Build every entry concurrently and aggregate the
//!   outcomes into one exit code
//!
//! # Example
//!
//! ```ignore
//! use cssbundle::build::{BuildContext, Orchestrator};
//! use cssbundle::config::load_config;
//! use cssbundle::report::ConsoleReporter;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root);
//! let orchestrator = Orchestrator::new(context, Arc::new(ConsoleReporter::new()));
//!
//! let summary = orchestrator.run()?;
//! std::process::exit(summary.exit_code() as i32);
//! ```

pub mod assets;
pub mod bundler;
pub mod context;
pub mod discovery;
pub mod loader;
pub mod orchestrator;
pub mod result;
pub mod target;

pub use assets::*;
pub use bundler::{build, BuildError, BundleOutput};
pub use context::*;
pub use discovery::*;
pub use loader::*;
pub use orchestrator::*;
pub use result::*;
pub use target::*;
