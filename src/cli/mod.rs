//! Command-line interface implementation
//!
//! Parses the process arguments once and hands them to the build command.

mod build;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

pub use build::{init_tracing, resolve_project, run_build, RunOptions};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_CONFIG: u8 = 2;

/// cssbundle - Compile Sass entry points into bundled CSS
#[derive(Debug, Parser)]
#[command(name = "cssbundle")]
#[command(about = "Compile app/assets/stylesheets/*.scss into app/assets/builds")]
#[command(version)]
pub struct Cli {
    /// Minify the generated CSS
    #[arg(long)]
    pub minify: bool,

    /// Keep running and rebuild when sources change
    #[arg(long)]
    pub watch: bool,

    /// Config file (default: cssbundle.toml found upward from the root)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Project root (default: the config file's directory, else the
    /// working directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = RunOptions::from_cli(&cli, std::env::var("DEBUG").ok().as_deref());
    init_tracing(options.debug);
    run_build(&options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["cssbundle", "--minify", "--watch"]).unwrap();
        assert!(cli.minify);
        assert!(cli.watch);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["cssbundle"]).unwrap();
        assert!(!cli.minify);
        assert!(!cli.watch);
    }

    #[test]
    fn test_parse_paths() {
        let cli = Cli::try_parse_from(["cssbundle", "--config", "conf/cssbundle.toml", "--root", "/srv/app"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("conf/cssbundle.toml")));
        assert_eq!(cli.root, Some(PathBuf::from("/srv/app")));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["cssbundle", "--minfy"]).is_err());
    }
}
