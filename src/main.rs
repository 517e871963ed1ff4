//! cssbundle - Command-line tool for bundling Sass entry points into CSS

use std::process::ExitCode;

use cssbundle::cli;

fn main() -> ExitCode {
    cli::run()
}
