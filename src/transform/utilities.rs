//! Utility-class framework stage.
//!
//! Expansion is delegated to the framework's own executable
//! (`tailwindcss` by default). The CSS is written to a temporary file,
//! passed as `--input <file>`, and the generated stylesheet is read from
//! stdout. The command runs in the project root so the framework picks up
//! its configuration and content sources from there.

use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use super::{Stage, StageError, UTILITY_CLASSES};

fn directive_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"@(tailwind|apply|layer|config)\b|\b(theme|screen)\(").expect("valid regex")
    })
}

/// Whether `css` contains anything the utility framework would expand.
pub fn has_framework_directives(css: &str) -> bool {
    directive_pattern().is_match(css)
}

/// Runs the utility framework executable over the stylesheet.
#[derive(Debug, Clone)]
pub struct UtilityStage {
    command: Vec<String>,
    working_dir: PathBuf,
}

impl UtilityStage {
    /// `command` is the program followed by any leading arguments.
    pub fn new(command: Vec<String>, working_dir: PathBuf) -> Self {
        Self { command, working_dir }
    }

    fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

impl Stage for UtilityStage {
    fn name(&self) -> &'static str {
        UTILITY_CLASSES
    }

    fn run(&self, css: &str) -> Result<String, StageError> {
        if !has_framework_directives(css) {
            tracing::debug!("no framework directives, skipping {}", self.command_line());
            return Ok(css.to_string());
        }

        let (program, args) = self.command.split_first().ok_or_else(|| StageError::Utility {
            command: String::new(),
            message: "no command configured".to_string(),
        })?;

        let mut input = tempfile::Builder::new().prefix("cssbundle-").suffix(".css").tempfile()?;
        input.write_all(css.as_bytes())?;
        input.flush()?;

        tracing::debug!(command = %self.command_line(), input = %input.path().display(), "expanding utilities");
        let output = Command::new(program)
            .args(args)
            .arg("--input")
            .arg(input.path())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| StageError::Spawn { command: self.command_line(), source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() { format!("exited with {}", output.status) } else { stderr };
            return Err(StageError::Utility { command: self.command_line(), message });
        }

        String::from_utf8(output.stdout).map_err(|_| StageError::Utility {
            command: self.command_line(),
            message: "output is not valid UTF-8".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string(), "sh".to_string()]
    }

    #[test]
    fn test_detects_directives() {
        assert!(has_framework_directives("@tailwind base;"));
        assert!(has_framework_directives(".btn { @apply px-4; }"));
        assert!(has_framework_directives(".x { color: theme(colors.red.500); }"));
        assert!(!has_framework_directives("a { color: red; }"));
        assert!(!has_framework_directives("@tailwindish x;"));
    }

    #[test]
    fn test_passthrough_without_directives() {
        let stage = UtilityStage::new(vec!["definitely-not-a-real-binary".to_string()], PathBuf::from("."));
        assert_eq!(stage.run("a { color: red; }").unwrap(), "a { color: red; }");
    }

    #[cfg(unix)]
    #[test]
    fn test_reads_generated_css_from_stdout() {
        // $1 is "--input", $2 the temporary file
        let stage = UtilityStage::new(sh(r#"sed 's/@tailwind base;/html { margin: 0; }/' "$2""#), PathBuf::from("."));
        let out = stage.run("@tailwind base;\na { color: red; }").unwrap();
        assert!(out.contains("html { margin: 0; }"));
        assert!(out.contains("a { color: red; }"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_carries_stderr() {
        let stage = UtilityStage::new(sh("echo 'unknown utility' >&2; exit 3"), PathBuf::from("."));
        let err = stage.run("@tailwind utilities;").unwrap_err();
        match err {
            StageError::Utility { message, .. } => assert_eq!(message, "unknown utility"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_executable_is_spawn_error() {
        let stage = UtilityStage::new(vec!["definitely-not-a-real-binary".to_string()], PathBuf::from("."));
        let err = stage.run("@tailwind base;").unwrap_err();
        assert!(matches!(err, StageError::Spawn { .. }));
    }
}
