//! Compilation status reporting.
//!
//! Every build announces itself with a timestamped, emoji-tagged line:
//!
//! ```text
//! 🔵 [5 Mar 09:04:07] [CSS] Compilating... /app/assets/stylesheets/application.scss
//! 🟢 [5 Mar 09:04:08] [CSS] Compilation ok /app/assets/stylesheets/application.scss
//! 🔴 [5 Mar 09:04:08] [CSS] Compilation failed. ↙️
//! (Error: expected ";".)
//! ```
//!
//! Stylesheet reads observed during compilation print an unprefixed
//! `Compiling <path>` line.

use chrono::{DateTime, Local, TimeZone};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Prefix shown after the timestamp of every status line.
pub const LOG_PREFIX: &str = "[CSS]";

/// `D MMM HH:mm:ss`, e.g. `5 Mar 09:04:07`.
pub const TIMESTAMP_FORMAT: &str = "%-d %b %H:%M:%S";

/// Events emitted over the life of a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationEvent {
    /// A build of the given entry point is starting
    Starting(Option<PathBuf>),
    /// The given entry point compiled and was written
    Success(Option<PathBuf>),
    /// A build failed; carries the error's display form
    Error(String),
    /// A stylesheet matching the resolution filter was read
    Resolving(PathBuf),
}

/// Receives compilation events.
///
/// Implementations must tolerate events from several builds interleaving.
pub trait EventReporter: Send + Sync {
    /// Report an event.
    fn report(&self, event: CompilationEvent);
}

/// Format a point in time as a status-line timestamp.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local time as a status-line timestamp.
pub fn timestamp() -> String {
    format_timestamp(&Local::now())
}

/// Render an event as the text written to the console.
///
/// `ts` is only used by the status events; resolution lines carry none.
pub fn render_event(event: &CompilationEvent, ts: &str) -> String {
    match event {
        CompilationEvent::Starting(file) => {
            format!("🔵 [{}] {} Compilating... {}", ts, LOG_PREFIX, display_file(file))
        }
        CompilationEvent::Success(file) => {
            format!("🟢 [{}] {} Compilation ok {}", ts, LOG_PREFIX, display_file(file))
        }
        CompilationEvent::Error(message) => {
            format!("🔴 [{}] {} Compilation failed. ↙️\n({})", ts, LOG_PREFIX, message)
        }
        CompilationEvent::Resolving(path) => format!("Compiling {}", path.display()),
    }
}

fn display_file(file: &Option<PathBuf>) -> String {
    file.as_ref().map(|p| p.display().to_string()).unwrap_or_default()
}

/// Console reporter writing one line per event to stdout.
pub struct ConsoleReporter {
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleReporter").finish()
    }
}

impl ConsoleReporter {
    /// Create a reporter writing to stdout.
    pub fn new() -> Self {
        Self { output: Mutex::new(Box::new(std::io::stdout())) }
    }

    /// Create a reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { output: Mutex::new(Box::new(output)) }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventReporter for ConsoleReporter {
    fn report(&self, event: CompilationEvent) {
        // Timestamp is taken at call time, never cached.
        let line = render_event(&event, &timestamp());
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
            let _ = output.flush();
        }
    }
}
