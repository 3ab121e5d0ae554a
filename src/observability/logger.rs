//! Structured JSON logger.
//!
//! One log line = one event. Lines are JSON objects with deterministic key
//! ordering: `event`, `severity`, `ts`, then remaining fields sorted
//! alphabetically. Output is synchronous and unbuffered.
//!
//! The logger is an explicit dependency: the coordinator receives one at
//! construction with a minimum severity, instead of consulting any
//! process-wide verbosity switch. Logging must never raise; write failures
//! are swallowed.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};

use super::events::Event;

/// Log severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

enum Sink {
    /// INFO and below to stdout, WARN and above to stderr.
    Console,
    /// Collect lines in memory (tests and assertions on log output).
    Capture(Arc<Mutex<Vec<String>>>),
}

/// Captured log output, shared with a [`Logger::captured`] logger.
#[derive(Clone)]
pub struct CapturedLogs {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedLogs {
    /// All lines captured so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Whether any captured line carries the given event.
    pub fn contains_event(&self, event: Event) -> bool {
        let needle = format!("\"event\":\"{}\"", event.code());
        self.lines().iter().any(|line| line.contains(&needle))
    }

    /// Number of captured lines carrying the given event.
    pub fn count_event(&self, event: Event) -> usize {
        let needle = format!("\"event\":\"{}\"", event.code());
        self.lines()
            .iter()
            .filter(|line| line.contains(&needle))
            .count()
    }
}

/// A structured logger with a minimum-severity filter.
pub struct Logger {
    min: Option<Severity>,
    sink: Sink,
}

impl Logger {
    /// A logger emitting everything at or above `min` to the console.
    pub fn new(min: Severity) -> Self {
        Self {
            min: Some(min),
            sink: Sink::Console,
        }
    }

    /// A logger that emits nothing. The default for embedded use.
    pub fn disabled() -> Self {
        Self {
            min: None,
            sink: Sink::Console,
        }
    }

    /// A logger that collects lines in memory instead of writing them out.
    pub fn captured(min: Severity) -> (Self, CapturedLogs) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let logger = Self {
            min: Some(min),
            sink: Sink::Capture(Arc::clone(&lines)),
        };
        (logger, CapturedLogs { lines })
    }

    fn enabled(&self, severity: Severity) -> bool {
        matches!(self.min, Some(min) if severity >= min)
    }

    /// Log an event with the given severity and fields.
    pub fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        if !self.enabled(severity) {
            return;
        }
        let line = render_line(severity, event, fields);
        match &self.sink {
            Sink::Console => {
                if severity >= Severity::Warn {
                    let mut err = io::stderr();
                    let _ = err.write_all(line.as_bytes());
                    let _ = err.flush();
                } else {
                    let mut out = io::stdout();
                    let _ = out.write_all(line.as_bytes());
                    let _ = out.flush();
                }
            }
            Sink::Capture(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line);
                }
            }
        }
    }

    /// Log at TRACE level
    pub fn trace(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }
}

/// Build one JSON log line. Event first, then severity and timestamp, then
/// fields sorted alphabetically for deterministic output.
fn render_line(severity: Severity, event: Event, fields: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(256);

    output.push_str("{\"event\":\"");
    escape_json_string(&mut output, event.code());
    output.push('"');

    output.push_str(",\"severity\":\"");
    output.push_str(severity.as_str());
    output.push('"');

    output.push_str(",\"ts\":\"");
    output.push_str(&Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    output.push('"');

    let mut sorted_fields: Vec<_> = fields.iter().collect();
    sorted_fields.sort_by_key(|(k, _)| *k);

    for (key, value) in sorted_fields {
        output.push_str(",\"");
        escape_json_string(&mut output, key);
        output.push_str("\":\"");
        escape_json_string(&mut output, value);
        output.push('"');
    }

    output.push('}');
    output.push('\n');
    output
}

/// Escape special characters for JSON strings
fn escape_json_string(output: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => {
                output.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => output.push(c),
        }
    }
}
