//! Host Log Sink
//!
//! Mirrors structured log events into the host's own logging pipeline
//! (Logcat on Android players, the system journal on Linux kiosks).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

use crate::error::Result;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Single-letter priority tag in the Logcat convention.
    pub fn tag(self) -> char {
        match self {
            LogLevel::Trace => 'V',
            LogLevel::Debug => 'D',
            LogLevel::Info => 'I',
            LogLevel::Warn => 'W',
            LogLevel::Error => 'E',
        }
    }
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Emitting module, e.g. `core_playback::registry`.
    pub target: String,
    pub message: String,
    /// Event fields, already redacted by the forwarding layer.
    pub fields: BTreeMap<String, String>,
    /// Name of the innermost active span, if any.
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }

    /// Render as a single Logcat-style line: `I/target: message key=value`.
    pub fn to_line(&self) -> String {
        let mut line = format!("{}/{}: {}", self.level.tag(), self.target, self.message);
        for (key, value) in &self.fields {
            line.push(' ');
            line.push_str(key);
            line.push('=');
            line.push_str(value);
        }
        line
    }
}

/// Logger sink trait
///
/// Called synchronously from whichever thread emitted the event, including
/// the owner thread, so implementations must not block for long.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};
///
/// struct Journal;
///
/// impl LoggerSink for Journal {
///     fn log(&self, entry: &LogEntry) -> Result<()> {
///         journal::send(entry.to_line())
///     }
/// }
/// ```
pub trait LoggerSink: Send + Sync {
    fn log(&self, entry: &LogEntry) -> Result<()>;

    /// Minimum level forwarded to this sink.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Writes entries to stderr, one line each.
#[derive(Debug, Clone)]
pub struct StderrLogger {
    pub min_level: LogLevel,
}

impl Default for StderrLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

impl LoggerSink for StderrLogger {
    fn log(&self, entry: &LogEntry) -> Result<()> {
        let mut stderr = std::io::stderr().lock();
        writeln!(
            stderr,
            "{} {}",
            entry.timestamp.format("%m-%d %H:%M:%S%.3f"),
            entry.to_line()
        )?;
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
