//! Structured result logs.
//!
//! A check does not return a bare status string: it returns an ordered
//! trail of `(severity, message)` entries. The overall severity of the
//! log is the most severe entry; `debug`/`info` entries carry
//! [`Severity::Ok`] and never raise it.

use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// One entry in a result log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
    /// Debug entries are kept out of default renderings.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub debug: bool,
}

/// Ordered diagnostic trail produced by one check execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLog {
    entries: Vec<LogEntry>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry log, the common case for simple checks.
    pub fn single(severity: Severity, message: impl Into<String>) -> Self {
        let mut log = Self::new();
        log.add(severity, message);
        log
    }

    /// Append an entry with an explicit severity.
    pub fn add(&mut self, severity: Severity, message: impl Into<String>) {
        self.entries.push(LogEntry {
            severity,
            message: message.into(),
            debug: false,
        });
    }

    /// Append a debug entry (does not affect the aggregate status).
    pub fn debug(&mut self, message: impl Into<String>) {
        self.entries.push(LogEntry {
            severity: Severity::Ok,
            message: message.into(),
            debug: true,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.add(Severity::Ok, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.add(Severity::Warn, message);
    }

    pub fn temporarily_unavailable(&mut self, message: impl Into<String>) {
        self.add(Severity::TemporarilyUnavailable, message);
    }

    pub fn critical(&mut self, message: impl Into<String>) {
        self.add(Severity::Critical, message);
    }

    pub fn health_check_error(&mut self, message: impl Into<String>) {
        self.add(Severity::HealthCheckError, message);
    }

    /// The most severe entry severity, `Ok` for an empty log.
    pub fn aggregate_status(&self) -> Severity {
        self.entries
            .iter()
            .fold(Severity::Ok, |acc, e| Severity::worst(acc, e.severity))
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append all entries of another log, preserving order.
    pub fn extend_from(&mut self, other: &ResultLog) {
        self.entries.extend_from_slice(&other.entries);
    }
}

impl std::fmt::Display for ResultLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", entry.severity, entry.message)?;
        }
        Ok(())
    }
}
