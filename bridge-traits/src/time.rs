//! Clock and host log sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Source of wall-clock time for pending operation timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds elapsed since `earlier`, clamped at zero.
    fn millis_since(&self, earlier: DateTime<Utc>) -> u64 {
        (self.now() - earlier).num_milliseconds().max(0) as u64
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// One diagnostic line mirrored into the host log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Rust module path that emitted the event
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
    /// Innermost span the event was emitted in
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn in_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }
}

/// Host logging pipeline (Logcat, os_log, a console).
///
/// Entries reach the sink already scrubbed when redaction is enabled; host
/// enrichment must not reintroduce purchase tokens or full document paths.
#[async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Entries below this level are never forwarded.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}
