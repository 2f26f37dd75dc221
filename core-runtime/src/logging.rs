//! # Logging
//!
//! [`init_logging`] installs the process-wide `tracing` subscriber:
//!
//! - a `tracing-subscriber` formatter on stdout (pretty, compact or JSON)
//! - an `EnvFilter` that keeps the bridge crates at the configured level and
//!   noisy HTTP dependencies at `warn`
//! - optionally, a layer mirroring every surviving event into the host
//!   [`LoggerSink`](bridge_traits::time::LoggerSink)
//!
//! Entries mirrored to the host are scrubbed when redaction is on: purchase
//! tokens and credentials are replaced, document paths are cut down to their
//! last segment and URL query strings are dropped.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::LogLevel;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug)
//!         .with_logger_sink(Arc::new(LogcatSink::default())),
//! )?;
//! ```

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const REDACTED: &str = "[REDACTED]";

/// Crates whose events honor [`LoggingConfig::level`].
const BRIDGE_CRATES: &[&str] = &["core_runtime", "core_bridge", "core_service", "bridge_desktop"];

/// Dependencies capped at `warn` under the default filter.
const QUIET_DEPENDENCIES: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "rustls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Full `EnvFilter` directive string; replaces the default filter
    pub filter: Option<String>,
    /// Scrub entries mirrored to the host sink
    pub redact: bool,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span enter/exit in the pretty format
    pub span_events: bool,
    /// Print thread names (`bridge-control` vs native workers)
    pub thread_names: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            redact: true,
            logger_sink: None,
            span_events: false,
            thread_names: true,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("redact", &self.redact)
            .field("logger_sink", &self.logger_sink.is_some())
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    pub fn with_redaction(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_thread_names(mut self, enabled: bool) -> Self {
        self.thread_names = enabled;
        self
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// [`Error::Logging`] when the filter does not parse or a global subscriber
/// is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let host_layer = config
        .logger_sink
        .clone()
        .map(|sink| HostLogLayer::new(sink, config.redact));

    tracing_subscriber::registry()
        .with(format_layer(&config))
        .with(filter)
        .with(host_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => default_directives(config.level),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Logging(format!("invalid filter {:?}: {}", directives, e)))
}

fn default_directives(level: LogLevel) -> String {
    let ours = BRIDGE_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level.as_str()));
    let quiet = QUIET_DEPENDENCIES.iter().map(|krate| format!("{}=warn", krate));

    ours.chain(quiet).collect::<Vec<_>>().join(",")
}

fn format_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_thread_names(config.thread_names);

    match config.format {
        LogFormat::Pretty => layer
            .pretty()
            .with_span_events(if config.span_events {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            })
            .boxed(),
        LogFormat::Json => layer
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

/// Mirrors events into the host [`LoggerSink`].
struct HostLogLayer {
    sink: Arc<dyn LoggerSink>,
    redact: bool,
}

impl HostLogLayer {
    fn new(sink: Arc<dyn LoggerSink>, redact: bool) -> Self {
        Self { sink, redact }
    }

    fn entry_for(&self, level: LogLevel, event: &Event<'_>) -> LogEntry {
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let metadata = event.metadata();
        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());

        fields
            .values
            .into_iter()
            .fold(LogEntry::new(level, metadata.target(), message), |entry, (key, value)| {
                let value = if self.redact {
                    scrub_field(&key, value)
                } else {
                    value
                };
                entry.with_field(key, value)
            })
    }

    fn forward(&self, entry: LogEntry) {
        let sink = Arc::clone(&self.sink);

        // Inside a runtime the sink runs as a task; elsewhere (native worker
        // threads, the blocking fetch path) it is driven inline.
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = sink.log(entry).await {
                        eprintln!("host log sink failed: {}", e);
                    }
                });
            }
            Err(_) => {
                if let Err(e) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("host log sink failed: {}", e);
                }
            }
        }
    }
}

impl<S> Layer<S> for HostLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let level = log_level(*event.metadata().level());
        if level < self.sink.min_level() {
            return;
        }

        let mut entry = self.entry_for(level, event);
        if let Some(span) = ctx.event_span(event) {
            entry = entry.in_span(span.name());
        }
        self.forward(entry);
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: HashMap<String, String>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

fn log_level(level: Level) -> LogLevel {
    match level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

fn scrub_field(name: &str, value: String) -> String {
    let lower = name.to_ascii_lowercase();
    if ["path", "file", "location", "display_name"]
        .iter()
        .any(|marker| lower.contains(marker))
    {
        strip_path(&value).to_string()
    } else {
        redact_if_sensitive(name, &value)
    }
}

/// Scrub a field value before it leaves the process.
///
/// Purchase tokens and credential-like fields are replaced entirely. URLs keep
/// scheme, host and path but lose their query string. Correlation tokens are
/// random and stay readable.
///
/// ```ignore
/// info!(purchase_token = %redact_if_sensitive("purchase_token", &token), "Consuming");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE: &[&str] = &[
        "purchase_token",
        "password",
        "secret",
        "api_key",
        "authorization",
        "cookie",
    ];

    let lower = field_name.to_ascii_lowercase();
    if SENSITIVE.iter().any(|marker| lower.contains(marker)) {
        return REDACTED.to_string();
    }

    match value.split_once('?') {
        Some((base, _)) if base.contains("://") => format!("{}?{}", base, REDACTED),
        _ => value.to_string(),
    }
}

/// Last segment of a file path or content URI.
///
/// ```ignore
/// info!(file = %strip_path("/data/user/0/app/files/save.dat"), "Exporting");
/// // file="save.dat"
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for CapturingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    fn capture(redact: bool, emit: impl FnOnce()) -> Vec<LogEntry> {
        let sink = Arc::new(CapturingSink::default());
        let subscriber =
            tracing_subscriber::registry().with(HostLogLayer::new(sink.clone(), redact));
        tracing::subscriber::with_default(subscriber, emit);
        let entries = sink.entries.lock().unwrap().clone();
        entries
    }

    #[test]
    fn test_default_directives() {
        let directives = default_directives(LogLevel::Debug);
        assert!(directives.contains("core_bridge=debug"));
        assert!(directives.contains("core_service=debug"));
        assert!(directives.contains("reqwest=warn"));
        assert!(build_filter(&LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_custom_filter_replaces_default() {
        let config = LoggingConfig::default().with_filter("core_bridge::ads=trace");
        let rendered = build_filter(&config).unwrap().to_string();
        assert!(rendered.contains("core_bridge::ads=trace"));
        assert!(!rendered.contains("reqwest"));
    }

    #[test]
    fn test_invalid_filter() {
        let config = LoggingConfig::default().with_filter("core_bridge=[[");
        assert!(matches!(build_filter(&config), Err(Error::Logging(_))));
    }

    #[test]
    fn test_redact_if_sensitive() {
        assert_eq!(redact_if_sensitive("purchase_token", "gpa.1234"), REDACTED);
        assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), REDACTED);
        assert_eq!(redact_if_sensitive("token", "7f0c"), "7f0c");
        assert_eq!(
            redact_if_sensitive("url", "https://api.example.com/v1/scores?key=abc"),
            "https://api.example.com/v1/scores?[REDACTED]"
        );
        assert_eq!(redact_if_sensitive("message", "what?"), "what?");
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(strip_path("/data/user/0/app/files/save.dat"), "save.dat");
        assert_eq!(strip_path("C:\\Users\\Jo\\save.dat"), "save.dat");
        assert_eq!(strip_path("content://com.android.providers/document/42"), "42");
        assert_eq!(strip_path("save.dat"), "save.dat");
    }

    #[test]
    fn test_host_layer_forwards_fields_and_span() {
        let entries = capture(false, || {
            let span = tracing::info_span!("buy");
            let _enter = span.enter();
            tracing::info!(target: "core_bridge::billing", index = 1u64, product_id = "paid_1", "Launching purchase");
        });

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.target, "core_bridge::billing");
        assert_eq!(entry.message, "Launching purchase");
        assert_eq!(entry.fields.get("index").map(String::as_str), Some("1"));
        assert_eq!(entry.fields.get("product_id").map(String::as_str), Some("paid_1"));
        assert_eq!(entry.span.as_deref(), Some("buy"));
    }

    #[test]
    fn test_host_layer_scrubs_when_enabled() {
        let entries = capture(true, || {
            tracing::warn!(
                purchase_token = "gpa.secret",
                path = "/data/user/0/app/files/save.dat",
                "Consume failed"
            );
            tracing::trace!("below the sink level");
        });

        assert_eq!(entries.len(), 1);
        let fields = &entries[0].fields;
        assert_eq!(fields.get("purchase_token").map(String::as_str), Some(REDACTED));
        assert_eq!(fields.get("path").map(String::as_str), Some("save.dat"));
    }
}
