//! Operator-facing log stream.
//!
//! Every line the supervisor prints on stdout goes through a [`Logger`]. The
//! output format is picked once, at construction, by choosing a [`LogSink`]:
//! [`PlainSink`] prints `[Vardr] message` lines, [`JsonSink`] prints one JSON
//! object per line. Internal diagnostics use `tracing` instead and go to
//! stderr.

use crate::Timestamp;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Prefix for plain-text lines.
pub const PLAIN_PREFIX: &str = "[Vardr]";

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

/// A single entry handed to a sink.
#[derive(Debug)]
pub enum LogEntry<'a> {
    /// Free-form message.
    Message { level: Level, message: &'a str },
    /// Structured event; payload fields are merged into the emitted object.
    Event {
        kind: &'a str,
        payload: Map<String, Value>,
    },
}

/// Output strategy for log entries. Implementations must not panic.
pub trait LogSink: Send + Sync {
    fn emit(&self, entry: &LogEntry<'_>);
}

type Output = Mutex<Box<dyn Write + Send>>;

fn write_line(out: &Output, line: &str) {
    if let Ok(mut out) = out.lock() {
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}

/// Human-readable sink.
pub struct PlainSink {
    out: Output,
}

impl PlainSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

impl LogSink for PlainSink {
    fn emit(&self, entry: &LogEntry<'_>) {
        match entry {
            LogEntry::Message { message, .. } => {
                write_line(&self.out, &format!("{} {}", PLAIN_PREFIX, message));
            }
            // Structured events are only meaningful to log collectors.
            LogEntry::Event { kind, .. } => {
                tracing::debug!(kind, "Skipping structured event in plain mode");
            }
        }
    }
}

/// Newline-delimited JSON sink.
pub struct JsonSink {
    out: Output,
}

impl JsonSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn render(entry: &LogEntry<'_>) -> serde_json::Result<String> {
        let mut object = Map::new();
        match entry {
            LogEntry::Message { level, message } => {
                object.insert("type".into(), Value::from("log"));
                object.insert("timestamp".into(), Value::from(Timestamp::now().to_iso8601()));
                object.insert("level".into(), serde_json::to_value(level)?);
                object.insert("message".into(), Value::from(*message));
            }
            LogEntry::Event { kind, payload } => {
                object.insert("type".into(), Value::from(*kind));
                object.insert("timestamp".into(), Value::from(Timestamp::now().to_iso8601()));
                for (key, value) in payload {
                    object.insert(key.clone(), value.clone());
                }
            }
        }
        serde_json::to_string(&Value::Object(object))
    }
}

impl LogSink for JsonSink {
    fn emit(&self, entry: &LogEntry<'_>) {
        match Self::render(entry) {
            Ok(line) => write_line(&self.out, &line),
            Err(e) => report_serialization_failure(&e),
        }
    }
}

fn report_serialization_failure(e: &dyn fmt::Display) {
    eprintln!("[ERROR] Failed to generate JSON log: {}", e);
}

/// Front end used by every component that reports to the operator.
pub struct Logger {
    sink: Box<dyn LogSink>,
}

impl Logger {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// Stdout logger, JSON or plain.
    pub fn stdout(json: bool) -> Self {
        if json {
            Self::new(JsonSink::stdout())
        } else {
            Self::new(PlainSink::stdout())
        }
    }

    /// Logger whose output is dropped.
    pub fn discard() -> Self {
        Self::new(PlainSink::new(Box::new(std::io::sink())))
    }

    pub fn log(&self, level: Level, message: impl AsRef<str>) {
        self.sink.emit(&LogEntry::Message {
            level,
            message: message.as_ref(),
        });
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Level::Error, message);
    }

    /// Emit a structured event. `payload` must serialize to a JSON object;
    /// anything else is reported on stderr and dropped.
    pub fn structured<T: Serialize + ?Sized>(&self, kind: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(Value::Object(payload)) => self.sink.emit(&LogEntry::Event { kind, payload }),
            Ok(other) => report_serialization_failure(&format!(
                "payload for {} is not an object: {}",
                kind, other
            )),
            Err(e) => report_serialization_failure(&e),
        }
    }
}

/// Cloneable in-memory writer, handy for capturing log output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        match self.0.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut buf) => {
                buf.extend_from_slice(data);
                Ok(data.len())
            }
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "log buffer poisoned",
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::ser::Error as _;
    use std::collections::BTreeMap;

    #[test]
    fn test_plain_line_format() {
        let buf = LogBuffer::new();
        let logger = Logger::new(PlainSink::new(Box::new(buf.clone())));
        logger.info("Starting certificate import process...");
        logger.warn("Invalid certificate format: broken.crt");
        assert_eq!(
            buf.lines(),
            vec![
                "[Vardr] Starting certificate import process...",
                "[Vardr] Invalid certificate format: broken.crt",
            ]
        );
    }

    #[test]
    fn test_plain_skips_structured_events() {
        let buf = LogBuffer::new();
        let logger = Logger::new(PlainSink::new(Box::new(buf.clone())));
        logger.structured("certificate_import_summary", &serde_json::json!({"total": 1}));
        assert!(buf.contents().is_empty());
    }

    #[test]
    fn test_json_message_fields() {
        let buf = LogBuffer::new();
        let logger = Logger::new(JsonSink::new(Box::new(buf.clone())));
        logger.error("boom");

        let lines = buf.lines();
        assert_eq!(lines.len(), 1);
        let value: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["type"], "log");
        assert_eq!(value["level"], "ERROR");
        assert_eq!(value["message"], "boom");
        let ts = value["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_json_event_merges_payload() {
        let buf = LogBuffer::new();
        let logger = Logger::new(JsonSink::new(Box::new(buf.clone())));
        let mut results = BTreeMap::new();
        results.insert("corp-root", "SUCCESS");
        logger.structured(
            "certificate_import_summary",
            &serde_json::json!({"successful_imports": 1, "results": results}),
        );

        let value: Value = serde_json::from_str(&buf.lines()[0]).unwrap();
        assert_eq!(value["type"], "certificate_import_summary");
        assert_eq!(value["successful_imports"], 1);
        assert_eq!(value["results"]["corp-root"], "SUCCESS");
        assert!(value.get("timestamp").is_some());
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refusing to serialize"))
        }
    }

    #[test]
    fn test_serialization_failure_does_not_emit() {
        let buf = LogBuffer::new();
        let logger = Logger::new(JsonSink::new(Box::new(buf.clone())));
        logger.structured("broken", &Unserializable);
        logger.structured("scalar", &42);
        logger.info("still running");

        let lines = buf.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("still running"));
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Info.to_string(), "INFO");
        assert_eq!(Level::Warn.to_string(), "WARN");
        assert_eq!(Level::Error.to_string(), "ERROR");
    }
}
