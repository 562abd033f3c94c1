//! Log capture for tests of components that fire signals
//!
//! The dispatcher reports receiver failures only through `tracing`, so tests
//! asserting on that behaviour install a [`CapturedLogs`] layer and inspect
//! the recorded events.
//!
//! # Example
//!
//! ```
//! use sumi_signals::testing::{capture_logs, CapturedLogs};
//!
//! let logs = CapturedLogs::default();
//! capture_logs(&logs, || tracing::error!(receiver = "r", "Something failed"));
//! assert_eq!(logs.errors()[0].field("receiver"), Some("r"));
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// One captured log event
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
}

impl LogRecord {
    /// Returns a structured field rendered as text
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// A `tracing` layer that stores every event it sees
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl CapturedLogs {
    /// Installs the capture as the thread's default subscriber
    ///
    /// Capture stops when the returned guard is dropped.
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    /// Returns every captured event
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns the captured ERROR events
    pub fn errors(&self) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.level == Level::ERROR)
            .collect()
    }

    fn push(&self, record: LogRecord) {
        self.records.lock().push(record);
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let message = visitor.fields.remove("message").unwrap_or_default();
        self.push(LogRecord {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message,
            fields: visitor.fields,
        });
    }
}

/// Runs a closure with the capture installed
pub fn capture_logs<T>(logs: &CapturedLogs, f: impl FnOnce() -> T) -> T {
    let _guard = logs.install();
    f()
}

#[derive(Default)]
struct FieldVisitor {
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }
}
