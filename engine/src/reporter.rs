//! Sink for uncaught errors.
//!
//! One [`ErrorReporter`] is built at startup and handed to whoever needs it.
//! Reporting never fails and never panics: every incident is reduced to a
//! single message and passed to a [`ReportSink`].

use std::any::Any;
use std::fmt;
use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use sigwire_http::PipelineError;

pub const UNKNOWN_ERROR: &str = "unknown error";

/// Something that went wrong and nobody handled.
#[derive(Debug)]
pub enum Incident {
    /// A typed error; the message includes its source chain.
    Error(anyhow::Error),
    /// An error of unknown shape.
    Value(Value),
    Panic {
        message: String,
        location: Option<String>,
    },
}

impl Incident {
    /// Human-readable message for the incident.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Incident::Error(err) => format!("{err:#}"),
            Incident::Value(value) => message_from_value(value),
            Incident::Panic {
                message,
                location: Some(location),
            } => format!("panicked at {location}: {message}"),
            Incident::Panic {
                message,
                location: None,
            } => format!("panicked: {message}"),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Incident::Error(_) => "error",
            Incident::Value(_) => "value",
            Incident::Panic { .. } => "panic",
        }
    }

    #[must_use]
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        Incident::Panic {
            message: panic_payload_message(info.payload()),
            location: info.location().map(ToString::to_string),
        }
    }
}

impl From<anyhow::Error> for Incident {
    fn from(err: anyhow::Error) -> Self {
        Incident::Error(err)
    }
}

impl From<PipelineError> for Incident {
    fn from(err: PipelineError) -> Self {
        Incident::Error(anyhow::Error::new(err))
    }
}

impl From<Value> for Incident {
    fn from(value: Value) -> Self {
        Incident::Value(value)
    }
}

/// `message` field if it is a string, the string itself, otherwise compact JSON.
fn message_from_value(value: &Value) -> String {
    match value {
        Value::Null => UNKNOWN_ERROR.to_string(),
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}

fn panic_payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        UNKNOWN_ERROR.to_string()
    }
}

/// Where reported messages end up.
pub trait ReportSink: Send + Sync {
    fn emit(&self, kind: &'static str, message: &str);
}

/// Logs each incident at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&self, kind: &'static str, message: &str) {
        tracing::error!(target: "sigwire::reporter", kind, "{message}");
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for RecordingSink {
    fn emit(&self, _kind: &'static str, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

impl<S: ReportSink + ?Sized> ReportSink for Arc<S> {
    fn emit(&self, kind: &'static str, message: &str) {
        (**self).emit(kind, message);
    }
}

pub struct ErrorReporter {
    sink: Box<dyn ReportSink>,
    reported: AtomicUsize,
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(TracingSink)
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("reported", &self.reported())
            .finish_non_exhaustive()
    }
}

impl ErrorReporter {
    pub fn new(sink: impl ReportSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            reported: AtomicUsize::new(0),
        }
    }

    /// Log the incident and swallow it.
    pub fn report(&self, incident: impl Into<Incident>) {
        let incident = incident.into();
        self.sink.emit(incident.kind(), &incident.message());
        self.reported.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of incidents reported so far.
    #[must_use]
    pub fn reported(&self) -> usize {
        self.reported.load(Ordering::Relaxed)
    }
}

/// Route panics on any thread to `reporter`. Replaces the current hook.
pub fn install_panic_hook(reporter: Arc<ErrorReporter>) {
    std::panic::set_hook(Box::new(move |info| {
        reporter.report(Incident::from_panic(info));
    }));
}
