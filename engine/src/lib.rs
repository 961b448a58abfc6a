//! Application layer for sigwire.
//!
//! [`App`] is the root component. It builds the HTTP client from
//! [`SigwireConfig`], runs the [`Initializer`], and owns the demo components.
//! Failures that nobody handles are passed to the [`ErrorReporter`] it was
//! constructed with.

mod app;
pub mod components;
mod initializer;
mod reporter;

pub use app::{App, Command, build_http_client};
pub use initializer::{
    APP_CONFIG_ASSET, APP_CONFIG_FILE, ConfigSource, Initializer, PRIORITY_MESSAGE,
};
pub use reporter::{
    ErrorReporter, Incident, RecordingSink, ReportSink, TracingSink, UNKNOWN_ERROR,
    install_panic_hook,
};
pub use sigwire_config::{ConfigError, SigwireConfig};
