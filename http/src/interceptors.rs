//! Built-in pipeline stages.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue, InvalidHeaderValue};

use crate::envelope::{HttpErrorResponse, HttpRequest};
use crate::error::PipelineError;
use crate::pipeline::{Interceptor, Next, PipelineResult};

/// Authorization value attached when none is configured.
pub const DEFAULT_AUTHORIZATION: &str = "test";

// ============================================================================
// AuthHeader
// ============================================================================

/// Sets a fixed `Authorization` header on every outbound request, replacing
/// any value already present. Other headers are left alone.
#[derive(Clone)]
pub struct AuthHeader {
    value: HeaderValue,
}

impl AuthHeader {
    pub fn new(value: &str) -> Result<Self, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(value)?;
        value.set_sensitive(true);
        Ok(Self { value })
    }
}

impl Default for AuthHeader {
    fn default() -> Self {
        let mut value = HeaderValue::from_static(DEFAULT_AUTHORIZATION);
        value.set_sensitive(true);
        Self { value }
    }
}

// Manual Debug impl to keep the credential out of logs.
impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl Interceptor for AuthHeader {
    fn name(&self) -> &'static str {
        "auth-header"
    }

    fn intercept<'a>(
        &'a self,
        mut request: HttpRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        tracing::debug!(request_id = %request.id(), url = %request.url, "HTTP interceptor triggered");
        request.headers.insert(AUTHORIZATION, self.value.clone());
        tracing::debug!(request_id = %request.id(), "Request prepared and ready to send");
        next.run(request)
    }
}

// ============================================================================
// ErrorClassifier
// ============================================================================

/// What the classifier hands back up the chain after handling an error response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorDetail {
    /// Re-raise the error response unchanged, status, URL and body included.
    #[default]
    Preserve,
    /// Re-raise only the message. Status and body are dropped, so callers
    /// cannot branch on them.
    MessageOnly,
}

pub type StatusHandler = Arc<dyn Fn(&HttpErrorResponse) + Send + Sync>;

/// Statuses with a dedicated handler out of the box.
pub const CLASSIFIED_STATUSES: [u16; 4] = [401, 402, 403, 404];

#[must_use]
pub fn status_message(status: StatusCode) -> String {
    format!("{} status code", status.as_u16())
}

fn log_status(error: &HttpErrorResponse) {
    tracing::warn!(
        status = error.status.as_u16(),
        url = %error.url,
        "{}",
        status_message(error.status)
    );
}

/// Inspects error responses coming back up the chain, dispatches them to a
/// per-status handler and re-raises them. Nothing is swallowed.
#[derive(Clone)]
pub struct ErrorClassifier {
    handlers: BTreeMap<u16, StatusHandler>,
    detail: ErrorDetail,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        let mut classifier = Self::empty();
        for status in CLASSIFIED_STATUSES {
            classifier = classifier.on(status, log_status);
        }
        classifier
    }
}

impl fmt::Debug for ErrorClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorClassifier")
            .field("statuses", &self.handlers.keys().collect::<Vec<_>>())
            .field("detail", &self.detail)
            .finish()
    }
}

impl ErrorClassifier {
    /// A classifier with no handlers; every status passes through unclassified.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
            detail: ErrorDetail::default(),
        }
    }

    /// Install (or replace) the handler for `status`.
    pub fn on(
        mut self,
        status: u16,
        handler: impl Fn(&HttpErrorResponse) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(status, Arc::new(handler));
        self
    }

    pub fn detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = detail;
        self
    }

    #[must_use]
    pub fn handles(&self, status: StatusCode) -> bool {
        self.handlers.contains_key(&status.as_u16())
    }

    /// Run the handler for `error`'s status. Returns false for unclassified statuses.
    pub fn classify(&self, error: &HttpErrorResponse) -> bool {
        match self.handlers.get(&error.status.as_u16()) {
            Some(handler) => {
                handler(error);
                true
            }
            None => {
                tracing::debug!(
                    status = error.status.as_u16(),
                    url = %error.url,
                    "Unclassified error status"
                );
                false
            }
        }
    }

    fn reraise(&self, error: HttpErrorResponse) -> PipelineError {
        match self.detail {
            ErrorDetail::Preserve => PipelineError::Http(error),
            ErrorDetail::MessageOnly => PipelineError::Message(error.message),
        }
    }
}

impl Interceptor for ErrorClassifier {
    fn name(&self) -> &'static str {
        "error-classifier"
    }

    fn intercept<'a>(
        &'a self,
        request: HttpRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            match next.run(request).await {
                Err(PipelineError::Http(error)) => {
                    self.classify(&error);
                    Err(self.reraise(error))
                }
                other => other,
            }
        })
    }
}
