//! HTTP client with an ordered interceptor pipeline.
//!
//! # Architecture
//!
//! - [`HttpRequest`] / [`HttpResponse`] / [`HttpErrorResponse`] - envelopes that
//!   travel through the chain
//! - [`Interceptor`] - one stage; may rewrite the request before calling
//!   [`Next::run`] and inspect the result after it
//! - [`Pipeline`] - stages composed by [`PipelineBuilder`], ending in a [`Transport`]
//! - [`ReqwestTransport`] - the network transport
//! - [`HttpClient`] - base URL resolution, query parameters and JSON decoding
//!
//! # Built-in stages
//!
//! | Stage | Outbound | Inbound |
//! |-------|----------|---------|
//! | [`AuthHeader`] | sets `Authorization` | - |
//! | [`ErrorClassifier`] | - | per-status handlers for error responses, then re-raise |
//!
//! # Error Handling
//!
//! Non-2xx responses are returned as [`PipelineError::Http`] rather than as a
//! successful response, so inbound stages see them. No stage swallows an error.

mod client;
mod envelope;
mod error;
mod interceptors;
mod pipeline;
mod transport;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

pub use client::HttpClient;
pub use envelope::{HttpErrorResponse, HttpRequest, HttpResponse};
pub use error::PipelineError;
pub use interceptors::{
    AuthHeader, CLASSIFIED_STATUSES, DEFAULT_AUTHORIZATION, ErrorClassifier, ErrorDetail,
    StatusHandler, status_message,
};
pub use pipeline::{Interceptor, Next, Pipeline, PipelineBuilder, PipelineResult, Transport};
pub use transport::{ReqwestTransport, read_capped_error_body};

pub use reqwest::{Method, StatusCode, header};
pub use url::Url;

const CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 32;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Knobs for [`build_client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Refuse plain-http URLs.
    pub https_only: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            https_only: false,
        }
    }
}

fn base_client_builder(options: &ClientOptions) -> reqwest::ClientBuilder {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("sigwire/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(options.timeout)
        .redirect(reqwest::redirect::Policy::none())
        .https_only(options.https_only)
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

pub fn build_client(options: &ClientOptions) -> Result<reqwest::Client, reqwest::Error> {
    base_client_builder(options).build()
}

/// The default pipeline: auth header outbound, error classification inbound,
/// over the network transport.
pub fn default_pipeline(
    client: reqwest::Client,
    auth: AuthHeader,
    classifier: ErrorClassifier,
) -> Pipeline {
    Pipeline::builder()
        .with(auth)
        .with(classifier)
        .build(ReqwestTransport::new(client))
}
