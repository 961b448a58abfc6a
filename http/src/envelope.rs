//! Request and response envelopes that travel through the pipeline.

use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use crate::error::PipelineError;

/// An outbound request. Interceptors may rewrite any field except the id.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    id: Uuid,
    pub method: Method,
    pub url: Url,
    /// Query parameters appended to `url` at send time. Setting an existing
    /// key replaces its value.
    pub params: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            url,
            params: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Correlation id carried in log lines for this request.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(key, value);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// `url` with `params` appended to any query it already has.
    #[must_use]
    pub fn resolved_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        url
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: StatusCode, url: Url, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            url,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PipelineError> {
        serde_json::from_slice(&self.body).map_err(|source| PipelineError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// A non-2xx response, with every field the server sent back.
#[derive(Debug, Clone)]
pub struct HttpErrorResponse {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: String,
    pub message: String,
}

impl HttpErrorResponse {
    #[must_use]
    pub fn new(status: StatusCode, url: Url, headers: HeaderMap, body: impl Into<String>) -> Self {
        let message = format!(
            "Http failure response for {url}: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        );
        Self {
            status,
            url,
            headers,
            body: body.into(),
            message,
        }
    }

    #[must_use]
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown Status")
    }
}

impl fmt::Display for HttpErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn set_param_replaces_existing_key() {
        let request = HttpRequest::get(url("https://example.com/posts"))
            .with_param("id", "1")
            .with_param("id", "2");
        assert_eq!(request.params, vec![("id".to_string(), "2".to_string())]);
    }

    #[test]
    fn resolved_url_appends_to_existing_query() {
        let request =
            HttpRequest::get(url("https://example.com/posts?page=3")).with_param("id", "1");
        assert_eq!(
            request.resolved_url().as_str(),
            "https://example.com/posts?page=3&id=1"
        );
    }

    #[test]
    fn resolved_url_without_params_is_unchanged() {
        let request = HttpRequest::get(url("https://example.com/posts"));
        assert_eq!(request.resolved_url().as_str(), "https://example.com/posts");
    }

    #[test]
    fn requests_get_distinct_ids() {
        let a = HttpRequest::get(url("https://example.com"));
        let b = HttpRequest::get(url("https://example.com"));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn error_message_names_url_and_status() {
        let err = HttpErrorResponse::new(
            StatusCode::NOT_FOUND,
            url("https://example.com/missing"),
            HeaderMap::new(),
            "",
        );
        assert_eq!(
            err.to_string(),
            "Http failure response for https://example.com/missing: 404 Not Found"
        );
        assert_eq!(err.status_text(), "Not Found");
    }

    #[test]
    fn json_decode_failure_carries_url() {
        let response = HttpResponse::new(StatusCode::OK, url("https://example.com/x"), "not json");
        let err = response.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
        assert!(err.to_string().contains("https://example.com/x"));
    }
}
