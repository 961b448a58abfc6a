use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::envelope::HttpErrorResponse;

/// Everything that can come back up the pipeline instead of a response.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The server answered with a non-2xx status.
    #[error("{0}")]
    Http(HttpErrorResponse),

    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    /// An error reduced to its message by
    /// [`ErrorDetail::MessageOnly`](crate::ErrorDetail::MessageOnly).
    #[error("{0}")]
    Message(String),

    #[error("invalid response body from {url}: {source}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid request url '{raw}': {source}")]
    InvalidUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
}

impl PipelineError {
    /// HTTP status, if the server answered at all and the error kept it.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http(response) => Some(response.status),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_http(&self) -> Option<&HttpErrorResponse> {
        match self {
            Self::Http(response) => Some(response),
            _ => None,
        }
    }
}
