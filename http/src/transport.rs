//! Network transport backed by `reqwest`.

use futures_util::StreamExt;
use futures_util::future::BoxFuture;

use crate::envelope::{HttpErrorResponse, HttpRequest, HttpResponse};
use crate::error::PipelineError;
use crate::pipeline::{PipelineResult, Transport};

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Sends requests with a shared `reqwest::Client`. Non-2xx answers become
/// [`PipelineError::Http`] so interceptors can inspect them on the way back.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, PipelineResult> {
        Box::pin(async move {
            let url = request.resolved_url();
            let id = request.id();
            tracing::debug!(request_id = %id, method = %request.method, %url, "Sending request");

            let response = self
                .client
                .request(request.method, url.clone())
                .headers(request.headers)
                .send()
                .await
                .map_err(|source| PipelineError::Transport {
                    url: url.clone(),
                    source,
                })?;

            let status = response.status();
            let headers = response.headers().clone();
            let final_url = response.url().clone();
            tracing::debug!(request_id = %id, status = status.as_u16(), "Response received");

            if status.is_success() {
                let body = response
                    .bytes()
                    .await
                    .map_err(|source| PipelineError::Transport { url, source })?;
                Ok(HttpResponse {
                    status,
                    url: final_url,
                    headers,
                    body: body.to_vec(),
                })
            } else {
                let body = read_capped_error_body(response).await;
                Err(PipelineError::Http(HttpErrorResponse::new(
                    status, final_url, headers, body,
                )))
            }
        })
    }
}

/// Error bodies are only ever logged or surfaced to a reporter; cap them.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
