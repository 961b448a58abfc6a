use serde::de::DeserializeOwned;
use url::Url;

use crate::envelope::{HttpRequest, HttpResponse};
use crate::error::PipelineError;
use crate::pipeline::{Pipeline, PipelineResult};

/// Facade over a [`Pipeline`] that resolves relative paths and decodes JSON.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: Option<Url>,
    pipeline: Pipeline,
}

impl HttpClient {
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            base_url: None,
            pipeline,
        }
    }

    /// Relative paths are joined onto `base`. A missing trailing slash is added
    /// so that the last path segment of `base` is kept.
    #[must_use]
    pub fn with_base_url(mut self, mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        self.base_url = Some(base);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn resolve(&self, target: &str) -> Result<Url, PipelineError> {
        let invalid = |source| PipelineError::InvalidUrl {
            raw: target.to_string(),
            source,
        };
        match Url::parse(target) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base.join(target).map_err(invalid),
                None => Err(invalid(url::ParseError::RelativeUrlWithoutBase)),
            },
            Err(source) => Err(invalid(source)),
        }
    }

    /// Build a GET request for `target` with `params` as query parameters.
    pub fn get_request(
        &self,
        target: &str,
        params: &[(&str, &str)],
    ) -> Result<HttpRequest, PipelineError> {
        let mut request = HttpRequest::get(self.resolve(target)?);
        for (key, value) in params {
            request.set_param(*key, *value);
        }
        Ok(request)
    }

    pub async fn send(&self, request: HttpRequest) -> PipelineResult {
        self.pipeline.send(request).await
    }

    pub async fn get(&self, target: &str, params: &[(&str, &str)]) -> PipelineResult {
        let request = self.get_request(target, params)?;
        self.send(request).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        target: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PipelineError> {
        let response: HttpResponse = self.get(target, params).await?;
        response.json()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;

    use super::*;
    use crate::pipeline::testing::StubTransport;

    fn client(status: StatusCode, body: &str) -> (HttpClient, Arc<StubTransport>) {
        let transport = Arc::new(StubTransport::answering(status, body));
        let pipeline = Pipeline::builder().build(Arc::clone(&transport));
        (HttpClient::new(pipeline), transport)
    }

    #[test]
    fn relative_path_joins_base_with_trailing_slash_added() {
        let (client, _) = client(StatusCode::OK, "");
        let client = client.with_base_url(Url::parse("http://localhost:4200/app").unwrap());
        let url = client.resolve("./assets/config/appConfig.json").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4200/app/assets/config/appConfig.json"
        );
    }

    #[test]
    fn absolute_url_ignores_base() {
        let (client, _) = client(StatusCode::OK, "");
        let client = client.with_base_url(Url::parse("http://localhost:4200/").unwrap());
        let url = client
            .resolve("https://jsonplaceholder.typicode.com/posts")
            .unwrap();
        assert_eq!(url.host_str(), Some("jsonplaceholder.typicode.com"));
    }

    #[test]
    fn relative_path_without_base_is_rejected() {
        let (client, _) = client(StatusCode::OK, "");
        let err = client.resolve("./assets/config/appConfig.json").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn get_json_decodes_body_and_sends_params() {
        let (client, transport) = client(StatusCode::OK, r#"[{"id":1,"title":"t"}]"#);

        let posts: serde_json::Value = client
            .get_json("https://example.com/posts", &[("id", "1")])
            .await
            .unwrap();

        assert_eq!(posts[0]["id"], 1);
        let seen = transport.seen.lock().unwrap();
        assert_eq!(
            seen[0].resolved_url().as_str(),
            "https://example.com/posts?id=1"
        );
    }
}
