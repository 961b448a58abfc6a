use anyhow::{Context, Result};
use serde_json::Value;
use sigwire_http::{HttpClient, PipelineError, Url};

pub const POSTS_PATH: &str = "posts";

/// Fetches the post with id 1 from the demo API.
#[derive(Debug, Clone)]
pub struct HttpExample {
    client: HttpClient,
    api_url: Url,
}

impl HttpExample {
    pub fn new(client: HttpClient, api_url: &str) -> Result<Self> {
        let mut api_url =
            Url::parse(api_url).with_context(|| format!("invalid api url '{api_url}'"))?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        Ok(Self { client, api_url })
    }

    #[must_use]
    pub fn posts_url(&self) -> Url {
        // Joining a plain segment onto a slash-terminated base cannot fail.
        self.api_url
            .join(POSTS_PATH)
            .unwrap_or_else(|_| self.api_url.clone())
    }

    pub async fn fetch_posts(&self) -> Result<Value, PipelineError> {
        let posts: Value = self
            .client
            .get_json(self.posts_url().as_str(), &[("id", "1")])
            .await?;
        tracing::info!(%posts, "Fetched posts");
        Ok(posts)
    }

    #[must_use]
    pub fn render(&self) -> Vec<String> {
        vec!["HTTP Client Example".to_string()]
    }
}
