//! Startup step that loads `appConfig.json` before anything else runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use sigwire_http::HttpClient;

/// Request path of the config asset, relative to the client's base URL.
pub const APP_CONFIG_ASSET: &str = "./assets/config/appConfig.json";
/// Location of the same asset inside the assets directory.
pub const APP_CONFIG_FILE: &str = "config/appConfig.json";

pub const PRIORITY_MESSAGE: &str = "Priority configurations have taken place.";

/// Where the config asset is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Fetched through the request pipeline.
    Http,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Initializer {
    client: HttpClient,
    assets_dir: PathBuf,
}

impl Initializer {
    #[must_use]
    pub fn new(client: HttpClient, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            assets_dir: assets_dir.into(),
        }
    }

    /// Over HTTP when the client has a base URL, otherwise from disk.
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        if self.client.base_url().is_some() {
            ConfigSource::Http
        } else {
            ConfigSource::File(self.assets_dir.join(APP_CONFIG_FILE))
        }
    }

    /// Log the priority message, then load and log the config asset. The
    /// message is logged even when loading fails. The value is not interpreted.
    pub async fn run(&self) -> Result<Value> {
        tracing::info!("{PRIORITY_MESSAGE}");

        let source = self.source();
        tracing::debug!(?source, "Loading app config");

        let config = match &source {
            ConfigSource::Http => self
                .client
                .get_json(APP_CONFIG_ASSET, &[])
                .await
                .context("failed to fetch app config")?,
            ConfigSource::File(path) => read_config_file(path).await?,
        };

        tracing::info!(%config, "App config loaded");
        Ok(config)
    }
}

async fn read_config_file(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read app config at {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse app config at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use sigwire_http::{
        AuthHeader, ClientOptions, ErrorClassifier, Url, build_client, default_pipeline,
    };
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client() -> HttpClient {
        let reqwest_client = build_client(&ClientOptions::default()).unwrap();
        HttpClient::new(default_pipeline(
            reqwest_client,
            AuthHeader::default(),
            ErrorClassifier::default(),
        ))
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    #[tokio::test]
    async fn priority_message_is_logged_when_loading_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (logs, _guard) = capture_logs();

        let result = Initializer::new(client(), dir.path()).run().await;

        assert!(result.is_err());
        assert!(logs.text().contains(PRIORITY_MESSAGE));
    }

    #[tokio::test]
    async fn priority_message_precedes_loaded_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(dir.path().join(APP_CONFIG_FILE), r#"{ "a": 1 }"#).unwrap();
        let (logs, _guard) = capture_logs();

        Initializer::new(client(), dir.path()).run().await.unwrap();

        let text = logs.text();
        let priority = text.find(PRIORITY_MESSAGE).unwrap();
        let loaded = text.find("App config loaded").unwrap();
        assert!(priority < loaded);
    }

    #[tokio::test]
    async fn reads_asset_from_disk_without_base_url() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(
            dir.path().join(APP_CONFIG_FILE),
            r#"{ "theme": "light" }"#,
        )
        .unwrap();

        let initializer = Initializer::new(client(), dir.path());
        assert_eq!(
            initializer.source(),
            ConfigSource::File(dir.path().join(APP_CONFIG_FILE))
        );
        let config = initializer.run().await.unwrap();
        assert_eq!(config["theme"], "light");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Initializer::new(client(), dir.path())
            .run()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read app config"));
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(dir.path().join(APP_CONFIG_FILE), "{ nope").unwrap();

        let err = Initializer::new(client(), dir.path())
            .run()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse app config"));
    }

    #[tokio::test]
    async fn fetches_asset_through_pipeline_with_base_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/config/appConfig.json"))
            .and(header("authorization", "test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "remote": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client().with_base_url(Url::parse(&server.uri()).unwrap());
        let initializer = Initializer::new(client, "unused");
        assert_eq!(initializer.source(), ConfigSource::Http);
        let config = initializer.run().await.unwrap();
        assert_eq!(config["remote"], true);
    }
}
