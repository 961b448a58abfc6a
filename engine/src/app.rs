//! Root component: builds the HTTP stack from configuration and owns every
//! demo component.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use sigwire_config::SigwireConfig;
use sigwire_http::{
    AuthHeader, ClientOptions, ErrorClassifier, ErrorDetail, HttpClient, Url, build_client,
    default_pipeline,
};
use sigwire_types::Environment;

use crate::components::{ControlFlowExample, HttpExample, SignalsExample};
use crate::initializer::Initializer;
use crate::reporter::ErrorReporter;

/// What a single CLI invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Initializer, then every component in page order.
    #[default]
    All,
    Signals,
    Http,
    Env,
    Init,
    Flow,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::All,
        Command::Signals,
        Command::Http,
        Command::Env,
        Command::Init,
        Command::Flow,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Command::All => "all",
            Command::Signals => "signals",
            Command::Http => "http",
            Command::Env => "env",
            Command::Init => "init",
            Command::Flow => "flow",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        Command::ALL
            .into_iter()
            .find(|command| command.as_str() == raw)
            .with_context(|| {
                let expected: Vec<_> = Command::ALL.into_iter().map(Command::as_str).collect();
                format!("unknown command '{s}'; expected one of: {}", expected.join(", "))
            })
    }
}

pub struct App {
    environment: Environment,
    reporter: Arc<ErrorReporter>,
    initializer: Initializer,
    http: HttpExample,
    signals: SignalsExample,
    control_flow: ControlFlowExample,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("environment", &self.environment)
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn new(config: &SigwireConfig, reporter: Arc<ErrorReporter>) -> Result<Self> {
        let client = build_http_client(config)?;
        Self::with_client(config, reporter, client)
    }

    /// Use an already configured client (tests point it at a mock server).
    pub fn with_client(
        config: &SigwireConfig,
        reporter: Arc<ErrorReporter>,
        client: HttpClient,
    ) -> Result<Self> {
        let environment = config.environment().context("invalid stage")?;
        let http = HttpExample::new(client.clone(), &config.http.api_url)?;
        let initializer = Initializer::new(client, config.assets_dir());

        Ok(Self {
            environment,
            reporter,
            initializer,
            http,
            signals: SignalsExample::new(),
            control_flow: ControlFlowExample::new(),
        })
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    #[must_use]
    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    #[must_use]
    pub fn signals(&self) -> &SignalsExample {
        &self.signals
    }

    #[must_use]
    pub fn control_flow(&self) -> &ControlFlowExample {
        &self.control_flow
    }

    /// Log the environment record and return it as a line.
    pub fn print_environment(&self) -> String {
        let line = self.environment.to_string();
        tracing::info!(environment = %line, "Environment");
        line
    }

    /// Run the initializer; failures go to the reporter.
    pub async fn initialize(&self) -> Option<Value> {
        match self.initializer.run().await {
            Ok(config) => Some(config),
            Err(err) => {
                self.reporter.report(err);
                None
            }
        }
    }

    /// Fetch the demo post; failures go to the reporter.
    pub async fn fetch_posts(&self) -> Option<Value> {
        match self.http.fetch_posts().await {
            Ok(posts) => Some(posts),
            Err(err) => {
                self.reporter.report(err);
                None
            }
        }
    }

    /// Press every button of the signals component once and render it.
    pub fn exercise_signals(&self) -> Vec<String> {
        let mut lines = self.signals.render();
        self.signals.set_value();
        self.signals.change_name();
        lines.push(self.signals.on_computed());
        self.signals.on_effect();
        lines.extend(self.signals.render());
        lines
    }

    /// Execute `command` and return the lines to show the user.
    pub async fn run(&self, command: Command) -> Vec<String> {
        tracing::debug!(%command, "Running command");
        let mut lines = Vec::new();

        if matches!(command, Command::All | Command::Init)
            && let Some(config) = self.initialize().await
        {
            lines.push(format!("appConfig: {config}"));
        }
        if matches!(command, Command::All | Command::Env) {
            lines.push(self.print_environment());
        }
        if matches!(command, Command::All | Command::Http) {
            lines.extend(self.http.render());
            if let Some(posts) = self.fetch_posts().await {
                lines.push(posts.to_string());
            }
        }
        if matches!(command, Command::All | Command::Signals) {
            lines.extend(self.exercise_signals());
        }
        if matches!(command, Command::All | Command::Flow) {
            lines.extend(self.control_flow.render());
        }

        lines
    }
}

/// Reqwest client, `Authorization` header and error classifier from `config`.
pub fn build_http_client(config: &SigwireConfig) -> Result<HttpClient> {
    let options = ClientOptions {
        timeout: config.http.timeout(),
        https_only: config.http.https_only,
    };
    let reqwest_client = build_client(&options).context("failed to build HTTP client")?;
    let auth = AuthHeader::new(&config.http.authorization)
        .context("authorization value is not a valid header value")?;
    let detail = if config.http.preserve_error_details {
        ErrorDetail::Preserve
    } else {
        ErrorDetail::MessageOnly
    };
    let classifier = ErrorClassifier::default().detail(detail);

    let mut client = HttpClient::new(default_pipeline(reqwest_client, auth, classifier));
    if let Some(base) = &config.http.base_url {
        let base = Url::parse(base).with_context(|| format!("invalid base url '{base}'"))?;
        client = client.with_base_url(base);
    }
    Ok(client)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::reporter::RecordingSink;

    fn recording_reporter() -> (Arc<ErrorReporter>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (Arc::new(ErrorReporter::new(Arc::clone(&sink))), sink)
    }

    fn config_for(server: &MockServer, extra: &str) -> SigwireConfig {
        SigwireConfig::parse(&format!(
            "[http]\napi_url = \"{}\"\nbase_url = \"{}\"\n{extra}",
            server.uri(),
            server.uri()
        ))
        .unwrap()
    }

    #[test]
    fn command_parsing() {
        assert_eq!("signals".parse::<Command>().unwrap(), Command::Signals);
        assert_eq!(" ENV ".parse::<Command>().unwrap(), Command::Env);
        let err = "deploy".parse::<Command>().unwrap_err();
        assert!(err.to_string().contains("expected one of: all, signals"));
    }

    #[test]
    fn environment_line_defaults_to_development() {
        let (reporter, _) = recording_reporter();
        let app = App::new(&SigwireConfig::default(), reporter).unwrap();
        let line = app.print_environment();
        assert!(line.contains("production: false"));
        assert!(line.contains("jsonplaceholder.typicode.com"));
    }

    #[test]
    fn environment_comes_from_config() {
        let (reporter, _) = recording_reporter();
        let config = SigwireConfig::parse(
            "[app]\nstage = \"prod\"\n[http]\napi_url = \"https://api.example\"",
        )
        .unwrap();
        let app = App::new(&config, reporter).unwrap();
        assert_eq!(app.environment(), &config.environment().unwrap());
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let (reporter, _) = recording_reporter();
        let config = SigwireConfig::parse("[app]\nstage = \"staging\"").unwrap();
        assert!(App::new(&config, reporter).is_err());
    }

    #[test]
    fn invalid_authorization_is_rejected() {
        let config = SigwireConfig::parse("[http]\nauthorization = \"bad\\nvalue\"").unwrap();
        assert!(build_http_client(&config).is_err());
    }

    #[test]
    fn signals_sequence() {
        let (reporter, _) = recording_reporter();
        let app = App::new(&SigwireConfig::default(), reporter).unwrap();
        let lines = app.exercise_signals();
        assert_eq!(
            lines,
            vec![
                "Signal x = 0",
                "Signal z = 5",
                "Signal Person Name - John",
                "The value of x changed to 2",
                "Signal x = 2",
                "Signal z = 6",
                "Signal Person Name - Jack",
            ]
        );
    }

    #[tokio::test]
    async fn http_failure_is_reported_not_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(query_param("id", "1"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let (reporter, sink) = recording_reporter();
        let config = config_for(&server, "");
        let app = App::new(&config, reporter).unwrap();

        assert!(app.fetch_posts().await.is_none());
        assert_eq!(app.reporter().reported(), 1);
        assert!(sink.messages()[0].contains("404 Not Found"));
    }

    #[tokio::test]
    async fn message_only_detail_reports_failure_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (reporter, sink) = recording_reporter();
        let config = config_for(&server, "preserve_error_details = false");
        let app = App::new(&config, reporter).unwrap();

        assert!(app.fetch_posts().await.is_none());
        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Http failure response for"));
        assert!(messages[0].ends_with("401 Unauthorized"));
    }

    #[tokio::test]
    async fn run_all_with_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/config/appConfig.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "a": 1 })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
            .mount(&server)
            .await;

        let (reporter, sink) = recording_reporter();
        let app = App::new(&config_for(&server, ""), reporter).unwrap();
        let lines = app.run(Command::All).await;

        assert_eq!(lines[0], r#"appConfig: {"a":1}"#);
        assert!(lines.contains(&r#"[{"id":1}]"#.to_string()));
        assert!(lines.contains(&"condition is true".to_string()));
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn init_from_disk_reports_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app]\nassets_dir = {:?}", dir.path().display().to_string()).unwrap();
        let config = SigwireConfig::load_from(file.path()).unwrap().unwrap();

        let (reporter, sink) = recording_reporter();
        let app = App::new(&config, reporter).unwrap();
        let lines = app.run(Command::Init).await;

        assert!(lines.is_empty());
        assert!(sink.messages()[0].starts_with("failed to read app config"));
    }
}
