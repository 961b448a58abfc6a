//! Configuration for sigwire.
//!
//! Read from `~/.sigwire/config.toml`, or from the path in `SIGWIRE_CONFIG`.
//! A missing file is not an error: every field has a default.
//!
//! ```toml
//! [app]
//! stage = "development"
//! assets_dir = "./assets"
//! log_filter = "info"
//! log_file = "/tmp/sigwire.log"
//!
//! [http]
//! base_url = "http://localhost:4200"
//! api_url = "https://jsonplaceholder.typicode.com"
//! authorization = "${SIGWIRE_AUTHORIZATION}"
//! timeout_secs = 30
//! https_only = false
//! preserve_error_details = true
//! ```
//!
//! `${VAR}` references in string values are replaced with the environment
//! variable's value (empty if unset).

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt, fs};

use serde::Deserialize;
use sigwire_types::{Environment, Stage};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "SIGWIRE_CONFIG";

pub const DEFAULT_API_URL: &str = "https://jsonplaceholder.typicode.com";
pub const DEFAULT_AUTHORIZATION: &str = "test";
pub const DEFAULT_ASSETS_DIR: &str = "./assets";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid stage in config at {}: {source}", path.display())]
    Stage {
        path: PathBuf,
        #[source]
        source: sigwire_types::StageParseError,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Stage { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SigwireConfig {
    pub app: AppConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// "development" (default) or "production".
    pub stage: Option<String>,
    /// Directory holding `config/appConfig.json` when no base URL is set.
    pub assets_dir: Option<PathBuf>,
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    pub log_filter: Option<String>,
    /// Append logs here instead of stderr.
    pub log_file: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base for relative request paths, such as the config asset.
    pub base_url: Option<String>,
    /// Base of the demo API.
    pub api_url: String,
    /// Value of the `Authorization` header attached to every request.
    pub authorization: String,
    pub timeout_secs: u64,
    pub https_only: bool,
    /// Re-raise error responses whole instead of reducing them to a message.
    pub preserve_error_details: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_url: DEFAULT_API_URL.to_string(),
            authorization: DEFAULT_AUTHORIZATION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            https_only: false,
            preserve_error_details: true,
        }
    }
}

// Manual Debug impl to keep the authorization value out of logs.
impl fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConfig")
            .field("base_url", &self.base_url)
            .field("api_url", &self.api_url)
            .field("authorization", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("https_only", &self.https_only)
            .field("preserve_error_details", &self.preserve_error_details)
            .finish()
    }
}

impl HttpConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Replace `${VAR}` with the value returned by `lookup` (empty when `None`).
/// An unterminated `${` is kept verbatim.
pub fn expand_vars_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if !name.is_empty()
                    && let Some(replacement) = lookup(name)
                {
                    out.push_str(&replacement);
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    expand_vars_with(value, |name| env::var(name).ok())
}

impl SigwireConfig {
    /// Load from the default location. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        let mut config = Self::parse(&content).map_err(|err| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, err);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            }
        })?;
        config.expand(expand_env_vars);

        if let Err(source) = config.stage() {
            return Err(ConfigError::Stage {
                path: path.to_path_buf(),
                source,
            });
        }

        Ok(Some(config))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn expand(&mut self, expand: impl Fn(&str) -> String) {
        self.http.authorization = expand(&self.http.authorization);
        self.http.api_url = expand(&self.http.api_url);
        if let Some(base) = &self.http.base_url {
            self.http.base_url = Some(expand(base));
        }
    }

    pub fn stage(&self) -> Result<Stage, sigwire_types::StageParseError> {
        match &self.app.stage {
            Some(raw) => raw.parse(),
            None => Ok(Stage::default()),
        }
    }

    /// The environment record shown by the root component.
    pub fn environment(&self) -> Result<Environment, sigwire_types::StageParseError> {
        Ok(Environment::new(self.stage()?, Some(self.http.api_url.clone())))
    }

    #[must_use]
    pub fn assets_dir(&self) -> PathBuf {
        self.app
            .assets_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR))
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".sigwire").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "TOKEN" => Some("abc".to_string()),
            "A" => Some("alpha".to_string()),
            "B" => Some("beta".to_string()),
            "CRAB" => Some("\u{1F980}".to_string()),
            _ => None,
        }
    }

    #[test]
    fn expand_no_vars() {
        assert_eq!(expand_vars_with("hello world", lookup), "hello world");
    }

    #[test]
    fn expand_single_var() {
        assert_eq!(
            expand_vars_with("Bearer ${TOKEN}", lookup),
            "Bearer abc"
        );
    }

    #[test]
    fn expand_missing_var_becomes_empty() {
        assert_eq!(
            expand_vars_with("before ${NOPE} after", lookup),
            "before  after"
        );
    }

    #[test]
    fn expand_adjacent_vars() {
        assert_eq!(expand_vars_with("${A}${B}", lookup), "alphabeta");
        assert_eq!(expand_vars_with("${A}-${B}", lookup), "alpha-beta");
    }

    #[test]
    fn expand_unclosed_brace_preserved() {
        assert_eq!(
            expand_vars_with("test ${UNCLOSED", lookup),
            "test ${UNCLOSED"
        );
    }

    #[test]
    fn expand_empty_name_removed() {
        assert_eq!(expand_vars_with("test ${} more", lookup), "test  more");
    }

    #[test]
    fn expand_unicode_content() {
        assert_eq!(
            expand_vars_with("Hello ${CRAB} Rust", lookup),
            "Hello \u{1F980} Rust"
        );
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = SigwireConfig::parse("").unwrap();
        assert_eq!(config.http.authorization, "test");
        assert_eq!(config.http.api_url, DEFAULT_API_URL);
        assert!(config.http.preserve_error_details);
        assert!(config.http.base_url.is_none());
        assert_eq!(config.stage().unwrap(), Stage::Development);
        assert_eq!(config.assets_dir(), PathBuf::from("./assets"));
    }

    #[test]
    fn partial_http_section_keeps_other_defaults() {
        let config = SigwireConfig::parse(
            r#"
            [http]
            base_url = "http://localhost:4200"
            preserve_error_details = false
            "#,
        )
        .unwrap();
        assert_eq!(config.http.base_url.as_deref(), Some("http://localhost:4200"));
        assert!(!config.http.preserve_error_details);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn expansion_applies_to_http_strings() {
        let mut config = SigwireConfig::parse(
            r#"
            [http]
            authorization = "Bearer ${TOKEN}"
            base_url = "http://${A}.local"
            "#,
        )
        .unwrap();
        config.expand(|v| expand_vars_with(v, lookup));
        assert_eq!(config.http.authorization, "Bearer abc");
        assert_eq!(config.http.base_url.as_deref(), Some("http://alpha.local"));
    }

    #[test]
    fn debug_redacts_authorization() {
        let config = SigwireConfig::parse("[http]\nauthorization = \"hunter2\"").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn environment_reflects_stage_and_api() {
        let config = SigwireConfig::parse(
            "[app]\nstage = \"production\"\n[http]\napi_url = \"https://api.example\"",
        )
        .unwrap();
        let env = config.environment().unwrap();
        assert!(env.production());
        assert_eq!(env.api_url.as_deref(), Some("https://api.example"));
    }

    #[test]
    fn environment_rejects_unknown_stage() {
        let config = SigwireConfig::parse("[app]\nstage = \"staging\"").unwrap();
        assert!(config.environment().is_err());
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = SigwireConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn load_malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http\nbroken").unwrap();
        let err = SigwireConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), file.path());
    }

    #[test]
    fn load_rejects_unknown_stage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app]\nstage = \"staging\"").unwrap();
        let err = SigwireConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Stage { .. }));
    }

    #[test]
    fn load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\ntimeout_secs = 5").unwrap();
        let config = SigwireConfig::load_from(file.path()).unwrap().unwrap();
        assert_eq!(config.http.timeout(), Duration::from_secs(5));
    }
}
