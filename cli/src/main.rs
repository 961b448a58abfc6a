//! sigwire CLI - runs the demo application once and prints what it renders.
//!
//! ```text
//! sigwire [all|signals|http|env|init|flow]
//! ```
//!
//! Startup order:
//!
//! 1. Load configuration (missing file means defaults)
//! 2. Initialise tracing (stderr, or the configured log file)
//! 3. Build the [`ErrorReporter`] and route panics to it
//! 4. Build the [`App`] and run the command
//!
//! Errors from components are reported and swallowed; only setup failures
//! make the process exit non-zero.

use anyhow::Result;
use std::{
    env,
    fs::{self, OpenOptions},
    path::Path,
    sync::{Arc, Mutex},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sigwire_engine::{App, Command, ErrorReporter, SigwireConfig, install_panic_hook};

const DEFAULT_LOG_FILTER: &str = "info";

fn init_tracing(config: &SigwireConfig) -> Vec<String> {
    let fallback = config
        .app
        .log_filter
        .as_deref()
        .unwrap_or(DEFAULT_LOG_FILTER);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let mut warnings = Vec::new();
    if let Some(path) = config.app.log_file.as_deref() {
        match open_log_file(path) {
            Ok(file) => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                    .with(env_filter)
                    .init();
                tracing::info!(path = %path.display(), "Logging initialized");
                return warnings;
            }
            Err(e) => warnings.push(format!("Failed to open log file {}: {e}", path.display())),
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    warnings
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn parse_command(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let command = match args.next() {
        Some(raw) => raw.parse()?,
        None => Command::default(),
    };
    if let Some(extra) = args.next() {
        anyhow::bail!("unexpected argument '{extra}'");
    }
    Ok(command)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let (config, config_error) = match SigwireConfig::load() {
        Ok(config) => (config.unwrap_or_default(), None),
        Err(err) => (SigwireConfig::default(), Some(err)),
    };

    for warning in init_tracing(&config) {
        tracing::warn!("{warning}");
    }
    if let Some(err) = config_error {
        tracing::warn!(path = %err.path().display(), "Using default configuration: {err}");
    }

    let command = parse_command(env::args().skip(1))?;

    let reporter = Arc::new(ErrorReporter::default());
    install_panic_hook(Arc::clone(&reporter));

    let app = App::new(&config, Arc::clone(&reporter))?;
    for line in app.run(command).await {
        println!("{line}");
    }

    if reporter.reported() > 0 {
        tracing::info!(count = reporter.reported(), "Errors were reported during the run");
    }
    Ok(())
}
