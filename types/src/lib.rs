//! Core domain records for sigwire.
//!
//! This crate contains plain value types with no IO, no async, and minimal dependencies.
//! Everything here can be stored in a reactive cell or serialized into a log line.

#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Person
// ============================================================================

/// A named record. Replaced wholesale on update, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    name: String,
}

impl Person {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a new record carrying `name`.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Deployment stage the application was started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Development,
    Production,
}

impl Stage {
    const EXPECTED: &'static [&'static str] = &["development", "production"];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Development => "development",
            Stage::Production => "production",
        }
    }

    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Stage::Production)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid stage value '{raw}'; expected one of: {expected:?}")]
pub struct StageParseError {
    raw: String,
    expected: &'static [&'static str],
}

impl StageParseError {
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Stage {
    type Err = StageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Stage::Development),
            "production" | "prod" => Ok(Stage::Production),
            _ => Err(StageParseError {
                raw: s.to_string(),
                expected: Stage::EXPECTED,
            }),
        }
    }
}

/// Runtime environment description, printed on demand by the root component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub stage: Stage,
    pub api_url: Option<String>,
}

impl Environment {
    #[must_use]
    pub fn new(stage: Stage, api_url: Option<String>) -> Self {
        Self { stage, api_url }
    }

    #[must_use]
    pub const fn production(&self) -> bool {
        self.stage.is_production()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Stage::Development, None)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ production: {}, stage: {}, api_url: {} }}",
            self.production(),
            self.stage,
            self.api_url.as_deref().unwrap_or("<unset>")
        )
    }
}
