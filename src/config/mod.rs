//! Typed configuration from environment variables.
//!
//! Loaded once at startup. Values that are present but unparseable fail
//! fast; absent values fall back to defaults.

use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_SNAPSHOT_PATH: &str = "state.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// `SNAPSHOT_PATH`: where the JSON snapshot lives.
    pub snapshot_path: PathBuf,
    /// `RESUME`: load the snapshot before running.
    pub resume: bool,
    /// `OTEL_ENDPOINT`: OTLP collector, if any.
    pub otel_endpoint: Option<String>,
    /// `LOG_LEVEL`: default tracing filter.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv().ok()` first to pick up a local `.env`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            snapshot_path: std::env::var("SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SNAPSHOT_PATH)),
            resume: bool_var("RESUME")?.unwrap_or(false),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok().filter(|s| !s.is_empty()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn bool_var(name: &str) -> Result<Option<bool>> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    parse_bool(&raw)
        .map(Some)
        .ok_or_else(|| Error::Config(format!("{name} must be a boolean, got '{raw}'")))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(""), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
