// Startup configuration, read once from the process environment
// (after an optional `.env` file has been loaded into it).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_RANGE: &str = "Sheet1!A2:D10";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
const DEFAULT_TOKEN_FILE: &str = "token.json";
const DEFAULT_CLIENT_SECRETS_FILE: &str = "credentials.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing {0} environment variable! Add it to your .env file.")]
    Missing(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub firebase_url: String,
    /// Loaded but not sent with the source read.
    pub firebase_api_key: Option<String>,
    pub spreadsheet_id: String,
    pub sheet_range: String,
    pub poll_interval: Duration,
    pub token_file: PathBuf,
    pub client_secrets_file: PathBuf,
    pub clear_before_write: bool,
    pub http_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name -> value lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let poll_secs = match get("POLL_INTERVAL_SECS") {
            Some(v) => parse_secs("POLL_INTERVAL_SECS", &v)?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };
        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(v) => Some(Duration::from_secs(parse_secs("HTTP_TIMEOUT_SECS", &v)?)),
            None => None,
        };
        let clear_before_write = match get("SHEET_CLEAR_BEFORE_WRITE") {
            Some(v) => parse_bool("SHEET_CLEAR_BEFORE_WRITE", &v)?,
            None => false,
        };

        Ok(Self {
            firebase_url: required("FIREBASE_URL")?,
            firebase_api_key: get("FIREBASE_API_KEY"),
            spreadsheet_id: required("SPREADSHEET_ID")?,
            sheet_range: get("SHEET_RANGE").unwrap_or_else(|| DEFAULT_RANGE.to_string()),
            poll_interval: Duration::from_secs(poll_secs),
            token_file: get("GOOGLE_TOKEN_FILE")
                .unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string())
                .into(),
            client_secrets_file: get("GOOGLE_CLIENT_SECRETS_FILE")
                .unwrap_or_else(|| DEFAULT_CLIENT_SECRETS_FILE.to_string())
                .into(),
            clear_before_write,
            http_timeout,
        })
    }
}

/// Whole seconds, at least 1.
fn parse_secs(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|&secs| secs > 0)
        .ok_or_else(|| ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}
