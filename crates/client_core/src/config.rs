use std::{collections::HashMap, fs, time::Duration};

use thiserror::Error;
use url::Url;

pub const SETTINGS_FILE: &str = "client.toml";

const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("backend base URL is not configured; set API_URL or api_url in {SETTINGS_FILE}")]
    MissingBaseUrl,
    #[error("invalid URL for {key} '{value}': {source}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("{key} must be an http(s) URL, got '{value}'")]
    UnsupportedScheme { key: &'static str, value: String },
    #[error("unknown deployment environment '{0}' (expected development, staging or production)")]
    InvalidEnvironment(String),
    #[error("invalid number for {key}: '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("failed to parse {SETTINGS_FILE}: {0}")]
    File(#[from] toml::de::Error),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Deployment stage the client is running against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Staging,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" | "local" => Ok(Self::Development),
            "staging" | "preview" => Ok(Self::Staging),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidEnvironment(value.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

/// Immutable client configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_base_url: Url,
    pub payment_client_key: Option<String>,
    pub app_origin: Url,
    pub environment: AppEnvironment,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl ClientSettings {
    pub fn new(api_base_url: Url) -> Self {
        let app_origin = Url::parse(DEFAULT_APP_ORIGIN).unwrap_or_else(|_| api_base_url.clone());
        Self {
            api_base_url,
            payment_client_key: None,
            app_origin,
            environment: AppEnvironment::Development,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    /// Resolves settings from an optional `client.toml` body and an environment map.
    ///
    /// Environment variables win over the file; `APP__`-prefixed names win over
    /// the plain ones.
    pub fn from_sources(
        file: Option<&str>,
        env: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let sources = Sources::new(file, env)?;

        let raw_base_url = sources
            .get("api_url", &["API_URL", "APP__API_URL"])
            .ok_or(ConfigError::MissingBaseUrl)?;
        let api_base_url = parse_http_url("api_url", &raw_base_url)?;

        let app_origin = match sources.get("app_url", &["APP_URL", "APP__APP_URL"]) {
            Some(raw) => parse_http_url("app_url", &raw)?,
            None => parse_http_url("app_url", DEFAULT_APP_ORIGIN)?,
        };

        let environment = match sources.get("env", &["APP_ENV", "APP__ENV"]) {
            Some(raw) => AppEnvironment::parse(&raw)?,
            None => AppEnvironment::Development,
        };

        let request_timeout = match sources.get("request_timeout_secs", &["APP__REQUEST_TIMEOUT_SECS"])
        {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::InvalidNumber {
                        key: "request_timeout_secs",
                        value: raw,
                    })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base_url,
            payment_client_key: sources.get(
                "payment_client_key",
                &["PAYMENT_CLIENT_KEY", "APP__PAYMENT_CLIENT_KEY"],
            ),
            app_origin,
            environment,
            request_timeout,
            log_level: sources
                .get("log_level", &["APP__LOG_LEVEL"])
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

/// Reads `client.toml` from the working directory (if present) and the process
/// environment.
pub fn load_settings() -> Result<ClientSettings, ConfigError> {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    let env: HashMap<String, String> = std::env::vars().collect();
    ClientSettings::from_sources(file.as_deref(), &env)
}

struct Sources<'a> {
    file: HashMap<String, String>,
    env: &'a HashMap<String, String>,
}

impl<'a> Sources<'a> {
    fn new(file: Option<&str>, env: &'a HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut flattened = HashMap::new();
        if let Some(raw) = file {
            let table = raw.parse::<toml::Table>()?;
            for (key, value) in table {
                let value = match value {
                    toml::Value::String(text) => text,
                    other => other.to_string(),
                };
                flattened.insert(key, value);
            }
        }
        Ok(Self {
            file: flattened,
            env,
        })
    }

    /// `env_keys` are listed in increasing precedence.
    fn get(&self, file_key: &str, env_keys: &[&str]) -> Option<String> {
        env_keys
            .iter()
            .rev()
            .filter_map(|key| self.env.get(*key))
            .chain(self.file.get(file_key))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(str::to_string)
    }
}

fn parse_http_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        key,
        value: raw.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme {
            key,
            value: raw.to_string(),
        });
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
