//! Configuration parsing and validation for gemrelay.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Default public host of the generative language API.
pub const DEFAULT_UPSTREAM_BASE: &str = "https://generativelanguage.googleapis.com";

/// Default environment variable holding the upstream API key.
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Root configuration structure.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Route the relay handler is mounted on
    #[serde(default = "default_path")]
    pub path: String,
    /// Largest inbound body accepted, in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_path() -> String {
    "/api-proxy".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The only way to the raw value is `.expose_secret()`, so every use is
/// grep-auditable.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// Where the upstream API key comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Literal string in the config file
    Literal,
    /// `${VAR}` reference expanded at load time
    EnvExpanded,
    /// Read from this environment variable on every request
    Environment(String),
    /// Configured env var is not currently set
    None,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Environment(var) => write!(f, "environment ({})", var),
            KeySource::None => write!(f, "none"),
        }
    }
}

/// Upstream generative language API configuration.
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Scheme and host, without trailing path (e.g., "https://generativelanguage.googleapis.com")
    pub base_url: String,
    /// API version path segment
    pub api_version: String,
    /// Environment variable read for the key on every request
    pub api_key_env: String,
    /// Key fixed in the config file; takes precedence over `api_key_env`
    pub api_key: Option<ApiKey>,
    /// How `api_key` was obtained, when set
    pub api_key_origin: Option<KeySource>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE.to_string(),
            api_version: default_api_version(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_key: None,
            api_key_origin: None,
        }
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key)
            .finish()
    }
}

impl UpstreamConfig {
    /// Resolve the API key for one invocation.
    ///
    /// A key fixed in the config file wins; otherwise the environment is read
    /// now, so rotating the variable takes effect without a restart. Empty
    /// values count as absent.
    pub fn resolve_api_key(&self) -> Option<ApiKey> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolve_api_key_with<F>(&self, lookup: F) -> Option<ApiKey>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        lookup(&self.api_key_env)
            .filter(|v| !v.is_empty())
            .map(ApiKey::from)
    }

    /// Describe where the key for the next request would come from.
    pub fn key_source(&self) -> KeySource {
        if self.api_key.is_some() {
            return self.api_key_origin.clone().unwrap_or(KeySource::Literal);
        }
        match std::env::var(&self.api_key_env) {
            Ok(v) if !v.is_empty() => KeySource::Environment(self.api_key_env.clone()),
            _ => KeySource::None,
        }
    }
}

fn default_api_version() -> String {
    "v1beta".to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_upstream_base() -> String {
    DEFAULT_UPSTREAM_BASE.to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: "text" or "json"
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for '{field}': {message}")]
    EnvVar {
        var: String,
        field: String,
        message: String,
    },
}

/// Upstream section as written in TOML. `api_key` and `base_url` may
/// contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
pub struct RawUpstreamConfig {
    #[serde(default = "default_upstream_base")]
    base_url: String,
    #[serde(default = "default_api_version")]
    api_version: String,
    #[serde(default = "default_api_key_env")]
    api_key_env: String,
    api_key: Option<String>,
}

impl Default for RawUpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base(),
            api_version: default_api_version(),
            api_key_env: default_api_key_env(),
            api_key: None,
        }
    }
}

/// Raw configuration deserialized directly from TOML.
#[derive(Deserialize, Default)]
pub struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    upstream: RawUpstreamConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports several references in one value (e.g. `${SCHEME}://${HOST}`).
/// Fails on the first missing variable, an unclosed `${`, or an empty name.
fn expand_env_vars_with<F>(input: &str, field: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            field: field.to_string(),
            message: "Unclosed '${' in config value".to_string(),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                field: field.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            field: field.to_string(),
            message: format!("Environment variable '{}' is not set", var_name),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

impl Config {
    /// Load configuration from a TOML file, expanding `${VAR}` references.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string, expanding `${VAR}` references.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse_str_with(content, |name| std::env::var(name).ok())
    }

    fn parse_str_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = toml::from_str(content)?;
        let config = Self::from_raw(raw, lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Convert raw (deserialized) config to the final config.
    ///
    /// - `base_url` has its `${VAR}` references expanded
    /// - `api_key` containing `${VAR}` is expanded, source = `EnvExpanded`
    /// - `api_key` as a plain string is wrapped directly, source = `Literal`
    /// - absent `api_key` leaves the per-request env lookup in charge
    pub fn from_raw<F>(raw: RawConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let up = raw.upstream;
        let base_url = expand_env_vars_with(&up.base_url, "upstream.base_url", &lookup)?;

        let (api_key, api_key_origin) = match up.api_key {
            Some(ref raw_key) if raw_key.contains("${") => {
                let expanded = expand_env_vars_with(raw_key, "upstream.api_key", &lookup)?;
                (Some(ApiKey::from(expanded)), Some(KeySource::EnvExpanded))
            }
            Some(raw_key) => (Some(ApiKey::from(raw_key)), Some(KeySource::Literal)),
            None => (None, None),
        };

        Ok(Config {
            server: raw.server,
            upstream: UpstreamConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_version: up.api_version,
                api_key_env: up.api_key_env,
                api_key,
                api_key_origin,
            },
            logging: raw.logging,
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = &self.upstream.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "upstream.base_url must be an http(s) URL, got '{}'",
                base
            )));
        }

        if self.upstream.api_version.is_empty() {
            return Err(ConfigError::Validation(
                "upstream.api_version must not be empty".to_string(),
            ));
        }

        if self.upstream.api_key_env.is_empty() {
            return Err(ConfigError::Validation(
                "upstream.api_key_env must not be empty".to_string(),
            ));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "server.path must start with '/', got '{}'",
                self.server.path
            )));
        }

        if self.server.path == "/health" {
            return Err(ConfigError::Validation(
                "server.path must not shadow /health".to_string(),
            ));
        }

        Ok(())
    }

    /// Non-fatal problems worth reporting once logging is up.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.upstream.key_source() == KeySource::None {
            warnings.push(format!(
                "API key variable '{}' not set - relay will answer 500 until it is",
                self.upstream.api_key_env
            ));
        }
        warnings
    }
}
