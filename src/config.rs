//! Configuration management

use std::{env, path::Path, path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before resolving secrets.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Analytics provider configuration
    pub analytics: AnalyticsConfig,
    /// Chat history authentication
    pub auth: AuthConfig,
    /// Chat history storage
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Environment variables (CRUNCHBOT_ prefix, `__` for nesting)
        figment = figment.merge(Env::prefixed("CRUNCHBOT_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Secrets may live in env files, so load them before anything resolves `env:`
        config.load_env_files();

        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Files that don't exist are skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = expand_home(path_str);
            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => tracing::info!("Loaded env file: {expanded}"),
                    Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }
}

fn expand_home(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.display().to_string(), 1);
        }
    }
    path.to_string()
}

/// Resolve a secret reference: `env:VAR` reads the variable (empty if unset),
/// anything else is taken literally.
#[must_use]
pub fn resolve_secret(value: &str) -> String {
    match value.strip_prefix("env:") {
        Some(var_name) => env::var(var_name).unwrap_or_default(),
        None => value.to_string(),
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Deadline for one full query chain (route, fetch, summarize)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout: Duration::from_secs(90),
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// API key (literal or `env:VAR_NAME`)
    pub api_key: String,
    /// Per-completion timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: "env:GEMINI_API_KEY".to_string(),
            timeout: Duration::from_secs(60),
            temperature: 0.2,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key (expand env vars)
    #[must_use]
    pub fn resolve_api_key(&self) -> String {
        resolve_secret(&self.api_key)
    }
}

/// Analytics provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// API root; endpoints live under `{base_url}/nft/collection/`
    pub base_url: String,
    /// API key sent as `x-api-key` (literal or `env:VAR_NAME`)
    pub api_key: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.unleashnfts.com/api/v2".to_string(),
            api_key: "env:BITSCRUNCH_API_KEY".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl AnalyticsConfig {
    /// Resolve the API key (expand env vars)
    #[must_use]
    pub fn resolve_api_key(&self) -> String {
        resolve_secret(&self.api_key)
    }
}

/// Authentication for the chat history routes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret used to verify bearer tokens (literal or `env:VAR_NAME`)
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "env:JWT_SECRET".to_string(),
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret (expand env vars)
    #[must_use]
    pub fn resolve_jwt_secret(&self) -> String {
        resolve_secret(&self.jwt_secret)
    }
}

/// Chat history storage
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot file; history is memory-only when unset
    pub path: Option<PathBuf>,
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(serde::de::Error::custom)
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.analytics.base_url, "https://api.unleashnfts.com/api/v2");
        assert_eq!(config.analytics.api_key, "env:BITSCRUNCH_API_KEY");
        assert_eq!(config.llm.api_key, "env:GEMINI_API_KEY");
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crunchbot.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
server:
  port: 4100
  request_timeout: 2m
llm:
  model: gemini-1.5-pro
  timeout: 1500ms
analytics:
  api_key: literal-key
store:
  path: /tmp/chats.json
"#
        )
        .unwrap();
        drop(f);

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.server.request_timeout, Duration::from_secs(120));
        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert_eq!(config.llm.timeout, Duration::from_millis(1500));
        assert_eq!(config.analytics.resolve_api_key(), "literal-key");
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/chats.json")));
        // Untouched sections keep defaults
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/crunchbot.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_files_populate_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("test.env");
        std::fs::write(&env_path, "CRUNCHBOT_TEST_ANALYTICS_KEY=from_env_file\n").unwrap();

        let config = Config {
            env_files: vec![env_path.to_string_lossy().to_string()],
            analytics: AnalyticsConfig {
                api_key: "env:CRUNCHBOT_TEST_ANALYTICS_KEY".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        config.load_env_files();

        assert_eq!(config.analytics.resolve_api_key(), "from_env_file");
    }

    #[test]
    fn test_resolve_secret_unset_var_is_empty() {
        assert_eq!(resolve_secret("env:CRUNCHBOT_TEST_DEFINITELY_UNSET"), "");
        assert_eq!(resolve_secret("plain"), "plain");
    }

    #[test]
    fn test_env_files_skip_missing() {
        let config = Config {
            env_files: vec!["/nonexistent/path/.env".to_string()],
            ..Default::default()
        };
        config.load_env_files();
    }
}
