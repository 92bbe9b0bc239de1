// Configuration module

use std::time::Duration;

use serde::Deserialize;

use crate::intake::MAX_UPLOAD_FILES;
use crate::poller::PollPolicy;
use crate::poller::policy::{
    DEFAULT_COMPLETION_DELAY_MS, DEFAULT_MAX_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS,
};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Base URL of the analysis API (the service exposing `/api/...`).
    pub analysis_api_url: String,
    /// Comma-separated CORS origins.
    pub frontend_url: String,
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub poll_backoff_multiplier: f64,
    pub poll_max_interval_ms: u64,
    #[serde(default)]
    pub poll_max_attempts: Option<u32>,
    pub completion_delay_ms: u64,
    pub max_upload_files: usize,
    pub environment: Environment,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::default().try_parsing(true))
    }

    /// Load from an explicit key/value map instead of the process
    /// environment. Keys use the same names as the environment variables.
    pub fn from_map(
        vars: std::collections::HashMap<String, String>,
    ) -> Result<Self, config::ConfigError> {
        Self::load(
            config::Environment::default()
                .try_parsing(true)
                .source(Some(vars)),
        )
    }

    fn load(source: config::Environment) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        let config = config::Config::builder()
            .set_default("server_host", defaults.server_host)?
            .set_default("server_port", defaults.server_port as i64)?
            .set_default("analysis_api_url", defaults.analysis_api_url)?
            .set_default("frontend_url", defaults.frontend_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("poll_interval_ms", defaults.poll_interval_ms as i64)?
            .set_default("poll_backoff_multiplier", defaults.poll_backoff_multiplier)?
            .set_default("poll_max_interval_ms", defaults.poll_max_interval_ms as i64)?
            .set_default("completion_delay_ms", defaults.completion_delay_ms as i64)?
            .set_default("max_upload_files", defaults.max_upload_files as i64)?
            .set_default("environment", "development")?
            .add_source(source)
            .build()?;

        config.try_deserialize()
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            backoff_multiplier: self.poll_backoff_multiplier,
            max_interval: Duration::from_millis(self.poll_max_interval_ms),
            max_attempts: self.poll_max_attempts.filter(|n| *n > 0),
            completion_delay: Duration::from_millis(self.completion_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.frontend_url
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            analysis_api_url: "http://127.0.0.1:5000".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 30,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_backoff_multiplier: 1.0,
            poll_max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
            poll_max_attempts: None,
            completion_delay_ms: DEFAULT_COMPLETION_DELAY_MS,
            max_upload_files: MAX_UPLOAD_FILES,
            environment: Environment::Development,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = Config::from_map(HashMap::new()).unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.analysis_api_url, "http://127.0.0.1:5000");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.poll_policy(), PollPolicy::default());
        assert_eq!(config.max_upload_files, 20);
    }

    #[test]
    fn environment_overrides_are_parsed() {
        let config = Config::from_map(vars(&[
            ("SERVER_PORT", "9090"),
            ("ANALYSIS_API_URL", "http://scanner:5000"),
            ("POLL_INTERVAL_MS", "500"),
            ("POLL_BACKOFF_MULTIPLIER", "1.5"),
            ("POLL_MAX_ATTEMPTS", "120"),
            ("ENVIRONMENT", "production"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 9090);
        assert_eq!(config.analysis_api_url, "http://scanner:5000");
        assert_eq!(config.environment, Environment::Production);

        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(policy.backoff_multiplier, 1.5);
        assert_eq!(policy.max_attempts, Some(120));
    }

    #[test]
    fn zero_max_attempts_means_unbounded() {
        let config = Config {
            poll_max_attempts: Some(0),
            ..Config::default()
        };
        assert_eq!(config.poll_policy().max_attempts, None);
    }

    #[test]
    fn cors_origins_split_on_commas() {
        let config = Config {
            frontend_url: "http://localhost:3000, https://smcvd.example.com,".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.cors_origins(),
            vec!["http://localhost:3000", "https://smcvd.example.com"]
        );
    }
}
