//! Configuration Module
//!
//! Client settings read from the environment.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOGIN_PATH: &str = "/login";

pub const API_URL_VAR: &str = "JT808_API_URL";
pub const TIMEOUT_VAR: &str = "JT808_API_TIMEOUT_SECS";
pub const DATA_DIR_VAR: &str = "JT808_DATA_DIR";
pub const LOGIN_PATH_VAR: &str = "JT808_LOGIN_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://localhost:8000`
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Directory holding the durable session slots
    pub data_dir: PathBuf,
    /// Login entry point handed to the UI on session expiry
    pub login_path: String,
}

impl ClientConfig {
    /// Load from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_base_url = lookup(API_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs = match lookup(TIMEOUT_VAR) {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                warn!("Ignoring invalid {}={:?}", TIMEOUT_VAR, raw);
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        let data_dir = lookup(DATA_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let login_path = lookup(LOGIN_PATH_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());

        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(timeout_secs),
            data_dir,
            login_path,
        }
    }

    pub fn with_api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = url.trim_end_matches('/').to_string();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("JT808Console")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ClientConfig::default();

        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.login_path, "/login");
        assert!(config.data_dir.ends_with("JT808Console"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://fleet.example.com/"),
            (TIMEOUT_VAR, "30"),
            (DATA_DIR_VAR, "/tmp/jt808"),
            (LOGIN_PATH_VAR, "/signin"),
        ]));

        assert_eq!(config.api_base_url, "https://fleet.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/jt808"));
        assert_eq!(config.login_path, "/signin");
    }

    #[test]
    fn invalid_timeout_falls_back() {
        let config = ClientConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "soon")]));

        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn api_url_override_trims_slash() {
        let config = ClientConfig::default().with_api_base_url("http://10.0.0.5:8000/");

        assert_eq!(config.api_base_url, "http://10.0.0.5:8000");
    }
}
