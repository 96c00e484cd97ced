//! Client configuration.
//!
//! Resolves the identity service endpoint, the location of the profile
//! store, the request timeout and the label this host presents to the
//! service. Built once at startup with [`Config::from_env`].
//!
//! The profile store lives at `<config dir>/blender_id/profiles.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

/// Directory name under the user config directory
const APP_NAME: &str = "blender_id";

/// Profile store file name
const PROFILES_FILE: &str = "profiles.json";

/// Production endpoint of the identity service
pub const DEFAULT_ENDPOINT: &str = "https://www.blender.org/id";

/// Overrides the service endpoint
pub const ENDPOINT_ENV: &str = "BLENDER_ID_ENDPOINT";

/// Overrides the full path of the profile store file
pub const PROFILES_ENV: &str = "BLENDER_ID_PROFILES";

/// HTTP request timeout in seconds.
/// The service only ever answers small form posts, so 30s is generous.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Name this client reports in the host label
const CLIENT_NAME: &str = "Blender ID client";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL without a trailing slash
    pub endpoint: String,
    pub profiles_path: PathBuf,
    pub request_timeout: Duration,
    /// Sent as `host_label` when authenticating so the user can tell tokens apart
    pub host_label: String,
}

impl Config {
    /// Build the configuration from the environment and platform defaults
    pub fn from_env() -> Result<Self> {
        let endpoint = resolve_endpoint(std::env::var(ENDPOINT_ENV).ok());

        let profiles_path = match std::env::var_os(PROFILES_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => Self::default_profiles_path()?,
        };

        Ok(Self::new(endpoint, profiles_path))
    }

    /// Build a configuration for an explicit endpoint and store path
    pub fn new(endpoint: impl AsRef<str>, profiles_path: PathBuf) -> Self {
        Self {
            endpoint: normalize_endpoint(endpoint.as_ref()),
            profiles_path,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            host_label: default_host_label(),
        }
    }

    fn default_profiles_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(PROFILES_FILE))
    }
}

/// The override when it names something, otherwise the production endpoint
fn resolve_endpoint(value: Option<String>) -> String {
    value
        .filter(|endpoint| !normalize_endpoint(endpoint).is_empty())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}

/// Strip every trailing slash so routes can be appended with `{}/u/...`
pub fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

fn default_host_label() -> String {
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "unknown host".to_string());
    format!("{} running on '{}'", CLIENT_NAME, hostname)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint_strips_trailing_slashes() {
        assert_eq!(normalize_endpoint("https://id.example.org/"), "https://id.example.org");
        assert_eq!(normalize_endpoint("https://id.example.org///"), "https://id.example.org");
        assert_eq!(normalize_endpoint(DEFAULT_ENDPOINT), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_empty_endpoint_override_falls_back_to_default() {
        assert_eq!(resolve_endpoint(None), DEFAULT_ENDPOINT);
        assert_eq!(resolve_endpoint(Some(String::new())), DEFAULT_ENDPOINT);
        assert_eq!(resolve_endpoint(Some(" / ".to_string())), DEFAULT_ENDPOINT);
        assert_eq!(
            resolve_endpoint(Some("http://localhost:8000/id".to_string())),
            "http://localhost:8000/id"
        );
    }

    #[test]
    fn test_new_normalizes_endpoint() {
        let config = Config::new("http://localhost:8000/id/", PathBuf::from("/tmp/p.json"));
        assert_eq!(config.endpoint, "http://localhost:8000/id");
        assert_eq!(config.request_timeout, Duration::from_secs(REQUEST_TIMEOUT_SECS));
    }

    #[test]
    fn test_host_label_names_client() {
        let label = default_host_label();
        assert!(label.starts_with(CLIENT_NAME));
        assert!(label.contains(" running on '"));
    }
}
