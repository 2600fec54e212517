//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `fvm.toml` configuration file
//! 3. Default values
//!
//! `${VAR_NAME}` inside the configuration file is replaced with the value of
//! the environment variable, so passwords do not have to live in the file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::Credentials;
use crate::{Error, Result};

/// Public address of the customer portal
pub const DEFAULT_BASE_URL: &str = "https://ugyfelszolgalat.vizmuvek.hu";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "fvm.toml";

/// Portal connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalConfig {
    /// Portal root URL (without trailing slash)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl PortalConfig {
    /// Create a config pointing at another portal root (used by tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Refresh throttling used by the calendars
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshConfig {
    /// Minimum number of days between two portal refreshes
    #[serde(default = "default_min_refresh_days")]
    pub min_refresh_days: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            min_refresh_days: default_min_refresh_days(),
        }
    }
}

impl RefreshConfig {
    pub fn min_interval(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.min_refresh_days))
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub portal: PortalConfig,

    /// Portal accounts, one controller each
    #[serde(default)]
    pub accounts: Vec<Credentials>,

    #[serde(default)]
    pub refresh: RefreshConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("fvm-calendar/{}", env!("CARGO_PKG_VERSION"))
}

fn default_min_refresh_days() -> u32 {
    7
}

impl Config {
    /// Expand `${VAR_NAME}` references with environment variable values
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file
    ///
    /// `${VAR_NAME}` references are expanded before parsing and environment
    /// overrides are applied afterwards.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();
        cfg.validate()?;

        Ok(cfg)
    }

    /// Parse configuration from TOML text without environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        let toml: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self::from_toml_config(toml))
    }

    /// Load configuration from the default location
    ///
    /// Uses `./fvm.toml` when present, environment variables otherwise.
    pub fn load() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let portal = toml.portal.unwrap_or_default();
        let portal_config = PortalConfig {
            base_url: portal
                .base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(default_base_url),
            timeout_secs: portal.timeout_secs.unwrap_or_else(default_timeout_secs),
            user_agent: portal.user_agent.unwrap_or_else(default_user_agent),
        };

        let accounts = toml
            .accounts
            .unwrap_or_default()
            .into_iter()
            .map(|account| Credentials::new(account.username, account.password))
            .collect();

        let refresh = toml.refresh.unwrap_or_default();
        let refresh_config = RefreshConfig {
            min_refresh_days: refresh.min_refresh_days.unwrap_or_else(default_min_refresh_days),
        };

        Config {
            portal: portal_config,
            accounts,
            refresh: refresh_config,
        }
    }

    /// Override file values with environment variables
    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("FVM_BASE_URL") {
            if !base_url.is_empty() {
                self.portal.base_url = base_url.trim_end_matches('/').to_string();
            }
        }
        if let Ok(timeout) = std::env::var("FVM_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.portal.timeout_secs = secs;
            }
        }
        if let Ok(days) = std::env::var("FVM_MIN_REFRESH_DAYS") {
            if let Ok(days) = days.parse() {
                self.refresh.min_refresh_days = days;
            }
        }

        // A single account from the environment replaces the file entry with the same username
        if let (Ok(username), Ok(password)) = (std::env::var("FVM_USERNAME"), std::env::var("FVM_PASSWORD")) {
            if !username.is_empty() {
                self.upsert_account(Credentials::new(username, password));
            }
        }
    }

    fn upsert_account(&mut self, credentials: Credentials) {
        match self
            .accounts
            .iter_mut()
            .find(|account| account.username == credentials.username)
        {
            Some(existing) => *existing = credentials,
            None => self.accounts.push(credentials),
        }
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let username = std::env::var("FVM_USERNAME")
            .map_err(|_| Error::Config("FVM_USERNAME not set".to_string()))?;
        let password = std::env::var("FVM_PASSWORD")
            .map_err(|_| Error::Config("FVM_PASSWORD not set".to_string()))?;

        let mut cfg = Config {
            portal: PortalConfig::default(),
            accounts: vec![Credentials::new(username, password)],
            refresh: RefreshConfig::default(),
        };
        cfg.apply_env_overrides();
        cfg.validate()?;

        Ok(cfg)
    }

    /// Check that the configuration can be used to talk to the portal
    pub fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            return Err(Error::Config("no portal accounts configured".to_string()));
        }

        for (index, account) in self.accounts.iter().enumerate() {
            if account.username.trim().is_empty() {
                return Err(Error::Config(format!("account #{} has an empty username", index + 1)));
            }
            if self.accounts[..index]
                .iter()
                .any(|other| other.username == account.username)
            {
                return Err(Error::Config(format!("duplicate account: {}", account.username)));
            }
        }

        if self.portal.timeout_secs == 0 {
            return Err(Error::Config("portal.timeout_secs must be positive".to_string()));
        }

        Ok(())
    }
}

// ============================================================================
// TOML file structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    portal: Option<TomlPortalConfig>,
    accounts: Option<Vec<TomlAccount>>,
    refresh: Option<TomlRefreshConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlPortalConfig {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlAccount {
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize, Default)]
struct TomlRefreshConfig {
    #[serde(default)]
    min_refresh_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_portal_config_default() {
        let config = PortalConfig::default();
        assert_eq!(config.base_url, "https://ugyfelszolgalat.vizmuvek.hu");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.user_agent.starts_with("fvm-calendar/"));
    }

    #[test]
    fn test_portal_config_with_base_url_trims_slash() {
        let config = PortalConfig::with_base_url("http://127.0.0.1:8080/");
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_refresh_config_default() {
        let config = RefreshConfig::default();
        assert_eq!(config.min_refresh_days, 7);
        assert_eq!(config.min_interval(), chrono::Duration::days(7));
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("FVM_CONFIG_TEST_VAR", "s3cret");
        }

        let result = Config::expand_env_vars("password = \"${FVM_CONFIG_TEST_VAR}\"");
        assert_eq!(result, "password = \"s3cret\"");

        let result = Config::expand_env_vars("prefix_${FVM_NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("FVM_CONFIG_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        assert_eq!(Config::expand_env_vars("cost is $5"), "cost is $5");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[portal]
base_url = "http://localhost:9000/"
timeout_secs = 5

[[accounts]]
username = "first@example.com"
password = "one"

[[accounts]]
username = "second@example.com"
password = "two"

[refresh]
min_refresh_days = 1
"#;

        let config = Config::from_toml_str(toml_content).unwrap();
        assert_eq!(config.portal.base_url, "http://localhost:9000");
        assert_eq!(config.portal.timeout_secs, 5);
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[1].username, "second@example.com");
        assert_eq!(config.accounts[1].password, "two");
        assert_eq!(config.refresh.min_refresh_days, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_config_defaults() {
        let config = Config::from_toml_str("[[accounts]]\nusername = \"a@example.com\"\n").unwrap();
        assert_eq!(config.portal, PortalConfig::default());
        assert_eq!(config.refresh, RefreshConfig::default());
        assert_eq!(config.accounts[0].password, "");
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml_str("[[accounts]\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_missing_accounts() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let config = Config {
            accounts: vec![
                Credentials::new("a@example.com", "1"),
                Credentials::new("a@example.com", "2"),
            ],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_upsert_account() {
        let mut config = Config {
            accounts: vec![Credentials::new("a@example.com", "old")],
            ..Default::default()
        };

        config.upsert_account(Credentials::new("a@example.com", "new"));
        config.upsert_account(Credentials::new("b@example.com", "other"));

        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[0].password, "new");
        assert_eq!(config.accounts[1].username, "b@example.com");
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[portal]\ntimeout_secs = 12\n\n[[accounts]]\nusername = \"file@example.com\"\npassword = \"pw\"").unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.portal.timeout_secs, 12);
        assert_eq!(config.accounts[0].username, "file@example.com");
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = Config::from_toml_file("/nonexistent/fvm.toml");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
