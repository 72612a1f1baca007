//! Layered run configuration.
//!
//! Values are resolved from lowest to highest precedence: built-in defaults,
//! an optional TOML file, `REQUESTWAVE_*` environment variables, then CLI
//! flags (applied by `main`). Credentials have no default.

use crate::error::{HarnessError, HarnessResult};
use api::{ClientConfig, Credentials};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_BASE_URL: &str = "REQUESTWAVE_BASE_URL";
pub const ENV_EMAIL: &str = "REQUESTWAVE_EMAIL";
pub const ENV_PASSWORD: &str = "REQUESTWAVE_PASSWORD";
pub const ENV_TIMEOUT_SECS: &str = "REQUESTWAVE_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub base_url: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub poll_attempts: u32,
    pub checkout_plan: String,
    pub color: bool,
    pub cleanup: bool,
    pub suites: Vec<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: api::config::DEFAULT_BASE_URL.to_string(),
            email: None,
            password: None,
            timeout_secs: 30,
            poll_interval_ms: 1_000,
            poll_attempts: 10,
            checkout_plan: "monthly".to_string(),
            color: true,
            cleanup: true,
            suites: Vec::new(),
        }
    }
}

impl HarnessConfig {
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads the file if one is given, then overlays the process environment.
    pub fn load(path: Option<&Path>) -> HarnessResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    pub fn with_env<F>(mut self, lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(email) = lookup(ENV_EMAIL) {
            self.email = Some(email);
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.password = Some(password);
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = timeout.trim().parse().map_err(|_| {
                HarnessError::config(format!(
                    "{} must be an integer, got {:?}",
                    ENV_TIMEOUT_SECS, timeout
                ))
            })?;
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_base_url(self.base_url.clone())
            .with_timeout(self.timeout())
    }

    pub fn credentials(&self) -> HarnessResult<Credentials> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Ok(Credentials::new(email.clone(), password.clone())),
            (None, _) => Err(HarnessError::config(format!(
                "no login email; set {} or pass --email",
                ENV_EMAIL
            ))),
            (_, None) => Err(HarnessError::config(format!(
                "no login password; set {} or pass --password",
                ENV_PASSWORD
            ))),
        }
    }

    pub fn validate(&self) -> HarnessResult<()> {
        self.client_config()
            .validate()
            .map_err(HarnessError::config)?;
        self.credentials()?;

        if self.poll_attempts == 0 {
            return Err(HarnessError::config("poll_attempts must be greater than 0"));
        }
        if self.checkout_plan.trim().is_empty() {
            return Err(HarnessError::config("checkout_plan cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_need_credentials() {
        let config = HarnessConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.poll_attempts, 10);
        assert!(matches!(
            config.validate(),
            Err(HarnessError::Config { .. })
        ));
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = HarnessConfig::default()
            .with_env(env(&[
                (ENV_BASE_URL, "https://rw.example"),
                (ENV_EMAIL, "ana@example.com"),
                (ENV_PASSWORD, "pw"),
                (ENV_TIMEOUT_SECS, "12"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "https://rw.example");
        assert_eq!(config.timeout_secs, 12);
        assert_eq!(config.credentials().unwrap().email, "ana@example.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_timeout_env_is_config_error() {
        let result = HarnessConfig::default().with_env(env(&[(ENV_TIMEOUT_SECS, "soon")]));
        assert!(matches!(result, Err(HarnessError::Config { .. })));
    }

    #[test]
    fn test_file_then_env_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "https://staging.rw.example"
email = "file@example.com"
password = "from-file"
poll_attempts = 3
suites = ["auth", "songs"]
"#
        )
        .unwrap();

        let config = HarnessConfig::from_file(file.path())
            .unwrap()
            .with_env(env(&[(ENV_EMAIL, "env@example.com")]))
            .unwrap();

        assert_eq!(config.base_url, "https://staging.rw.example");
        assert_eq!(config.email.as_deref(), Some("env@example.com"));
        assert_eq!(config.password.as_deref(), Some("from-file"));
        assert_eq!(config.poll_attempts, 3);
        assert_eq!(config.suites, vec!["auth", "songs"]);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_validation_rules() {
        let mut config = HarnessConfig {
            email: Some("ana@example.com".into()),
            password: Some("pw".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.timeout_secs = 30;
        config.base_url = "rw.example".into();
        assert!(config.validate().is_err());

        config.base_url = "https://rw.example".into();
        config.poll_attempts = 0;
        assert!(config.validate().is_err());
    }
}
