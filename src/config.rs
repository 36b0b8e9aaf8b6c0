use super::checklist::ChecklistConfig;
use super::classifier::DEFAULT_MOBILE_TOKENS;
use super::error::{Error, Result};
use super::redirector::UpgradePages;
use super::throttle::DEFAULT_COOLDOWN_DAYS;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REPORT_PATH: &str = "/upgrade-log";

pub(crate) fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Client-side settings for a gate run. Every field has a default, so an
/// empty YAML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Absolute URL of the report endpoint.
    pub report_endpoint: String,
    pub request_timeout_ms: u64,
    /// How long the gate waits for the report before redirecting anyway.
    pub grace_ms: u64,
    /// Pause between the report step and navigation.
    pub redirect_delay_ms: u64,
    pub cooldown_days: i64,
    pub pages: UpgradePages,
    /// Hostnames on which the gate does nothing at all.
    pub bypass_hosts: Vec<String>,
    pub mobile_tokens: Vec<String>,
    pub checklist: ChecklistConfig,
    /// Prefix auxiliary reasons with `辅助特性：` and send `checkType`
    /// labels in the report. The redirect decision is unaffected.
    pub tagged_report: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            report_endpoint: format!("http://127.0.0.1:8080{DEFAULT_REPORT_PATH}"),
            request_timeout_ms: 5_000,
            grace_ms: 1_500,
            redirect_delay_ms: 1_000,
            cooldown_days: DEFAULT_COOLDOWN_DAYS,
            pages: UpgradePages::default(),
            bypass_hosts: vec!["localhost".to_string()],
            mobile_tokens: DEFAULT_MOBILE_TOKENS.iter().map(|t| t.to_string()).collect(),
            checklist: ChecklistConfig::default(),
            tagged_report: false,
        }
    }
}

impl GateConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = load_yaml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cooldown_days < 0 {
            return Err(Error::Config("cooldown_days must not be negative".into()));
        }
        if self.mobile_tokens.iter().any(|t| t.is_empty()) {
            return Err(Error::Config("mobile_tokens must not contain empty tokens".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::days(self.cooldown_days)
    }
}

/// Settings for the report endpoint server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Route the endpoint is mounted on.
    pub path: String,
    pub log_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            path: DEFAULT_REPORT_PATH.to_string(),
            log_file: PathBuf::from("upgrade-gate.log"),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = load_yaml(path.as_ref())?;
        if !config.path.starts_with('/') {
            return Err(Error::Config(format!(
                "endpoint path must start with '/': {}",
                config.path
            )));
        }
        Ok(config)
    }
}
