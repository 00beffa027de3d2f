/*
[INPUT]:  Optional YAML configuration file
[OUTPUT]: Timeouts, polling cadence, and settings location for the CLI
[POS]:    Configuration layer - client and scheduler setup
[UPDATE]: When adding new configuration options
*/

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use nextgen_client::{ClientConfig, FileSettingsStore, SchedulerConfig};

/// Top-level configuration for the nextgen CLI
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    /// Whole-request timeout for submit/history calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Budget for ping and health probes
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Seconds between reconciliation passes while tasks are active
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Settings file holding the server address
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            settings_path: None,
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_poll_interval_secs() -> u64 {
    60
}

impl CliConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than zero");
        }
        if self.request_timeout_secs == 0 || self.probe_timeout_secs == 0 {
            anyhow::bail!("timeouts must be greater than zero");
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
        }
    }

    /// Explicit path wins, then the config file, then the platform default.
    pub fn resolve_settings_path(&self, override_path: Option<PathBuf>) -> Result<PathBuf> {
        override_path
            .or_else(|| self.settings_path.clone())
            .or_else(FileSettingsStore::default_path)
            .context("could not determine a settings location; pass --settings")
    }
}
