/*
[INPUT]:  Optional YAML configuration file, TUNEFETCH__SECTION__KEY environment overrides
[OUTPUT]: Validated QueueConfig (backend endpoint, monitor timing, download defaults)
[POS]:    Configuration layer - client setup
[UPDATE]: When adding new configuration options
*/

use anyhow::Context as _;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tunefetch_adapter::{ClientConfig, DEFAULT_BASE_URL};
use url::Url;

use crate::controller::EnqueueOptions;
use crate::error::QueueError;
use crate::state_machine::MonitorPolicy;

const ENV_PREFIX: &str = "TUNEFETCH";
const ENV_SEPARATOR: &str = "__";

/// Top-level configuration for the queue client
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub backend: BackendConfig,
    pub monitor: MonitorConfig,
    pub defaults: DownloadDefaults,
}

/// Where and how to reach the download backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Polling cadence and lifecycle timers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    pub inactivity_timeout_secs: u64,
    pub removal_grace_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            inactivity_timeout_secs: 180,
            removal_grace_secs: 5,
        }
    }
}

/// Options applied to every download unless overridden on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DownloadDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_quality: Option<String>,
    pub real_time: bool,
}

impl QueueConfig {
    /// `<config dir>/tunefetch/config.yaml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tunefetch").join("config.yaml"))
    }

    /// Load the configuration, layering environment overrides over the file.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, None)
    }

    pub(crate) fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> anyhow::Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(
                    File::from(path)
                        .format(FileFormat::Yaml)
                        .required(true),
                );
            }
            None => {
                if let Some(default) = Self::default_path() {
                    builder = builder.add_source(
                        File::from(default)
                            .format(FileFormat::Yaml)
                            .required(false),
                    );
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let config: Self = builder
            .build()
            .context("read configuration sources")?
            .try_deserialize()
            .context("parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file only
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content).context("parse YAML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("serialize configuration")
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.monitor.poll_interval_ms == 0 {
            return Err(QueueError::Config(
                "monitor.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        let url = Url::parse(&self.backend.base_url).map_err(|err| {
            QueueError::Config(format!(
                "backend.base_url {:?} is not a valid URL: {err}",
                self.backend.base_url
            ))
        })?;
        if url.cannot_be_a_base() {
            return Err(QueueError::Config(format!(
                "backend.base_url {:?} cannot be used as a base URL",
                self.backend.base_url
            )));
        }
        Ok(())
    }

    pub fn monitor_policy(&self) -> MonitorPolicy {
        MonitorPolicy {
            poll_interval: Duration::from_millis(self.monitor.poll_interval_ms),
            inactivity_timeout: Duration::from_secs(self.monitor.inactivity_timeout_secs),
            removal_grace: Duration::from_secs(self.monitor.removal_grace_secs),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.backend.timeout_secs),
            connect_timeout: Duration::from_secs(self.backend.connect_timeout_secs),
        }
    }

    pub fn enqueue_options(&self) -> EnqueueOptions {
        EnqueueOptions {
            main_account: self.defaults.main_account.clone(),
            fallback_account: self.defaults.fallback_account.clone(),
            quality: self.defaults.quality.clone(),
            fallback_quality: self.defaults.fallback_quality.clone(),
            real_time: self.defaults.real_time,
        }
    }
}
