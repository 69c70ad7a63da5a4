use crate::prelude::*;

use crate::options::Options;

use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,

    /// Per-request timeout for the HTTP backend.
    #[serde(default = "Config::default_timeout_secs")]
    pub timeout_secs: u64,

    /// Built-in registry name, or a path to a registry document.
    #[serde(default = "Config::default_registry")]
    pub registry: String,
}

// BackendConfig {{{
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BackendConfig {
    /// Heater API base, e.g. `http://192.168.1.1/api/dev/65`
    pub url: Option<String>,
    /// Offline register state file
    pub yaml: Option<PathBuf>,
}

impl BackendConfig {
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn yaml(&self) -> Option<&Path> {
        self.yaml.as_deref()
    }
} // }}}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            loglevel: Self::default_loglevel(),
            timeout_secs: Self::default_timeout_secs(),
            registry: Self::default_registry(),
        }
    }
}

impl Config {
    pub fn new(file: &str) -> Result<Self> {
        let content = std::fs::read_to_string(file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// The config file named on the command line (if any) with the
    /// command-line flags layered on top.
    pub fn from_options(options: &Options) -> Result<Self> {
        let mut config = match &options.config_file {
            Some(file) => Self::new(file)?,
            None => Self::default(),
        };
        config.apply_overrides(options);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, options: &Options) {
        // either flag replaces the whole backend section
        if options.url.is_some() || options.yaml.is_some() {
            self.backend = BackendConfig {
                url: options.url.clone(),
                yaml: options.yaml.clone(),
            };
        }
        if let Some(registry) = &options.registry {
            self.registry = registry.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.backend.url {
            if let Err(e) = url::Url::parse(url) {
                bail!("invalid backend.url {:?}: {}", url, e);
            }
        }
        if let Some(path) = &self.backend.yaml {
            if path.as_os_str().is_empty() {
                bail!("backend.yaml cannot be empty");
            }
        }
        if self.backend.url.is_some() && self.backend.yaml.is_some() {
            bail!("use either backend.url or backend.yaml, not both");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than 0");
        }
        if self.registry.is_empty() {
            bail!("registry cannot be empty");
        }
        Ok(())
    }

    /// Checks that a backend has been chosen at all. Kept apart from
    /// [`validate`](Self::validate) so a config file may leave the choice to
    /// the command line.
    pub fn require_backend(&self) -> Result<()> {
        if self.backend.url.is_none() && self.backend.yaml.is_none() {
            bail!("specify --url for HTTP mode or --yaml for offline mode");
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        info!("Configuration:");
        match (self.backend.url(), self.backend.yaml()) {
            (Some(url), _) => info!("  Backend: HTTP {}", url),
            (_, Some(path)) => info!("  Backend: YAML {}", path.display()),
            _ => info!("  Backend: none"),
        }
        info!("  Timeout: {}s", self.timeout_secs);
        info!("  Registry: {}", self.registry);
        info!("  Log Level: {}", self.loglevel);
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    pub fn loglevel(&self) -> &str {
        &self.loglevel
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }

    fn default_timeout_secs() -> u64 {
        5
    }

    fn default_registry() -> String {
        crate::registry::STANDARD_CONFIG.to_string()
    }
}
