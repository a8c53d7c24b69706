use serde::Deserialize;
use std::path::Path;

use crate::error::{IorderError, Result};
use crate::transaction::OrderPolicy;
use crate::validate::ValidationOptions;

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "iorder.toml";

/// The iorder configuration file structure (iorder.toml)
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transaction set ordering
    pub order: OrderConfig,

    /// Validation settings
    pub validate: ValidateConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    pub policy: OrderPolicy,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ValidateConfig {
    /// Stop when the progress receiver asks to
    pub honor_abort: bool,

    /// Idents to analyze; empty means all
    pub interest: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Show progress bars
    pub progress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { progress: true }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// Reads `path` if given (it must exist), else `iorder.toml` in the working
    /// directory if present, then applies the `IORDER_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = std::env::current_dir()?.join(CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `IORDER_ORDER`, `IORDER_HONOR_ABORT` and `IORDER_INTEREST` as
    /// returned by `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("IORDER_ORDER") {
            self.order.policy = OrderPolicy::from_str(&value)
                .ok_or_else(|| IorderError::Config(format!("invalid IORDER_ORDER: {}", value)))?;
        }

        if let Some(value) = lookup("IORDER_HONOR_ABORT") {
            self.validate.honor_abort = match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(IorderError::Config(format!(
                        "invalid IORDER_HONOR_ABORT: {}",
                        value
                    )))
                }
            };
        }

        if let Some(value) = lookup("IORDER_INTEREST") {
            self.validate.interest = value
                .split(',')
                .map(str::trim)
                .filter(|ident| !ident.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            honor_abort: self.validate.honor_abort,
        }
    }
}
