//! Configuration loading
//!
//! The price table lives in a TOML file and is loaded once at process start
//! into an explicit `Config` object; nothing reads configuration at module
//! scope. Lookup order: explicit `--config` path, then `.emrcost.toml` in the
//! current directory, then the platform config dir.

use crate::error::ConfigError;
use crate::pricing::PriceTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Hourly on-demand price per instance type.
    #[serde(default)]
    pub prices: HashMap<String, f64>,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = if let Some(p) = path {
            // An explicitly requested config that is missing is an error, not
            // a silent fallback to defaults.
            if !p.exists() {
                return Err(ConfigError::NotFound(p.display().to_string()));
            }
            p.to_path_buf()
        } else {
            let local = PathBuf::from(".emrcost.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("emrcost").join("config.toml"))
                    .unwrap_or(local)
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|e| {
                ConfigError::ParseError(format!("{}: {}", config_path.display(), e))
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| {
                ConfigError::ParseError(format!("{}: {}", config_path.display(), e))
            })?;
            config.validate()?;
            Ok(config)
        } else {
            eprintln!(
                "WARNING: no config file found, price table is empty. Run 'emrcost init' to create one."
            );
            Ok(Config::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (instance_type, price) in &self.prices {
            if !price.is_finite() || *price < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("prices.{instance_type}"),
                    reason: format!("hourly price must be a non-negative number, got {price}"),
                });
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    pub fn price_table(&self) -> PriceTable {
        PriceTable::new(self.prices.clone())
    }
}

/// Write a starter config with a few common instance types.
pub fn init_config(output: &Path) -> Result<(), ConfigError> {
    let config = Config {
        prices: HashMap::from([
            ("m4.large".to_string(), 0.1),
            ("m4.xlarge".to_string(), 0.2),
            ("m4.2xlarge".to_string(), 0.4),
            ("r4.xlarge".to_string(), 0.266),
        ]),
    };
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}
