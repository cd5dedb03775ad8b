//! Configuration management for the lmi CLI
//!
//! Stores estimator defaults in ~/.latentmi/config.toml. Command-line flags
//! override the file, the file overrides library defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use latentmi_core::{EstimatorConfig, Regularizer};

/// Keys accepted by `lmi config set|get`
pub const KEYS: &[&str] = &[
    "regularizer",
    "alpha",
    "lam",
    "latent-dim",
    "hidden-dim",
    "batch-size",
    "learning-rate",
    "epochs",
    "patience",
    "validation-split",
    "neighbours",
    "seed",
];

// ============================================================================
// MAIN CONFIG
// ============================================================================

/// CLI Configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub estimator: EstimatorDefaults,
}

/// Persisted overrides for [`EstimatorConfig`]; unset fields keep the library default
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EstimatorDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regularizer: Option<Regularizer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lam: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latent_dim: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_dim: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epochs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patience: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_split: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighbours: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Config {
    /// Get the config directory path (~/.latentmi/)
    pub fn dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".latentmi"))
    }

    /// Get the config file path (~/.latentmi/config.toml)
    pub fn path() -> Result<PathBuf> {
        Ok(Self::dir()?.join("config.toml"))
    }

    /// Load config from file (default if not exists)
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let dir = Self::dir()?;

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(Self::path()?, contents)?;

        Ok(())
    }

    /// Set one key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let e = &mut self.estimator;
        match key {
            "regularizer" => e.regularizer = Some(value.parse::<Regularizer>().map_err(anyhow::Error::msg)?),
            "alpha" => e.alpha = Some(parse(key, value)?),
            "lam" => e.lam = Some(parse(key, value)?),
            "latent-dim" => e.latent_dim = Some(parse(key, value)?),
            "hidden-dim" => e.hidden_dim = Some(parse(key, value)?),
            "batch-size" => e.batch_size = Some(parse(key, value)?),
            "learning-rate" => e.learning_rate = Some(parse(key, value)?),
            "epochs" => e.epochs = Some(parse(key, value)?),
            "patience" => e.patience = Some(parse(key, value)?),
            "validation-split" => e.validation_split = Some(parse(key, value)?),
            "neighbours" => e.neighbours = Some(parse(key, value)?),
            "seed" => e.seed = Some(parse(key, value)?),
            _ => anyhow::bail!("Unknown config key: {}. Valid keys: {}", key, KEYS.join(", ")),
        }
        Ok(())
    }

    /// Current value of `key`, `None` when unset
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let e = &self.estimator;
        let value = match key {
            "regularizer" => e.regularizer.map(|v| v.to_string()),
            "alpha" => e.alpha.map(|v| v.to_string()),
            "lam" => e.lam.map(|v| v.to_string()),
            "latent-dim" => e.latent_dim.map(|v| v.to_string()),
            "hidden-dim" => e.hidden_dim.map(|v| v.to_string()),
            "batch-size" => e.batch_size.map(|v| v.to_string()),
            "learning-rate" => e.learning_rate.map(|v| v.to_string()),
            "epochs" => e.epochs.map(|v| v.to_string()),
            "patience" => e.patience.map(|v| v.to_string()),
            "validation-split" => e.validation_split.map(|v| v.to_string()),
            "neighbours" => e.neighbours.map(|v| v.to_string()),
            "seed" => e.seed.map(|v| v.to_string()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }

    /// Layer the stored defaults over `base`
    pub fn apply(&self, mut base: EstimatorConfig) -> EstimatorConfig {
        let e = &self.estimator;
        let rep = &mut base.representation;
        if let Some(v) = e.regularizer {
            rep.regularizer = v;
        }
        if let Some(v) = e.alpha {
            rep.alpha = v;
        }
        if let Some(v) = e.lam {
            rep.lam = v;
        }
        if let Some(v) = e.latent_dim {
            rep.latent_dim = v;
        }
        if let Some(v) = e.hidden_dim {
            rep.hidden_dim = v;
        }

        let training = &mut base.training;
        if let Some(v) = e.batch_size {
            training.batch_size = v;
        }
        if let Some(v) = e.learning_rate {
            training.learning_rate = v;
        }
        if let Some(v) = e.epochs {
            training.max_epochs = v;
        }
        if let Some(v) = e.patience {
            training.patience = v;
        }

        if let Some(v) = e.validation_split {
            base.validation_split = v;
        }
        if let Some(v) = e.neighbours {
            base.neighbours = v;
        }
        if e.seed.is_some() {
            base.seed = e.seed;
        }
        base
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value '{}' for {}", value, key))
}
