//! Configuration loading.
//!
//! Loading order (priority from highest to lowest): command line flags
//! (applied by the binary), environment variables (prefixed with APP_),
//! the configuration file, then defaults.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::services::extraction::{PricingTable, TierRates};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub pricing: PricingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "postgres://localhost/advscope".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider API key. Usually supplied via ANTHROPIC_API_KEY.
    pub api_key: String,
    pub api_base: String,
    pub tier1_model: String,
    pub tier2_model: String,
    pub tier3_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.anthropic.com".to_string(),
            tier1_model: "claude-3-5-haiku-latest".to_string(),
            tier2_model: "claude-sonnet-4-5".to_string(),
            tier3_model: "claude-opus-4-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Highest tier the pipeline runs (1-3).
    pub max_tier: u8,
    /// Per-advisor USD budget. Absent or non-positive disables the gate.
    pub max_cost_usd: Option<f64>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { max_tier: 3, max_cost_usd: None }
    }
}

/// Per-tier rates in USD per 1M tokens. Unset tiers fall back to the
/// built-in table.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PricingConfig {
    pub tier1: Option<TierRates>,
    pub tier2: Option<TierRates>,
    pub tier3: Option<TierRates>,
}

impl PricingConfig {
    pub fn to_table(&self) -> PricingTable {
        let defaults = PricingTable::default();
        PricingTable {
            tier1: self.tier1.unwrap_or(defaults.tier1),
            tier2: self.tier2.unwrap_or(defaults.tier2),
            tier3: self.tier3.unwrap_or(defaults.tier3),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,advscope=debug".to_string() }
    }
}

impl Config {
    /// Load from the given file (or the first default location found), then
    /// apply environment overrides and validate.
    pub fn load(config_path: Option<&str>) -> Result<Self, anyhow::Error> {
        let path = config_path.map(|p| p.to_string()).or_else(Self::find_config_file);
        let mut config = if let Some(path) = path {
            Self::from_toml(&path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Supported environment variables:
    /// - APP_DATABASE_URL: Postgres connection string
    /// - ANTHROPIC_API_KEY: provider API key
    /// - APP_LLM_API_BASE: provider base URL
    /// - APP_TIER1_MODEL / APP_TIER2_MODEL / APP_TIER3_MODEL
    /// - APP_MAX_TIER: pipeline tier cap (1-3)
    /// - APP_MAX_COST_USD: per-advisor budget
    /// - APP_LOG_LEVEL: tracing filter
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("APP_DATABASE_URL") {
            self.database.url = url;
            tracing::info!("Override database.url from env");
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(base) = std::env::var("APP_LLM_API_BASE") {
            self.llm.api_base = base;
            tracing::info!("Override llm.api_base from env: {}", self.llm.api_base);
        }
        if let Ok(model) = std::env::var("APP_TIER1_MODEL") {
            self.llm.tier1_model = model;
            tracing::info!("Override llm.tier1_model from env: {}", self.llm.tier1_model);
        }
        if let Ok(model) = std::env::var("APP_TIER2_MODEL") {
            self.llm.tier2_model = model;
            tracing::info!("Override llm.tier2_model from env: {}", self.llm.tier2_model);
        }
        if let Ok(model) = std::env::var("APP_TIER3_MODEL") {
            self.llm.tier3_model = model;
            tracing::info!("Override llm.tier3_model from env: {}", self.llm.tier3_model);
        }
        if let Ok(tier) = std::env::var("APP_MAX_TIER")
            && let Ok(tier) = tier.parse()
        {
            self.extraction.max_tier = tier;
            tracing::info!("Override extraction.max_tier from env: {}", self.extraction.max_tier);
        }
        if let Ok(cost) = std::env::var("APP_MAX_COST_USD")
            && let Ok(cost) = cost.parse()
        {
            self.extraction.max_cost_usd = Some(cost);
            tracing::info!("Override extraction.max_cost_usd from env: {}", cost);
        }
        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }
        if !(1..=3).contains(&self.extraction.max_tier) {
            anyhow::bail!("extraction.max_tier must be 1, 2, or 3");
        }
        if let Some(cost) = self.extraction.max_cost_usd {
            if cost < 0.0 {
                anyhow::bail!("extraction.max_cost_usd cannot be negative");
            }
        }
        if self.llm.api_key.is_empty() {
            tracing::warn!("No LLM API key configured; set ANTHROPIC_API_KEY before extracting");
        }
        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extraction.max_tier, 3);
    }

    #[test]
    fn test_toml_parsing_with_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [database]
            url = "postgres://db/prod"

            [extraction]
            max_tier = 2
            max_cost_usd = 1.5

            [pricing.tier1]
            input = 1.0
            output = 5.0
            cache_write = 1.25
            cache_read = 0.1
            "#,
        )
        .expect("should parse");
        assert_eq!(config.database.url, "postgres://db/prod");
        assert_eq!(config.extraction.max_tier, 2);
        assert_eq!(config.extraction.max_cost_usd, Some(1.5));

        let table = config.pricing.to_table();
        assert_eq!(table.tier1.input, 1.0);
        // Unset tiers fall back to defaults.
        assert_eq!(table.tier2.input, PricingTable::default().tier2.input);
    }

    #[test]
    fn test_invalid_max_tier_rejected() {
        let mut config = Config::default();
        config.extraction.max_tier = 5;
        assert!(config.validate().is_err());
    }
}
