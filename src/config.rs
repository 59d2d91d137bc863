//! Configuration module
//!
//! Reads `~/.config/water-billing/config.toml` (or the file named by
//! `WATER_BILLING_CONFIG`). A missing file means defaults.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::billing::{ConnectionType, RateSchedule, RateTier};
use crate::shared::errors::ConfigError;

pub const CONFIG_ENV_VAR: &str = "WATER_BILLING_CONFIG";

/// `<config dir>/water-billing/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("water-billing")
        .join("config.toml")
}

/// `WATER_BILLING_CONFIG` when set, otherwise [`default_config_path`].
pub fn resolve_config_path() -> PathBuf {
    std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_config_path())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub billing: BillingSettings,

    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingConfig,

    #[serde(default = "default_rates")]
    pub rates: Vec<RateTier>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            billing: BillingSettings::default(),
            logging: LoggingConfig::default(),
            rates: default_rates(),
        }
    }
}

impl AppConfig {
    /// Load and validate the file at `path`; defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.validate_all()?;
            return Ok(config);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str(&content)
    }

    /// Load from [`resolve_config_path`].
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&resolve_config_path())
    }

    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Write the config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source: std::io::Error| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_error)
    }

    /// Field checks plus: every connection type that appears in `rates`
    /// must form a valid schedule.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.rates.is_empty() {
            return Err(ConfigError::Invalid("no rate tiers configured".to_string()));
        }
        for connection_type in self.configured_connection_types() {
            RateSchedule::for_connection(&self.rates, connection_type)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }

    pub fn configured_connection_types(&self) -> BTreeSet<ConnectionType> {
        self.rates.iter().map(|t| t.connection_type).collect()
    }
}

/// `[billing]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BillingSettings {
    /// Fixed monthly charge per connection
    #[validate(custom(function = "validate_base_charge"))]
    pub base_charge: Decimal,

    /// VAT as a fraction, `0.10` = 10%
    #[validate(custom(function = "validate_tax_rate"))]
    pub tax_rate: Decimal,

    /// ISO 4217 code
    #[validate(length(equal = 3, message = "currency must be a 3-letter ISO code"))]
    pub currency: String,

    /// Decimal places of the currency's minor unit (0 for TZS)
    #[validate(range(max = 4, message = "minor_units must be between 0 and 4"))]
    pub minor_units: u32,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            base_charge: Decimal::from(2000),
            tax_rate: Decimal::new(10, 2),
            currency: "TZS".to_string(),
            minor_units: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `water_billing=debug`
    #[validate(custom(function = "validate_log_level"))]
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

fn default_rates() -> Vec<RateTier> {
    ConnectionType::ALL
        .into_iter()
        .flat_map(RateTier::standard_table)
        .collect()
}

fn validate_base_charge(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("base_charge")
            .with_message("base_charge must be >= 0".into()));
    }
    Ok(())
}

fn validate_tax_rate(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE {
        return Err(ValidationError::new("tax_rate")
            .with_message("tax_rate must be between 0 and 1".into()));
    }
    Ok(())
}

fn validate_log_level(value: &str) -> Result<(), ValidationError> {
    tracing_subscriber::EnvFilter::try_new(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("level").with_message("invalid log filter".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate_all().unwrap();
        assert_eq!(config.billing.base_charge, Decimal::from(2000));
        assert_eq!(config.billing.currency, "TZS");
        assert_eq!(config.configured_connection_types().len(), 3);
        assert_eq!(config.rates.len(), 12);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::parse_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn parses_sections() {
        let config = AppConfig::parse_str(
            r#"
            [billing]
            base_charge = 1500
            tax_rate = 0.18
            currency = "USD"
            minor_units = 2

            [logging]
            level = "water_billing=debug"
            format = "json"

            [[rates]]
            connection_type = "commercial"
            min_consumption = 0
            max_consumption = 100
            rate_per_unit = 2000

            [[rates]]
            connection_type = "commercial"
            min_consumption = 101
            rate_per_unit = 3000
            "#,
        )
        .unwrap();

        assert_eq!(config.billing.base_charge, Decimal::from(1500));
        assert_eq!(config.billing.tax_rate, Decimal::new(18, 2));
        assert_eq!(config.billing.minor_units, 2);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.rates.len(), 2);
        assert!(config.rates[1].is_unbounded());
        assert_eq!(
            config.configured_connection_types().into_iter().collect::<Vec<_>>(),
            vec![ConnectionType::Commercial]
        );
    }

    #[test]
    fn partial_billing_section_keeps_other_defaults() {
        let config = AppConfig::parse_str("[billing]\nbase_charge = 3000\n").unwrap();
        assert_eq!(config.billing.base_charge, Decimal::from(3000));
        assert_eq!(config.billing.tax_rate, Decimal::new(10, 2));
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn rejects_tax_rate_above_one() {
        let err = AppConfig::parse_str("[billing]\ntax_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("tax_rate"));
    }

    #[test]
    fn rejects_negative_base_charge() {
        assert!(matches!(
            AppConfig::parse_str("[billing]\nbase_charge = -1\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_bad_currency_and_minor_units() {
        assert!(AppConfig::parse_str("[billing]\ncurrency = \"TZSH\"\n").is_err());
        assert!(AppConfig::parse_str("[billing]\nminor_units = 9\n").is_err());
    }

    #[test]
    fn rejects_rate_table_with_gap() {
        let err = AppConfig::parse_str(
            r#"
            [[rates]]
            connection_type = "residential"
            min_consumption = 0
            max_consumption = 10
            rate_per_unit = 800

            [[rates]]
            connection_type = "residential"
            min_consumption = 15
            rate_per_unit = 1200
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("gap"), "{}", err);
    }

    #[test]
    fn rejects_explicitly_empty_rate_table() {
        let err = AppConfig::parse_str("rates = []\n").unwrap_err();
        assert!(err.to_string().contains("no rate tiers"));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            AppConfig::parse_str("[billing\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("water-billing-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.billing.tax_rate = Decimal::new(18, 2);
        config.logging.format = LogFormat::Json;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir()
            .join(format!("water-billing-missing-{}", uuid::Uuid::new_v4()))
            .join("config.toml");
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        let path = default_config_path();
        assert!(path.ends_with("water-billing/config.toml"));
    }
}
