//! Configuration loading from TOML files.

use std::path::Path;

use serde::Deserialize;

use crate::domain::{Bps, FeeSchedule, UserId, MAX_FEE_BPS};
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub fees: FeesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Identity whose resolutions the engine trusts; part of every
    /// condition derivation.
    pub oracle: String,
    /// Identity holding the administrative surface.
    pub admin: String,
    /// Identity fees accrue to.
    pub treasury: String,
    /// Decimal precision of the settlement currency, for display only.
    pub collateral_decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeesConfig {
    /// Default trade-fee rate in basis points.
    pub trade_bps: u16,
    /// Default claim-fee rate in basis points.
    pub claim_bps: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("engine.oracle", &self.engine.oracle),
            ("engine.admin", &self.engine.admin),
            ("engine.treasury", &self.engine.treasury),
        ] {
            if value.is_empty() {
                return Err(ConfigError::MissingField { field }.into());
            }
        }
        for (field, value) in [
            ("fees.trade_bps", self.fees.trade_bps),
            ("fees.claim_bps", self.fees.claim_bps),
        ] {
            if value > MAX_FEE_BPS.value() {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{value} exceeds the {MAX_FEE_BPS} cap"),
                }
                .into());
            }
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: format!("unknown format '{}'", self.logging.format),
            }
            .into());
        }
        Ok(())
    }

    /// The fee schedule the config describes.
    #[must_use]
    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule::new(Bps::new(self.fees.trade_bps), Bps::new(self.fees.claim_bps))
            .expect("validate() already capped the rates")
    }

    /// The oracle identity.
    #[must_use]
    pub fn oracle(&self) -> UserId {
        UserId::new(self.engine.oracle.clone())
    }

    /// The admin identity.
    #[must_use]
    pub fn admin(&self) -> UserId {
        UserId::new(self.engine.admin.clone())
    }

    /// The treasury identity.
    #[must_use]
    pub fn treasury(&self) -> UserId {
        UserId::new(self.engine.treasury.clone())
    }

    /// Initialize tracing from the logging section. `RUST_LOG` wins when set.
    pub fn init_logging(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.logging.level));
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        let result = if self.logging.format == "json" {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        // Already-initialized is fine (tests, repeated calls).
        let _ = result;
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                oracle: "oracle".into(),
                admin: "admin".into(),
                treasury: "treasury".into(),
                collateral_decimals: 6,
            },
            fees: FeesConfig {
                trade_bps: 100,
                claim_bps: 400,
            },
            logging: LoggingConfig {
                level: "info".into(),
                format: "pretty".into(),
            },
        }
    }
}
