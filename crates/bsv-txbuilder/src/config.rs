//! Fee configuration.
//!
//! Settings can be built in code, deserialized from JSON, or read from the
//! `FEE_RATE`, `DUST_FEE_RATE` and `UNRECOGNIZED_TEMPLATE` environment
//! variables.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TxBuilderError;

/// Default fee rate in satoshis per byte.
pub const DEFAULT_FEE_RATE: f64 = 0.05;

/// Default dust fee rate. Zero makes every non-zero output spendable.
pub const DEFAULT_DUST_FEE_RATE: f64 = 0.0;

/// What to do when a spent locking script matches no known template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplatePolicy {
    /// Fail with `UnrecognizedTemplate`.
    Strict,
    /// Size the input as a maximum-size P2PKH input.
    #[default]
    AssumeP2pkh,
}

impl FromStr for TemplatePolicy {
    type Err = TxBuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TemplatePolicy::Strict),
            "assume_p2pkh" | "p2pkh" => Ok(TemplatePolicy::AssumeP2pkh),
            other => Err(TxBuilderError::InvalidConfig(format!(
                "unknown template policy {:?}",
                other
            ))),
        }
    }
}

/// Fee rates and estimation policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Satoshis per byte paid to miners.
    pub fee_rate: f64,
    /// Satoshis per byte used to compute dust limits.
    pub dust_fee_rate: f64,
    /// Handling of unrecognized spent locking scripts.
    pub unrecognized_template: TemplatePolicy,
}

impl Default for FeeConfig {
    fn default() -> Self {
        FeeConfig {
            fee_rate: DEFAULT_FEE_RATE,
            dust_fee_rate: DEFAULT_DUST_FEE_RATE,
            unrecognized_template: TemplatePolicy::default(),
        }
    }
}

impl FeeConfig {
    /// Create a validated configuration with the default template policy.
    pub fn new(fee_rate: f64, dust_fee_rate: f64) -> Result<Self, TxBuilderError> {
        let config = FeeConfig {
            fee_rate,
            dust_fee_rate,
            ..FeeConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, TxBuilderError> {
        let config: FeeConfig = serde_json::from_str(json)
            .map_err(|e| TxBuilderError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration from the environment. Unset variables take
    /// defaults.
    pub fn from_env() -> Result<Self, TxBuilderError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, TxBuilderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = FeeConfig::default();
        if let Some(v) = lookup("FEE_RATE") {
            config.fee_rate = parse_rate("FEE_RATE", &v)?;
        }
        if let Some(v) = lookup("DUST_FEE_RATE") {
            config.dust_fee_rate = parse_rate("DUST_FEE_RATE", &v)?;
        }
        if let Some(v) = lookup("UNRECOGNIZED_TEMPLATE") {
            config.unrecognized_template = v.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject negative or non-finite rates.
    pub fn validate(&self) -> Result<(), TxBuilderError> {
        check_rate("fee_rate", self.fee_rate)?;
        check_rate("dust_fee_rate", self.dust_fee_rate)
    }
}

fn parse_rate(name: &str, value: &str) -> Result<f64, TxBuilderError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| TxBuilderError::InvalidConfig(format!("{}: {}", name, e)))
}

fn check_rate(name: &str, rate: f64) -> Result<(), TxBuilderError> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(TxBuilderError::InvalidConfig(format!(
            "{} must be a non-negative number, got {}",
            name, rate
        )));
    }
    Ok(())
}
