//! TOML-based billing configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::billing::aggregator::{DEFAULT_CYCLE_DAYS, PeriodAggregator};
use crate::billing::ledger::{CreditLedger, LedgerMode, ShortfallPolicy};
use crate::billing::tariff::{Tariff, TierBand};

/// Longest accepted billing cycle in days.
pub const MAX_CYCLE_DAYS: u32 = 366;

/// Top-level billing configuration parsed from TOML.
///
/// All fields have defaults matching the `cfe_1` preset. Load from TOML with
/// [`BillingConfig::from_toml_file`] or pick a preset with
/// [`BillingConfig::from_preset`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BillingConfig {
    /// Tariff schedule.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Credit ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Open-period projection parameters.
    #[serde(default)]
    pub projection: ProjectionConfig,
}

/// Tariff schedule parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Charge billed for non-positive or fully offset consumption, before tax.
    pub fixed_charge: f64,
    /// Tax rate (0.16 = 16%).
    pub tax_rate: f64,
    /// Progressive bands, ascending; only the last may omit `up_to_kwh`.
    pub tiers: Vec<TierConfig>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        let tariff = Tariff::default();
        Self {
            fixed_charge: tariff.fixed_charge,
            tax_rate: tariff.tax_rate,
            tiers: tariff
                .bands
                .iter()
                .map(|b| TierConfig {
                    up_to_kwh: b.up_to_kwh,
                    rate: b.rate,
                })
                .collect(),
        }
    }
}

/// One tariff band.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    /// Upper cumulative bound (kWh); omitted for the open-ended last band.
    #[serde(default)]
    pub up_to_kwh: Option<f64>,
    /// Price per kWh.
    pub rate: f64,
}

/// Credit ledger parameters.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// `"energy"` or `"energy+cash"`.
    pub mode: LedgerMode,
    /// `"partial_offset"` or `"forfeit"`.
    pub shortfall: ShortfallPolicy,
}

/// Open-period projection parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionConfig {
    /// Nominal billing cycle length in days (1..=366).
    pub cycle_days: u32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            cycle_days: DEFAULT_CYCLE_DAYS,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"tariff.tax_rate"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl BillingConfig {
    /// Domestic schedule with energy-only credit and partial offset.
    pub fn cfe_1() -> Self {
        Self {
            tariff: TariffConfig::default(),
            ledger: LedgerConfig::default(),
            projection: ProjectionConfig::default(),
        }
    }

    /// Same schedule, tracking monetary credit alongside energy and
    /// forfeiting energy credit that cannot cover a whole period.
    pub fn cfe_1_cash() -> Self {
        Self {
            ledger: LedgerConfig {
                mode: LedgerMode::EnergyAndCash,
                shortfall: ShortfallPolicy::Forfeit,
            },
            ..Self::cfe_1()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["cfe_1", "cfe_1_cash"];

    /// Loads a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "cfe_1" => Ok(Self::cfe_1()),
            "cfe_1_cash" => Ok(Self::cfe_1_cash()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let t = &self.tariff;

        if !t.fixed_charge.is_finite() || t.fixed_charge < 0.0 {
            errors.push(ConfigError::new("tariff.fixed_charge", "must be >= 0"));
        }
        if !t.tax_rate.is_finite() || t.tax_rate < 0.0 {
            errors.push(ConfigError::new("tariff.tax_rate", "must be >= 0"));
        }
        if t.tiers.is_empty() {
            errors.push(ConfigError::new("tariff.tiers", "at least one tier is required"));
        }

        let mut previous = 0.0_f64;
        for (i, tier) in t.tiers.iter().enumerate() {
            let is_last = i + 1 == t.tiers.len();
            if !tier.rate.is_finite() || tier.rate < 0.0 {
                errors.push(ConfigError::new(
                    format!("tariff.tiers[{i}].rate"),
                    "must be >= 0",
                ));
            }
            match tier.up_to_kwh {
                Some(up) if !up.is_finite() || up <= 0.0 => errors.push(ConfigError::new(
                    format!("tariff.tiers[{i}].up_to_kwh"),
                    "must be a finite value > 0",
                )),
                Some(_) if is_last => errors.push(ConfigError::new(
                    format!("tariff.tiers[{i}].up_to_kwh"),
                    "last tier must be open-ended",
                )),
                None if !is_last => errors.push(ConfigError::new(
                    format!("tariff.tiers[{i}].up_to_kwh"),
                    "only the last tier may be open-ended",
                )),
                Some(up) if up <= previous => errors.push(ConfigError::new(
                    format!("tariff.tiers[{i}].up_to_kwh"),
                    format!("must be > {previous}"),
                )),
                Some(up) => previous = up,
                None => {}
            }
        }

        if !(1..=MAX_CYCLE_DAYS).contains(&self.projection.cycle_days) {
            errors.push(ConfigError::new(
                "projection.cycle_days",
                format!("must be in 1..={MAX_CYCLE_DAYS}"),
            ));
        }

        errors
    }

    /// Builds the tariff described by `[tariff]`.
    pub fn tariff(&self) -> Tariff {
        Tariff::new(
            self.tariff.fixed_charge,
            self.tariff.tax_rate,
            self.tariff
                .tiers
                .iter()
                .map(|t| TierBand {
                    up_to_kwh: t.up_to_kwh,
                    rate: t.rate,
                })
                .collect(),
        )
    }

    /// Builds the credit ledger described by `[tariff]` and `[ledger]`.
    pub fn ledger(&self) -> CreditLedger {
        CreditLedger::new(self.tariff(), self.ledger.mode, self.ledger.shortfall)
    }

    /// Builds the period aggregator for this configuration.
    pub fn aggregator(&self) -> PeriodAggregator {
        PeriodAggregator::new(self.ledger(), self.projection.cycle_days)
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self::cfe_1()
    }
}
