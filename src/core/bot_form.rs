//! Start form: the editable parameters a `BotConfig` is built from

use crate::api::{BotConfig, DurationUnit, BUILTIN_STRATEGIES};
use crate::error::{AppError, Result};

/// Form field names accepted by [`BotForm::set`]
pub const FORM_FIELDS: &[&str] = &[
    "strategy",
    "symbol",
    "stake",
    "target",
    "stop_loss",
    "martingale",
    "duration",
    "unit",
    "streak",
    "barrier",
    "trailing",
];

#[derive(Debug, Clone, PartialEq)]
pub struct BotForm {
    values: BotConfig,
}

impl BotForm {
    pub fn new(defaults: BotConfig) -> Self {
        let mut values = defaults;
        values.script = None;
        Self { values }
    }

    pub fn values(&self) -> &BotConfig {
        &self.values
    }

    /// Fresh config for one start command; never cached
    pub fn build(&self) -> Result<BotConfig> {
        let config = self.values.clone();
        config.validate()?;
        Ok(config)
    }

    /// Fresh `custom` config carrying `script` verbatim
    pub fn build_with_script(&self, script: &str) -> Result<BotConfig> {
        let config = self.values.clone().with_script(script);
        config.validate()?;
        Ok(config)
    }

    /// Parse and assign one field from operator text input
    pub fn set(&mut self, field: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match field {
            "strategy" => {
                if !BUILTIN_STRATEGIES.contains(&value) {
                    return Err(AppError::Validation(format!(
                        "unknown strategy '{}' (expected one of {})",
                        value,
                        BUILTIN_STRATEGIES.join(", ")
                    )));
                }
                self.values.strategy = value.to_string();
            }
            "symbol" => {
                if value.is_empty() {
                    return Err(AppError::Validation("symbol is required".into()));
                }
                self.values.symbol = value.to_string();
            }
            "stake" => {
                let stake = parse_number(field, value)?;
                if !(stake > 0.0) {
                    return Err(AppError::Validation(format!(
                        "initial stake must be > 0, got {}",
                        value
                    )));
                }
                self.values.initial_stake = stake;
            }
            "target" => self.values.target_profit = parse_number(field, value)?,
            "stop_loss" => self.values.stop_loss = parse_number(field, value)?,
            "martingale" => {
                let factor = parse_number(field, value)?;
                if !(factor >= 0.0) {
                    return Err(AppError::Validation(format!(
                        "martingale factor must be >= 0, got {}",
                        value
                    )));
                }
                self.values.martingale_factor = factor;
            }
            "duration" => {
                let duration: u32 = parse_integer(field, value)?;
                if duration == 0 {
                    return Err(AppError::Validation("duration must be > 0".into()));
                }
                self.values.duration = duration;
            }
            "unit" => self.values.duration_unit = value.parse::<DurationUnit>()?,
            "streak" => self.values.streak_threshold = parse_integer(field, value)?,
            "barrier" => self.values.barrier = value.to_string(),
            "trailing" => {
                self.values.use_trailing_stop = match value.to_lowercase().as_str() {
                    "on" | "true" | "yes" | "1" => true,
                    "off" | "false" | "no" | "0" => false,
                    _ => {
                        return Err(AppError::Validation(format!(
                            "trailing expects on/off, got '{}'",
                            value
                        )))
                    }
                }
            }
            other => {
                return Err(AppError::Validation(format!(
                    "unknown field '{}' (expected one of {})",
                    other,
                    FORM_FIELDS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

fn parse_number(field: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::Validation(format!("{} expects a number, got '{}'", field, value)))
}

fn parse_integer(field: &str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|_| AppError::Validation(format!("{} expects a whole number, got '{}'", field, value)))
}
