//! Wire types exchanged with the bot server
//!
//! Field names follow the server's snake_case JSON. Numeric aggregates default
//! to zero when the server omits them (an empty trade collection yields `{}`-ish
//! payloads on some endpoints).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ============================================================================
// Telemetry channel
// ============================================================================

/// Frame pushed by the server over the telemetry channel: `{type, message}`.
///
/// Unknown `type` values decode to `Other` so the protocol can grow without
/// breaking older consoles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelMessage {
    Log { message: String },
    Info { message: String },
    Error { message: String },
    #[serde(other)]
    Other,
}

// ============================================================================
// Bot lifecycle
// ============================================================================

/// Contract duration units understood by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DurationUnit {
    #[default]
    #[serde(rename = "t")]
    Ticks,
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
    #[serde(rename = "d")]
    Days,
}

impl DurationUnit {
    pub fn code(&self) -> &'static str {
        match self {
            DurationUnit::Ticks => "t",
            DurationUnit::Seconds => "s",
            DurationUnit::Minutes => "m",
            DurationUnit::Hours => "h",
            DurationUnit::Days => "d",
        }
    }
}

impl std::fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DurationUnit::Ticks => "ticks",
            DurationUnit::Seconds => "seconds",
            DurationUnit::Minutes => "minutes",
            DurationUnit::Hours => "hours",
            DurationUnit::Days => "days",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for DurationUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "t" | "tick" | "ticks" => Ok(DurationUnit::Ticks),
            "s" | "sec" | "seconds" => Ok(DurationUnit::Seconds),
            "m" | "min" | "minutes" => Ok(DurationUnit::Minutes),
            "h" | "hours" => Ok(DurationUnit::Hours),
            "d" | "days" => Ok(DurationUnit::Days),
            other => Err(AppError::Validation(format!(
                "unknown duration unit '{}'",
                other
            ))),
        }
    }
}

/// Strategy kinds the bot binary ships with
pub const BUILTIN_STRATEGIES: &[&str] = &[
    "even_odd",
    "rise_fall",
    "differs",
    "higher_lower",
    "multiplier",
    "custom",
];

/// Strategy kind that carries user script source
pub const CUSTOM_STRATEGY: &str = "custom";

/// Start command payload, rebuilt from the form every time start is issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    pub strategy: String,
    pub symbol: String,
    pub initial_stake: f64,
    pub target_profit: f64,
    pub stop_loss: f64,
    #[serde(rename = "martingale")]
    pub martingale_factor: f64,
    pub duration: u32,
    pub duration_unit: DurationUnit,
    pub streak_threshold: u32,
    #[serde(default)]
    pub barrier: String,
    #[serde(default)]
    pub use_trailing_stop: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            strategy: "rise_fall".to_string(),
            symbol: "R_100".to_string(),
            initial_stake: 1.0,
            target_profit: 10.0,
            stop_loss: 10.0,
            martingale_factor: 2.0,
            duration: 5,
            duration_unit: DurationUnit::Ticks,
            streak_threshold: 0,
            barrier: String::new(),
            use_trailing_stop: false,
            script: None,
        }
    }
}

impl BotConfig {
    /// Validate the local form constraints before anything goes on the wire
    pub fn validate(&self) -> Result<(), AppError> {
        if self.strategy.trim().is_empty() {
            return Err(AppError::Validation("strategy is required".into()));
        }
        if self.symbol.trim().is_empty() {
            return Err(AppError::Validation("symbol is required".into()));
        }
        if !(self.initial_stake > 0.0) {
            return Err(AppError::Validation(format!(
                "initial stake must be > 0, got {}",
                self.initial_stake
            )));
        }
        if !(self.martingale_factor >= 0.0) {
            return Err(AppError::Validation(format!(
                "martingale factor must be >= 0, got {}",
                self.martingale_factor
            )));
        }
        if self.duration == 0 {
            return Err(AppError::Validation("duration must be > 0".into()));
        }
        if self.strategy == CUSTOM_STRATEGY
            && self.script.as_deref().map_or(true, |s| s.trim().is_empty())
        {
            return Err(AppError::Validation(
                "custom strategy requires a script".into(),
            ));
        }
        Ok(())
    }

    /// Same parameters, running the `custom` strategy with `script` verbatim
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.strategy = CUSTOM_STRATEGY.to_string();
        self.script = Some(script.into());
        self
    }
}

/// Server-reported run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BotStatus {
    pub running: bool,
    #[serde(default, rename = "start_time", skip_serializing_if = "Option::is_none")]
    pub start_time_epoch_secs: Option<i64>,
}

impl BotStatus {
    pub fn stopped() -> Self {
        Self::default()
    }

    pub fn running_since(epoch_secs: i64) -> Self {
        Self {
            running: true,
            start_time_epoch_secs: Some(epoch_secs),
        }
    }

    /// Drop a start time reported alongside `running: false`
    pub fn normalized(self) -> Self {
        if self.running {
            self
        } else {
            Self::stopped()
        }
    }
}

// ============================================================================
// Telemetry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TradeStats {
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub total_pnl: f64,
    pub avg_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub strategy: String,
    pub contract_type: String,
    pub stake: f64,
    pub profit: f64,
    pub total_pnl: f64,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub strategy: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub winning_trades: u64,
    #[serde(default)]
    pub losing_trades: u64,
    #[serde(default)]
    pub total_pnl: f64,
    #[serde(default)]
    pub max_pnl: f64,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

// ============================================================================
// Strategies & journal
// ============================================================================

/// Saved strategy as listed in the sidebar (content fetched separately)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveStrategyRequest<'a> {
    pub name: &'a str,
    pub content: &'a str,
    pub tags: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveStrategyResponse {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewJournalEntry<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub tags: &'a [String],
}

// ============================================================================
// Settings
// ============================================================================

pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_AI_MODEL: &str = "gpt-3.5-turbo";

/// Server-side system settings (`GET/POST /api/settings`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "deriv_api_token")]
    pub api_token: String,
    pub mongo_uri: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub openai_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub openai_model: String,
}

impl Settings {
    /// The required credential is present
    pub fn has_credentials(&self) -> bool {
        !self.api_token.trim().is_empty()
    }
}

// ============================================================================
// Analytics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TradeReport {
    pub total_trades: u64,
    pub win_rate: f64,
    pub total_profit: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_duration: f64,
    pub longest_streak_win: u32,
    pub longest_streak_loss: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowPoint {
    pub timestamp: DateTime<Utc>,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptRequest<'a> {
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptReply {
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_message_known_kinds() {
        let msg: ChannelMessage =
            serde_json::from_str(r#"{"type":"info","message":"hello","time":"12:00:00"}"#)
                .unwrap();
        assert_eq!(msg, ChannelMessage::Info { message: "hello".into() });
    }

    #[test]
    fn test_channel_message_unknown_kind_is_other() {
        let msg: ChannelMessage =
            serde_json::from_str(r#"{"type":"trade","data":{"profit":1.0}}"#).unwrap();
        assert_eq!(msg, ChannelMessage::Other);
    }

    #[test]
    fn test_channel_message_missing_text_is_an_error() {
        assert!(serde_json::from_str::<ChannelMessage>(r#"{"type":"log"}"#).is_err());
    }

    #[test]
    fn test_bot_config_wire_names() {
        let config = BotConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["initial_stake"], 1.0);
        assert_eq!(json["martingale"], 2.0);
        assert_eq!(json["duration_unit"], "t");
        assert!(json.get("script").is_none());
    }

    #[test]
    fn test_bot_config_validation() {
        assert!(BotConfig::default().validate().is_ok());

        let zero_stake = BotConfig {
            initial_stake: 0.0,
            ..Default::default()
        };
        assert!(matches!(zero_stake.validate(), Err(AppError::Validation(_))));

        let negative_martingale = BotConfig {
            martingale_factor: -1.0,
            ..Default::default()
        };
        assert!(negative_martingale.validate().is_err());

        let nan_stake = BotConfig {
            initial_stake: f64::NAN,
            ..Default::default()
        };
        assert!(nan_stake.validate().is_err());

        let zero_duration = BotConfig {
            duration: 0,
            ..Default::default()
        };
        assert!(zero_duration.validate().is_err());
    }

    #[test]
    fn test_custom_strategy_requires_script() {
        let mut config = BotConfig::default();
        config.strategy = CUSTOM_STRATEGY.into();
        assert!(config.validate().is_err());

        let config = BotConfig::default().with_script("function onTick(q) {}");
        assert_eq!(config.strategy, "custom");
        assert!(config.validate().is_ok());
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["script"], "function onTick(q) {}");
    }

    #[test]
    fn test_bot_status_normalization() {
        let status: BotStatus = serde_json::from_str(r#"{"running":true,"start_time":1700000000}"#).unwrap();
        assert_eq!(status, BotStatus::running_since(1_700_000_000));

        let stale: BotStatus = serde_json::from_str(r#"{"running":false,"start_time":5}"#).unwrap();
        assert_eq!(stale.normalized(), BotStatus::stopped());
    }

    #[test]
    fn test_duration_unit_parse() {
        assert_eq!("minutes".parse::<DurationUnit>().unwrap(), DurationUnit::Minutes);
        assert_eq!("t".parse::<DurationUnit>().unwrap(), DurationUnit::Ticks);
        assert!("weeks".parse::<DurationUnit>().is_err());
    }

    #[test]
    fn test_stats_defaults_on_missing_fields() {
        let stats: TradeStats = serde_json::from_str(r#"{"total_trades":3}"#).unwrap();
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.winning_trades, 0);
        assert_eq!(stats.total_pnl, 0.0);
    }

    #[test]
    fn test_settings_credentials() {
        let settings: Settings = serde_json::from_str(r#"{"deriv_api_token":"  ","mongo_uri":""}"#).unwrap();
        assert!(!settings.has_credentials());
        let settings = Settings {
            api_token: "abc".into(),
            ..Default::default()
        };
        assert!(settings.has_credentials());
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["deriv_api_token"], "abc");
        assert!(json.get("openai_key").is_none());
    }
}
