//! Request/response boundary to the bot server
//!
//! Components depend on the [`ConsoleApi`] trait only; [`ApiClient`] is the
//! HTTP implementation used by the binary.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use client::ApiClient;
pub use types::{
    BotConfig, BotStatus, CashFlowPoint, ChannelMessage, DurationUnit, JournalEntry, Session,
    Settings, Strategy, Trade, TradeReport, TradeStats, BUILTIN_STRATEGIES, CUSTOM_STRATEGY,
    DEFAULT_AI_MODEL, DEFAULT_MONGO_URI,
};

/// Every REST call the console makes
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    async fn settings(&self) -> Result<Settings>;
    async fn save_settings(&self, settings: &Settings) -> Result<()>;

    /// Aggregate stats, optionally restricted to one strategy
    async fn stats(&self, filter: Option<&str>) -> Result<TradeStats>;
    async fn trades(&self, filter: Option<&str>, limit: usize) -> Result<Vec<Trade>>;
    /// Sessions are never filtered by strategy
    async fn sessions(&self, limit: usize) -> Result<Vec<Session>>;

    async fn bot_status(&self) -> Result<BotStatus>;
    async fn start_bot(&self, config: &BotConfig) -> Result<()>;
    async fn stop_bot(&self) -> Result<()>;

    async fn list_strategies(&self) -> Result<Vec<Strategy>>;
    async fn get_strategy(&self, name: &str) -> Result<String>;
    /// Upsert; returns the name the server stored it under
    async fn save_strategy(&self, name: &str, content: &str, tags: &[String]) -> Result<String>;
    async fn delete_strategy(&self, name: &str) -> Result<()>;

    async fn list_journal(&self, limit: usize) -> Result<Vec<JournalEntry>>;
    async fn create_journal(&self, title: &str, content: &str, tags: &[String]) -> Result<()>;
    async fn delete_journal(&self, id: &str) -> Result<()>;

    async fn cash_flow(&self) -> Result<Vec<CashFlowPoint>>;
    async fn trade_report(&self) -> Result<TradeReport>;
    async fn analyze(&self, prompt: &str) -> Result<String>;
    async fn generate_strategy(&self, prompt: &str, mode: &str, model: Option<&str>) -> Result<String>;
    /// CSV export of every recorded trade
    async fn export_trades(&self) -> Result<String>;
    async fn download_logs(&self) -> Result<String>;
}
