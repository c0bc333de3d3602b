//! reqwest implementation of [`ConsoleApi`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::*;
use super::ConsoleApi;
use crate::config::SanitizedValue;
use crate::error::{AppError, Result};

/// HTTP client for the bot server's `/api` surface
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client rooted at `base_url` (the console's origin)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send and turn non-2xx responses into `AppError::Server` with the body verbatim
    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(path = %path, status = status.as_u16(), "API request ok");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let body = body.trim().to_string();
        warn!(path = %path, status = status.as_u16(), body = %body, "API request rejected");
        Err(AppError::Server {
            status: status.as_u16(),
            body: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let request = self.http.get(self.url(path)).query(query);
        let text = self.send(request, path).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let request = self.http.get(self.url(path)).query(query);
        Ok(self.send(request, path).await?.text().await?)
    }
}

fn filter_query(filter: Option<&str>) -> Vec<(&'static str, String)> {
    match filter {
        Some(strategy) if !strategy.is_empty() => vec![("strategy", strategy.to_string())],
        _ => Vec::new(),
    }
}

#[async_trait]
impl ConsoleApi for ApiClient {
    async fn settings(&self) -> Result<Settings> {
        self.get_json("/api/settings", &[]).await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        debug!(
            token = %SanitizedValue::new(&settings.api_token),
            mongo_uri = %settings.mongo_uri,
            "Saving settings"
        );
        let path = "/api/settings";
        self.send(self.http.post(self.url(path)).json(settings), path)
            .await?;
        Ok(())
    }

    async fn stats(&self, filter: Option<&str>) -> Result<TradeStats> {
        self.get_json("/api/stats", &filter_query(filter)).await
    }

    async fn trades(&self, filter: Option<&str>, limit: usize) -> Result<Vec<Trade>> {
        let mut query = filter_query(filter);
        query.push(("limit", limit.to_string()));
        let trades: Option<Vec<Trade>> = self.get_json("/api/trades", &query).await?;
        Ok(trades.unwrap_or_default())
    }

    async fn sessions(&self, limit: usize) -> Result<Vec<Session>> {
        let sessions: Option<Vec<Session>> = self
            .get_json("/api/sessions", &[("limit", limit.to_string())])
            .await?;
        Ok(sessions.unwrap_or_default())
    }

    async fn bot_status(&self) -> Result<BotStatus> {
        let status: BotStatus = self.get_json("/api/bot/status", &[]).await?;
        Ok(status.normalized())
    }

    async fn start_bot(&self, config: &BotConfig) -> Result<()> {
        let path = "/api/bot/start";
        self.send(self.http.post(self.url(path)).json(config), path)
            .await?;
        Ok(())
    }

    async fn stop_bot(&self) -> Result<()> {
        let path = "/api/bot/stop";
        self.send(self.http.post(self.url(path)), path).await?;
        Ok(())
    }

    async fn list_strategies(&self) -> Result<Vec<Strategy>> {
        let list: Option<Vec<Strategy>> = self.get_json("/api/strategies/list", &[]).await?;
        Ok(list.unwrap_or_default())
    }

    async fn get_strategy(&self, name: &str) -> Result<String> {
        self.get_text("/api/strategies/get", &[("name", name.to_string())])
            .await
    }

    async fn save_strategy(&self, name: &str, content: &str, tags: &[String]) -> Result<String> {
        let path = "/api/strategies/save";
        let body = SaveStrategyRequest { name, content, tags };
        let text = self
            .send(self.http.post(self.url(path)).json(&body), path)
            .await?
            .text()
            .await?;
        let stored = serde_json::from_str::<SaveStrategyResponse>(&text)
            .ok()
            .and_then(|r| r.name)
            .unwrap_or_else(|| name.to_string());
        Ok(stored)
    }

    async fn delete_strategy(&self, name: &str) -> Result<()> {
        let path = "/api/strategies/delete";
        let request = self.http.post(self.url(path)).query(&[("name", name)]);
        self.send(request, path).await?;
        Ok(())
    }

    async fn list_journal(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let entries: Option<Vec<JournalEntry>> = self
            .get_json("/api/journal/list", &[("limit", limit.to_string())])
            .await?;
        Ok(entries.unwrap_or_default())
    }

    async fn create_journal(&self, title: &str, content: &str, tags: &[String]) -> Result<()> {
        let path = "/api/journal/create";
        let body = NewJournalEntry { title, content, tags };
        self.send(self.http.post(self.url(path)).json(&body), path)
            .await?;
        Ok(())
    }

    async fn delete_journal(&self, id: &str) -> Result<()> {
        let path = "/api/journal/delete";
        let request = self.http.post(self.url(path)).query(&[("id", id)]);
        self.send(request, path).await?;
        Ok(())
    }

    async fn cash_flow(&self) -> Result<Vec<CashFlowPoint>> {
        let points: Option<Vec<CashFlowPoint>> =
            self.get_json("/api/analytics/cashflow", &[]).await?;
        Ok(points.unwrap_or_default())
    }

    async fn trade_report(&self) -> Result<TradeReport> {
        self.get_json("/api/analytics/report", &[]).await
    }

    async fn analyze(&self, prompt: &str) -> Result<String> {
        let path = "/api/analytics/analyze";
        let body = PromptRequest {
            prompt,
            mode: None,
            model: None,
        };
        let text = self
            .send(self.http.post(self.url(path)).json(&body), path)
            .await?
            .text()
            .await?;
        let reply: PromptReply = serde_json::from_str(&text)?;
        Ok(reply.reply)
    }

    async fn generate_strategy(&self, prompt: &str, mode: &str, model: Option<&str>) -> Result<String> {
        let path = "/api/analytics/generate-strategy";
        let body = PromptRequest {
            prompt,
            mode: Some(mode),
            model,
        };
        let text = self
            .send(self.http.post(self.url(path)).json(&body), path)
            .await?
            .text()
            .await?;
        let reply: PromptReply = serde_json::from_str(&text)?;
        Ok(reply.reply)
    }

    async fn export_trades(&self) -> Result<String> {
        self.get_text("/api/trades/export", &[]).await
    }

    async fn download_logs(&self) -> Result<String> {
        self.get_text("/api/logs/download", &[]).await
    }
}
