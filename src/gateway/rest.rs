//! HTTP client for the platform's REST API.
//!
//! The bot only ever creates messages, so that is the only call here.

use std::time::Duration;

use anyhow::Context;
use reqwest::{header, Client};
use serde_json::json;

use crate::config::BotConfig;

/// REST client authenticated as the bot.
///
/// [`reqwest::Client`] holds an `Arc` internally; one instance is built per
/// worker and reused for every reply.
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// Build a client that sends `Authorization: Bot <token>` on every request.
    pub fn new(cfg: &BotConfig, token: &str) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bot {token}"))
            .context("invalid bot token value for Authorization header")?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("DiscordBot (funbot, ", env!("CARGO_PKG_VERSION"), ")"))
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .context("building reqwest client")?;

        Ok(Self {
            client,
            base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Post `content` to `channel_id`.
    ///
    /// # Errors
    /// Returns an error if the request fails or the API answers non-2xx.
    pub async fn create_message(&self, channel_id: &str, content: &str) -> anyhow::Result<()> {
        let url = format!("{}/channels/{channel_id}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "content": content }))
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("create message returned HTTP {}: {}", status, text);
        }
        Ok(())
    }
}
