//! Slack Web API client for history lookups, private downloads and posting.

use async_trait::async_trait;
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::error::SlackError;
use crate::slack::types::{ApiResponse, Empty, HistoryPayload, SourceMessage};

/// Chat platform operations the pipelines depend on.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Most recent message at or before `ts` in `channel` (inclusive, limit 1).
    async fn latest_message(
        &self,
        channel: &str,
        ts: &str,
    ) -> Result<Option<SourceMessage>, SlackError>;

    /// Download a private file with the bot credential.
    async fn download_file(&self, url: &str) -> Result<Vec<u8>, SlackError>;

    /// Post plain text to a channel.
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError>;
}

/// Slack Web API client authenticated with the bot token.
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
}

impl SlackClient {
    pub fn new(http: reqwest::Client, api_base: &str, bot_token: SecretString) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.bot_token.expose_secret())
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    async fn latest_message(
        &self,
        channel: &str,
        ts: &str,
    ) -> Result<Option<SourceMessage>, SlackError> {
        let method = "conversations.history";
        let resp = self
            .http
            .get(self.api_url(method))
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .query(&[
                ("channel", channel),
                ("latest", ts),
                ("limit", "1"),
                ("inclusive", "true"),
            ])
            .send()
            .await
            .map_err(|e| transport(method, e))?;

        let payload: HistoryPayload = read_api(method, resp).await?;
        Ok(payload
            .messages
            .into_iter()
            .next()
            .map(|m| m.into_source(channel)))
    }

    async fn download_file(&self, url: &str) -> Result<Vec<u8>, SlackError> {
        let method = "files.download";
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| transport(method, e))?;

        if !resp.status().is_success() {
            return Err(SlackError::Status {
                method: method.into(),
                status: resp.status().as_u16(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| transport(method, e))?;
        tracing::debug!(bytes = bytes.len(), "Downloaded private file");
        Ok(bytes.to_vec())
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        let method = "chat.postMessage";
        let body = serde_json::json!({
            "channel": channel,
            "text": text,
        });

        let resp = self
            .http
            .post(self.api_url(method))
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(method, e))?;

        let _: Empty = read_api(method, resp).await?;
        tracing::info!(channel = %channel, "Posted message");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

pub(crate) fn transport(method: &str, e: reqwest::Error) -> SlackError {
    SlackError::Transport {
        method: method.to_string(),
        reason: e.to_string(),
    }
}

/// Check status, decode the `ok`/`error` envelope and return the payload.
pub(crate) async fn read_api<T: DeserializeOwned>(
    method: &str,
    resp: Response,
) -> Result<T, SlackError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(SlackError::Status {
            method: method.to_string(),
            status: status.as_u16(),
        });
    }

    let body = resp.bytes().await.map_err(|e| transport(method, e))?;
    let decoded: ApiResponse<T> =
        serde_json::from_slice(&body).map_err(|e| SlackError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })?;

    if !decoded.ok {
        return Err(SlackError::Api {
            method: method.to_string(),
            error: decoded.error.unwrap_or_else(|| "unknown_error".to_string()),
        });
    }

    Ok(decoded.data)
}
