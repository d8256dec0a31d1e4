//! Socket Mode transport — receives workspace events over a websocket.
//!
//! Opens a connection URL with the app-level token, acknowledges every
//! envelope as soon as it arrives and forwards `events_api` payloads as
//! [`EventEnvelope`]s. Reconnects after a fixed delay whenever Slack asks
//! for it or the socket drops.

use std::pin::Pin;
use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::SlackError;
use crate::events::EventEnvelope;
use crate::slack::client::{read_api, transport};
use crate::slack::types::ConnectionPayload;

/// Delay before reconnecting after an error or a `disconnect` request.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Stream of decoded events.
pub type EventStream = Pin<Box<dyn Stream<Item = EventEnvelope> + Send>>;

/// Socket Mode client.
pub struct SocketModeClient {
    http: reqwest::Client,
    api_base: String,
    app_token: SecretString,
}

impl SocketModeClient {
    pub fn new(http: reqwest::Client, api_base: &str, app_token: SecretString) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            app_token,
        }
    }

    /// Request a fresh websocket URL via `apps.connections.open`.
    pub async fn open_connection(&self) -> Result<String, SlackError> {
        open_connection(&self.http, &self.api_base, &self.app_token).await
    }

    /// Start the receive loop and return the event stream.
    ///
    /// The loop ends once the returned stream is dropped.
    pub fn start(&self) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let http = self.http.clone();
        let api_base = self.api_base.clone();
        let app_token = self.app_token.clone();

        tokio::spawn(async move {
            tracing::info!("Socket Mode listening for events...");

            while !tx.is_closed() {
                let url = match open_connection(&http, &api_base, &app_token).await {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::warn!("Socket Mode connection open failed: {e}");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        continue;
                    }
                };

                let ws = match connect_async(url.as_str()).await {
                    Ok((ws, _)) => ws,
                    Err(e) => {
                        tracing::warn!("Socket Mode websocket connect failed: {e}");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        continue;
                    }
                };
                tracing::info!("Socket Mode connected");

                let (mut sink, mut frames) = ws.split();
                while let Some(frame) = frames.next().await {
                    let text = match frame {
                        Ok(Message::Text(text)) => text,
                        Ok(Message::Ping(payload)) => {
                            if sink.send(Message::Pong(payload)).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        Ok(Message::Close(reason)) => {
                            tracing::info!(?reason, "Socket Mode closed by server");
                            break;
                        }
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::warn!("Socket Mode read error: {e}");
                            break;
                        }
                    };

                    let action = decode_frame(text.as_str());

                    if let Some(ack) = action.ack
                        && let Err(e) = sink.send(Message::Text(ack.into())).await
                    {
                        tracing::warn!("Socket Mode ack failed: {e}");
                        break;
                    }

                    if let Some(event) = action.event
                        && tx.send(event).is_err()
                    {
                        tracing::info!("Socket Mode event receiver dropped");
                        return;
                    }

                    if action.reconnect {
                        tracing::info!("Socket Mode disconnect requested, reconnecting");
                        break;
                    }
                }

                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Box::pin(stream)
    }
}

async fn open_connection(
    http: &reqwest::Client,
    api_base: &str,
    app_token: &SecretString,
) -> Result<String, SlackError> {
    let method = "apps.connections.open";
    let resp = http
        .post(format!("{api_base}/{method}"))
        .header(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", app_token.expose_secret()),
        )
        .send()
        .await
        .map_err(|e| transport(method, e))?;

    let payload: ConnectionPayload = read_api(method, resp).await?;
    payload.url.ok_or_else(|| SlackError::Decode {
        method: method.to_string(),
        reason: "response has no url".to_string(),
    })
}

// ── Frame decoding ──────────────────────────────────────────────────

/// What to do with one inbound text frame.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FrameAction {
    /// Acknowledgement to send back, if the envelope carries an id.
    pub ack: Option<String>,
    /// Event to dispatch.
    pub event: Option<EventEnvelope>,
    /// Slack asked us to reconnect.
    pub reconnect: bool,
}

#[derive(Debug, Deserialize)]
struct SocketEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

/// Decode a Socket Mode text frame.
pub fn decode_frame(text: &str) -> FrameAction {
    let envelope: SocketEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring undecodable Socket Mode frame");
            return FrameAction::default();
        }
    };

    let ack = envelope
        .envelope_id
        .as_deref()
        .map(|id| serde_json::json!({ "envelope_id": id }).to_string());

    match envelope.kind.as_str() {
        "events_api" => {
            let event = envelope
                .payload
                .as_ref()
                .and_then(|p| p.get("event"))
                .and_then(EventEnvelope::from_slack_event);
            FrameAction {
                ack,
                event,
                reconnect: false,
            }
        }
        "disconnect" => FrameAction {
            ack,
            event: None,
            reconnect: true,
        },
        "hello" => {
            tracing::debug!("Socket Mode hello received");
            FrameAction {
                ack,
                ..FrameAction::default()
            }
        }
        other => {
            tracing::debug!(kind = %other, "Ignoring Socket Mode envelope");
            FrameAction {
                ack,
                ..FrameAction::default()
            }
        }
    }
}
