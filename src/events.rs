//! Inbound workspace events routed by the dispatcher.
//!
//! The transport hands over raw Events API `event` objects; only
//! `reaction_added` on messages and `emoji_changed` are turned into
//! [`EventEnvelope`]s, everything else is dropped at the edge.

use serde::{Deserialize, Serialize};

/// A user added a reaction to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub reacting_user_id: String,
    pub reaction_name: String,
    pub target_channel_id: String,
    pub target_message_ts: String,
}

/// The workspace emoji set changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiChangedNotice {
    /// `add`, `remove` or `rename`.
    pub subtype: String,
    /// Emoji name for `add`.
    #[serde(default)]
    pub name: Option<String>,
    /// Emoji names for `remove`.
    #[serde(default)]
    pub names: Vec<String>,
    /// Image URL or `alias:` target for `add`.
    #[serde(default)]
    pub value: Option<String>,
}

impl EmojiChangedNotice {
    pub fn is_add(&self) -> bool {
        self.subtype == "add"
    }
}

/// Event handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventEnvelope {
    ReactionAdded(ReactionEvent),
    EmojiChanged(EmojiChangedNotice),
}

impl EventEnvelope {
    /// Short label used in log spans.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReactionAdded(_) => "reaction_added",
            Self::EmojiChanged(_) => "emoji_changed",
        }
    }

    /// Decode an Events API inner `event` object.
    ///
    /// Returns `None` for event types the bot does not handle, for reactions
    /// on non-message items, and for malformed payloads.
    pub fn from_slack_event(event: &serde_json::Value) -> Option<Self> {
        let decoded = match SlackEvent::deserialize(event) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring undecodable event payload");
                return None;
            }
        };

        match decoded {
            SlackEvent::ReactionAdded {
                user,
                reaction,
                item,
            } => {
                if item.kind != "message" {
                    tracing::debug!(item_type = %item.kind, "Ignoring reaction on non-message item");
                    return None;
                }
                Some(Self::ReactionAdded(ReactionEvent {
                    reacting_user_id: user,
                    reaction_name: reaction,
                    target_channel_id: item.channel?,
                    target_message_ts: item.ts?,
                }))
            }
            SlackEvent::EmojiChanged(notice) => Some(Self::EmojiChanged(notice)),
            SlackEvent::Unsupported => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum SlackEvent {
    #[serde(rename = "reaction_added")]
    ReactionAdded {
        user: String,
        reaction: String,
        item: ReactionItem,
    },
    #[serde(rename = "emoji_changed")]
    EmojiChanged(EmojiChangedNotice),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct ReactionItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}
