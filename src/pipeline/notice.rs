//! Announces emoji added to the workspace.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{PipelineError, Step};
use crate::events::EmojiChangedNotice;
use crate::pipeline::announcement_text;
use crate::slack::ChatPlatform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeOutcome {
    Announced { name: String },
    Ignored,
}

/// Posts an announcement for every `add` notice.
pub struct NotificationPipeline {
    chat: Arc<dyn ChatPlatform>,
    channel: String,
}

impl NotificationPipeline {
    pub fn new(chat: Arc<dyn ChatPlatform>, channel: impl Into<String>) -> Self {
        Self {
            chat,
            channel: channel.into(),
        }
    }

    pub async fn handle(&self, notice: &EmojiChangedNotice) -> Result<NoticeOutcome, PipelineError> {
        let name = match notice.name.as_deref() {
            Some(name) if notice.is_add() && !name.is_empty() => name,
            _ => {
                debug!(subtype = %notice.subtype, "Ignoring emoji change");
                return Ok(NoticeOutcome::Ignored);
            }
        };

        if let Err(source) = self
            .chat
            .post_message(&self.channel, &announcement_text(name))
            .await
        {
            warn!(emoji = %name, error = %source, "Failed to announce new emoji");
            return Err(PipelineError::NotifyFailed {
                step: Step::Announce,
                source,
            });
        }

        info!(emoji = %name, channel = %self.channel, "Announced new emoji");
        Ok(NoticeOutcome::Announced {
            name: name.to_string(),
        })
    }
}
