//! Reaction pipeline — trigger reaction on an image message → custom emoji.
//!
//! Flow (every step is a hard gate, nothing is rolled back):
//! 1. Authorization: trigger reaction and configured admin
//! 2. Source resolution: newest message at-or-before the reacted timestamp
//! 3. Download first attachment, sniff format from content
//! 4. Normalize to a 128×128 PNG
//! 5. Derive and validate the emoji name
//! 6. Publish + register through the configured registry
//! 7. Confirm in the originating channel

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{ImageError, PipelineError, RegistryError, Step};
use crate::events::ReactionEvent;
use crate::media::{self, NormalizedImage, SourceFormat};
use crate::pipeline::name::EmojiName;
use crate::pipeline::{TRIGGER_REACTION, announcement_text};
use crate::registry::EmojiRegistry;
use crate::slack::ChatPlatform;

/// Why an event was accepted without doing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotTrigger,
    NoMessage,
    NoAttachment,
}

/// Result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    Ignored(IgnoreReason),
    Registered { name: EmojiName },
}

/// Converts reacted image attachments into custom emoji.
pub struct ReactionPipeline {
    chat: Arc<dyn ChatPlatform>,
    registry: Arc<dyn EmojiRegistry>,
    admin_user_id: String,
}

impl ReactionPipeline {
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        registry: Arc<dyn EmojiRegistry>,
        admin_user_id: impl Into<String>,
    ) -> Self {
        Self {
            chat,
            registry,
            admin_user_id: admin_user_id.into(),
        }
    }

    /// Handle one reaction event.
    pub async fn handle(&self, event: &ReactionEvent) -> Result<ReactionOutcome, PipelineError> {
        // Step 1: authorization
        if event.reaction_name != TRIGGER_REACTION {
            debug!(reaction = %event.reaction_name, "Not the trigger reaction");
            return Ok(ReactionOutcome::Ignored(IgnoreReason::NotTrigger));
        }
        if self.admin_user_id.trim().is_empty() {
            return Err(PipelineError::AdminNotConfigured {
                step: Step::Authorize,
            });
        }

        info!(
            channel = %event.target_channel_id,
            ts = %event.target_message_ts,
            user = %event.reacting_user_id,
            protocol = ?self.registry.protocol(),
            "Processing emoji reaction"
        );

        // Step 2: source resolution
        let message = self
            .chat
            .latest_message(&event.target_channel_id, &event.target_message_ts)
            .await
            .map_err(|source| fail(PipelineError::FetchFailed {
                step: Step::History,
                source,
            }))?;

        let Some(message) = message else {
            info!("No message found for reaction");
            return Ok(ReactionOutcome::Ignored(IgnoreReason::NoMessage));
        };
        let Some(attachment) = message.attachments.into_iter().next() else {
            info!(ts = %message.timestamp, "Reacted message has no attachment");
            return Ok(ReactionOutcome::Ignored(IgnoreReason::NoAttachment));
        };

        // Step 3: asset retrieval
        let bytes = self
            .chat
            .download_file(&attachment.private_download_url)
            .await
            .map_err(|source| fail(PipelineError::FetchFailed {
                step: Step::Download,
                source,
            }))?;

        let format = media::sniff_format(&bytes).map_err(|e| {
            let format = match e {
                ImageError::UnsupportedFormat(mime) => mime,
                other => other.to_string(),
            };
            fail(PipelineError::UnsupportedFormat {
                step: Step::Download,
                format,
            })
        })?;
        debug!(format = %format, bytes = bytes.len(), "Detected attachment format");

        // Step 4: normalization
        let image = normalize_off_thread(bytes, format)
            .await
            .map_err(|source| fail(PipelineError::EncodeDecodeFailed {
                step: Step::Normalize,
                source,
            }))?;

        // Step 5: name derivation
        let name = EmojiName::from_attachment(&attachment).map_err(|name| {
            fail(PipelineError::InvalidName {
                step: Step::Name,
                name,
            })
        })?;

        // Step 6: publish + register
        self.registry
            .register(&name, &image)
            .await
            .map_err(|e| {
                fail(match e {
                    RegistryError::Publish(source) => PipelineError::PublishFailed {
                        step: Step::Publish,
                        source,
                    },
                    RegistryError::Rejected(reason) => PipelineError::RegistrationFailed {
                        step: Step::Register,
                        name: name.to_string(),
                        reason,
                    },
                })
            })?;
        info!(emoji = %name, "Registered custom emoji");

        // Step 7: confirmation (registration stands even if this fails)
        self.chat
            .post_message(&event.target_channel_id, &announcement_text(name.as_str()))
            .await
            .map_err(|source| fail(PipelineError::NotifyFailed {
                step: Step::Confirm,
                source,
            }))?;

        Ok(ReactionOutcome::Registered { name })
    }
}

/// Decode/resize/encode on the blocking pool.
async fn normalize_off_thread(
    bytes: Vec<u8>,
    format: SourceFormat,
) -> Result<NormalizedImage, ImageError> {
    tokio::task::spawn_blocking(move || media::normalize(&bytes, format))
        .await
        .map_err(|e| ImageError::Encode(format!("normalizer task failed: {e}")))?
}

fn fail(err: PipelineError) -> PipelineError {
    warn!(step = %err.step(), error = %err, "Reaction pipeline step failed");
    err
}
