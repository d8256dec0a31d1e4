//! Event pipelines.
//!
//! - `ReactionPipeline` turns a trigger reaction on an image message into a
//!   registered custom emoji and confirms it in the channel.
//! - `NotificationPipeline` announces emoji added by anyone else.
//! - `Dispatcher` runs each event on its own task.
//!
//! Invocations share no mutable state and have no ordering guarantee.

pub mod dispatch;
pub mod name;
pub mod notice;
pub mod reaction;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatch::Dispatcher;
pub use name::EmojiName;
pub use notice::{NoticeOutcome, NotificationPipeline};
pub use reaction::{IgnoreReason, ReactionOutcome, ReactionPipeline};

/// Reaction that turns an image message into an emoji.
pub const TRIGGER_REACTION: &str = "done";

/// Message posted whenever a new emoji appears.
pub fn announcement_text(name: &str) -> String {
    format!("New emoji :{name}: `{name}` has been added!")
}
