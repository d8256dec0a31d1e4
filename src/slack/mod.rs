//! Slack integration: Web API client, wire types and the Socket Mode
//! event transport.

pub mod client;
pub mod socket_mode;
pub mod types;

pub use client::{ChatPlatform, SlackClient};
pub use socket_mode::SocketModeClient;
pub use types::{Attachment, SourceMessage};
