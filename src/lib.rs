//! Emoji Bot: turns reacted image messages into custom workspace emoji.

pub mod assets;
pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod pipeline;
pub mod registry;
pub mod slack;
