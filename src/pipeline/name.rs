//! Emoji name derivation and validation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::slack::Attachment;

/// Longest name the registry accepts.
pub const MAX_EMOJI_NAME_LEN: usize = 100;

static EMOJI_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_+'\-]+$").unwrap());

/// Remove every whitespace character. Applying it twice is a no-op.
pub fn derive_emoji_name(base_name: &str) -> String {
    base_name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Validated custom emoji identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmojiName(String);

impl EmojiName {
    /// Validate an already-derived name.
    pub fn parse(name: &str) -> Result<Self, String> {
        if name.is_empty() {
            return Err(name.to_string());
        }
        if name.len() > MAX_EMOJI_NAME_LEN || !EMOJI_NAME_RE.is_match(name) {
            return Err(name.to_string());
        }
        Ok(Self(name.to_string()))
    }

    /// Derive from an attachment's display name minus its extension.
    ///
    /// On failure returns the rejected candidate.
    pub fn from_attachment(attachment: &Attachment) -> Result<Self, String> {
        Self::parse(&derive_emoji_name(attachment.base_name()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmojiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
