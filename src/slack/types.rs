//! Slack Web API wire types and the domain types built from them.

use serde::Deserialize;

/// Common Web API response shape: `{ "ok": bool, "error"?: string, ... }`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

/// Response body with no payload beyond `ok`/`error`.
#[derive(Debug, Default, Deserialize)]
pub struct Empty {}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryPayload {
    #[serde(default)]
    pub messages: Vec<MessageWire>,
}

#[derive(Debug, Deserialize)]
pub struct MessageWire {
    pub ts: String,
    #[serde(default)]
    pub files: Vec<FileWire>,
}

#[derive(Debug, Deserialize)]
pub struct FileWire {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub filetype: String,
    #[serde(default)]
    pub url_private_download: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectionPayload {
    #[serde(default)]
    pub url: Option<String>,
}

/// Message fetched from channel history. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMessage {
    pub channel_id: String,
    pub timestamp: String,
    pub attachments: Vec<Attachment>,
}

/// File attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub display_name: String,
    /// Slack's `filetype`, e.g. `png`, `jpg`. Untrusted.
    pub file_extension: String,
    pub private_download_url: String,
}

impl Attachment {
    /// Display name without its file extension.
    ///
    /// Strips `.<file_extension>` when the name ends with it; otherwise falls
    /// back to dropping the last dotted suffix, keeping dotfiles intact.
    pub fn base_name(&self) -> &str {
        let name = self.display_name.as_str();
        if !self.file_extension.is_empty() {
            let suffix_len = self.file_extension.len() + 1;
            if name.len() > suffix_len && name.is_char_boundary(name.len() - suffix_len) {
                let (stem, suffix) = name.split_at(name.len() - suffix_len);
                if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(&self.file_extension) {
                    return stem;
                }
            }
        }
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }
}

impl MessageWire {
    /// Convert into a [`SourceMessage`], dropping files without a download URL.
    pub fn into_source(self, channel_id: &str) -> SourceMessage {
        let attachments = self
            .files
            .into_iter()
            .filter_map(|f| {
                let url = f.url_private_download.filter(|u| !u.is_empty())?;
                Some(Attachment {
                    display_name: f.name,
                    file_extension: f.filetype,
                    private_download_url: url,
                })
            })
            .collect();

        SourceMessage {
            channel_id: channel_id.to_string(),
            timestamp: self.ts,
            attachments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, ext: &str) -> Attachment {
        Attachment {
            display_name: name.into(),
            file_extension: ext.into(),
            private_download_url: "https://files.slack.com/x".into(),
        }
    }

    #[test]
    fn base_name_strips_declared_extension() {
        assert_eq!(attachment("party cat.png", "png").base_name(), "party cat");
        assert_eq!(attachment("Shout.PNG", "png").base_name(), "Shout");
        assert_eq!(attachment("v1.2.gif", "gif").base_name(), "v1.2");
    }

    #[test]
    fn base_name_falls_back_to_last_suffix() {
        assert_eq!(attachment("photo.jpeg", "jpg").base_name(), "photo");
        assert_eq!(attachment("noext", "png").base_name(), "noext");
        assert_eq!(attachment(".hidden", "").base_name(), ".hidden");
    }

    #[test]
    fn history_payload_decodes_files() {
        let body = r#"{
            "ok": true,
            "messages": [{
                "type": "message",
                "ts": "1700000000.000100",
                "files": [
                    {"name": "party cat.png", "filetype": "png", "url_private_download": "https://files.slack.com/a"},
                    {"name": "gone.png", "filetype": "png"}
                ]
            }],
            "has_more": false
        }"#;
        let resp: ApiResponse<HistoryPayload> = serde_json::from_str(body).unwrap();
        assert!(resp.ok);

        let msg = resp.data.messages.into_iter().next().unwrap().into_source("C1");
        assert_eq!(msg.channel_id, "C1");
        assert_eq!(msg.timestamp, "1700000000.000100");
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.attachments[0].display_name, "party cat.png");
    }

    #[test]
    fn error_response_decodes_without_payload() {
        let resp: ApiResponse<HistoryPayload> =
            serde_json::from_str(r#"{"ok": false, "error": "channel_not_found"}"#).unwrap();
        assert!(!resp.ok);
        assert_eq!(resp.error.as_deref(), Some("channel_not_found"));
        assert!(resp.data.messages.is_empty());
    }
}
