//! Wire calls for adding custom emoji.
//!
//! Two call shapes exist:
//! - `admin.emoji.add` takes a name and a URL the registry fetches itself.
//! - `emoji.add` with `mode=data` takes the image inline as multipart.

use reqwest::Response;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};

use crate::error::RegistrationError;
use crate::slack::types::{ApiResponse, Empty};

/// Where the registry gets the image from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Publicly fetchable URL.
    Url(String),
    /// Raw PNG bytes.
    Bytes(Vec<u8>),
}

/// Admin-scoped emoji API client.
pub struct EmojiApi {
    http: reqwest::Client,
    api_base: String,
    token: SecretString,
}

impl EmojiApi {
    pub fn new(http: reqwest::Client, api_base: &str, token: SecretString) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    /// Add an emoji named `name` from `source`.
    pub async fn add(&self, name: &str, source: ImageSource) -> Result<(), RegistrationError> {
        let bearer = format!("Bearer {}", self.token.expose_secret());

        let request = match source {
            ImageSource::Url(url) => self
                .http
                .post(self.api_url("admin.emoji.add"))
                .header(reqwest::header::AUTHORIZATION, bearer)
                .form(&[("name", name), ("url", url.as_str())]),
            ImageSource::Bytes(bytes) => {
                let part = Part::bytes(bytes)
                    .file_name(format!("{name}.png"))
                    .mime_str("image/png")
                    .map_err(|e| RegistrationError::Transport(e.to_string()))?;
                let form = Form::new()
                    .text("mode", "data")
                    .text("name", name.to_string())
                    .part("image", part);
                self.http
                    .post(self.api_url("emoji.add"))
                    .header(reqwest::header::AUTHORIZATION, bearer)
                    .multipart(form)
            }
        };

        let resp = request
            .send()
            .await
            .map_err(|e| RegistrationError::Transport(e.to_string()))?;

        read_registration(resp).await
    }
}

/// Map a registry response onto the registration taxonomy.
async fn read_registration(resp: Response) -> Result<(), RegistrationError> {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(RegistrationError::RateLimited);
    }
    if !status.is_success() {
        return Err(RegistrationError::Http(status.as_u16()));
    }

    let body = resp
        .bytes()
        .await
        .map_err(|e| RegistrationError::Transport(e.to_string()))?;
    let decoded: ApiResponse<Empty> = serde_json::from_slice(&body)
        .map_err(|e| RegistrationError::Transport(format!("invalid response body: {e}")))?;

    if decoded.ok {
        Ok(())
    } else {
        Err(RegistrationError::from_code(
            decoded.error.as_deref().unwrap_or("unknown_error"),
        ))
    }
}
