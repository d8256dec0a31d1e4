//! Recording stubs for pipeline tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::RegistryProtocol;
use crate::error::{AssetError, RegistrationError, RegistryError, SlackError};
use crate::media::NormalizedImage;
use crate::pipeline::name::EmojiName;
use crate::registry::EmojiRegistry;
use crate::slack::{ChatPlatform, SourceMessage};

/// Chat platform returning canned history and file bytes.
pub struct StubChat {
    message: Option<SourceMessage>,
    file: Vec<u8>,
    fail_history: bool,
    post_error: Mutex<Option<SlackError>>,
    calls: Mutex<usize>,
    posts: Mutex<Vec<(String, String)>>,
}

impl StubChat {
    pub fn with_message(message: Option<SourceMessage>, file: Vec<u8>) -> Self {
        Self {
            message,
            file,
            fail_history: false,
            post_error: Mutex::new(None),
            calls: Mutex::new(0),
            posts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_history() -> Self {
        Self {
            fail_history: true,
            ..Self::with_message(None, Vec::new())
        }
    }

    /// Fail the next post with `err`.
    pub fn with_post_error(self, err: SlackError) -> Self {
        *self.post_error.lock().unwrap() = Some(err);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().unwrap().clone()
    }

    fn record(&self) {
        *self.calls.lock().unwrap() += 1;
    }
}

#[async_trait]
impl ChatPlatform for StubChat {
    async fn latest_message(
        &self,
        _channel: &str,
        _ts: &str,
    ) -> Result<Option<SourceMessage>, SlackError> {
        self.record();
        if self.fail_history {
            return Err(SlackError::Api {
                method: "conversations.history".into(),
                error: "channel_not_found".into(),
            });
        }
        Ok(self.message.clone())
    }

    async fn download_file(&self, _url: &str) -> Result<Vec<u8>, SlackError> {
        self.record();
        Ok(self.file.clone())
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        self.record();
        if let Some(err) = self.post_error.lock().unwrap().take() {
            return Err(err);
        }
        self.posts
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }
}

enum RegistryMode {
    Accept,
    Reject(RegistrationError),
    RejectDuplicates,
    FailPublish(Mutex<Option<AssetError>>),
}

/// Registry that records `(name, png bytes)` for every accepted call.
pub struct StubRegistry {
    mode: RegistryMode,
    delay: Duration,
    seen: Mutex<HashSet<String>>,
    registered: Mutex<Vec<(String, Vec<u8>)>>,
}

impl StubRegistry {
    fn new(mode: RegistryMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
            seen: Mutex::new(HashSet::new()),
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> Self {
        Self::new(RegistryMode::Accept)
    }

    pub fn rejecting(reason: RegistrationError) -> Self {
        Self::new(RegistryMode::Reject(reason))
    }

    pub fn rejecting_duplicates() -> Self {
        Self::new(RegistryMode::RejectDuplicates)
    }

    pub fn failing_publish(err: AssetError) -> Self {
        Self::new(RegistryMode::FailPublish(Mutex::new(Some(err))))
    }

    /// Take `delay` to answer every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn registered(&self) -> Vec<(String, Vec<u8>)> {
        self.registered.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmojiRegistry for StubRegistry {
    fn protocol(&self) -> RegistryProtocol {
        RegistryProtocol::UrlReference
    }

    async fn register(&self, name: &EmojiName, image: &NormalizedImage) -> Result<(), RegistryError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.mode {
            RegistryMode::Accept => {}
            RegistryMode::Reject(reason) => return Err(reason.clone().into()),
            RegistryMode::RejectDuplicates => {
                if !self.seen.lock().unwrap().insert(name.to_string()) {
                    return Err(RegistrationError::NameTaken.into());
                }
            }
            RegistryMode::FailPublish(err) => {
                if let Some(err) = err.lock().unwrap().take() {
                    return Err(err.into());
                }
            }
        }
        self.registered
            .lock()
            .unwrap()
            .push((name.to_string(), image.as_bytes().to_vec()));
        Ok(())
    }
}
