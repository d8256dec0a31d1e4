//! Emoji registry with one interface over two registration protocols.
//!
//! The protocol is picked once at startup; the reaction pipeline only sees
//! `dyn EmojiRegistry`.

pub mod api;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::assets::AssetStore;
use crate::config::{AppConfig, RegistryProtocol};
use crate::error::RegistryError;
use crate::media::NormalizedImage;
use crate::pipeline::name::EmojiName;

pub use api::{EmojiApi, ImageSource};

/// Registers a normalized image as a custom emoji.
#[async_trait]
pub trait EmojiRegistry: Send + Sync {
    fn protocol(&self) -> RegistryProtocol;

    async fn register(&self, name: &EmojiName, image: &NormalizedImage) -> Result<(), RegistryError>;
}

/// Publishes the image to the asset store and registers its public URL.
///
/// The asset outlives the call and is reclaimed by the store's TTL, which
/// must exceed the registry's own fetch latency.
pub struct UrlReferenceRegistry {
    api: EmojiApi,
    store: Arc<AssetStore>,
}

impl UrlReferenceRegistry {
    pub fn new(api: EmojiApi, store: Arc<AssetStore>) -> Self {
        Self { api, store }
    }
}

#[async_trait]
impl EmojiRegistry for UrlReferenceRegistry {
    fn protocol(&self) -> RegistryProtocol {
        RegistryProtocol::UrlReference
    }

    async fn register(&self, name: &EmojiName, image: &NormalizedImage) -> Result<(), RegistryError> {
        let asset = self.store.store(image.as_bytes()).await?;
        info!(emoji = %name, url = %asset.url, "Published emoji image");

        self.api
            .add(name.as_str(), ImageSource::Url(asset.url))
            .await?;
        Ok(())
    }
}

/// Uploads the PNG bytes inline.
pub struct MultipartRegistry {
    api: EmojiApi,
}

impl MultipartRegistry {
    pub fn new(api: EmojiApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EmojiRegistry for MultipartRegistry {
    fn protocol(&self) -> RegistryProtocol {
        RegistryProtocol::Multipart
    }

    async fn register(&self, name: &EmojiName, image: &NormalizedImage) -> Result<(), RegistryError> {
        self.api
            .add(name.as_str(), ImageSource::Bytes(image.as_bytes().to_vec()))
            .await?;
        Ok(())
    }
}

/// Build the registry selected by `config.registry_protocol`.
pub fn build_registry(
    config: &AppConfig,
    http: reqwest::Client,
    store: Arc<AssetStore>,
) -> Arc<dyn EmojiRegistry> {
    let api = EmojiApi::new(http, &config.slack_api_base, config.admin_token.clone());
    match config.registry_protocol {
        RegistryProtocol::UrlReference => Arc::new(UrlReferenceRegistry::new(api, store)),
        RegistryProtocol::Multipart => Arc::new(MultipartRegistry::new(api)),
    }
}
