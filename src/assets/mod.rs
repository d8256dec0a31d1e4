//! Ephemeral asset storage and the HTTP server that exposes it.

pub mod server;
pub mod store;

pub use server::asset_routes;
pub use store::{AssetStore, EphemeralAsset};
