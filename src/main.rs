use std::sync::Arc;

use anyhow::Context;

use emoji_bot::assets::{AssetStore, asset_routes};
use emoji_bot::config::AppConfig;
use emoji_bot::pipeline::{Dispatcher, NotificationPipeline, ReactionPipeline};
use emoji_bot::registry::build_registry;
use emoji_bot::slack::{ChatPlatform, SlackClient, SocketModeClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        tracing::warn!("Failed to load .env: {e}");
    }

    let config = AppConfig::from_env().context("Invalid configuration")?;

    eprintln!("🎉 Emoji Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Registry: {:?}", config.registry_protocol);
    eprintln!("   Assets: {}/images/ (ttl {:?})", config.base_url, config.asset_ttl);
    eprintln!("   Asset server: http://0.0.0.0:{}", config.asset_port);
    eprintln!("   Announcements: {}\n", config.announce_channel);

    // ── Asset store + server ─────────────────────────────────────────────
    let store = AssetStore::open(config.asset_dir.clone(), &config.base_url, config.asset_ttl)
        .await
        .with_context(|| format!("Failed to open asset dir {}", config.asset_dir.display()))?;
    let swept = store.sweep_stale().await;
    if swept > 0 {
        tracing::info!(count = swept, "Removed stale assets from previous run");
    }

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.asset_port))
        .await
        .with_context(|| format!("Failed to bind asset server port {}", config.asset_port))?;
    let app = asset_routes(Arc::clone(&store));
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Asset server stopped: {e}");
        }
    });
    tracing::info!(port = config.asset_port, "Asset server started");

    // ── Slack + pipelines ────────────────────────────────────────────────
    let http = reqwest::Client::new();
    let chat: Arc<dyn ChatPlatform> = Arc::new(SlackClient::new(
        http.clone(),
        &config.slack_api_base,
        config.slack_token.clone(),
    ));
    let registry = build_registry(&config, http.clone(), Arc::clone(&store));

    let dispatcher = Dispatcher::new(
        Arc::new(ReactionPipeline::new(
            Arc::clone(&chat),
            registry,
            config.admin_user_id.clone(),
        )),
        Arc::new(NotificationPipeline::new(
            Arc::clone(&chat),
            config.announce_channel.clone(),
        )),
    );

    let socket = SocketModeClient::new(http, &config.slack_api_base, config.slack_app_token.clone());
    let events = socket.start();

    tokio::select! {
        count = dispatcher.run(events) => {
            tracing::warn!(events = count, "Event stream ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
    }

    // In-flight registrations may still need their published asset.
    let aborted = dispatcher.shutdown(config.asset_ttl).await;
    if aborted > 0 {
        tracing::warn!(count = aborted, "Aborted handlers still running at shutdown");
    }

    match store.flush().await {
        Ok(n) => tracing::info!(count = n, "Flushed outstanding assets"),
        Err(e) => tracing::warn!("Asset flush failed: {e}"),
    }

    Ok(())
}
