//! Ephemeral asset store.
//!
//! Writes PNGs under unguessable names into a shared directory and deletes
//! each one exactly once, `ttl` after creation, whether or not it was ever
//! fetched. Deadlines live in a min-heap owned by a single reaper task; the
//! task stops when the store is dropped and outstanding files are abandoned.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::AssetError;

/// Extension of every stored asset.
const ASSET_EXTENSION: &str = ".png";

/// Random bytes per asset name (128 bits).
const NAME_ENTROPY_BYTES: usize = 16;

/// Deadline used when `ttl` overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// A stored asset and where it can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralAsset {
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

enum ReaperCommand {
    Schedule { deadline: Instant, path: PathBuf },
    Flush(oneshot::Sender<usize>),
}

/// Directory-backed store with time-bounded deletion.
pub struct AssetStore {
    dir: PathBuf,
    base_url: String,
    ttl: Duration,
    reaper_tx: mpsc::UnboundedSender<ReaperCommand>,
    reaper: JoinHandle<()>,
}

impl AssetStore {
    /// Create the directory if needed and start the reaper.
    pub async fn open(
        dir: impl Into<PathBuf>,
        base_url: &str,
        ttl: Duration,
    ) -> Result<Arc<Self>, AssetError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| AssetError::Directory {
                path: dir.display().to_string(),
                source,
            })?;

        let (reaper_tx, reaper_rx) = mpsc::unbounded_channel();
        let reaper = tokio::spawn(run_reaper(reaper_rx));

        info!(dir = %dir.display(), ttl_secs = ttl.as_secs(), "Asset store ready");

        Ok(Arc::new(Self {
            dir,
            base_url: base_url.trim_end_matches('/').to_string(),
            ttl,
            reaper_tx,
            reaper,
        }))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Public URL for an asset name.
    pub fn url_for(&self, name: &str) -> String {
        format!("{}/images/{name}", self.base_url)
    }

    /// On-disk path of an asset, or `None` if `name` could not have been
    /// produced by this store.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        is_asset_name(name).then(|| self.dir.join(name))
    }

    /// Write `bytes` under a fresh name and schedule its deletion.
    pub async fn store(&self, bytes: &[u8]) -> Result<EphemeralAsset, AssetError> {
        let name = generate_asset_name();
        let path = self.dir.join(&name);

        let write_err = |source| AssetError::Write {
            name: name.clone(),
            source,
        };
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(write_err)?;
        write_or_discard(&mut file, &path, bytes)
            .await
            .map_err(write_err)?;
        drop(file);

        let created_at = Utc::now();
        let now = Instant::now();
        let deadline = now.checked_add(self.ttl).unwrap_or(now + FAR_FUTURE);
        if self
            .reaper_tx
            .send(ReaperCommand::Schedule {
                deadline,
                path: path.clone(),
            })
            .is_err()
        {
            remove_asset(&path).await;
            return Err(AssetError::ReaperStopped);
        }

        let expires_at = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let url = self.url_for(&name);
        debug!(name = %name, bytes = bytes.len(), "Stored ephemeral asset");

        Ok(EphemeralAsset {
            name,
            url,
            created_at,
            expires_at,
        })
    }

    /// Delete every outstanding asset now. Returns how many were removed.
    pub async fn flush(&self) -> Result<usize, AssetError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.reaper_tx
            .send(ReaperCommand::Flush(reply_tx))
            .map_err(|_| AssetError::ReaperStopped)?;
        reply_rx.await.map_err(|_| AssetError::ReaperStopped)
    }

    /// Remove asset files older than the TTL, e.g. left over from a previous
    /// process. Returns how many were removed.
    pub async fn sweep_stale(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Cannot read asset directory");
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !is_asset_name(name) {
                continue;
            }

            let age = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok());
            if age.is_some_and(|age| age >= self.ttl) && remove_asset(&entry.path()).await {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(count = removed, "Swept stale assets");
        }
        removed
    }
}

impl Drop for AssetStore {
    fn drop(&mut self) {
        self.reaper.abort();
    }
}

/// 128 random bits from the OS RNG, hex encoded, plus the PNG extension.
pub fn generate_asset_name() -> String {
    let mut bytes = [0u8; NAME_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{}{ASSET_EXTENSION}", hex::encode(bytes))
}

/// Write `bytes` through `writer`. On failure the partial file at `path` is
/// removed so no truncated asset stays servable.
async fn write_or_discard<W>(writer: &mut W, path: &Path, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let result = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    }
    .await;
    if result.is_err() {
        remove_asset(path).await;
    }
    result
}

/// Whether `name` has the exact shape produced by [`generate_asset_name`].
pub fn is_asset_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(ASSET_EXTENSION) else {
        return false;
    };
    stem.len() == NAME_ENTROPY_BYTES * 2
        && stem
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

// ── Reaper ──────────────────────────────────────────────────────────

async fn run_reaper(mut rx: mpsc::UnboundedReceiver<ReaperCommand>) {
    let mut pending: BinaryHeap<Reverse<(Instant, PathBuf)>> = BinaryHeap::new();

    loop {
        let next_deadline = pending.peek().map(|Reverse((at, _))| *at);

        tokio::select! {
            command = rx.recv() => match command {
                Some(ReaperCommand::Schedule { deadline, path }) => {
                    pending.push(Reverse((deadline, path)));
                }
                Some(ReaperCommand::Flush(reply)) => {
                    let mut removed = 0;
                    while let Some(Reverse((_, path))) = pending.pop() {
                        if remove_asset(&path).await {
                            removed += 1;
                        }
                    }
                    let _ = reply.send(removed);
                }
                None => {
                    debug!(outstanding = pending.len(), "Asset store dropped, abandoning outstanding assets");
                    return;
                }
            },
            _ = sleep_until(next_deadline) => {
                let now = Instant::now();
                while pending.peek().is_some_and(|Reverse((at, _))| *at <= now) {
                    if let Some(Reverse((_, path))) = pending.pop() {
                        remove_asset(&path).await;
                    }
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Best-effort delete. An already-missing file is not a failure.
async fn remove_asset(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Deleted expired asset");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Asset already gone");
            false
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to delete asset");
            false
        }
    }
}
