//! Two-tier tile fetch pipeline.
//!
//! A requested tile is looked for on disk first; a fresh disk copy is
//! decoded and completed without touching the network. Otherwise the tile
//! is downloaded, the raw body persisted for next time, and the decoded
//! image completed into the cache. Any failure along the way completes the
//! key as invalid, which stops re-requests until the entry is evicted.
//!
//! Work runs on the runtime's blocking pool, one task per claimed key; the
//! in-memory cache's pending guard ensures a key is never fetched twice
//! concurrently. Every completion also emits a [`FetchEvent`] so the host
//! knows a redraw is worthwhile.

pub mod http;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::{TileCache, TileRead};
use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::render::{Drawable, Renderer};
use crate::source::TileSource;
use crate::tile::TileKey;

use http::HttpClient;

/// How a fetch ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Ready,
    Invalid,
}

/// Notification that a fetch completed and the cache was updated.
#[derive(Clone, Copy, Debug)]
pub struct FetchEvent {
    pub key: TileKey,
    pub outcome: FetchOutcome,
}

/// Disk-then-network tile fetcher for one source.
pub struct FetchPipeline {
    cache: Arc<TileCache>,
    source: Arc<dyn TileSource>,
    http: Arc<dyn HttpClient>,
    renderer: Arc<dyn Renderer>,
    config: FetchConfig,
    runtime: tokio::runtime::Handle,
    events: mpsc::UnboundedSender<FetchEvent>,
}

impl FetchPipeline {
    /// Build a pipeline and the event stream it completes into.
    pub fn new(
        cache: Arc<TileCache>,
        source: Arc<dyn TileSource>,
        http: Arc<dyn HttpClient>,
        renderer: Arc<dyn Renderer>,
        config: FetchConfig,
        runtime: tokio::runtime::Handle,
    ) -> (Self, mpsc::UnboundedReceiver<FetchEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                cache,
                source,
                http,
                renderer,
                config,
                runtime,
                events,
            },
            receiver,
        )
    }

    pub fn source(&self) -> &Arc<dyn TileSource> {
        &self.source
    }

    /// Request a fetch for `key`. Returns `true` if a worker was started;
    /// `false` if the key is out of the grid, already in flight, already
    /// ready, or marked invalid.
    pub fn request(&self, key: TileKey) -> bool {
        if !key.is_valid() {
            return false;
        }
        // Invalid is terminal until evicted.
        if matches!(self.cache.get(key), TileRead::Invalid) {
            return false;
        }
        if !self.cache.mark_pending(key) {
            return false;
        }

        let cache = Arc::clone(&self.cache);
        let source = Arc::clone(&self.source);
        let http = Arc::clone(&self.http);
        let renderer = Arc::clone(&self.renderer);
        let config = self.config.clone();
        let events = self.events.clone();
        self.runtime.spawn_blocking(move || {
            let result = fetch_tile(key, &*source, &*http, &*renderer, &config);
            let outcome = match &result {
                Ok(_) => FetchOutcome::Ready,
                Err(FetchError::Unaddressable) => {
                    debug!(%key, source = source.name(), "source has no url for key");
                    FetchOutcome::Invalid
                }
                Err(err) => {
                    warn!(%key, source = source.name(), %err, "tile fetch failed");
                    FetchOutcome::Invalid
                }
            };
            cache.complete(key, result.ok(), Instant::now());
            // The host may have dropped the receiver during shutdown.
            let _ = events.send(FetchEvent { key, outcome });
        });
        true
    }
}

/// The blocking part of a fetch: disk tier, then network tier.
fn fetch_tile(
    key: TileKey,
    source: &dyn TileSource,
    http: &dyn HttpClient,
    renderer: &dyn Renderer,
    config: &FetchConfig,
) -> Result<Arc<dyn Drawable>, FetchError> {
    let dir = config.cache_dir.join(source.name());
    let path = dir.join(key.cache_file_name());

    if let Some(image) = read_disk_tile(&path, renderer, config) {
        debug!(%key, source = source.name(), "tile served from disk");
        return Ok(image);
    }

    let url = source.url_for(key).ok_or(FetchError::Unaddressable)?;
    let bytes = http.get(&url)?;

    // Persist the raw body before decoding; a failure to write is not a
    // failure to fetch.
    if let Err(err) = fs::create_dir_all(&dir).and_then(|_| fs::write(&path, &bytes)) {
        warn!(%key, %err, "could not persist tile to disk cache");
    }

    match renderer.decode(&bytes) {
        Ok(image) => Ok(image),
        Err(err) => {
            let _ = fs::remove_file(&path);
            Err(err.into())
        }
    }
}

/// Decode the disk-cached tile at `path` if it exists and is fresh.
///
/// Stale and unreadable files are deleted so the network tier replaces
/// them.
fn read_disk_tile(
    path: &PathBuf,
    renderer: &dyn Renderer,
    config: &FetchConfig,
) -> Option<Arc<dyn Drawable>> {
    let metadata = fs::metadata(path).ok()?;
    let stale = metadata
        .modified()
        .ok()
        .and_then(|mtime| mtime.elapsed().ok())
        .map_or(true, |age| age > config.disk_ttl);
    if stale {
        let _ = fs::remove_file(path);
        return None;
    }

    let result: Result<Arc<dyn Drawable>, FetchError> = fs::read(path)
        .map_err(FetchError::from)
        .and_then(|bytes| renderer.decode(&bytes).map_err(FetchError::from));
    match result {
        Ok(image) => Some(image),
        Err(err) => {
            warn!(path = %path.display(), %err, "dropping unreadable disk tile");
            let _ = fs::remove_file(path);
            None
        }
    }
}
