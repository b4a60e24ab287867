//! Map sessions: one tile source bound to a cache and a fetch pipeline.
//!
//! The compositor renders against the [`TileLayer`] trait so that a plain
//! single-source [`MapSession`] and the multi-source blender are
//! interchangeable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::cache::{TileCache, TileRead};
use crate::config::FetchConfig;
use crate::fetch::http::HttpClient;
use crate::fetch::{FetchEvent, FetchPipeline};
use crate::render::{Color, Drawable, Renderer};
use crate::source::TileSource;
use crate::tile::TileKey;

/// What the compositor needs from a tile layer.
pub trait TileLayer: Send + Sync {
    /// Current state of `key`, scheduling a fetch if the key has never
    /// been requested. Touches the entry's last-used stamp.
    fn get_or_fetch(&self, key: TileKey, now: Instant) -> TileRead;

    /// The ready image for `key` if cached, without scheduling anything.
    /// Used for child/ancestor substitution. Touches the last-used stamp.
    fn ready_in_cache(&self, key: TileKey, now: Instant) -> Option<Arc<dyn Drawable>>;

    /// Whether this layer's tiles are transparent overlays.
    fn has_alpha(&self) -> bool;

    /// Fill color for cells with nothing to draw.
    fn back_color(&self) -> Color;

    /// Placeholder drawn while a cell has no tile, children, or ancestor.
    fn refresh_image(&self) -> Option<Arc<dyn Drawable>>;
}

/// A single tile source with its in-memory cache and fetch pipeline.
pub struct MapSession {
    cache: Arc<TileCache>,
    pipeline: FetchPipeline,
    back_color: Color,
    refresh_image: Option<Arc<dyn Drawable>>,
}

impl MapSession {
    /// Bind `source` to a fresh cache. Returns the session and the stream
    /// of fetch completions; the host should redraw when events arrive.
    pub fn new(
        source: Arc<dyn TileSource>,
        http: Arc<dyn HttpClient>,
        renderer: Arc<dyn Renderer>,
        config: FetchConfig,
        runtime: tokio::runtime::Handle,
    ) -> (Self, mpsc::UnboundedReceiver<FetchEvent>) {
        let cache = Arc::new(TileCache::new());
        let (pipeline, events) = FetchPipeline::new(
            Arc::clone(&cache),
            source,
            http,
            renderer,
            config,
            runtime,
        );
        (
            Self {
                cache,
                pipeline,
                back_color: Color::GRAY,
                refresh_image: None,
            },
            events,
        )
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    pub fn source(&self) -> &Arc<dyn TileSource> {
        self.pipeline.source()
    }

    pub fn set_back_color(&mut self, color: Color) {
        self.back_color = color;
    }

    pub fn set_refresh_image(&mut self, image: Option<Arc<dyn Drawable>>) {
        self.refresh_image = image;
    }

    /// Drop tiles unused for longer than `max_idle`.
    pub fn evict_aged(&self, max_idle: Duration, now: Instant) -> usize {
        self.cache.evict_by_age(max_idle, now)
    }

    /// Drop every cached tile not at `zoom`.
    pub fn evict_other_zooms(&self, zoom: u8) -> usize {
        self.cache.evict_by_zoom(zoom)
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

impl TileLayer for MapSession {
    fn get_or_fetch(&self, key: TileKey, now: Instant) -> TileRead {
        let read = self.cache.read_for_render(key, now);
        if read.is_absent() && self.pipeline.request(key) {
            // The fetch may already have completed from disk.
            return self.cache.read_for_render(key, now);
        }
        read
    }

    fn ready_in_cache(&self, key: TileKey, now: Instant) -> Option<Arc<dyn Drawable>> {
        self.cache.read_for_render(key, now).image().cloned()
    }

    fn has_alpha(&self) -> bool {
        self.pipeline.source().has_alpha()
    }

    fn back_color(&self) -> Color {
        self.back_color
    }

    fn refresh_image(&self) -> Option<Arc<dyn Drawable>> {
        self.refresh_image.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::http::mock::MockHttpClient;
    use crate::render::raster::RasterRenderer;

    struct GridSource;

    impl TileSource for GridSource {
        fn name(&self) -> &'static str {
            "grid"
        }
        fn url_for(&self, key: TileKey) -> Option<String> {
            Some(format!("http://grid.test/{}", key.cache_file_name()))
        }
    }

    fn png_bytes() -> Vec<u8> {
        RasterRenderer::new()
            .execute(2, 2, Color::GRAY, &[])
            .unwrap()
            .encode_png()
            .unwrap()
    }

    fn session(
        http: Arc<MockHttpClient>,
    ) -> (MapSession, mpsc::UnboundedReceiver<FetchEvent>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (session, events) = MapSession::new(
            Arc::new(GridSource),
            http as Arc<dyn HttpClient>,
            Arc::new(RasterRenderer::new()),
            FetchConfig::new(dir.path().to_path_buf()),
            tokio::runtime::Handle::current(),
        );
        (session, events, dir)
    }

    #[tokio::test]
    async fn test_get_or_fetch_schedules_once() {
        let http = Arc::new(MockHttpClient::new());
        http.respond("http://grid.test/1-2-3", png_bytes());
        let (session, mut events, _dir) = session(Arc::clone(&http));

        let key = TileKey::new(1, 2, 3);
        let now = Instant::now();
        let first = session.get_or_fetch(key, now);
        assert!(!first.is_absent());

        events.recv().await.unwrap();
        assert!(session.get_or_fetch(key, now).is_ready());
        assert_eq!(http.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_ready_in_cache_never_schedules() {
        let http = Arc::new(MockHttpClient::new());
        let (session, _events, _dir) = session(Arc::clone(&http));

        assert!(session
            .ready_in_cache(TileKey::new(0, 0, 2), Instant::now())
            .is_none());
        assert!(http.requests().is_empty());
        assert!(session.cache().is_empty());
    }

    #[tokio::test]
    async fn test_layer_defaults() {
        let http = Arc::new(MockHttpClient::new());
        let (mut session, _events, _dir) = session(http);
        assert_eq!(session.back_color(), Color::GRAY);
        assert!(!session.has_alpha());
        assert!(session.refresh_image().is_none());

        session.set_back_color(Color::opaque(0, 0, 0));
        assert_eq!(session.back_color(), Color::opaque(0, 0, 0));
    }

    #[tokio::test]
    async fn test_evictions_delegate_to_cache() {
        let http = Arc::new(MockHttpClient::new());
        http.respond("http://grid.test/1-2-3", png_bytes());
        let (session, mut events, _dir) = session(http);

        session.get_or_fetch(TileKey::new(1, 2, 3), Instant::now());
        events.recv().await.unwrap();
        assert_eq!(session.cache().len(), 1);

        assert_eq!(session.evict_other_zooms(3), 0);
        assert_eq!(session.evict_other_zooms(5), 1);
        session.clear();
        assert!(session.cache().is_empty());
    }
}
