//! Tile cache with an explicit per-entry lifecycle.
//!
//! Every key is in exactly one state at a time:
//!
//! - `Absent`: not present, never fetched (or evicted since).
//! - `Pending`: a fetch is in flight; at most one per key, enforced by
//!   [`TileCache::mark_pending`].
//! - `Invalid`: the fetch failed or the tile is unreachable; terminal
//!   until the entry is evicted.
//! - `Ready`: decoded image available, with a monotonic last-used stamp
//!   touched by render-path reads.
//!
//! The store is mutated from the render thread (eviction, clears) and from
//! fetch workers (completions), so all access goes through one
//! `parking_lot::Mutex`. Completions apply unconditionally: last writer
//! wins, which resolves the race between a slow disk read and an eviction
//! of the same key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::render::Drawable;
use crate::tile::TileKey;

enum TileState {
    Pending,
    Invalid,
    Ready {
        image: Arc<dyn Drawable>,
        last_used: Instant,
    },
}

/// Snapshot of a cache entry's state, as seen by a caller.
#[derive(Clone)]
pub enum TileRead {
    /// No entry for the key.
    Absent,
    /// A fetch is in flight.
    Pending,
    /// The last fetch failed; no retry until the entry is evicted.
    Invalid,
    /// Decoded image available.
    Ready(Arc<dyn Drawable>),
}

impl TileRead {
    pub fn is_ready(&self) -> bool {
        matches!(self, TileRead::Ready(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, TileRead::Absent)
    }

    /// The image if ready, `None` otherwise.
    pub fn image(&self) -> Option<&Arc<dyn Drawable>> {
        match self {
            TileRead::Ready(image) => Some(image),
            _ => None,
        }
    }
}

impl std::fmt::Debug for TileRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileRead::Absent => write!(f, "Absent"),
            TileRead::Pending => write!(f, "Pending"),
            TileRead::Invalid => write!(f, "Invalid"),
            TileRead::Ready(image) => {
                write!(f, "Ready({}x{})", image.width(), image.height())
            }
        }
    }
}

/// Key-to-entry tile store shared between the render thread and fetch
/// workers.
#[derive(Default)]
pub struct TileCache {
    entries: Mutex<HashMap<TileKey, TileState>>,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existence check: current state without touching the last-used stamp.
    pub fn get(&self, key: TileKey) -> TileRead {
        let entries = self.entries.lock();
        match entries.get(&key) {
            None => TileRead::Absent,
            Some(TileState::Pending) => TileRead::Pending,
            Some(TileState::Invalid) => TileRead::Invalid,
            Some(TileState::Ready { image, .. }) => TileRead::Ready(Arc::clone(image)),
        }
    }

    /// Render-path read: like [`get`](Self::get) but stamps `now` on a
    /// ready entry so age-based eviction sees it as recently used.
    pub fn read_for_render(&self, key: TileKey, now: Instant) -> TileRead {
        let mut entries = self.entries.lock();
        match entries.get_mut(&key) {
            None => TileRead::Absent,
            Some(TileState::Pending) => TileRead::Pending,
            Some(TileState::Invalid) => TileRead::Invalid,
            Some(TileState::Ready { image, last_used }) => {
                *last_used = now;
                TileRead::Ready(Arc::clone(image))
            }
        }
    }

    /// Claim the key for a fetch. Returns `false` without touching the
    /// entry if a fetch is already in flight or the tile is already ready;
    /// this is the single-outstanding-fetch-per-key guard.
    pub fn mark_pending(&self, key: TileKey) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(&key) {
            Some(TileState::Pending) | Some(TileState::Ready { .. }) => false,
            _ => {
                entries.insert(key, TileState::Pending);
                true
            }
        }
    }

    /// Record the outcome of a fetch: `Some` image moves the entry to
    /// `Ready`, `None` to `Invalid`.
    ///
    /// Applies even if the entry is no longer `Pending` (stale or duplicate
    /// completion): last writer wins, and any image replaced here is
    /// released.
    pub fn complete(&self, key: TileKey, image: Option<Arc<dyn Drawable>>, now: Instant) {
        let state = match image {
            Some(image) => TileState::Ready {
                image,
                last_used: now,
            },
            None => TileState::Invalid,
        };
        self.entries.lock().insert(key, state);
    }

    /// Force-set a ready image for the key, replacing whatever was there.
    ///
    /// Used by the multi-source blender, which produces composites itself
    /// rather than going through the fetch pipeline.
    pub fn put_ready(&self, key: TileKey, image: Arc<dyn Drawable>, now: Instant) {
        self.entries.lock().insert(
            key,
            TileState::Ready {
                image,
                last_used: now,
            },
        );
    }

    /// Remove one entry, releasing its image. Returns whether it existed.
    pub fn remove(&self, key: TileKey) -> bool {
        self.entries.lock().remove(&key).is_some()
    }

    /// Remove every ready entry not used for longer than `max_idle` as of
    /// `now`. Returns the number of entries removed.
    pub fn evict_by_age(&self, max_idle: Duration, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, state| match state {
            TileState::Ready { last_used, .. } => {
                now.saturating_duration_since(*last_used) <= max_idle
            }
            _ => true,
        });
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "evicted idle tiles");
        }
        removed
    }

    /// Remove every entry whose key is not at `keep_zoom`. Returns the
    /// number of entries removed.
    pub fn evict_by_zoom(&self, keep_zoom: u8) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| key.zoom == keep_zoom);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, keep_zoom, "evicted off-zoom tiles");
        }
        removed
    }

    /// Release every image and empty the cache.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Drawable that counts live instances, for release assertions.
    struct CountedImage {
        live: Arc<AtomicUsize>,
    }

    impl CountedImage {
        fn new(live: &Arc<AtomicUsize>) -> Arc<dyn Drawable> {
            live.fetch_add(1, Ordering::SeqCst);
            Arc::new(CountedImage {
                live: Arc::clone(live),
            })
        }
    }

    impl Drop for CountedImage {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl Drawable for CountedImage {
        fn width(&self) -> u32 {
            256
        }
        fn height(&self) -> u32 {
            256
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn key(x: i32, y: i32) -> TileKey {
        TileKey::new(x, y, 10)
    }

    #[test]
    fn test_absent_by_default() {
        let cache = TileCache::new();
        assert!(cache.get(key(1, 1)).is_absent());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_mark_pending_claims_once() {
        let cache = TileCache::new();
        assert!(cache.mark_pending(key(1, 1)));
        assert!(!cache.mark_pending(key(1, 1)));
        assert!(matches!(cache.get(key(1, 1)), TileRead::Pending));
    }

    #[test]
    fn test_mark_pending_rejected_when_ready() {
        let cache = TileCache::new();
        let live = Arc::new(AtomicUsize::new(0));
        let now = Instant::now();
        assert!(cache.mark_pending(key(1, 1)));
        cache.complete(key(1, 1), Some(CountedImage::new(&live)), now);
        assert!(!cache.mark_pending(key(1, 1)));
        assert!(cache.get(key(1, 1)).is_ready());
    }

    #[test]
    fn test_mark_pending_allowed_on_invalid() {
        // Invalid entries are terminal until evicted, but eviction brings
        // the key back to Absent, and a later mark_pending on a still-
        // Invalid key would mean the caller decided to retry. The guard
        // only protects Pending and Ready.
        let cache = TileCache::new();
        cache.mark_pending(key(1, 1));
        cache.complete(key(1, 1), None, Instant::now());
        assert!(matches!(cache.get(key(1, 1)), TileRead::Invalid));
        assert!(cache.mark_pending(key(1, 1)));
    }

    #[test]
    fn test_complete_failure_marks_invalid() {
        let cache = TileCache::new();
        cache.mark_pending(key(2, 2));
        cache.complete(key(2, 2), None, Instant::now());
        assert!(matches!(cache.get(key(2, 2)), TileRead::Invalid));
    }

    #[test]
    fn test_stale_completion_last_writer_wins() {
        let cache = TileCache::new();
        let live = Arc::new(AtomicUsize::new(0));
        let now = Instant::now();

        // Completion lands on a key that was never pending (e.g. evicted
        // while the fetch was in flight). It still applies.
        cache.complete(key(3, 3), Some(CountedImage::new(&live)), now);
        assert!(cache.get(key(3, 3)).is_ready());

        // A duplicate failure completion replaces it and releases the image.
        cache.complete(key(3, 3), None, now);
        assert!(matches!(cache.get(key(3, 3)), TileRead::Invalid));
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_read_for_render_touches_last_used() {
        let cache = TileCache::new();
        let live = Arc::new(AtomicUsize::new(0));
        let t0 = Instant::now();
        cache.mark_pending(key(4, 4));
        cache.complete(key(4, 4), Some(CountedImage::new(&live)), t0);

        // Touch at a simulated later time, then sweep with a cutoff that
        // would have evicted the original stamp.
        let t5 = t0 + Duration::from_secs(5);
        assert!(cache.read_for_render(key(4, 4), t5).is_ready());
        let removed = cache.evict_by_age(Duration::from_secs(3), t5 + Duration::from_secs(1));
        assert_eq!(removed, 0);
        assert!(cache.get(key(4, 4)).is_ready());
    }

    #[test]
    fn test_evict_by_age_releases_images() {
        let cache = TileCache::new();
        let live = Arc::new(AtomicUsize::new(0));
        let t0 = Instant::now();

        cache.complete(key(1, 0), Some(CountedImage::new(&live)), t0);
        cache.complete(key(2, 0), Some(CountedImage::new(&live)), t0);
        // One entry used much later than the other.
        let t10 = t0 + Duration::from_secs(10);
        cache.read_for_render(key(2, 0), t10);
        assert_eq!(live.load(Ordering::SeqCst), 2);

        let removed = cache.evict_by_age(Duration::from_secs(5), t10 + Duration::from_secs(1));
        assert_eq!(removed, 1);
        assert!(cache.get(key(1, 0)).is_absent());
        assert!(cache.get(key(2, 0)).is_ready());
        assert_eq!(live.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_evict_by_age_keeps_pending_and_invalid() {
        let cache = TileCache::new();
        let t0 = Instant::now();
        cache.mark_pending(key(1, 0));
        cache.mark_pending(key(2, 0));
        cache.complete(key(2, 0), None, t0);

        cache.evict_by_age(Duration::from_secs(0), t0 + Duration::from_secs(60));
        assert!(matches!(cache.get(key(1, 0)), TileRead::Pending));
        assert!(matches!(cache.get(key(2, 0)), TileRead::Invalid));
    }

    #[test]
    fn test_evict_by_zoom() {
        let cache = TileCache::new();
        let live = Arc::new(AtomicUsize::new(0));
        let now = Instant::now();
        cache.complete(TileKey::new(1, 1, 9), Some(CountedImage::new(&live)), now);
        cache.complete(TileKey::new(1, 1, 10), Some(CountedImage::new(&live)), now);
        cache.complete(TileKey::new(1, 1, 11), Some(CountedImage::new(&live)), now);

        let removed = cache.evict_by_zoom(10);
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(TileKey::new(1, 1, 10)).is_ready());
        assert_eq!(live.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_releases_everything() {
        let cache = TileCache::new();
        let live = Arc::new(AtomicUsize::new(0));
        let now = Instant::now();
        for x in 0..8 {
            cache.complete(key(x, 0), Some(CountedImage::new(&live)), now);
        }
        assert_eq!(live.load(Ordering::SeqCst), 8);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_eviction_returns_key_to_absent() {
        // An Invalid entry becomes fetchable again once swept away.
        let cache = TileCache::new();
        cache.mark_pending(key(6, 6));
        cache.complete(key(6, 6), None, Instant::now());
        cache.evict_by_zoom(0);
        assert!(cache.get(key(6, 6)).is_absent());
        assert!(cache.mark_pending(key(6, 6)));
    }

    #[test]
    fn test_concurrent_completions_single_state() {
        use std::thread;

        let cache = Arc::new(TileCache::new());
        let live = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            let live = Arc::clone(&live);
            handles.push(thread::spawn(move || {
                let now = Instant::now();
                if i % 2 == 0 {
                    cache.complete(key(0, 0), Some(CountedImage::new(&live)), now);
                } else {
                    cache.complete(key(0, 0), None, now);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Whatever won, there is exactly one entry in exactly one state,
        // and every replaced image has been released.
        assert_eq!(cache.len(), 1);
        let state = cache.get(key(0, 0));
        let expected_live = if state.is_ready() { 1 } else { 0 };
        assert_eq!(live.load(Ordering::SeqCst), expected_live);
    }
}
