//! Multi-source blending: several providers composited into one logical
//! tile layer.
//!
//! Each key tracks how many enabled sources have contributed to its
//! current composite. A new composite is produced only when that count
//! increases, so a render loop polling a half-loaded tile does not
//! recompose on every frame. Once every enabled source has contributed,
//! the composite is final; optionally the contributing sources' own cache
//! entries are released, since the merged image now carries them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{TileCache, TileRead};
use crate::render::{Color, Drawable, Renderer};
use crate::session::{MapSession, TileLayer};
use crate::tile::TileKey;

struct BlendLayer {
    session: Arc<MapSession>,
    enabled: bool,
}

/// A [`TileLayer`] that merges the ready tiles of several sources.
pub struct BlendedSession {
    layers: Vec<BlendLayer>,
    /// Contributions per key in the current composite.
    blend: Mutex<HashMap<TileKey, usize>>,
    cache: Arc<TileCache>,
    renderer: Arc<dyn Renderer>,
    refresh_image: Arc<dyn Drawable>,
    back_color: Color,
    clear_blended: bool,
}

impl BlendedSession {
    /// Blend `sessions` in order, bottom to top. Only the first source
    /// starts enabled. `refresh_image` is the composite base and the
    /// placeholder for unresolved cells.
    pub fn new(
        sessions: Vec<Arc<MapSession>>,
        renderer: Arc<dyn Renderer>,
        refresh_image: Arc<dyn Drawable>,
    ) -> Self {
        let layers = sessions
            .into_iter()
            .enumerate()
            .map(|(i, session)| BlendLayer {
                session,
                enabled: i == 0,
            })
            .collect();
        Self {
            layers,
            blend: Mutex::new(HashMap::new()),
            cache: Arc::new(TileCache::new()),
            renderer,
            refresh_image,
            back_color: Color::GRAY,
            clear_blended: true,
        }
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    pub fn enabled(&self, index: usize) -> bool {
        self.layers.get(index).map(|l| l.enabled).unwrap_or(false)
    }

    /// Number of sources a full composite needs.
    pub fn target_blend(&self) -> usize {
        self.layers.iter().filter(|l| l.enabled).count()
    }

    /// Whether fully-blended composites release the contributing sources'
    /// cache entries.
    pub fn set_clear_blended(&mut self, clear: bool) {
        self.clear_blended = clear;
    }

    pub fn set_back_color(&mut self, color: Color) {
        self.back_color = color;
    }

    /// Enable or disable one source. Every composite is invalidated; a
    /// disabled source's own cache is dropped as well.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) {
        let Some(layer) = self.layers.get_mut(index) else {
            return;
        };
        if layer.enabled == enabled {
            return;
        }
        layer.enabled = enabled;
        if !enabled {
            layer.session.clear();
        }
        self.blend.lock().clear();
        self.cache.clear();
        debug!(index, enabled, "blend source toggled");
    }

    /// Drop every composite and every source cache.
    pub fn clear(&self) {
        self.blend.lock().clear();
        self.cache.clear();
        for layer in &self.layers {
            layer.session.clear();
        }
    }

    /// Drop composites unused for longer than `max_idle`. Their blend
    /// counts go too, so a revisited key recomposes from scratch.
    pub fn evict_aged(&self, max_idle: Duration, now: Instant) -> usize {
        let removed = self.cache.evict_by_age(max_idle, now);
        if removed > 0 {
            let mut blend = self.blend.lock();
            blend.retain(|key, _| self.cache.get(*key).is_ready());
        }
        removed
    }
}

impl TileLayer for BlendedSession {
    fn get_or_fetch(&self, key: TileKey, now: Instant) -> TileRead {
        if self.layers.is_empty() {
            return TileRead::Absent;
        }

        let target = self.target_blend();
        let current = self.blend.lock().get(&key).copied().unwrap_or(0);
        if current == target && target > 0 {
            return self.cache.read_for_render(key, now);
        }

        // Poll every enabled source, scheduling fetches as a side effect.
        let mut contributions = Vec::new();
        for layer in &self.layers {
            if !layer.enabled {
                continue;
            }
            if let Some(image) = layer.session.get_or_fetch(key, now).image() {
                contributions.push((layer, image.clone()));
            }
        }

        // Nothing new since the last composite.
        if contributions.len() == current {
            return self.cache.read_for_render(key, now);
        }

        let images: Vec<Arc<dyn Drawable>> =
            contributions.iter().map(|(_, image)| image.clone()).collect();
        let composite = match self.renderer.compose(&self.refresh_image, &images) {
            Ok(composite) => composite,
            Err(err) => {
                warn!(%key, %err, "tile composition failed");
                return self.cache.read_for_render(key, now);
            }
        };

        self.blend.lock().insert(key, contributions.len());
        if self.clear_blended && contributions.len() == target {
            // The composite owns the merged pixels now.
            for (layer, _) in &contributions {
                layer.session.cache().remove(key);
            }
        }
        self.cache.put_ready(key, Arc::clone(&composite), now);
        TileRead::Ready(composite)
    }

    fn ready_in_cache(&self, key: TileKey, now: Instant) -> Option<Arc<dyn Drawable>> {
        self.cache.read_for_render(key, now).image().cloned()
    }

    fn has_alpha(&self) -> bool {
        false
    }

    fn back_color(&self) -> Color {
        self.back_color
    }

    fn refresh_image(&self) -> Option<Arc<dyn Drawable>> {
        Some(Arc::clone(&self.refresh_image))
    }
}
