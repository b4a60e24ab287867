//! Google tile providers.
//!
//! The map, satellite, terrain, and roads styles are striped over four
//! mirrors (`mt0`..`mt3`, `khm0`..`khm3`); each source rotates through
//! them with a relaxed counter. Terrain and roads address zoom as
//! `17 - zoom` rather than directly. The satellite style addresses tiles
//! by a quadtree letter path instead of x/y/z.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::tile::TileKey;

use super::TileSource;

/// The standard road-map style.
#[derive(Default)]
pub struct GoogleMap {
    server: AtomicU32,
}

impl GoogleMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TileSource for GoogleMap {
    fn name(&self) -> &'static str {
        "google-map"
    }

    fn url_for(&self, key: TileKey) -> Option<String> {
        let server = self.server.fetch_add(1, Ordering::Relaxed) % 4;
        Some(format!(
            "http://mt{}.google.com/mt?v=w2.88&hl=en&x={}&s=&y={}&z={}",
            server, key.x, key.y, key.zoom
        ))
    }
}

/// Satellite imagery, addressed by a `q`/`r`/`t`/`s` letter path.
#[derive(Default)]
pub struct GoogleSatellite {
    server: AtomicU32,
}

impl GoogleSatellite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quadtree path of the key: one letter per zoom level, rooted at `t`.
    /// `q` is the north-west child, `r` north-east, `t` south-west, `s`
    /// south-east.
    fn letter_path(key: TileKey) -> String {
        let mut letters = vec![0u8; key.zoom as usize + 1];
        letters[0] = b't';
        let mut x = key.x;
        let mut y = key.y;
        for slot in letters[1..].iter_mut().rev() {
            *slot = match (x % 2 == 1, y % 2 == 1) {
                (false, false) => b'q',
                (true, false) => b'r',
                (false, true) => b't',
                (true, true) => b's',
            };
            x /= 2;
            y /= 2;
        }
        String::from_utf8(letters).unwrap_or_default()
    }
}

impl TileSource for GoogleSatellite {
    fn name(&self) -> &'static str {
        "google-satellite"
    }

    fn url_for(&self, key: TileKey) -> Option<String> {
        let server = self.server.fetch_add(1, Ordering::Relaxed) % 4;
        Some(format!(
            "http://khm{}.google.com/kh?n=404&v=33&t={}",
            server,
            Self::letter_path(key)
        ))
    }
}

/// Terrain shading style.
#[derive(Default)]
pub struct GoogleTerrain {
    server: AtomicU32,
}

impl GoogleTerrain {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TileSource for GoogleTerrain {
    fn name(&self) -> &'static str {
        "google-terrain"
    }

    fn url_for(&self, key: TileKey) -> Option<String> {
        let server = self.server.fetch_add(1, Ordering::Relaxed) % 4;
        Some(format!(
            "http://mt{}.google.com/mt?n=404&v=w2p.75&x={}&y={}&zoom={}",
            server,
            key.x,
            key.y,
            17 - key.zoom as i32
        ))
    }
}

/// Transparent road overlay, for drawing over satellite or terrain tiles.
#[derive(Default)]
pub struct GoogleRoads {
    server: AtomicU32,
}

impl GoogleRoads {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TileSource for GoogleRoads {
    fn name(&self) -> &'static str {
        "google-roads"
    }

    fn url_for(&self, key: TileKey) -> Option<String> {
        let server = self.server.fetch_add(1, Ordering::Relaxed) % 4;
        Some(format!(
            "http://mt{}.google.com/mt?n=404&v=w2t.86&x={}&y={}&zoom={}",
            server,
            key.x,
            key.y,
            17 - key.zoom as i32
        ))
    }

    fn has_alpha(&self) -> bool {
        true
    }
}

/// Transparent traffic-flow overlay. Served from a single host.
#[derive(Default)]
pub struct GoogleTraffic;

impl GoogleTraffic {
    pub fn new() -> Self {
        Self
    }
}

impl TileSource for GoogleTraffic {
    fn name(&self) -> &'static str {
        "google-traffic"
    }

    fn url_for(&self, key: TileKey) -> Option<String> {
        Some(format!(
            "http://www.google.com/mapstt?zoom={}&x={}&y={}",
            key.zoom, key.x, key.y
        ))
    }

    fn has_alpha(&self) -> bool {
        true
    }
}
