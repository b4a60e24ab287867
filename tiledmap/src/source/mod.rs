//! Tile sources.
//!
//! A [`TileSource`] knows how to turn a [`TileKey`] into a download URL
//! and declares whether its tiles carry transparency. It never performs
//! I/O itself; the fetch pipeline does that.

pub mod google;
pub mod virtual_earth;

use crate::tile::TileKey;

pub use google::{GoogleMap, GoogleRoads, GoogleSatellite, GoogleTerrain, GoogleTraffic};
pub use virtual_earth::{VirtualEarthHybrid, VirtualEarthMap, VirtualEarthTraffic};

/// A named provider of map tiles.
pub trait TileSource: Send + Sync {
    /// Stable identifier, also used as the disk cache subdirectory.
    fn name(&self) -> &'static str;

    /// The download URL for a tile, or `None` if the provider has no tile
    /// at this key (e.g. addressing schemes with no encoding for the root).
    fn url_for(&self, key: TileKey) -> Option<String>;

    /// Whether tiles from this source have an alpha channel and are meant
    /// to be drawn over another layer.
    fn has_alpha(&self) -> bool {
        false
    }
}
