//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use tiledmap::source::{
    GoogleMap, GoogleRoads, GoogleSatellite, GoogleTerrain, GoogleTraffic, VirtualEarthHybrid,
    VirtualEarthMap, VirtualEarthTraffic,
};
use tiledmap::TileSource;

/// Tile provider selection for CLI arguments.
#[derive(Debug, Clone, ValueEnum, PartialEq)]
pub enum SourceType {
    /// Google road map
    GoogleMap,
    /// Google satellite imagery
    GoogleSatellite,
    /// Google terrain shading
    GoogleTerrain,
    /// Google transparent roads overlay
    GoogleRoads,
    /// Google traffic overlay
    GoogleTraffic,
    /// Virtual Earth road map
    VeMap,
    /// Virtual Earth hybrid imagery
    VeHybrid,
    /// Virtual Earth traffic overlay
    VeTraffic,
}

impl SourceType {
    pub fn to_source(&self) -> Arc<dyn TileSource> {
        match self {
            SourceType::GoogleMap => Arc::new(GoogleMap::new()),
            SourceType::GoogleSatellite => Arc::new(GoogleSatellite::new()),
            SourceType::GoogleTerrain => Arc::new(GoogleTerrain::new()),
            SourceType::GoogleRoads => Arc::new(GoogleRoads::new()),
            SourceType::GoogleTraffic => Arc::new(GoogleTraffic::new()),
            SourceType::VeMap => Arc::new(VirtualEarthMap::new()),
            SourceType::VeHybrid => Arc::new(VirtualEarthHybrid::new()),
            SourceType::VeTraffic => Arc::new(VirtualEarthTraffic::new()),
        }
    }
}

/// The disk tile cache directory: an explicit override, or a `tiledmap`
/// directory under the platform cache location.
pub fn cache_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("tiledmap")
    })
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_cache_dir_override() {
        let dir = cache_dir(Some(PathBuf::from("/tmp/tiles")));
        assert_eq!(dir, PathBuf::from("/tmp/tiles"));
    }
}
