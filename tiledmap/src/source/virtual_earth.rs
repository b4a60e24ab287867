//! Virtual Earth tile providers.
//!
//! Tiles are addressed by quadkey; the serving host is picked from the
//! quadkey's last digit, which spreads siblings across hosts. The root
//! tile has an empty quadkey and no addressable URL.

use crate::tile::TileKey;

use super::TileSource;

/// Road-map style.
#[derive(Default)]
pub struct VirtualEarthMap;

impl VirtualEarthMap {
    pub fn new() -> Self {
        Self
    }
}

impl TileSource for VirtualEarthMap {
    fn name(&self) -> &'static str {
        "ve-map"
    }

    fn url_for(&self, key: TileKey) -> Option<String> {
        let quadkey = key.quadkey();
        let server = quadkey.chars().last()?;
        Some(format!(
            "http://r{}.ortho.tiles.virtualearth.net/tiles/r{}.png?g=97",
            server, quadkey
        ))
    }
}

/// Aerial imagery with road labels.
#[derive(Default)]
pub struct VirtualEarthHybrid;

impl VirtualEarthHybrid {
    pub fn new() -> Self {
        Self
    }
}

impl TileSource for VirtualEarthHybrid {
    fn name(&self) -> &'static str {
        "ve-hybrid"
    }

    fn url_for(&self, key: TileKey) -> Option<String> {
        let quadkey = key.quadkey();
        let server = quadkey.chars().last()?;
        Some(format!(
            "http://h{}.ortho.tiles.virtualearth.net/tiles/h{}.jpeg?g=104",
            server, quadkey
        ))
    }
}

/// Transparent traffic-flow overlay, striped over two hosts by tile
/// coordinate parity.
#[derive(Default)]
pub struct VirtualEarthTraffic;

impl VirtualEarthTraffic {
    pub fn new() -> Self {
        Self
    }
}

impl TileSource for VirtualEarthTraffic {
    fn name(&self) -> &'static str {
        "ve-traffic"
    }

    fn url_for(&self, key: TileKey) -> Option<String> {
        let quadkey = key.quadkey();
        if quadkey.is_empty() {
            return None;
        }
        let server = (key.x + key.y).rem_euclid(2);
        Some(format!(
            "http://t{}.traffic.virtualearth.net/Flow/t{}.png?tc=8321627",
            server, quadkey
        ))
    }

    fn has_alpha(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_url_uses_quadkey_and_last_digit_server() {
        let source = VirtualEarthMap::new();
        // (3, 5, 3) -> quadkey "213".
        let url = source.url_for(TileKey::new(3, 5, 3)).unwrap();
        assert_eq!(
            url,
            "http://r3.ortho.tiles.virtualearth.net/tiles/r213.png?g=97"
        );
    }

    #[test]
    fn test_root_has_no_url() {
        assert_eq!(VirtualEarthMap::new().url_for(TileKey::ROOT), None);
        assert_eq!(VirtualEarthHybrid::new().url_for(TileKey::ROOT), None);
        assert_eq!(VirtualEarthTraffic::new().url_for(TileKey::ROOT), None);
    }

    #[test]
    fn test_hybrid_is_jpeg_endpoint() {
        let source = VirtualEarthHybrid::new();
        let url = source.url_for(TileKey::new(1, 0, 1)).unwrap();
        assert_eq!(
            url,
            "http://h1.ortho.tiles.virtualearth.net/tiles/h1.jpeg?g=104"
        );
    }

    #[test]
    fn test_traffic_server_parity() {
        let source = VirtualEarthTraffic::new();
        let even = source.url_for(TileKey::new(2, 2, 3)).unwrap();
        let odd = source.url_for(TileKey::new(2, 3, 3)).unwrap();
        assert!(even.starts_with("http://t0.traffic."), "{even}");
        assert!(odd.starts_with("http://t1.traffic."), "{odd}");
        assert!(source.has_alpha());
    }
}
