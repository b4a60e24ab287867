//! Tile addressing.
//!
//! A [`TileKey`] names a node in the implicit quadtree that tiles the
//! Mercator plane: zoom 0 is the single root tile and each zoom increment
//! doubles the resolution in both axes.

/// Side length of a tile in pixels.
pub const TILE_SIZE: i32 = 256;

/// Address of one 256x256 tile: column, row, and zoom level.
///
/// `x` and `y` may be out of range (negative or past the grid edge) while
/// the compositor walks the visible grid; such keys answer `false` from
/// [`TileKey::is_valid`] and are never fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Column, increasing eastward.
    pub x: i32,
    /// Row, increasing southward.
    pub y: i32,
    /// Zoom level.
    pub zoom: u8,
}

impl TileKey {
    /// The single tile covering the whole world.
    pub const ROOT: TileKey = TileKey { x: 0, y: 0, zoom: 0 };

    pub fn new(x: i32, y: i32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Whether the key addresses a tile that exists at its zoom level.
    pub fn is_valid(&self) -> bool {
        let side = 1i32 << self.zoom;
        self.x >= 0 && self.y >= 0 && self.x < side && self.y < side
    }

    /// The key one zoom level up that contains this tile, or `None` at the
    /// root.
    pub fn parent(&self) -> Option<TileKey> {
        if self.zoom == 0 {
            return None;
        }
        Some(TileKey::new(self.x / 2, self.y / 2, self.zoom - 1))
    }

    /// The four children one zoom level down, in top-left, top-right,
    /// bottom-left, bottom-right order.
    pub fn children(&self) -> [TileKey; 4] {
        let x = self.x * 2;
        let y = self.y * 2;
        let zoom = self.zoom + 1;
        [
            TileKey::new(x, y, zoom),
            TileKey::new(x + 1, y, zoom),
            TileKey::new(x, y + 1, zoom),
            TileKey::new(x + 1, y + 1, zoom),
        ]
    }

    /// Quadkey path-string encoding: one digit per zoom level, most
    /// significant first, built from the bit parity of `x` and `y`.
    ///
    /// The root tile encodes as the empty string.
    pub fn quadkey(&self) -> String {
        let mut digits = vec![0u8; self.zoom as usize];
        let mut x = self.x;
        let mut y = self.y;
        for slot in digits.iter_mut().rev() {
            let mut digit = b'0';
            if x % 2 == 1 {
                digit += 1;
            }
            if y % 2 == 1 {
                digit += 2;
            }
            *slot = digit;
            x /= 2;
            y /= 2;
        }
        // Digits are ASCII by construction.
        String::from_utf8(digits).unwrap_or_default()
    }

    /// File name used for this key in the disk cache.
    pub fn cache_file_name(&self) -> String {
        format!("{}-{}-{}", self.x, self.y, self.zoom)
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})@{}", self.x, self.y, self.zoom)
    }
}
