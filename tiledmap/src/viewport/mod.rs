//! Viewport state: which tile is under the screen center, where inside it,
//! and at what zoom.
//!
//! The anchor is `center_tile` plus `center_offset`, the pixel within that
//! tile that sits at the exact center of the screen. All mutations keep
//! the offset inside `[0, 256)` by carrying whole tiles into
//! `center_tile`, and refuse any change that would put the center outside
//! the tile grid.

use crate::geo::{self, Geocode};
use crate::render::Point;
use crate::tile::{TileKey, TILE_SIZE};

/// Deepest tile zoom the engine addresses.
pub const MAX_ZOOM: u8 = 15;

/// A map view anchored at a center tile and intra-tile pixel offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    center_tile: Point,
    center_offset: Point,
    zoom: u8,
}

impl Default for Viewport {
    /// The whole-world view: root tile, centered.
    fn default() -> Self {
        Self {
            center_tile: Point::new(0, 0),
            center_offset: Point::new(128, 128),
            zoom: 0,
        }
    }
}

impl Viewport {
    pub fn new(center_tile: Point, center_offset: Point, zoom: u8) -> Self {
        Self {
            center_tile,
            center_offset,
            zoom,
        }
    }

    /// View with the given geocode under the screen center.
    pub fn centered_on(geocode: Geocode, zoom: u8) -> Self {
        let zoom = zoom.min(MAX_ZOOM);
        let pixel_zoom = zoom + 8;
        let x = geo::longitude_to_x(geocode.longitude, pixel_zoom);
        let y = geo::latitude_to_y(geocode.latitude, pixel_zoom);
        let tile_size = TILE_SIZE as i64;
        Self {
            center_tile: Point::new(
                x.div_euclid(tile_size) as i32,
                y.div_euclid(tile_size) as i32,
            ),
            center_offset: Point::new(
                x.rem_euclid(tile_size) as i32,
                y.rem_euclid(tile_size) as i32,
            ),
            zoom,
        }
    }

    pub fn center_tile(&self) -> Point {
        self.center_tile
    }

    pub fn center_offset(&self) -> Point {
        self.center_offset
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// The tile key under the screen center.
    pub fn center_key(&self) -> TileKey {
        TileKey::new(self.center_tile.x, self.center_tile.y, self.zoom)
    }

    pub fn can_zoom_in(&self) -> bool {
        self.zoom < MAX_ZOOM
    }

    pub fn can_zoom_out(&self) -> bool {
        self.zoom > 0
    }

    /// Shift the view by a screen-pixel delta. Dragging the map right
    /// (positive `dx`) moves the anchor west. A pan that would carry the
    /// center tile off the grid is ignored.
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let mut offset_x = self.center_offset.x - dx;
        let mut offset_y = self.center_offset.y - dy;
        let mut tile = self.center_tile;

        while offset_x < 0 {
            offset_x += TILE_SIZE;
            tile.x -= 1;
        }
        while offset_x >= TILE_SIZE {
            offset_x -= TILE_SIZE;
            tile.x += 1;
        }
        while offset_y < 0 {
            offset_y += TILE_SIZE;
            tile.y -= 1;
        }
        while offset_y >= TILE_SIZE {
            offset_y -= TILE_SIZE;
            tile.y += 1;
        }

        if !TileKey::new(tile.x, tile.y, self.zoom).is_valid() {
            return;
        }
        self.center_tile = tile;
        self.center_offset = Point::new(offset_x, offset_y);
    }

    /// Zoom in one level, keeping the same point under the screen center.
    /// No-op at [`MAX_ZOOM`].
    pub fn zoom_in(&mut self) {
        if !self.can_zoom_in() {
            return;
        }
        let mut tile = Point::new(self.center_tile.x * 2, self.center_tile.y * 2);
        if self.center_offset.x >= 128 {
            tile.x += 1;
        }
        if self.center_offset.y >= 128 {
            tile.y += 1;
        }
        self.center_tile = tile;
        self.center_offset = Point::new(
            (self.center_offset.x % 128) * 2,
            (self.center_offset.y % 128) * 2,
        );
        self.zoom += 1;
    }

    /// Zoom out one level, keeping the same point under the screen center.
    /// No-op at zoom 0.
    pub fn zoom_out(&mut self) {
        if !self.can_zoom_out() {
            return;
        }
        let odd_x = self.center_tile.x % 2 != 0;
        let odd_y = self.center_tile.y % 2 != 0;
        self.zoom -= 1;
        self.center_tile = Point::new(self.center_tile.x / 2, self.center_tile.y / 2);
        let mut offset = Point::new(self.center_offset.x / 2, self.center_offset.y / 2);
        if odd_x {
            offset.x += 128;
        }
        if odd_y {
            offset.y += 128;
        }
        self.center_offset = offset;
    }

    /// Center on the bounding box of `points` and zoom out from `max_zoom`
    /// until the box fits within the half-dimensions of a `width`x`height`
    /// screen (or zoom 0 is reached).
    pub fn fit_points(&mut self, width: i32, height: i32, max_zoom: u8, points: &[Geocode]) {
        if points.is_empty() {
            return;
        }
        let mut top = f64::MIN;
        let mut bottom = f64::MAX;
        let mut left = f64::MAX;
        let mut right = f64::MIN;
        for point in points {
            top = top.max(point.latitude);
            bottom = bottom.min(point.latitude);
            left = left.min(point.longitude);
            right = right.max(point.longitude);
        }
        let center = Geocode::new((top + bottom) / 2.0, (left + right) / 2.0);

        *self = Self::centered_on(center, max_zoom);

        let half_width = width / 2;
        let half_height = height / 2;
        while self.zoom > 0 {
            self.zoom_out();
            let pixel_zoom = self.zoom + 8;
            let x = geo::longitude_to_x(center.longitude, pixel_zoom);
            let y = geo::latitude_to_y(center.latitude, pixel_zoom);
            let tl_x = geo::longitude_to_x(left, pixel_zoom);
            let tl_y = geo::latitude_to_y(top, pixel_zoom);
            let br_x = geo::longitude_to_x(right, pixel_zoom);
            let br_y = geo::latitude_to_y(bottom, pixel_zoom);
            if tl_x - x > -(half_width as i64)
                && tl_y - y > -(half_height as i64)
                && br_x - x < half_width as i64
                && br_y - y < half_height as i64
            {
                break;
            }
        }
    }

    /// The geocode under a screen point given relative to the center.
    pub fn geocode_at(&self, point: Point) -> Geocode {
        let pixel_zoom = self.zoom + 8;
        let x = ((self.center_tile.x as i64) << 8) + self.center_offset.x as i64 + point.x as i64;
        let y = ((self.center_tile.y as i64) << 8) + self.center_offset.y as i64 + point.y as i64;
        Geocode::new(
            geo::y_to_latitude(y, pixel_zoom),
            geo::x_to_longitude(x, pixel_zoom),
        )
    }

    /// The center-relative screen point of a geocode.
    pub fn point_of(&self, geocode: Geocode) -> Point {
        let pixel_zoom = self.zoom + 8;
        let center_x = ((self.center_tile.x as i64) << 8) + self.center_offset.x as i64;
        let center_y = ((self.center_tile.y as i64) << 8) + self.center_offset.y as i64;
        let x = geo::longitude_to_x(geocode.longitude, pixel_zoom);
        let y = geo::latitude_to_y(geocode.latitude, pixel_zoom);
        Point::new((x - center_x) as i32, (y - center_y) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(x: i32, y: i32, ox: i32, oy: i32, zoom: u8) -> Viewport {
        Viewport::new(Point::new(x, y), Point::new(ox, oy), zoom)
    }

    #[test]
    fn test_default_is_centered_root() {
        let vp = Viewport::default();
        assert_eq!(vp.center_tile(), Point::new(0, 0));
        assert_eq!(vp.center_offset(), Point::new(128, 128));
        assert_eq!(vp.zoom(), 0);
    }

    #[test]
    fn test_pan_within_tile() {
        let mut vp = viewport(4, 4, 128, 128, 5);
        vp.pan(28, -50);
        assert_eq!(vp.center_tile(), Point::new(4, 4));
        assert_eq!(vp.center_offset(), Point::new(100, 178));
    }

    #[test]
    fn test_pan_carries_whole_tiles() {
        let mut vp = viewport(4, 4, 128, 128, 5);
        vp.pan(300, 0);
        assert_eq!(vp.center_offset(), Point::new(84, 128));
        assert_eq!(vp.center_tile(), Point::new(3, 4));
    }

    #[test]
    fn test_pan_carries_multiple_tiles() {
        let mut vp = viewport(8, 8, 128, 128, 5);
        vp.pan(-600, 600);
        // 128 + 600 = 728 -> two carries east; 128 - 600 = -472 -> two west.
        assert_eq!(vp.center_offset(), Point::new(216, 40));
        assert_eq!(vp.center_tile(), Point::new(10, 6));
    }

    #[test]
    fn test_pan_keeps_offset_in_range() {
        let mut vp = viewport(4, 4, 0, 0, 5);
        vp.pan(-256, -256);
        assert_eq!(vp.center_offset(), Point::new(0, 0));
        assert_eq!(vp.center_tile(), Point::new(5, 5));
    }

    #[test]
    fn test_pan_off_grid_is_rejected() {
        let mut vp = viewport(0, 0, 128, 128, 0);
        let before = vp;
        vp.pan(300, 0);
        assert_eq!(vp, before);
    }

    #[test]
    fn test_zoom_in_splits_tile() {
        let mut vp = viewport(512, 341, 128, 128, 10);
        vp.zoom_in();
        assert_eq!(vp.zoom(), 11);
        assert_eq!(vp.center_tile(), Point::new(1025, 683));
        assert_eq!(vp.center_offset(), Point::new(0, 0));
    }

    #[test]
    fn test_zoom_in_low_offset_keeps_even_child() {
        let mut vp = viewport(512, 341, 60, 100, 10);
        vp.zoom_in();
        assert_eq!(vp.center_tile(), Point::new(1024, 682));
        assert_eq!(vp.center_offset(), Point::new(120, 200));
    }

    #[test]
    fn test_zoom_out_restores_parity_offset() {
        let mut vp = viewport(1025, 683, 0, 0, 11);
        vp.zoom_out();
        assert_eq!(vp.zoom(), 10);
        assert_eq!(vp.center_tile(), Point::new(512, 341));
        assert_eq!(vp.center_offset(), Point::new(128, 128));
    }

    #[test]
    fn test_zoom_round_trip() {
        let original = viewport(512, 341, 100, 40, 10);
        let mut vp = original;
        vp.zoom_in();
        vp.zoom_out();
        assert_eq!(vp, original);
    }

    #[test]
    fn test_zoom_in_clamped_at_max() {
        let mut vp = viewport(100, 100, 10, 10, MAX_ZOOM);
        let before = vp;
        assert!(!vp.can_zoom_in());
        vp.zoom_in();
        assert_eq!(vp, before);
    }

    #[test]
    fn test_zoom_out_clamped_at_root() {
        let mut vp = Viewport::default();
        let before = vp;
        vp.zoom_out();
        assert_eq!(vp, before);
    }

    #[test]
    fn test_centered_on_places_geocode_at_center() {
        let geocode = Geocode::new(47.62, -122.35);
        let vp = Viewport::centered_on(geocode, 12);
        assert_eq!(vp.zoom(), 12);
        let p = vp.point_of(geocode);
        assert_eq!(p, Point::new(0, 0));
        assert!(vp.center_key().is_valid());
    }

    #[test]
    fn test_centered_on_clamps_zoom() {
        let vp = Viewport::centered_on(Geocode::new(0.0, 0.0), 40);
        assert_eq!(vp.zoom(), MAX_ZOOM);
    }

    #[test]
    fn test_geocode_point_round_trip() {
        let vp = Viewport::centered_on(Geocode::new(40.7128, -74.006), 14);
        let geocode = vp.geocode_at(Point::new(75, -40));
        let p = vp.point_of(geocode);
        assert_eq!(p, Point::new(75, -40));
    }

    #[test]
    fn test_fit_points_contains_all_points() {
        let points = [
            Geocode::new(47.60, -122.33),
            Geocode::new(47.68, -122.12),
            Geocode::new(47.52, -122.20),
        ];
        let mut vp = Viewport::default();
        vp.fit_points(800, 600, MAX_ZOOM, &points);

        for point in &points {
            let p = vp.point_of(*point);
            assert!(p.x.abs() < 400, "{point} at {p:?}");
            assert!(p.y.abs() < 300, "{point} at {p:?}");
        }
    }

    #[test]
    fn test_fit_points_widely_spread_reaches_low_zoom() {
        let points = [Geocode::new(48.85, 2.35), Geocode::new(40.71, -74.0)];
        let mut vp = Viewport::default();
        vp.fit_points(640, 480, MAX_ZOOM, &points);
        assert!(vp.zoom() <= 3, "zoom {}", vp.zoom());
    }

    #[test]
    fn test_fit_points_empty_is_noop() {
        let mut vp = viewport(4, 4, 128, 128, 5);
        let before = vp;
        vp.fit_points(800, 600, MAX_ZOOM, &[]);
        assert_eq!(vp, before);
    }
}
