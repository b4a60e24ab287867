//! Geographic coordinate conversions.
//!
//! Implements the spherical Mercator projection used by web tile servers:
//! the world at zoom `z` is a square of `2^z` units per side (tiles when
//! `z` is a tile zoom, pixels when `z` is a tile zoom plus 8, since each
//! tile is 256 = 2^8 pixels). `y` increases southward.
//!
//! The `*_f64` functions are exact inverses of each other up to floating
//! point rounding; the integer variants round to the nearest grid unit and
//! are what the viewport and compositor work with.

use std::f64::consts::PI;

/// Mean equatorial Earth radius used by the spherical Mercator projection,
/// in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Earth circumference at the equator, in meters.
pub const EARTH_CIRCUMFERENCE: f64 = EARTH_RADIUS * 2.0 * PI;

const EARTH_HALF_CIRCUMFERENCE: f64 = EARTH_CIRCUMFERENCE / 2.0;

/// A latitude/longitude pair in degrees.
///
/// The null sentinel `(+inf, +inf)` means "no geocode"; equality is
/// structural on both fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geocode {
    pub latitude: f64,
    pub longitude: f64,
}

impl Geocode {
    /// The "no geocode" sentinel.
    pub const NULL: Geocode = Geocode {
        latitude: f64::INFINITY,
        longitude: f64::INFINITY,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Returns true if this is the null sentinel.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl Default for Geocode {
    /// The null sentinel.
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for Geocode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Width of one grid unit at the given zoom, in meters.
fn arc(zoom: u8) -> f64 {
    EARTH_CIRCUMFERENCE / (1u64 << zoom) as f64
}

/// Longitude to a fractional x position in the `2^zoom` grid.
pub fn longitude_to_x_f64(longitude: f64, zoom: u8) -> f64 {
    (longitude.to_radians() * EARTH_RADIUS + EARTH_HALF_CIRCUMFERENCE) / arc(zoom)
}

/// Fractional grid x back to longitude. Inverse of [`longitude_to_x_f64`].
pub fn x_to_longitude_f64(x: f64, zoom: u8) -> f64 {
    ((x * arc(zoom) - EARTH_HALF_CIRCUMFERENCE) / EARTH_RADIUS).to_degrees()
}

/// Latitude to a fractional y position in the `2^zoom` grid, increasing
/// southward.
pub fn latitude_to_y_f64(latitude: f64, zoom: u8) -> f64 {
    let sine = latitude.to_radians().sin();
    let meters = ((1.0 + sine) / (1.0 - sine)).ln() * EARTH_RADIUS / 2.0;
    (EARTH_HALF_CIRCUMFERENCE - meters) / arc(zoom)
}

/// Fractional grid y back to latitude. Inverse of [`latitude_to_y_f64`].
pub fn y_to_latitude_f64(y: f64, zoom: u8) -> f64 {
    let meters = EARTH_HALF_CIRCUMFERENCE - y * arc(zoom);
    let a = (meters * 2.0 / EARTH_RADIUS).exp();
    ((a - 1.0) / (a + 1.0)).asin().to_degrees()
}

/// Longitude to the nearest integer grid x at the given zoom.
pub fn longitude_to_x(longitude: f64, zoom: u8) -> i64 {
    longitude_to_x_f64(longitude, zoom).round() as i64
}

/// Integer grid x to the longitude of that grid line.
pub fn x_to_longitude(x: i64, zoom: u8) -> f64 {
    x_to_longitude_f64(x as f64, zoom)
}

/// Latitude to the nearest integer grid y at the given zoom.
pub fn latitude_to_y(latitude: f64, zoom: u8) -> i64 {
    latitude_to_y_f64(latitude, zoom).round() as i64
}

/// Integer grid y to the latitude of that grid line.
pub fn y_to_latitude(y: i64, zoom: u8) -> f64 {
    y_to_latitude_f64(y as f64, zoom)
}
