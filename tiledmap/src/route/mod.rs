//! Routes, turn-by-turn directions, and point overlays drawn on the map.

use std::sync::Arc;

use crate::geo::Geocode;
use crate::render::{Color, Drawable, Point};

/// Detail levels a polyline point can carry, mapped to the shallowest tile
/// zoom at which the point is drawn. Level 3 points are drawn at every
/// zoom.
pub const LEVEL_TO_ZOOM: [i32; 4] = [13, 7, 2, i32::MIN];

/// A polyline drawn over the map.
#[derive(Clone, Debug)]
pub struct Route {
    /// Path vertices.
    pub polyline: Vec<Geocode>,
    /// Detail level per vertex, indexing [`LEVEL_TO_ZOOM`].
    pub levels: Vec<usize>,
    pub color: Color,
    pub line_width: f32,
}

impl Route {
    pub fn new(polyline: Vec<Geocode>, levels: Vec<usize>) -> Self {
        Self {
            polyline,
            levels,
            color: Color::CYAN,
            line_width: 4.0,
        }
    }
}

impl Default for Route {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// One instruction of a turn-by-turn route.
#[derive(Clone, Debug, Default)]
pub struct Segment {
    /// Plain-text instruction.
    pub text: String,
    /// Instruction with provider markup preserved.
    pub formatted_text: String,
    pub road_name: String,
    pub distance: String,
    pub time: String,
    /// Where along the route this instruction applies.
    pub geocode: Geocode,
    pub notes: Vec<String>,
}

/// A route plus its instructions.
#[derive(Clone, Debug, Default)]
pub struct Directions {
    pub route: Route,
    pub segments: Vec<Segment>,
}

/// Capability to fetch turn-by-turn directions between two points.
///
/// Implementations wrap provider-specific services; the engine only
/// consumes the resulting [`Directions`].
pub trait DirectionsService: Send + Sync {
    fn fetch_directions(
        &self,
        origin: Geocode,
        destination: Geocode,
    ) -> Result<Directions, crate::error::FetchError>;
}

/// An image pinned to a geocode, drawn centered on it plus a pixel offset.
#[derive(Clone)]
pub struct Overlay {
    pub drawable: Arc<dyn Drawable>,
    pub geocode: Geocode,
    pub offset: Point,
}

impl Overlay {
    pub fn new(drawable: Arc<dyn Drawable>, geocode: Geocode) -> Self {
        Self {
            drawable,
            geocode,
            offset: Point::new(0, 0),
        }
    }

    pub fn with_offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }
}
