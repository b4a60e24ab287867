//! Rendering capability boundary.
//!
//! The engine never touches pixels itself. The compositor emits a list of
//! [`RenderCommand`]s against opaque [`Drawable`] handles, and the host
//! supplies a [`Renderer`] that can decode downloaded bytes into drawables
//! and compose tiles offscreen (used by the multi-source blender). The
//! built-in software backend lives in [`raster`].

pub mod raster;

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

/// A point in screen or tile pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// True if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// The overlap of two rectangles; empty if they do not intersect.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }
}

/// An RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const GRAY: Color = Color::opaque(128, 128, 128);
    pub const CYAN: Color = Color::opaque(0, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// An opaque decoded image owned by the host's rendering backend.
///
/// The tile cache holds exactly one strong reference per cached tile;
/// render commands hold additional references only for the lifetime of the
/// pass. Dropping the last reference releases the backing resource.
pub trait Drawable: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Backend downcast hook, for renderers that need their own concrete
    /// image type back.
    fn as_any(&self) -> &dyn Any;
}

/// Failure to turn bytes into a [`Drawable`].
#[derive(Debug, Error)]
#[error("image decode failed: {0}")]
pub struct DecodeError(pub String);

/// The drawing/decoding capability supplied by the host.
pub trait Renderer: Send + Sync {
    /// Decode downloaded bytes into a drawable image.
    fn decode(&self, bytes: &[u8]) -> Result<Arc<dyn Drawable>, DecodeError>;

    /// Compose a new tile: `base` drawn first, then each layer over it in
    /// order, all stretched to the base's dimensions.
    fn compose(
        &self,
        base: &Arc<dyn Drawable>,
        layers: &[Arc<dyn Drawable>],
    ) -> Result<Arc<dyn Drawable>, DecodeError>;
}

/// One drawing operation produced by a render pass.
///
/// Commands are backend-agnostic; a backend executes them in order against
/// its own surface.
#[derive(Clone)]
pub enum RenderCommand {
    /// Draw `src` of the image scaled into `dest`.
    DrawImage {
        image: Arc<dyn Drawable>,
        dest: Rect,
        src: Rect,
    },
    /// Fill `rect` with a solid color.
    FillRect { color: Color, rect: Rect },
    /// Stroke a polyline through `points`.
    Polyline {
        width: f32,
        color: Color,
        points: Vec<Point>,
    },
}

impl std::fmt::Debug for RenderCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderCommand::DrawImage { image, dest, src } => f
                .debug_struct("DrawImage")
                .field("image", &(image.width(), image.height()))
                .field("dest", dest)
                .field("src", src)
                .finish(),
            RenderCommand::FillRect { color, rect } => f
                .debug_struct("FillRect")
                .field("color", color)
                .field("rect", rect)
                .finish(),
            RenderCommand::Polyline { width, color, points } => f
                .debug_struct("Polyline")
                .field("width", width)
                .field("color", color)
                .field("points", &points.len())
                .finish(),
        }
    }
}
