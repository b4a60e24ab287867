//! Client-side tiled map engine.
//!
//! Renders slippy-map views from quadtree tile providers: Mercator
//! coordinate math, an in-memory tile cache with an explicit entry
//! lifecycle, an asynchronous disk-then-network fetch pipeline, and a
//! compositor that fills missing tiles from quadtree neighbors while
//! fetches are in flight. Several providers can be blended into one
//! logical layer.
//!
//! The engine emits backend-agnostic draw commands; a software backend on
//! `tiny-skia` is included for offscreen rendering.

pub mod blend;
pub mod cache;
pub mod compositor;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod render;
pub mod route;
pub mod session;
pub mod source;
pub mod tile;
pub mod viewport;

pub use blend::BlendedSession;
pub use cache::{TileCache, TileRead};
pub use compositor::RenderPass;
pub use config::FetchConfig;
pub use error::FetchError;
pub use fetch::{FetchEvent, FetchOutcome, FetchPipeline};
pub use geo::Geocode;
pub use render::{Color, Drawable, Point, Rect, RenderCommand, Renderer};
pub use route::{Directions, DirectionsService, Overlay, Route, Segment};
pub use session::{MapSession, TileLayer};
pub use source::TileSource;
pub use tile::{TileKey, TILE_SIZE};
pub use viewport::{Viewport, MAX_ZOOM};
