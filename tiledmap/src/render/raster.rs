//! Software rendering backend on `tiny-skia`, with decoding via `image`.
//!
//! [`RasterRenderer`] implements the [`Renderer`] capability for the fetch
//! pipeline and the blender, and additionally executes whole command lists
//! onto an offscreen [`Pixmap`] for hosts that want finished frames (the
//! CLI renders PNGs this way).

use std::sync::Arc;

use thiserror::Error;
use tiny_skia::{
    Color as SkColor, ColorU8, FilterQuality, Paint, PathBuilder, Pattern, Pixmap, SpreadMode,
    Stroke, Transform,
};

use super::{Color, DecodeError, Drawable, Rect, RenderCommand, Renderer};

/// A decoded tile held as a premultiplied-RGBA pixmap.
pub struct RasterImage {
    pixmap: Pixmap,
}

impl RasterImage {
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

impl Drawable for RasterImage {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Failure while executing render commands on the software backend.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("surface dimensions {0}x{1} are not drawable")]
    Surface(u32, u32),
    #[error("drawable was not produced by this backend")]
    ForeignImage,
    #[error("png encoding failed: {0}")]
    Png(String),
}

/// Software implementation of [`Renderer`].
#[derive(Default)]
pub struct RasterRenderer;

impl RasterRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Execute a command list onto a fresh surface filled with `background`.
    pub fn execute(
        &self,
        width: u32,
        height: u32,
        background: Color,
        commands: &[RenderCommand],
    ) -> Result<Pixmap, RasterError> {
        let mut pixmap =
            Pixmap::new(width, height).ok_or(RasterError::Surface(width, height))?;
        pixmap.fill(to_sk_color(background));
        for command in commands {
            self.apply(&mut pixmap, command)?;
        }
        Ok(pixmap)
    }

    /// Encode a surface as PNG bytes.
    pub fn to_png(&self, pixmap: &Pixmap) -> Result<Vec<u8>, RasterError> {
        pixmap.encode_png().map_err(|e| RasterError::Png(e.to_string()))
    }

    fn apply(&self, target: &mut Pixmap, command: &RenderCommand) -> Result<(), RasterError> {
        match command {
            RenderCommand::DrawImage { image, dest, src } => {
                let raster = image
                    .as_any()
                    .downcast_ref::<RasterImage>()
                    .ok_or(RasterError::ForeignImage)?;
                draw_scaled(target, raster.pixmap(), *dest, *src);
                Ok(())
            }
            RenderCommand::FillRect { color, rect } => {
                fill_rect(target, *color, *rect);
                Ok(())
            }
            RenderCommand::Polyline { width, color, points } => {
                if points.len() < 2 {
                    return Ok(());
                }
                let mut pb = PathBuilder::new();
                pb.move_to(points[0].x as f32, points[0].y as f32);
                for point in &points[1..] {
                    pb.line_to(point.x as f32, point.y as f32);
                }
                if let Some(path) = pb.finish() {
                    let mut paint = Paint::default();
                    paint.set_color(to_sk_color(*color));
                    paint.anti_alias = true;
                    let stroke = Stroke {
                        width: *width,
                        ..Stroke::default()
                    };
                    target.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
                Ok(())
            }
        }
    }
}

impl Renderer for RasterRenderer {
    fn decode(&self, bytes: &[u8]) -> Result<Arc<dyn Drawable>, DecodeError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| DecodeError(e.to_string()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let mut pixmap =
            Pixmap::new(width, height).ok_or_else(|| DecodeError("empty image".to_string()))?;
        for (px, out) in decoded.pixels().zip(pixmap.pixels_mut()) {
            let [r, g, b, a] = px.0;
            *out = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Arc::new(RasterImage::from_pixmap(pixmap)))
    }

    fn compose(
        &self,
        base: &Arc<dyn Drawable>,
        layers: &[Arc<dyn Drawable>],
    ) -> Result<Arc<dyn Drawable>, DecodeError> {
        let base_raster = base
            .as_any()
            .downcast_ref::<RasterImage>()
            .ok_or_else(|| DecodeError("foreign drawable".to_string()))?;
        let width = base_raster.width();
        let height = base_raster.height();
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| DecodeError("empty compose surface".to_string()))?;

        let full = Rect::new(0, 0, width as i32, height as i32);
        draw_scaled(
            &mut pixmap,
            base_raster.pixmap(),
            full,
            Rect::new(0, 0, base_raster.width() as i32, base_raster.height() as i32),
        );
        for layer in layers {
            let raster = layer
                .as_any()
                .downcast_ref::<RasterImage>()
                .ok_or_else(|| DecodeError("foreign drawable".to_string()))?;
            draw_scaled(
                &mut pixmap,
                raster.pixmap(),
                full,
                Rect::new(0, 0, raster.width() as i32, raster.height() as i32),
            );
        }
        Ok(Arc::new(RasterImage::from_pixmap(pixmap)))
    }
}

fn to_sk_color(color: Color) -> SkColor {
    SkColor::from_rgba8(color.r, color.g, color.b, color.a)
}

fn fill_rect(target: &mut Pixmap, color: Color, rect: Rect) {
    if rect.is_empty() {
        return;
    }
    let Some(sk_rect) = tiny_skia::Rect::from_xywh(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    ) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color));
    target.fill_rect(sk_rect, &paint, Transform::identity(), None);
}

/// Draw `src` of `source` scaled into `dest` on `target`.
///
/// Implemented as a pattern fill of the destination rectangle, so clipping
/// to the surface falls out of rasterization.
fn draw_scaled(target: &mut Pixmap, source: &Pixmap, dest: Rect, src: Rect) {
    if dest.is_empty() || src.is_empty() {
        return;
    }
    let Some(sk_dest) = tiny_skia::Rect::from_xywh(
        dest.x as f32,
        dest.y as f32,
        dest.width as f32,
        dest.height as f32,
    ) else {
        return;
    };

    let sx = dest.width as f32 / src.width as f32;
    let sy = dest.height as f32 / src.height as f32;
    let tx = dest.x as f32 - src.x as f32 * sx;
    let ty = dest.y as f32 - src.y as f32 * sy;

    let quality = if sx == 1.0 && sy == 1.0 {
        FilterQuality::Nearest
    } else {
        FilterQuality::Bilinear
    };
    let mut paint = Paint::default();
    paint.shader = Pattern::new(
        source.as_ref(),
        SpreadMode::Pad,
        quality,
        1.0,
        Transform::from_row(sx, 0.0, 0.0, sy, tx, ty),
    );
    target.fill_rect(sk_dest, &paint, Transform::identity(), None);
}
