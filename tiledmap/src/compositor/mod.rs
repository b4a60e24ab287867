//! The render pass: walk the visible tile grid and emit draw commands.
//!
//! Each visible cell resolves through a fixed precedence: the tile itself
//! if ready, else all four children at half scale, else the nearest ready
//! ancestor scaled up, else a placeholder. Only cells that fall all the
//! way to the placeholder count as missing; the count tells the host
//! whether another repaint is worth scheduling once fetches complete.

use std::time::Instant;

use crate::geo::Geocode;
use crate::render::{Point, Rect, RenderCommand};
use crate::route::{Overlay, Route, LEVEL_TO_ZOOM};
use crate::session::TileLayer;
use crate::tile::{TileKey, TILE_SIZE};
use crate::viewport::Viewport;

/// The output of one render pass.
#[derive(Debug, Default)]
pub struct RenderPass {
    pub commands: Vec<RenderCommand>,
    /// Cells drawn as placeholder, fill, or gap.
    pub missing: usize,
}

/// Render `layer` through `viewport` into the pixel rectangle
/// `[x, x+width) x [y, y+height)`, then draw routes and overlays on top.
pub fn render(
    layer: &dyn TileLayer,
    viewport: &Viewport,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    routes: &[Route],
    overlays: &[Overlay],
    now: Instant,
) -> RenderPass {
    let mut pass = RenderPass::default();
    if width <= 0 || height <= 0 {
        return pass;
    }

    let offset = viewport.center_offset();
    let center = viewport.center_tile();
    let zoom = viewport.zoom();
    let rect = Rect::new(x, y, width, height);

    // Position of the center tile's top-left corner on screen, then back
    // up to the first tile column/row that could intersect the rectangle.
    let mid_x = x + width / 2 - offset.x;
    let mid_y = y + height / 2 - offset.y;
    let x_tiles = (mid_x - x) / TILE_SIZE + 1;
    let y_tiles = (mid_y - y) / TILE_SIZE + 1;
    let x_start = mid_x - x_tiles * TILE_SIZE;
    let y_start = mid_y - y_tiles * TILE_SIZE;

    let mut column_key = TileKey::new(center.x - x_tiles, center.y - y_tiles, zoom);
    let mut current_x = x_start;
    while current_x < x + width {
        let mut key = column_key;
        let mut current_y = y_start;
        while current_y < y + height {
            render_cell(layer, &rect, current_x, current_y, key, now, &mut pass);
            current_y += TILE_SIZE;
            key.y += 1;
        }
        current_x += TILE_SIZE;
        column_key.x += 1;
    }

    let pixel_zoom = zoom + 8;
    let center_x_ref = (center.x as i64) << 8;
    let center_y_ref = (center.y as i64) << 8;
    let span = 1i64 << pixel_zoom;
    let tl = Geocode::new(
        crate::geo::y_to_latitude(
            (center_y_ref + offset.y as i64 - height as i64 / 2).max(0),
            pixel_zoom,
        ),
        crate::geo::x_to_longitude(
            (center_x_ref + offset.x as i64 - width as i64 / 2).max(0),
            pixel_zoom,
        ),
    );
    let br = Geocode::new(
        crate::geo::y_to_latitude(
            (center_y_ref + offset.y as i64 + height as i64 / 2).min(span),
            pixel_zoom,
        ),
        crate::geo::x_to_longitude(
            (center_x_ref + offset.x as i64 + width as i64 / 2).min(span),
            pixel_zoom,
        ),
    );
    let adjust = (mid_x as i64 - center_x_ref, mid_y as i64 - center_y_ref);

    for route in routes {
        draw_route(route, zoom, pixel_zoom, tl, br, adjust, &mut pass);
    }
    for overlay in overlays {
        draw_overlay(overlay, pixel_zoom, tl, br, adjust, &mut pass);
    }

    pass
}

/// Resolve and draw one grid cell whose top-left corner is at
/// `(cell_x, cell_y)` on screen.
fn render_cell(
    layer: &dyn TileLayer,
    rect: &Rect,
    cell_x: i32,
    cell_y: i32,
    key: TileKey,
    now: Instant,
    pass: &mut RenderPass,
) {
    let cell = Rect::new(cell_x, cell_y, TILE_SIZE, TILE_SIZE);
    let tile_rect = cell.intersect(rect);
    let source_rect = Rect::new(
        tile_rect.x - cell_x,
        tile_rect.y - cell_y,
        tile_rect.width,
        tile_rect.height,
    );

    // Off the edge of the world: opaque layers paint background, overlays
    // leave the cell alone. Never counted as missing.
    if !key.is_valid() {
        if !layer.has_alpha() && !tile_rect.is_empty() {
            pass.commands.push(RenderCommand::FillRect {
                color: layer.back_color(),
                rect: tile_rect,
            });
        }
        return;
    }

    if let Some(image) = layer.get_or_fetch(key, now).image() {
        if !tile_rect.is_empty() {
            pass.commands.push(RenderCommand::DrawImage {
                image: image.clone(),
                dest: tile_rect,
                src: source_rect,
            });
        }
        return;
    }

    if draw_from_children(layer, rect, cell_x, cell_y, key, now, pass) {
        return;
    }
    if draw_from_ancestor(layer, key, tile_rect, source_rect, now, pass) {
        return;
    }

    // Nothing usable anywhere in the quadtree.
    pass.missing += 1;
    if layer.has_alpha() {
        return;
    }
    if let Some(refresh) = layer.refresh_image() {
        if !tile_rect.is_empty() {
            pass.commands.push(RenderCommand::DrawImage {
                image: refresh,
                dest: tile_rect,
                src: source_rect,
            });
        }
    } else if !tile_rect.is_empty() {
        pass.commands.push(RenderCommand::FillRect {
            color: layer.back_color(),
            rect: tile_rect,
        });
    }
}

/// Draw the cell from its four children at half scale. All four must be
/// ready; a partial set would leave seams.
fn draw_from_children(
    layer: &dyn TileLayer,
    rect: &Rect,
    cell_x: i32,
    cell_y: i32,
    key: TileKey,
    now: Instant,
    pass: &mut RenderPass,
) -> bool {
    let children = key.children();
    let mut images = Vec::with_capacity(4);
    for child in children {
        match layer.ready_in_cache(child, now) {
            Some(image) => images.push(image),
            None => return false,
        }
    }

    let half = TILE_SIZE / 2;
    let quadrants = [
        Point::new(cell_x, cell_y),
        Point::new(cell_x + half, cell_y),
        Point::new(cell_x, cell_y + half),
        Point::new(cell_x + half, cell_y + half),
    ];
    for (image, origin) in images.into_iter().zip(quadrants) {
        let dest = Rect::new(origin.x, origin.y, half, half).intersect(rect);
        if dest.is_empty() {
            continue;
        }
        // The child covers the quadrant at double resolution.
        let src = Rect::new(
            (dest.x - origin.x) * 2,
            (dest.y - origin.y) * 2,
            dest.width * 2,
            dest.height * 2,
        );
        pass.commands.push(RenderCommand::DrawImage { image, dest, src });
    }
    true
}

/// Draw the cell from the nearest ready ancestor, scaling up the
/// corresponding sub-rectangle.
fn draw_from_ancestor(
    layer: &dyn TileLayer,
    key: TileKey,
    tile_rect: Rect,
    source_rect: Rect,
    now: Instant,
    pass: &mut RenderPass,
) -> bool {
    let mut node = key;
    let mut src = source_rect;
    while node.zoom > 0 {
        // Each level up, the cell occupies a half-size sub-rectangle of
        // the ancestor, shifted by 128 on the axes where this node is the
        // odd child.
        src.width /= 2;
        src.height /= 2;
        src.x /= 2;
        src.y /= 2;
        if node.x % 2 == 1 {
            src.x += 128;
        }
        if node.y % 2 == 1 {
            src.y += 128;
        }
        node = match node.parent() {
            Some(parent) => parent,
            None => break,
        };
        if let Some(image) = layer.ready_in_cache(node, now) {
            if !tile_rect.is_empty() {
                pass.commands.push(RenderCommand::DrawImage {
                    image,
                    dest: tile_rect,
                    src,
                });
            }
            return true;
        }
    }
    false
}

fn box_contains(tl: Geocode, br: Geocode, g: Geocode) -> bool {
    g.latitude > br.latitude
        && g.latitude < tl.latitude
        && g.longitude > tl.longitude
        && g.longitude < br.longitude
}

fn to_screen(g: Geocode, pixel_zoom: u8, adjust: (i64, i64)) -> Point {
    Point::new(
        (crate::geo::longitude_to_x(g.longitude, pixel_zoom) + adjust.0) as i32,
        (crate::geo::latitude_to_y(g.latitude, pixel_zoom) + adjust.1) as i32,
    )
}

/// Project a route polyline to screen space and emit one stroke.
///
/// Vertices below the current zoom's detail threshold are skipped. Runs
/// of off-screen vertices collapse to a single boundary point on each of
/// exit and entry so the stroke still reaches the screen edge.
fn draw_route(
    route: &Route,
    zoom: u8,
    pixel_zoom: u8,
    tl: Geocode,
    br: Geocode,
    adjust: (i64, i64),
    pass: &mut RenderPass,
) {
    let mut points = Vec::new();
    let mut last_offscreen: Option<Geocode> = None;
    for (i, geocode) in route.polyline.iter().enumerate() {
        let level = route.levels.get(i).copied().unwrap_or(3).min(3);
        if LEVEL_TO_ZOOM[level] > zoom as i32 {
            continue;
        }

        if !box_contains(tl, br, *geocode) {
            // Leaving the screen: draw out to this vertex, then skip
            // until the line comes back.
            if last_offscreen.is_none() {
                points.push(to_screen(*geocode, pixel_zoom, adjust));
            }
            last_offscreen = Some(*geocode);
            continue;
        }

        if let Some(outside) = last_offscreen.take() {
            points.push(to_screen(outside, pixel_zoom, adjust));
        }
        points.push(to_screen(*geocode, pixel_zoom, adjust));
    }

    if points.len() > 1 {
        pass.commands.push(RenderCommand::Polyline {
            width: route.line_width,
            color: route.color,
            points,
        });
    }
}

/// Draw an overlay image centered on its geocode, if on screen.
fn draw_overlay(
    overlay: &Overlay,
    pixel_zoom: u8,
    tl: Geocode,
    br: Geocode,
    adjust: (i64, i64),
    pass: &mut RenderPass,
) {
    if !box_contains(tl, br, overlay.geocode) {
        return;
    }
    let p = to_screen(
        overlay.geocode,
        pixel_zoom,
        (
            adjust.0 + overlay.offset.x as i64,
            adjust.1 + overlay.offset.y as i64,
        ),
    );
    let w = overlay.drawable.width() as i32;
    let h = overlay.drawable.height() as i32;
    pass.commands.push(RenderCommand::DrawImage {
        image: overlay.drawable.clone(),
        dest: Rect::new(p.x - w / 2, p.y - h / 2, w, h),
        src: Rect::new(0, 0, w, h),
    });
}
