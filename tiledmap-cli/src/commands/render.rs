//! Render a map view to a PNG file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use tokio::time::timeout;
use tracing::info;

use tiledmap::compositor;
use tiledmap::fetch::http::ReqwestClient;
use tiledmap::render::raster::RasterRenderer;
use tiledmap::{FetchConfig, Geocode, MapSession, RenderPass, TileLayer, Viewport};

use crate::commands::common::{cache_dir, SourceType};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Latitude of the view center, degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the view center, degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Tile zoom level (0-15)
    #[arg(long, short, default_value_t = 10)]
    pub zoom: u8,

    /// Tile source
    #[arg(long, short, value_enum, default_value_t = SourceType::GoogleMap)]
    pub source: SourceType,

    /// Output image width in pixels
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Output image height in pixels
    #[arg(long, default_value_t = 768)]
    pub height: u32,

    /// Output PNG path
    #[arg(long, short, default_value = "map.png")]
    pub output: PathBuf,

    /// Tile cache directory (defaults to the platform cache dir)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// How long to wait for tiles before rendering whatever arrived
    #[arg(long, default_value_t = 30)]
    pub wait_secs: u64,
}

pub fn run(args: RenderArgs) -> Result<(), CliError> {
    let runtime = tokio::runtime::Runtime::new()?;
    let config = FetchConfig::new(cache_dir(args.cache_dir.clone()));
    let renderer = Arc::new(RasterRenderer::new());
    let http = Arc::new(ReqwestClient::new(&config)?);

    let (session, mut events) = MapSession::new(
        args.source.to_source(),
        http,
        renderer.clone(),
        config,
        runtime.handle().clone(),
    );

    let viewport = Viewport::centered_on(Geocode::new(args.lat, args.lon), args.zoom);
    let width = args.width as i32;
    let height = args.height as i32;

    // Repaint whenever a fetch lands, until the view is complete or the
    // wait budget runs out.
    let deadline = Instant::now() + Duration::from_secs(args.wait_secs);
    let pass: RenderPass = runtime.block_on(async {
        loop {
            let pass = compositor::render(
                &session,
                &viewport,
                0,
                0,
                width,
                height,
                &[],
                &[],
                Instant::now(),
            );
            if pass.missing == 0 {
                return pass;
            }
            info!(missing = pass.missing, "waiting for tiles");

            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) if !remaining.is_zero() => remaining,
                _ => return pass,
            };
            match timeout(remaining, events.recv()).await {
                Ok(Some(_)) => {
                    // Fold in everything else that has already landed.
                    while events.try_recv().is_ok() {}
                }
                _ => return pass,
            }
        }
    });

    if pass.missing > 0 {
        info!(missing = pass.missing, "rendering with missing tiles");
    }

    let surface = renderer
        .execute(args.width, args.height, session.back_color(), &pass.commands)
        .map_err(|e| CliError::Render(e.to_string()))?;
    let png = renderer
        .to_png(&surface)
        .map_err(|e| CliError::Render(e.to_string()))?;
    std::fs::write(&args.output, png)?;

    println!(
        "Wrote {}x{} map to {}",
        args.width,
        args.height,
        args.output.display()
    );
    Ok(())
}
