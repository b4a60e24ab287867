//! Command-line front end for the tiledmap engine: render map views to
//! PNG and manage the disk tile cache.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::cache::CacheAction;
use commands::render::RenderArgs;

#[derive(Debug, Parser)]
#[command(name = "tiledmap", version, about = "Render tiled web maps to PNG")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a map view to a PNG file
    Render(RenderArgs),
    /// Manage the disk tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("tiledmap={default_level}"))),
        )
        .init();

    let result = match cli.command {
        Command::Render(args) => commands::render::run(args),
        Command::Cache { action } => commands::cache::run(action),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
