//! Disk tile cache management commands.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::commands::common::{cache_dir, format_size};
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Delete every cached tile
    Clear {
        /// Cache directory (defaults to the platform cache dir)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Show cache size per tile source
    Stats {
        /// Cache directory (defaults to the platform cache dir)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

pub fn run(action: CacheAction) -> Result<(), CliError> {
    match action {
        CacheAction::Clear { cache_dir: dir } => {
            let dir = cache_dir(dir);
            if !dir.exists() {
                println!("No cache at {}", dir.display());
                return Ok(());
            }
            let (files, bytes) = walk(&dir)?;
            fs::remove_dir_all(&dir)?;
            println!(
                "Deleted {} files, freed {} from {}",
                files,
                format_size(bytes),
                dir.display()
            );
            Ok(())
        }
        CacheAction::Stats { cache_dir: dir } => {
            let dir = cache_dir(dir);
            println!("Tile cache: {}", dir.display());
            if !dir.exists() {
                println!("  (empty)");
                return Ok(());
            }
            let mut total_files = 0;
            let mut total_bytes = 0;
            let mut entries: Vec<_> = fs::read_dir(&dir)?.filter_map(Result::ok).collect();
            entries.sort_by_key(|e| e.file_name());
            for entry in entries {
                if !entry.path().is_dir() {
                    continue;
                }
                let (files, bytes) = walk(&entry.path())?;
                total_files += files;
                total_bytes += bytes;
                println!(
                    "  {:<20} {:>8} tiles  {:>10}",
                    entry.file_name().to_string_lossy(),
                    files,
                    format_size(bytes)
                );
            }
            println!("  total: {} tiles, {}", total_files, format_size(total_bytes));
            Ok(())
        }
    }
}

/// File count and byte total under a directory.
fn walk(dir: &Path) -> Result<(u64, u64), CliError> {
    let mut files = 0;
    let mut bytes = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            let (f, b) = walk(&entry.path())?;
            files += f;
            bytes += b;
        } else {
            files += 1;
            bytes += metadata.len();
        }
    }
    Ok((files, bytes))
}
