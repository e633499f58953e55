//! Disk icon cache management commands.

use clap::Subcommand;

use crate::error::CliError;
use crate::runner::CliRunner;
use mapoverlay::config::display_size;
use mapoverlay::icon::{DiskIconCache, PruneResult};

/// Cache subcommands.
#[derive(Subcommand)]
pub enum CacheAction {
    /// Show disk icon cache location and usage
    Stats,
    /// Delete every cached icon
    Clear,
    /// Evict the oldest icons until the cache fits its limits
    Prune,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(false)?;
    runner.log_startup("cache");

    let Some(disk_config) = runner.engine_config().icons.disk else {
        println!("Disk icon cache is disabled (icons.disk_size or icons.disk_max_files is 0)");
        return Ok(());
    };
    let disk = DiskIconCache::new(disk_config);

    match action {
        CacheAction::Stats => {
            let usage = disk.usage()?;
            println!("Disk Icon Cache");
            println!("===============");
            println!();
            println!("Location:   {}", disk.directory().display());
            println!("Icons:      {} / {}", usage.files, disk.max_files());
            println!(
                "Size:       {} / {}",
                display_size(usage.bytes),
                display_size(disk.max_bytes())
            );
        }
        CacheAction::Clear => {
            let result = disk.clear()?;
            println!("Cleared {}", disk.directory().display());
            print_prune_result(&result);
        }
        CacheAction::Prune => {
            let result = disk.prune()?;
            if result.files_deleted == 0 {
                println!("Cache is within limits, nothing to prune");
            }
            print_prune_result(&result);
        }
    }

    Ok(())
}

fn print_prune_result(result: &PruneResult) {
    println!(
        "Deleted {} icons ({}), {} remaining ({})",
        result.files_deleted,
        display_size(result.bytes_freed),
        result.files_remaining,
        display_size(result.bytes_remaining)
    );
}
