//! Board table commands

use std::fs;

use anyhow::{Context, Result};
use log::{info, warn};

use super::spawn_progress_logger;
use crate::boards::BoardCatalog;
use crate::cli::args::Cli;
use crate::models::BoardInfo;
use crate::process::PioRunner;
use crate::utils::logging::ProgressReporter;

/// Print the cached board table, optionally filtered
pub async fn execute_list_boards_command(cli: &Cli, filter: Option<&str>) -> Result<()> {
    let config = cli.app_config();
    let catalog = BoardCatalog::load(&config.board_cache_path())
        .context("Failed to read the cached board table")?;

    if catalog.is_empty() {
        warn!("⚠️  No boards cached, run `piobrew refresh-boards` first");
        return Ok(());
    }

    let needle = filter.map(str::to_lowercase);
    let mut boards: Vec<&BoardInfo> = catalog
        .boards()
        .iter()
        .filter(|b| needle.as_deref().is_none_or(|n| matches_filter(b, n)))
        .collect();
    boards.sort_by(|a, b| a.id.cmp(&b.id));

    for board in &boards {
        let ota = if board.is_wireless_capable() { " [OTA]" } else { "" };
        println!(
            "{:<32} {:<40} {:<12} {}{}",
            board.id, board.name, board.mcu, board.platform, ota
        );
    }
    println!("\nTotal boards: {}", boards.len());
    Ok(())
}

/// Ask PlatformIO for its board table and cache it
pub async fn execute_refresh_boards_command(cli: &Cli) -> Result<()> {
    let config = cli.app_config();
    fs::create_dir_all(&config.cache_dir)
        .with_context(|| format!("Cannot create {}", config.cache_dir.display()))?;

    let (reporter, rx) = ProgressReporter::channel();
    let log_handler = spawn_progress_logger(rx);

    let runner = PioRunner::new(config.pio_executable.clone());
    let cache_path = config.board_cache_path();
    let cwd = config.cache_dir.clone();
    let catalog = tokio::task::spawn_blocking(move || {
        BoardCatalog::refresh(&runner, &cwd, &cache_path, &reporter)
    })
    .await??;

    log_handler.await?;
    info!("✅ Cached {} boards", catalog.len());
    Ok(())
}

fn matches_filter(board: &BoardInfo, needle: &str) -> bool {
    [&board.id, &board.name, &board.mcu]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}
