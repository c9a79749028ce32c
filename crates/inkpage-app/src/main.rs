//! Main application entry point.

use clap::Parser;
use inkpage_app::{App, AppConfig, AppResult};
use std::path::PathBuf;
use std::process::ExitCode;

/// Replay an annotation session over a tiled page and export it as PNG.
#[derive(Debug, Parser)]
#[command(name = "inkpage", version, about)]
struct Args {
    /// JSON configuration file; defaults apply to missing fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output PNG path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of pages in the generated document.
    #[arg(long)]
    pages: Option<usize>,

    /// Tile cache capacity.
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Fixed tile edge in pixels.
    #[arg(long)]
    tile_size: Option<u32>,
}

impl Args {
    fn into_config(self) -> AppResult<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(pages) = self.pages {
            config.page_count = pages;
        }
        if let Some(capacity) = self.cache_capacity {
            config.viewer.cache_capacity = capacity;
        }
        if let Some(tile_size) = self.tile_size {
            config.viewer.tile_size = Some(tile_size);
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting inkpage");

    let result = Args::parse()
        .into_config()
        .and_then(App::new)
        .and_then(|app| pollster::block_on(app.run()));

    match result {
        Ok(summary) => {
            log::info!("{:?}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("inkpage: {}", e);
            ExitCode::FAILURE
        }
    }
}
