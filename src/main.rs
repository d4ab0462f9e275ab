use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use simple_logger::SimpleLogger;

use stc_engine::{
    ecs::{InteractionSystem, PickupSystem},
    EngineConfig, Game,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless runner for stc_engine levels")]
struct Cli {
    /// Directory of entity JSON files to load
    #[arg(long)]
    level: Option<PathBuf>,

    /// Engine configuration file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Milliseconds of game time to simulate
    #[arg(long, default_value_t = 1000)]
    millis: u64,

    /// Directory to save the level to after the run
    #[arg(long)]
    save_to: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    SimpleLogger::new()
        .with_level(config.logging.level_filter())
        .init()?;

    let mut game = Game::new(config);
    game.add_system(PickupSystem::new());
    game.add_system(InteractionSystem::new());

    if let Some(level) = &cli.level {
        let report = game
            .load_level(level)
            .with_context(|| format!("failed to read level {}", level.display()))?;
        for (path, err) in &report.skipped {
            warn!("Skipped {}: {err}", path.display());
        }
        info!("Loaded {} entities", report.loaded.len());
    }

    let summary = game.run_for(cli.millis);

    if let Some(dir) = &cli.save_to {
        let written = game
            .save_level(dir)
            .with_context(|| format!("failed to save level to {}", dir.display()))?;
        info!("Saved {written} entities");
    }

    println!(
        "Ran {} ms: {} frames, {} animation ticks, {} entities, {} drawables in the last frame",
        cli.millis,
        summary.frames,
        summary.animation_ticks,
        game.world().entity_count(),
        summary.drawn
    );
    Ok(())
}
