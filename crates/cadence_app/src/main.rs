//! Spaceship demo host.
//!
//! Loads configuration, builds the spaceship pipeline on a headless renderer
//! and drives it at a fixed frame rate until `--frames` is reached.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cadence_app::{AppConfig, Args, FrameDriver, HeadlessRenderer, SeededRandom};

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("cadence_app=info".parse()?)
                .add_directive("cadence::deferred=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::from_args(&args)?;
    info!(
        workers = config.task.workers,
        population = config.spawn.population,
        frame_rate = config.tick.frame_rate,
        max_frames = config.tick.max_frames,
        seed = config.seed,
        "cadence host starting"
    );

    let mut driver = FrameDriver::new(
        &config,
        HeadlessRenderer::default(),
        SeededRandom::new(config.seed),
    )?;
    let outcome = driver.run();
    let stats = driver.render().renderer().clone();
    driver.shutdown()?;
    let frames = outcome?;

    info!(
        frames,
        draw_calls = stats.draw_calls,
        objects_drawn = stats.objects_drawn,
        "cadence host shut down"
    );
    Ok(())
}
