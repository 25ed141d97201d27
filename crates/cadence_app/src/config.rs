//! Host configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! JSON file, and command-line flags.

use std::path::{Path, PathBuf};

use cadence_math::Vec3;
use cadence_task::TaskConfig;
use clap::Parser;
use serde::Deserialize;

/// Command-line arguments.
#[derive(Debug, Default, Parser)]
#[command(name = "cadence_app", about = "Runs the spaceship pipeline on the cadence frame scheduler")]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Executor pool size
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Number of spaceships kept alive
    #[arg(short, long)]
    pub population: Option<usize>,

    /// Stop after this many frames (0 = run forever)
    #[arg(short, long)]
    pub frames: Option<u64>,

    /// Target frames per second
    #[arg(long)]
    pub frame_rate: Option<f64>,

    /// Random seed
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the host frame loop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target frames per second.
    pub frame_rate: f64,
    /// Maximum number of frames to run (0 = unlimited).
    pub max_frames: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            max_frames: 0,
        }
    }
}

/// An inclusive range of `f32` values to sample from.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Spaceship spawning and motion parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Spaceships kept alive.
    pub population: usize,
    /// Spaceships created per spawn subtask.
    pub batch_size: usize,
    /// Spawn positions fall inside `[-extent, extent]` on every axis.
    pub extent: f32,
    /// Initial speed in units per second.
    pub speed: FloatRange,
    /// Lifetime in seconds.
    pub lifetime: FloatRange,
    /// Constant acceleration.
    pub gravity: Vec3,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            population: 1000,
            batch_size: 256,
            extent: 50.0,
            speed: FloatRange::new(1.0, 5.0),
            lifetime: FloatRange::new(2.0, 10.0),
            gravity: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub task: TaskConfig,
    pub tick: TickConfig,
    pub spawn: SpawnConfig,
    pub seed: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            task: TaskConfig::default(),
            tick: TickConfig::default(),
            spawn: SpawnConfig::default(),
            seed: 0x5EED,
        }
    }
}

impl AppConfig {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the configuration from defaults, the optional file and flags.
    ///
    /// # Errors
    ///
    /// Returns any load error, or [`ConfigError::Invalid`] if the result does
    /// not validate.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(args);
        config.validate()?;
        Ok(config)
    }

    /// Override file values with the flags that were given.
    pub fn apply(&mut self, args: &Args) {
        if let Some(workers) = args.workers {
            self.task.workers = workers;
        }
        if let Some(population) = args.population {
            self.spawn.population = population;
        }
        if let Some(frames) = args.frames {
            self.tick.max_frames = frames;
        }
        if let Some(frame_rate) = args.frame_rate {
            self.tick.frame_rate = frame_rate;
        }
        if let Some(seed) = args.seed {
            self.seed = seed;
        }
    }

    /// Check the invariants the frame driver relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.task.workers == 0 {
            return invalid("task.workers must be at least 1");
        }
        if self.spawn.batch_size == 0 {
            return invalid("spawn.batch_size must be at least 1");
        }
        if !(self.tick.frame_rate.is_finite() && self.tick.frame_rate > 0.0) {
            return invalid("tick.frame_rate must be positive");
        }
        if !(self.spawn.extent.is_finite() && self.spawn.extent >= 0.0) {
            return invalid("spawn.extent must be non-negative");
        }
        if !self.spawn.speed.is_valid() {
            return invalid("spawn.speed must satisfy min <= max");
        }
        if !self.spawn.lifetime.is_valid() {
            return invalid("spawn.lifetime must satisfy min <= max");
        }
        Ok(())
    }
}
