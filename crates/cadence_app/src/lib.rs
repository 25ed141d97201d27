//! # cadence_app
//!
//! The host side of the cadence scheduler: a spaceship simulation whose six
//! systems run on the executor pool one cycle ahead of rendering.
//!
//! - [`components`]: `Velocity`, `Age` and `Lifetime`.
//! - [`systems`]: the pipeline, in order.
//! - [`random`] / [`render`]: the external collaborators.
//! - [`frame`]: the per-frame `complete` / `render` / `flush` / `clear` /
//!   `update` / `dispatch` sequence.
//! - [`config`]: JSON and command-line configuration.

pub mod components;
pub mod config;
pub mod frame;
pub mod random;
pub mod render;
pub mod systems;

pub use components::{Age, Lifetime, Velocity};
pub use config::{AppConfig, Args, ConfigError, SpawnConfig, TickConfig};
pub use frame::{DriverError, FrameDriver, FrameStats};
pub use random::{RandomProvider, SeededRandom};
pub use render::{HeadlessRenderer, RenderManager, RenderObject, Renderer};
