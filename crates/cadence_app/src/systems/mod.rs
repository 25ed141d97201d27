//! The spaceship pipeline.
//!
//! Systems run in this order, with conflicts between them resolved by the
//! scheduler from their access profiles:
//!
//! 1. [`SpawnSpaceshipSystem`] tops the population up.
//! 2. [`ApplyVelocitySystem`] integrates positions.
//! 3. [`ApplyGravitySystem`] accelerates velocities.
//! 4. [`AgeSystem`] advances ages (runs beside 2 and 3).
//! 5. [`RegisterRenderObjectsSystem`] hands transforms to the renderer.
//! 6. [`LifetimeSystem`] despawns expired spaceships.

mod age;
mod lifetime;
mod motion;
mod register;
mod spawn;

use std::sync::Arc;

use cadence_task::System;

pub use age::AgeSystem;
pub use lifetime::LifetimeSystem;
pub use motion::{ApplyGravitySystem, ApplyVelocitySystem};
pub use register::RegisterRenderObjectsSystem;
pub use spawn::SpawnSpaceshipSystem;

use crate::config::SpawnConfig;
use crate::random::RandomProvider;
use crate::render::{RenderManager, Renderer};

/// Build the six spaceship systems in pipeline order.
#[must_use]
pub fn spaceship_pipeline<P, R>(
    config: &SpawnConfig,
    random: P,
    render: Arc<RenderManager<R>>,
) -> Vec<Arc<dyn System>>
where
    P: RandomProvider,
    R: Renderer,
{
    vec![
        Arc::new(SpawnSpaceshipSystem::new(config.clone(), random)),
        Arc::new(ApplyVelocitySystem),
        Arc::new(ApplyGravitySystem::new(config.gravity)),
        Arc::new(AgeSystem),
        Arc::new(RegisterRenderObjectsSystem::new(render)),
        Arc::new(LifetimeSystem),
    ]
}
