//! Keeps the spaceship population topped up.

use cadence_ecs::Access;
use cadence_math::{Transform, Vec3};
use cadence_task::{Batch, Severity, System, SystemContext, Workload};
use rand::Rng;

use crate::components::{Age, Lifetime, Velocity};
use crate::config::SpawnConfig;
use crate::random::{RandomProvider, stream_key};

/// Spawns the spaceships missing from the configured population.
///
/// Work is split into batches of `batch_size`; each batch draws from its own
/// random stream keyed by frame and batch index.
pub struct SpawnSpaceshipSystem<P> {
    config: SpawnConfig,
    random: P,
}

impl<P: RandomProvider> SpawnSpaceshipSystem<P> {
    #[must_use]
    pub fn new(config: SpawnConfig, random: P) -> Self {
        Self { config, random }
    }

    fn spawn_one(&self, ctx: &SystemContext, rng: &mut P::Rng) {
        let extent = self.config.extent;
        let position = Vec3::new(
            rng.gen_range(-extent..=extent),
            rng.gen_range(-extent..=extent),
            rng.gen_range(-extent..=extent),
        );
        let direction = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        )
        .normalize_or_zero();
        let speed = rng.gen_range(self.config.speed.min..=self.config.speed.max);
        let lifetime = rng.gen_range(self.config.lifetime.min..=self.config.lifetime.max);

        let world = ctx.world();
        let entity = world.spawn();
        let attached = world
            .attach(entity, Transform::from_translation(position))
            .and_then(|()| {
                world.attach(
                    entity,
                    Velocity {
                        linear: direction * speed,
                    },
                )
            })
            .and_then(|()| world.attach(entity, Age::default()))
            .and_then(|()| world.attach(entity, Lifetime { seconds: lifetime }));
        if let Err(err) = attached {
            ctx.logger()
                .record(format!("spaceship {entity} discarded: {err}"), Severity::Error);
            world.despawn(entity);
        }
    }
}

impl<P: RandomProvider> System for SpawnSpaceshipSystem<P> {
    fn name(&self) -> &str {
        "spawn_spaceships"
    }

    fn access(&self) -> Access {
        Access::new()
            .write::<Transform>()
            .write::<Velocity>()
            .write::<Age>()
            .write::<Lifetime>()
    }

    fn workload(&self, ctx: &SystemContext) -> Workload {
        let missing = self
            .config
            .population
            .saturating_sub(ctx.world().entity_count());
        Workload::chunks(missing, self.config.batch_size)
    }

    fn run(&self, ctx: &SystemContext, batch: &Batch) {
        let mut rng = self.random.stream(stream_key(ctx.frame(), batch.index));
        for _ in batch.items.clone() {
            self.spawn_one(ctx, &mut rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cadence_ecs::{Component, World};
    use cadence_task::{DeferredLogger, FrameClock};

    use super::*;
    use crate::random::SeededRandom;

    /// Claims the `Velocity` component name first.
    #[derive(Debug, Clone, Copy)]
    struct FakeVelocity;

    impl Component for FakeVelocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[test]
    fn test_failed_setup_is_logged_and_discarded() {
        let world = Arc::new(World::new());
        world.register::<FakeVelocity>().unwrap();
        let ctx = SystemContext::new(
            Arc::clone(&world),
            Arc::new(FrameClock::new()),
            Arc::new(DeferredLogger::new(16)),
        );
        let config = SpawnConfig {
            population: 3,
            ..SpawnConfig::default()
        };
        let system = SpawnSpaceshipSystem::new(config, SeededRandom::new(1));

        for batch in system.workload(&ctx).batches() {
            system.run(&ctx, &batch);
        }

        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.component_count::<Transform>(), 0);
        assert_eq!(ctx.logger().pending(), 3);
    }
}
