use cadence_ecs::Access;
use cadence_task::{Batch, Severity, System, SystemContext};

use crate::components::{Age, Lifetime};

/// Despawns every entity whose age reached its lifetime.
///
/// Despawn releases every component type of the entity, so this system
/// declares exclusive access and runs alone at the end of the cycle.
#[derive(Debug, Default)]
pub struct LifetimeSystem;

impl System for LifetimeSystem {
    fn name(&self) -> &str {
        "lifetime"
    }

    fn access(&self) -> Access {
        Access::exclusive()
    }

    fn run(&self, ctx: &SystemContext, _batch: &Batch) {
        let world = ctx.world();
        let expired: Vec<_> = world
            .query::<(Age, Lifetime)>()
            .iter()
            .filter(|(_, (age, lifetime))| lifetime.is_expired(age))
            .map(|(entity, _)| entity)
            .collect();

        let despawned = expired.into_iter().filter(|&e| world.despawn(e)).count();
        if despawned > 0 {
            ctx.logger().record(
                format!("frame {}: {despawned} spaceship(s) expired", ctx.frame()),
                Severity::Info,
            );
        }
    }
}
