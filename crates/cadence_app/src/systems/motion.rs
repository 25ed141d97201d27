//! Velocity integration and gravity.

use cadence_ecs::Access;
use cadence_math::{Transform, Vec3};
use cadence_task::{Batch, System, SystemContext, Workload};

use crate::components::Velocity;

/// Moves every transform by its velocity, one chunk per subtask.
#[derive(Debug, Default)]
pub struct ApplyVelocitySystem;

impl System for ApplyVelocitySystem {
    fn name(&self) -> &str {
        "apply_velocity"
    }

    fn access(&self) -> Access {
        Access::new().read::<Velocity>().write::<Transform>()
    }

    fn workload(&self, ctx: &SystemContext) -> Workload {
        Workload::each(ctx.world().chunk_count::<Transform>())
    }

    fn run(&self, ctx: &SystemContext, batch: &Batch) {
        let world = ctx.world();
        let Some(velocities) = world.read::<Velocity>() else {
            return;
        };
        let dt = ctx.delta() as f32;
        for index in batch.items.clone() {
            let Some(mut transforms) = world.chunk_mut::<Transform>(index) else {
                continue;
            };
            for (entity, transform) in transforms.iter_mut() {
                if let Some(velocity) = velocities.get(entity) {
                    transform.translate(velocity.linear * dt);
                }
            }
        }
    }
}

/// Accelerates every velocity by a constant, one chunk per subtask.
#[derive(Debug)]
pub struct ApplyGravitySystem {
    gravity: Vec3,
}

impl ApplyGravitySystem {
    #[must_use]
    pub fn new(gravity: Vec3) -> Self {
        Self { gravity }
    }
}

impl System for ApplyGravitySystem {
    fn name(&self) -> &str {
        "apply_gravity"
    }

    fn access(&self) -> Access {
        Access::new().write::<Velocity>()
    }

    fn workload(&self, ctx: &SystemContext) -> Workload {
        Workload::each(ctx.world().chunk_count::<Velocity>())
    }

    fn run(&self, ctx: &SystemContext, batch: &Batch) {
        let step = self.gravity * ctx.delta() as f32;
        for index in batch.items.clone() {
            if let Some(mut velocities) = ctx.world().chunk_mut::<Velocity>(index) {
                for (_, velocity) in velocities.iter_mut() {
                    velocity.linear += step;
                }
            }
        }
    }
}
