use cadence_ecs::Access;
use cadence_task::{Batch, System, SystemContext, Workload};

use crate::components::Age;

/// Adds the frame delta to every [`Age`], one chunk per subtask.
#[derive(Debug, Default)]
pub struct AgeSystem;

impl System for AgeSystem {
    fn name(&self) -> &str {
        "age"
    }

    fn access(&self) -> Access {
        Access::new().write::<Age>()
    }

    fn workload(&self, ctx: &SystemContext) -> Workload {
        Workload::each(ctx.world().chunk_count::<Age>())
    }

    fn run(&self, ctx: &SystemContext, batch: &Batch) {
        let dt = ctx.delta() as f32;
        for index in batch.items.clone() {
            if let Some(mut ages) = ctx.world().chunk_mut::<Age>(index) {
                for (_, age) in ages.iter_mut() {
                    age.seconds += dt;
                }
            }
        }
    }
}
