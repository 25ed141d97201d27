use std::sync::Arc;

use cadence_ecs::Access;
use cadence_math::Transform;
use cadence_task::{Batch, System, SystemContext, Workload};

use crate::render::{RenderManager, RenderObject, Renderer};

/// Hands every transform to the render manager, one chunk per subtask.
pub struct RegisterRenderObjectsSystem<R> {
    render: Arc<RenderManager<R>>,
}

impl<R: Renderer> RegisterRenderObjectsSystem<R> {
    #[must_use]
    pub fn new(render: Arc<RenderManager<R>>) -> Self {
        Self { render }
    }
}

impl<R: Renderer> System for RegisterRenderObjectsSystem<R> {
    fn name(&self) -> &str {
        "register_render_objects"
    }

    fn access(&self) -> Access {
        Access::new().read::<Transform>()
    }

    fn workload(&self, ctx: &SystemContext) -> Workload {
        Workload::each(ctx.world().chunk_count::<Transform>())
    }

    fn run(&self, ctx: &SystemContext, batch: &Batch) {
        for index in batch.items.clone() {
            if let Some(transforms) = ctx.world().chunk::<Transform>(index) {
                self.render
                    .register_batch(transforms.iter().map(|(entity, transform)| RenderObject {
                        entity,
                        matrix: transform.rows(),
                    }));
            }
        }
    }
}
