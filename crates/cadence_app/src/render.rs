//! Rendering collaborator.
//!
//! A system registers render objects while a cycle runs; after the join the
//! controlling thread calls [`RenderManager::render`] and then
//! [`RenderManager::clear`] before dispatching the next cycle.

use cadence_ecs::Entity;
use cadence_math::Float3x4;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// One object to draw this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderObject {
    pub entity: Entity,
    pub matrix: Float3x4,
}

/// Backend that turns render objects into draw calls.
pub trait Renderer: Send + 'static {
    /// Draw every object registered this frame.
    fn draw(&mut self, objects: &[RenderObject]);

    /// Release backend resources. Called once, at teardown.
    fn dispose(&mut self) {}
}

/// Renderer that only counts what it would have drawn.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeadlessRenderer {
    pub draw_calls: u64,
    pub objects_drawn: u64,
    pub last_frame: usize,
    pub disposed: bool,
}

impl Renderer for HeadlessRenderer {
    fn draw(&mut self, objects: &[RenderObject]) {
        self.draw_calls += 1;
        self.objects_drawn += objects.len() as u64;
        self.last_frame = objects.len();
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}

/// Thread-safe accumulation of render objects in front of a [`Renderer`].
#[derive(Debug)]
pub struct RenderManager<R> {
    pending: Mutex<Vec<RenderObject>>,
    renderer: Mutex<R>,
    disposed: Mutex<bool>,
}

impl<R: Renderer> RenderManager<R> {
    #[must_use]
    pub fn new(renderer: R) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            renderer: Mutex::new(renderer),
            disposed: Mutex::new(false),
        }
    }

    /// Queue objects for this frame. Callable from any worker.
    pub fn register_batch(&self, objects: impl IntoIterator<Item = RenderObject>) {
        self.pending.lock().extend(objects);
    }

    /// Draw everything registered since the last [`clear`](Self::clear).
    ///
    /// Returns the number of objects drawn.
    pub fn render(&self) -> usize {
        if *self.disposed.lock() {
            warn!("render called after dispose");
            return 0;
        }
        let pending = self.pending.lock();
        self.renderer.lock().draw(&pending);
        pending.len()
    }

    /// Drop this frame's registrations.
    pub fn clear(&self) {
        self.pending.lock().clear();
    }

    /// Objects registered since the last clear.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Dispose the backend. Later calls are ignored.
    pub fn dispose(&self) {
        let mut disposed = self.disposed.lock();
        if *disposed {
            return;
        }
        self.renderer.lock().dispose();
        *disposed = true;
        self.pending.lock().clear();
        debug!("render manager disposed");
    }

    /// Access the backend, e.g. to read statistics.
    pub fn renderer(&self) -> MutexGuard<'_, R> {
        self.renderer.lock()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn object(index: u32) -> RenderObject {
        RenderObject {
            entity: Entity::new(index, 0),
            matrix: Float3x4::default(),
        }
    }

    #[test]
    fn test_render_then_clear() {
        let manager = RenderManager::new(HeadlessRenderer::default());
        manager.register_batch([object(0), object(1)]);
        assert_eq!(manager.render(), 2);
        manager.clear();
        assert_eq!(manager.render(), 0);

        let renderer = manager.renderer();
        assert_eq!(renderer.draw_calls, 2);
        assert_eq!(renderer.objects_drawn, 2);
    }

    #[test]
    fn test_concurrent_registration() {
        let manager = Arc::new(RenderManager::new(HeadlessRenderer::default()));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    manager.register_batch((0..100).map(|i| object(t * 100 + i)));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(manager.pending(), 400);
    }

    #[test]
    fn test_dispose_once() {
        let manager = RenderManager::new(HeadlessRenderer::default());
        manager.register_batch([object(0)]);
        manager.dispose();
        manager.dispose();
        assert!(manager.renderer().disposed);
        assert_eq!(manager.render(), 0);
    }
}
