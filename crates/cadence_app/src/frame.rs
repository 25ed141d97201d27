//! Host frame driver.
//!
//! Every external frame tick runs, in order:
//!
//! 1. `complete()`: join the cycle dispatched by the previous tick.
//! 2. `render()`: draw the now-stable results.
//! 3. `flush()`: emit log records from that cycle.
//! 4. `clear()`: reset render accumulation.
//! 5. `update(delta)`: publish this frame's elapsed time.
//! 6. `dispatch()`: start the next cycle in the background.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_ecs::World;
use cadence_task::{DeferredLogger, FrameClock, Scheduler, SystemContext, TaskError};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ConfigError, TickConfig};
use crate::random::RandomProvider;
use crate::render::{RenderManager, Renderer};
use crate::systems::spaceship_pipeline;

/// Errors raised while building a [`FrameDriver`].
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Task(#[from] TaskError),
}

/// What one [`FrameDriver::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Frames ticked so far, including this one.
    pub frame: u64,
    /// Objects drawn from the joined cycle.
    pub rendered: usize,
    /// Log records flushed.
    pub logged: usize,
    /// Time spent waiting for the previous cycle.
    pub join_wait: Duration,
    /// Time spent rendering.
    pub render_time: Duration,
}

/// Drives the scheduler and its collaborators once per frame.
#[derive(Debug)]
pub struct FrameDriver<R> {
    scheduler: Scheduler,
    render: Arc<RenderManager<R>>,
    tick: TickConfig,
    frames: u64,
}

impl<R: Renderer> FrameDriver<R> {
    /// Build the world, collaborators and spaceship pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Config`] if `config` does not validate, or
    /// [`DriverError::Task`] for any pipeline or executor pool construction
    /// error.
    pub fn new<P: RandomProvider>(
        config: &AppConfig,
        renderer: R,
        random: P,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        let context = SystemContext::new(
            Arc::new(World::new()),
            Arc::new(FrameClock::new()),
            Arc::new(DeferredLogger::new(config.task.log_capacity)),
        );
        let render = Arc::new(RenderManager::new(renderer));
        let systems = spaceship_pipeline(&config.spawn, random, Arc::clone(&render));
        let scheduler = Scheduler::new(systems, context, &config.task)?;
        info!(
            workers = config.task.workers,
            population = config.spawn.population,
            systems = scheduler.graph().len(),
            "frame driver ready"
        );
        Ok(Self {
            scheduler,
            render,
            tick: config.tick.clone(),
            frames: 0,
        })
    }

    /// Run one host frame.
    ///
    /// # Errors
    ///
    /// Returns the join error if the previous cycle had panicking subtasks,
    /// or the dispatch error if the next cycle could not start.
    pub fn tick(&mut self, delta: f64) -> Result<FrameStats, TaskError> {
        let started = Instant::now();
        self.scheduler.complete()?;
        let join_wait = started.elapsed();

        let started = Instant::now();
        let rendered = self.render.render();
        let render_time = started.elapsed();

        let logged = self.context().logger().flush().emitted;
        self.render.clear();
        self.context().clock().update(delta);
        self.scheduler.dispatch()?;
        self.frames += 1;

        debug!(
            frame = self.frames,
            join_wait_us = join_wait.as_micros() as u64,
            render_us = render_time.as_micros() as u64,
            rendered,
            logged,
            "frame"
        );
        Ok(FrameStats {
            frame: self.frames,
            rendered,
            logged,
            join_wait,
            render_time,
        })
    }

    /// Join the in-flight cycle without starting another.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::SubtaskPanicked`] if a subtask panicked.
    pub fn join(&mut self) -> Result<(), TaskError> {
        self.scheduler.complete()
    }

    /// Tick at the configured frame rate until `max_frames` is reached, or
    /// forever if it is zero. Each tick receives the real time the previous
    /// frame took.
    ///
    /// # Errors
    ///
    /// Stops at the first failing tick and returns its error.
    pub fn run(&mut self) -> Result<u64, TaskError> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.tick.frame_rate);
        let mut delta = frame_duration.as_secs_f64();
        let mut frame_count = 0u64;

        info!(
            frame_rate = self.tick.frame_rate,
            max_frames = self.tick.max_frames,
            "starting frame loop"
        );

        loop {
            let start = Instant::now();
            self.tick(delta)?;

            frame_count += 1;
            if self.tick.max_frames > 0 && frame_count >= self.tick.max_frames {
                info!(frames = frame_count, "frame loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            } else {
                warn!(
                    frame = self.frames,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = frame_duration.as_millis() as u64,
                    "frame exceeded time budget"
                );
            }
            delta = start.elapsed().as_secs_f64();
        }
        Ok(frame_count)
    }

    /// Join any in-flight cycle, stop the pool and dispose the renderer.
    ///
    /// # Errors
    ///
    /// Returns the join error, if any, after teardown has finished.
    pub fn shutdown(mut self) -> Result<(), TaskError> {
        let joined = self.scheduler.complete();
        let logged = self.context().logger().flush().emitted;
        self.scheduler.shutdown()?;
        self.render.dispose();
        info!(frames = self.frames, logged, "frame driver shut down");
        joined
    }

    /// Frames ticked so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// The shared context handed to systems.
    #[must_use]
    pub fn context(&self) -> &SystemContext {
        self.scheduler.context()
    }

    /// The entity-component store.
    #[must_use]
    pub fn world(&self) -> &Arc<World> {
        self.context().world()
    }

    /// The render collaborator.
    #[must_use]
    pub fn render(&self) -> &Arc<RenderManager<R>> {
        &self.render
    }

    /// The scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;
    use crate::render::HeadlessRenderer;

    fn config(population: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.task.workers = 2;
        config.spawn.population = population;
        config.spawn.batch_size = 16;
        config
    }

    fn driver(population: usize) -> FrameDriver<HeadlessRenderer> {
        FrameDriver::new(&config(population), HeadlessRenderer::default(), SeededRandom::new(9))
            .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut zero_rate = config(10);
        zero_rate.tick.frame_rate = 0.0;
        let mut inverted = config(10);
        inverted.spawn.lifetime.min = 5.0;
        inverted.spawn.lifetime.max = 1.0;
        let mut nan_extent = config(10);
        nan_extent.spawn.extent = f32::NAN;

        for bad in [zero_rate, inverted, nan_extent] {
            let result = FrameDriver::new(&bad, HeadlessRenderer::default(), SeededRandom::new(1));
            assert!(matches!(
                result,
                Err(DriverError::Config(ConfigError::Invalid(_)))
            ));
        }
    }

    #[test]
    fn test_first_tick_renders_nothing() {
        let mut driver = driver(50);
        let stats = driver.tick(1.0 / 60.0).unwrap();
        assert_eq!(stats.frame, 1);
        assert_eq!(stats.rendered, 0);
        driver.shutdown().unwrap();
    }

    #[test]
    fn test_second_tick_renders_first_cycle() {
        let mut driver = driver(50);
        driver.tick(1.0 / 60.0).unwrap();
        let stats = driver.tick(1.0 / 60.0).unwrap();
        assert_eq!(stats.rendered, 50);
        assert_eq!(driver.render().renderer().draw_calls, 2);
        driver.shutdown().unwrap();
    }

    #[test]
    fn test_clock_updated_before_dispatch() {
        let mut driver = driver(10);
        driver.tick(0.5).unwrap();
        assert_eq!(driver.context().clock().elapsed(), 0.5);
        assert_eq!(driver.context().clock().frame(), 1);
        driver.shutdown().unwrap();
    }

    #[test]
    fn test_run_limited_frames() {
        let mut config = config(20);
        config.tick = TickConfig {
            frame_rate: 1000.0,
            max_frames: 5,
        };
        let mut driver =
            FrameDriver::new(&config, HeadlessRenderer::default(), SeededRandom::new(1)).unwrap();
        assert_eq!(driver.run().unwrap(), 5);
        assert_eq!(driver.frames(), 5);
        driver.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_joins_in_flight_cycle() {
        let mut driver = driver(100);
        driver.tick(1.0 / 60.0).unwrap();
        let world = Arc::clone(driver.world());
        driver.shutdown().unwrap();
        assert_eq!(world.entity_count(), 100);
    }
}
