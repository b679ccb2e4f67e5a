//! Fixed-step simulate-then-draw loop without a window.
//!
//! [`HeadlessRunner`] advances a [`PhysicsWorld`] by a fixed timestep,
//! snapshots it and renders the snapshot onto any [`Surface`].
//!
//! # Example
//!
//! ```
//! use vellum_render::prelude::*;
//! use vellum_scene::prelude::*;
//!
//! let mut physics = PhysicsWorld::new(0.0, 9.81);
//! physics
//!     .add_body(BodyDesc::new(Vector::new(0.0, 0.0), vec![box_part(2.0, 2.0)]))
//!     .unwrap();
//!
//! let render = Render::new(RenderOptions::default()).unwrap();
//! let mut runner = HeadlessRunner::new(physics, render, RunnerConfig::default());
//! let mut surface = RecordingSurface::new(800.0, 600.0);
//! let reports = runner.run_frames(3, &mut surface);
//!
//! assert_eq!(reports.len(), 3);
//! assert_eq!(runner.frame_count(), 3);
//! ```

use std::time::{Duration, Instant};

use tracing::debug;
use vellum_scene::composite::Scene;
use vellum_scene::physics::PhysicsWorld;

use crate::render::Render;
use crate::surface::Surface;

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Simulation step per frame, in seconds.
    pub fixed_dt: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
        }
    }
}

/// What happened in one [`HeadlessRunner::frame`].
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Collision events raised by the physics step.
    pub collisions: usize,
    /// Step plus render time.
    pub elapsed: Duration,
}

/// Steps physics and renders each resulting snapshot.
#[derive(Debug)]
pub struct HeadlessRunner {
    physics: PhysicsWorld,
    render: Render,
    config: RunnerConfig,
    frame: u64,
    last_scene: Option<Scene>,
}

impl HeadlessRunner {
    /// Create a runner.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(physics: PhysicsWorld, render: Render, config: RunnerConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        Self {
            physics,
            render,
            config,
            frame: 0,
            last_scene: None,
        }
    }

    /// Step once and draw the result.
    pub fn frame(&mut self, surface: &mut dyn Surface) -> FrameReport {
        let start = Instant::now();
        let collisions = self.physics.step(self.config.fixed_dt);
        let scene = self.physics.snapshot();
        self.render.world(&scene, surface);
        self.last_scene = Some(scene);
        self.frame += 1;

        if !collisions.is_empty() {
            debug!(frame = self.frame, count = collisions.len(), "collisions");
        }

        FrameReport {
            frame: self.frame,
            collisions: collisions.len(),
            elapsed: start.elapsed(),
        }
    }

    /// Run `n` frames onto the same surface.
    pub fn run_frames(&mut self, n: u64, surface: &mut dyn Surface) -> Vec<FrameReport> {
        (0..n).map(|_| self.frame(surface)).collect()
    }

    /// Frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// The runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The simulated world.
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Mutable world, e.g. to add bodies between frames.
    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    /// The renderer.
    pub fn render(&self) -> &Render {
        &self.render
    }

    /// Mutable renderer, e.g. to change options.
    pub fn render_mut(&mut self) -> &mut Render {
        &mut self.render
    }

    /// The snapshot drawn by the most recent frame.
    pub fn last_scene(&self) -> Option<&Scene> {
        self.last_scene.as_ref()
    }
}
