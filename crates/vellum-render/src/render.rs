//! The frame orchestrator.
//!
//! [`Render`] owns everything that outlives a frame: options, the texture
//! cache, the view bounds, the pointer, listeners, the last applied
//! background and timing history. [`Render::world`] draws one scene in a
//! single sequential pass:
//!
//! 1. poll finished texture loads and emit `BeforeRender`,
//! 2. apply the backdrop if it changed, then clear the surface,
//! 3. cull to the view bounds (when enabled) and set up the transform,
//! 4. bodies, bounds, debug overlays, constraints,
//! 5. emit `AfterRender` and record the frame time.
//!
//! # Example
//!
//! ```
//! use vellum_render::prelude::*;
//! use vellum_scene::prelude::*;
//!
//! let mut world = Composite::new(0, "world");
//! world.bodies.push(Body::single(
//!     BodyId(1),
//!     Part::rectangle(1, Vector::new(100.0, 100.0), 40.0, 40.0),
//! ));
//! let scene = Scene::new(world);
//!
//! let mut render = Render::new(RenderOptions::default()).unwrap();
//! let mut surface = RecordingSurface::new(800.0, 600.0);
//! render.world(&scene, &mut surface);
//!
//! assert_eq!(render.timing().frames(), 1);
//! assert_eq!(render.current_background(), Some("#14151f"));
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::trace;
use vellum_scene::body::Body;
use vellum_scene::composite::{BodyIndex, Scene};
use vellum_scene::constraint::Constraint;
use vellum_scene::geometry::{Bounds, Vector};

use crate::background::apply_background;
use crate::bodies::draw_bodies;
use crate::bounds::draw_body_bounds;
use crate::events::{ListenerId, RenderEvent, RenderEvents};
use crate::options::RenderOptions;
use crate::overlays::{Overlays, StandardOverlays};
use crate::pointer::Pointer;
use crate::session::DrawSession;
use crate::surface::{CompositeOperation, FillStyle, Surface, Transform};
use crate::texture::{FileTextureLoader, TextureCache};
use crate::RenderError;

/// Number of frame times kept for [`RenderTiming::average`].
const TIMING_HISTORY: usize = 60;

// ---------------------------------------------------------------------------
// RenderTiming
// ---------------------------------------------------------------------------

/// Wall-clock time spent in [`Render::world`].
#[derive(Debug, Clone, Default)]
pub struct RenderTiming {
    /// Time of the most recent frame.
    pub last_elapsed: Duration,
    history: VecDeque<Duration>,
    frames: u64,
}

impl RenderTiming {
    fn record(&mut self, elapsed: Duration) {
        self.last_elapsed = elapsed;
        self.frames += 1;
        if self.history.len() == TIMING_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(elapsed);
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Mean frame time over the recent history, zero before the first frame.
    pub fn average(&self) -> Duration {
        if self.history.is_empty() {
            return Duration::ZERO;
        }
        self.history.iter().sum::<Duration>() / self.history.len() as u32
    }

    /// Recent frame times, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Duration> {
        self.history.iter()
    }
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

/// A renderer instance.
pub struct Render {
    /// Options read every frame. Change them freely between frames.
    pub options: RenderOptions,
    /// View bounds in world coordinates, used when `options.has_bounds`.
    pub bounds: Bounds,
    /// Pointer mapped through the view bounds, if one is attached.
    pub pointer: Option<Pointer>,
    textures: TextureCache,
    events: RenderEvents,
    current_background: Option<String>,
    timing: RenderTiming,
    overlays: Box<dyn Overlays>,
}

impl Render {
    /// Renderer loading textures from the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidOptions`] if the options fail
    /// validation.
    pub fn new(options: RenderOptions) -> Result<Self, RenderError> {
        Self::with_textures(options, TextureCache::new(FileTextureLoader::new()))
    }

    /// Renderer with a caller-supplied texture cache.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidOptions`] if the options fail
    /// validation.
    pub fn with_textures(options: RenderOptions, textures: TextureCache) -> Result<Self, RenderError> {
        options.validate()?;
        let bounds = Bounds::new(Vector::ZERO, Vector::new(options.width, options.height));
        Ok(Self {
            options,
            bounds,
            pointer: None,
            textures,
            events: RenderEvents::new(),
            current_background: None,
            timing: RenderTiming::default(),
            overlays: Box::new(StandardOverlays),
        })
    }

    /// Replace the overlay drawers.
    pub fn with_overlays(mut self, overlays: impl Overlays + 'static) -> Self {
        self.overlays = Box::new(overlays);
        self
    }

    /// Register a frame listener.
    pub fn add_listener(&mut self, listener: impl FnMut(&RenderEvent) + 'static) -> ListenerId {
        self.events.add_listener(listener)
    }

    /// Unregister a frame listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    /// The frame listeners.
    pub fn events(&self) -> &RenderEvents {
        &self.events
    }

    /// The texture cache shared by every frame.
    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    /// Mutable texture cache, e.g. to wait for pending loads.
    pub fn textures_mut(&mut self) -> &mut TextureCache {
        &mut self.textures
    }

    /// The backdrop string last applied to the surface.
    pub fn current_background(&self) -> Option<&str> {
        self.current_background.as_deref()
    }

    /// Frame timing diagnostics.
    pub fn timing(&self) -> &RenderTiming {
        &self.timing
    }

    /// Surface size in device pixels for the current options.
    pub fn canvas_size(&self) -> (f64, f64) {
        (
            self.options.width * self.options.pixel_ratio,
            self.options.height * self.options.pixel_ratio,
        )
    }

    /// Change the device pixel ratio.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidOptions`] unless `ratio` is positive
    /// and finite. The previous ratio is kept on error.
    pub fn set_pixel_ratio(&mut self, ratio: f64) -> Result<(), RenderError> {
        if !(ratio > 0.0 && ratio.is_finite()) {
            return Err(RenderError::InvalidOptions {
                reason: format!("pixelRatio must be positive and finite, got {ratio}"),
            });
        }
        self.options.pixel_ratio = ratio;
        Ok(())
    }

    /// Fit the view bounds around `bodies` plus `padding` on each side.
    ///
    /// The view keeps the aspect ratio of the surface by growing the short
    /// side; with `center` the extra space is split evenly. Enables
    /// `has_bounds`. An empty slice leaves the view unchanged.
    pub fn look_at(&mut self, bodies: &[&Body], padding: Vector, center: bool) {
        let Some(target) = bodies
            .iter()
            .map(|b| b.bounds())
            .reduce(|acc, b| acc.union(&b))
        else {
            return;
        };

        let width = target.width() + 2.0 * padding.x;
        let height = target.height() + 2.0 * padding.y;
        let outer_ratio = self.options.width / self.options.height;
        let inner_ratio = width / height;
        let (mut scale_x, mut scale_y) = (1.0, 1.0);
        if inner_ratio > outer_ratio {
            scale_y = inner_ratio / outer_ratio;
        } else {
            scale_x = outer_ratio / inner_ratio;
        }

        let mut min = target.min;
        let mut max = Vector::new(min.x + width * scale_x, min.y + height * scale_y);
        if center {
            let shift = Vector::new(
                width * 0.5 - width * scale_x * 0.5,
                height * 0.5 - height * scale_y * 0.5,
            );
            min = min.add(shift);
            max = max.add(shift);
        }

        self.bounds = Bounds::new(min.sub(padding), max.sub(padding));
        self.options.has_bounds = true;
        self.sync_pointer();
    }

    fn sync_pointer(&mut self) {
        let scale = Vector::new(
            self.bounds.width() / self.options.width,
            self.bounds.height() / self.options.height,
        );
        let offset = self.bounds.min;
        if let Some(pointer) = &mut self.pointer {
            pointer.set_scale(scale);
            pointer.set_offset(offset);
        }
    }

    /// Draw one frame of `scene` onto `surface`.
    pub fn world(&mut self, scene: &Scene, surface: &mut dyn Surface) {
        let start = Instant::now();

        let all_bodies = scene.world.all_bodies();
        let all_constraints = scene.world.all_constraints();
        let index = BodyIndex::new(&all_bodies);

        self.textures.poll();
        self.events.emit(&RenderEvent::BeforeRender {
            timestamp: scene.timestamp,
        });

        let background = self.options.active_background();
        if self.current_background.as_deref() != Some(background) {
            apply_background(surface, background);
            self.current_background = Some(background.to_owned());
        }

        let (width, height) = surface.size();
        let mut session = DrawSession::begin(surface, self.options.pixel_ratio);
        session.set_composite_operation(CompositeOperation::SourceIn);
        session.set_fill_style(FillStyle::color("transparent"));
        session.fill_rect(0.0, 0.0, width, height);
        session.set_composite_operation(CompositeOperation::SourceOver);

        let (bodies, constraints) = if self.options.has_bounds {
            let bodies: Vec<&Body> = all_bodies
                .iter()
                .copied()
                .filter(|b| b.bounds().overlaps(&self.bounds))
                .collect();
            let constraints: Vec<&Constraint> = all_constraints
                .iter()
                .copied()
                .filter(|c| {
                    match (c.world_point_a(&index), c.world_point_b(&index)) {
                        (Some(a), Some(b)) => self.bounds.contains(a) || self.bounds.contains(b),
                        _ => false,
                    }
                })
                .collect();

            session.start_view_transform(&self.bounds, self.options.width, self.options.height);
            self.sync_pointer();
            (bodies, constraints)
        } else {
            let ratio = self.options.pixel_ratio;
            if ratio != 1.0 {
                session.set_transform(Transform::scale(ratio, ratio));
            }
            (all_bodies.clone(), all_constraints.clone())
        };

        let options = &self.options;
        let overlays = self.overlays.as_ref();
        let surface: &mut dyn Surface = &mut *session;

        if !options.wireframes || (scene.enable_sleeping && options.show_sleeping) {
            draw_bodies(options, &mut self.textures, &bodies, surface);
        } else {
            if options.show_convex_hulls {
                overlays.body_convex_hulls(options, &bodies, surface);
            }
            overlays.body_wireframes(options, &bodies, surface);
        }

        if options.show_bounds {
            draw_body_bounds(options, overlays, &bodies, surface);
        }

        if options.debug {
            if options.show_axes || options.show_angle_indicator {
                overlays.body_axes(options, &bodies, surface);
            }
            if options.show_positions {
                overlays.body_positions(options, &bodies, surface);
            }
            if options.show_velocity {
                overlays.body_velocity(options, &bodies, surface);
            }
            if options.show_ids {
                overlays.body_ids(options, &bodies, surface);
            }
            if options.show_separations {
                overlays.separations(options, &scene.pairs, surface);
            }
            if options.show_collisions {
                overlays.collisions(options, &scene.pairs, surface);
            }
            if options.show_vertex_numbers {
                overlays.vertex_numbers(options, &bodies, surface);
            }
            if options.show_mouse_position {
                if let Some(pointer) = &self.pointer {
                    overlays.mouse_position(options, pointer, surface);
                }
            }
        }

        overlays.constraints(&constraints, &index, surface);
        drop(session);

        self.events.emit(&RenderEvent::AfterRender {
            timestamp: scene.timestamp,
        });

        let elapsed = start.elapsed();
        self.timing.record(elapsed);
        trace!(
            frame = self.timing.frames(),
            bodies = bodies.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "frame rendered"
        );
    }
}

impl std::fmt::Debug for Render {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Render")
            .field("options", &self.options)
            .field("bounds", &self.bounds)
            .field("textures", &self.textures)
            .field("events", &self.events)
            .field("current_background", &self.current_background)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawCall, RecordingSurface};
    use std::cell::RefCell;
    use std::rc::Rc;
    use vellum_scene::body::{BodyId, Part};
    use vellum_scene::composite::Composite;

    fn scene_with(bodies: Vec<Body>) -> Scene {
        let mut world = Composite::new(0, "world");
        world.bodies = bodies;
        Scene::new(world)
    }

    fn square(id: u64, x: f64, y: f64) -> Body {
        Body::single(BodyId(id), Part::rectangle(id, Vector::new(x, y), 20.0, 20.0))
    }

    #[test]
    fn frame_clears_with_source_in_then_restores_source_over() {
        let mut render = Render::new(RenderOptions::default()).unwrap();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        render.world(&scene_with(vec![]), &mut surface);

        let calls = surface.calls();
        let clear = calls
            .iter()
            .position(|c| matches!(c, DrawCall::FillRect { .. }))
            .expect("surface cleared");
        assert_eq!(
            calls[clear - 2],
            DrawCall::SetCompositeOperation(CompositeOperation::SourceIn)
        );
        assert_eq!(
            calls[clear + 1],
            DrawCall::SetCompositeOperation(CompositeOperation::SourceOver)
        );
    }

    #[test]
    fn events_bracket_the_frame() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut render = Render::new(RenderOptions::default()).unwrap();
        let log = Rc::clone(&seen);
        render.add_listener(move |e| log.borrow_mut().push(*e));

        let mut scene = scene_with(vec![]);
        scene.timestamp = 16.0;
        render.world(&scene, &mut RecordingSurface::new(10.0, 10.0));

        assert_eq!(
            *seen.borrow(),
            vec![
                RenderEvent::BeforeRender { timestamp: 16.0 },
                RenderEvent::AfterRender { timestamp: 16.0 },
            ]
        );
    }

    #[test]
    fn pixel_ratio_scales_without_bounds() {
        let options = RenderOptions {
            pixel_ratio: 2.0,
            ..RenderOptions::default()
        };
        let mut render = Render::new(options).unwrap();
        let mut surface = RecordingSurface::new(1600.0, 1200.0);
        render.world(&scene_with(vec![]), &mut surface);
        assert!(surface
            .calls()
            .contains(&DrawCall::SetTransform(Transform::scale(2.0, 2.0))));
        assert_eq!(render.canvas_size(), (1600.0, 1200.0));
    }

    #[test]
    fn set_pixel_ratio_rejects_non_positive() {
        let mut render = Render::new(RenderOptions::default()).unwrap();
        assert!(render.set_pixel_ratio(0.0).is_err());
        assert!(render.set_pixel_ratio(f64::NAN).is_err());
        assert_eq!(render.options.pixel_ratio, 1.0);
        render.set_pixel_ratio(3.0).unwrap();
        assert_eq!(render.options.pixel_ratio, 3.0);
    }

    #[test]
    fn look_at_keeps_surface_aspect_ratio() {
        let mut render = Render::new(RenderOptions::default()).unwrap();
        let a = square(1, 0.0, 0.0);
        let b = square(2, 100.0, 0.0);
        render.look_at(&[&a, &b], Vector::new(10.0, 10.0), true);

        assert!(render.options.has_bounds);
        let ratio = render.bounds.width() / render.bounds.height();
        assert!((ratio - 800.0 / 600.0).abs() < 1e-9, "ratio = {ratio}");
        // union is x in [-10, 110], centered view keeps the midpoint
        let mid_x = (render.bounds.min.x + render.bounds.max.x) / 2.0;
        let mid_y = (render.bounds.min.y + render.bounds.max.y) / 2.0;
        assert!((mid_x - 50.0).abs() < 1e-9);
        assert!(mid_y.abs() < 1e-9);
    }

    #[test]
    fn look_at_without_bodies_is_a_no_op() {
        let mut render = Render::new(RenderOptions::default()).unwrap();
        let before = render.bounds;
        render.look_at(&[], Vector::ZERO, false);
        assert_eq!(render.bounds, before);
        assert!(!render.options.has_bounds);
    }

    #[test]
    fn view_bounds_update_the_pointer() {
        let mut render = Render::new(RenderOptions::default()).unwrap();
        render.pointer = Some(Pointer::new());
        render.options.has_bounds = true;
        render.bounds = Bounds::new(Vector::new(100.0, 100.0), Vector::new(500.0, 400.0));
        render.world(&scene_with(vec![]), &mut RecordingSurface::new(800.0, 600.0));

        let pointer = render.pointer.unwrap();
        assert_eq!(pointer.scale, Vector::new(0.5, 0.5));
        assert_eq!(pointer.offset, Vector::new(100.0, 100.0));
    }

    #[test]
    fn timing_is_recorded_every_frame() {
        let mut render = Render::new(RenderOptions::default()).unwrap();
        let scene = scene_with(vec![square(1, 50.0, 50.0)]);
        let mut surface = RecordingSurface::new(800.0, 600.0);
        for _ in 0..3 {
            render.world(&scene, &mut surface);
        }
        assert_eq!(render.timing().frames(), 3);
        assert_eq!(render.timing().history().count(), 3);
        assert!(render.timing().average() <= render.timing().history().copied().max().unwrap());
    }

    #[test]
    fn timing_history_is_bounded() {
        let mut timing = RenderTiming::default();
        for i in 0..(TIMING_HISTORY as u64 + 5) {
            timing.record(Duration::from_millis(i));
        }
        assert_eq!(timing.history().count(), TIMING_HISTORY);
        assert_eq!(timing.history().next(), Some(&Duration::from_millis(5)));
        assert_eq!(timing.last_elapsed, Duration::from_millis(TIMING_HISTORY as u64 + 4));
    }
}
