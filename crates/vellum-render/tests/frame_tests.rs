//! Whole-frame tests for the renderer.
//!
//! Every test drives `Render::world` (or a drawer) against a
//! `RecordingSurface` and inspects the recorded calls; no pixels involved.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vellum_render::bodies::draw_bodies;
use vellum_render::prelude::*;
use vellum_scene::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Loader that hands out a 16x16 image and counts calls.
struct Counting(Arc<AtomicUsize>);

impl TextureLoader for Counting {
    fn load(&self, path: &str) -> Result<TextureImage, RenderError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(TextureImage::solid(path, 16, 16, [10, 20, 30, 255]))
    }
}

fn counting_cache() -> (TextureCache, Arc<AtomicUsize>) {
    let loads = Arc::new(AtomicUsize::new(0));
    (TextureCache::new(Counting(Arc::clone(&loads))), loads)
}

fn scene_of(bodies: Vec<Body>) -> Scene {
    let mut world = Composite::new(0, "world");
    world.bodies = bodies;
    Scene::new(world)
}

fn square(id: u64, x: f64, y: f64) -> Body {
    Body::single(BodyId(id), Part::rectangle(id, Vector::new(x, y), 20.0, 20.0))
}

fn filled() -> RenderOptions {
    RenderOptions {
        wireframes: false,
        ..RenderOptions::default()
    }
}

// ---------------------------------------------------------------------------
// Outlines
// ---------------------------------------------------------------------------

#[test]
fn square_with_one_internal_edge_strokes_three_edges() {
    let mut part = Part::rectangle(1, Vector::new(50.0, 50.0), 20.0, 20.0);
    part.vertices[1].is_internal = true;
    let mut aggregate = part.clone();
    aggregate.id = 0;
    aggregate.is_aggregate = true;
    aggregate.vertices.iter_mut().for_each(|v| v.is_internal = false);

    let mut body = Body::single(BodyId(1), part.clone());
    body.parts.insert(0, aggregate);

    let mut render = Render::new(RenderOptions::default()).unwrap();
    let mut surface = RecordingSurface::new(800.0, 600.0);
    render.world(&scene_of(vec![body]), &mut surface);

    let strokes = surface.strokes();
    assert_eq!(strokes.len(), 1);
    let segments = &strokes[0];
    assert_eq!(segments.len(), 3, "{segments:?}");

    let v = |i: usize| part.vertices[i].point();
    assert!(segments.iter().all(|s| !s.joins(v(1), v(2), 1e-9)));
    assert!(segments.iter().any(|s| s.joins(v(0), v(1), 1e-9)));
    assert!(segments.iter().any(|s| s.joins(v(2), v(3), 1e-9)));
    assert!(segments.iter().any(|s| s.joins(v(3), v(0), 1e-9)));
}

#[test]
fn compound_wireframe_hides_the_seam_unless_asked() {
    let body = Body::compound(
        BodyId(1),
        vec![
            Part::rectangle(1, Vector::new(40.0, 50.0), 20.0, 20.0),
            Part::rectangle(2, Vector::new(60.0, 50.0), 20.0, 20.0),
        ],
    )
    .unwrap();
    let seam = (Vector::new(50.0, 40.0), Vector::new(50.0, 60.0));
    let scene = scene_of(vec![body]);

    let mut render = Render::new(RenderOptions::default()).unwrap();
    let mut surface = RecordingSurface::new(800.0, 600.0);
    render.world(&scene, &mut surface);
    let hidden = &surface.strokes()[0];
    assert_eq!(hidden.len(), 6);
    assert!(hidden.iter().all(|s| !s.joins(seam.0, seam.1, 1e-9)));

    render.options.show_internal_edges = true;
    let mut surface = RecordingSurface::new(800.0, 600.0);
    render.world(&scene, &mut surface);
    let shown = &surface.strokes()[0];
    assert_eq!(shown.len(), 8);
    assert!(shown.iter().any(|s| s.joins(seam.0, seam.1, 1e-9)));
}

// ---------------------------------------------------------------------------
// Visibility and state
// ---------------------------------------------------------------------------

#[test]
fn invisible_body_draws_nothing() {
    let mut body = square(1, 50.0, 50.0);
    body.parts[0].render = PartRender::filled("red");
    body.parts[0].render.sprite = Some(Sprite::new("crate.png"));
    body.parts[0].render.text = Some(TextLabel::literal("hidden"));
    body.render.visible = false;

    let (mut textures, loads) = counting_cache();
    let mut surface = RecordingSurface::new(100.0, 100.0);
    draw_bodies(&filled(), &mut textures, &[&body], &mut surface);

    assert!(surface.calls().is_empty(), "{:?}", surface.calls());
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[test]
fn sleeping_bodies_use_the_full_drawer_in_wireframes() {
    let mut body = square(1, 50.0, 50.0);
    body.is_sleeping = true;
    let mut scene = scene_of(vec![body]);
    scene.enable_sleeping = true;

    let mut render = Render::new(RenderOptions::default()).unwrap();
    let mut surface = RecordingSurface::new(800.0, 600.0);
    render.world(&scene, &mut surface);

    assert!(surface.calls().contains(&DrawCall::SetGlobalAlpha(0.5)));
    assert_eq!(surface.global_alpha(), 1.0);
}

#[test]
fn frame_leaves_no_transform_behind() {
    let mut render = Render::new(RenderOptions::default()).unwrap();
    render.look_at(&[&square(1, 0.0, 0.0)], Vector::new(10.0, 10.0), true);
    let mut surface = RecordingSurface::new(800.0, 600.0);
    render.world(&scene_of(vec![square(1, 0.0, 0.0)]), &mut surface);

    assert_eq!(surface.transform(), Transform::IDENTITY);
    assert_eq!(surface.composite_operation(), CompositeOperation::SourceOver);
}

// ---------------------------------------------------------------------------
// Background
// ---------------------------------------------------------------------------

#[test]
fn unchanged_background_is_applied_once() {
    let options = RenderOptions {
        background: "#fff".to_owned(),
        ..filled()
    };
    let mut render = Render::new(options).unwrap();
    let mut surface = RecordingSurface::new(800.0, 600.0);
    let scene = scene_of(vec![]);

    render.world(&scene, &mut surface);
    render.world(&scene, &mut surface);

    let assigned: Vec<&DrawCall> = surface
        .calls()
        .iter()
        .filter(|c| matches!(c, DrawCall::SetBackground(_)))
        .collect();
    assert_eq!(assigned.len(), 1);
    assert_eq!(
        assigned[0],
        &DrawCall::SetBackground(Background::Style("#fff".to_owned()))
    );

    render.options.wireframes = true;
    render.world(&scene, &mut surface);
    assert_eq!(surface.count(|c| matches!(c, DrawCall::SetBackground(_))), 2);
    assert_eq!(render.current_background(), Some("#14151f"));
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

#[test]
fn bounded_viewport_culls_bodies_and_constraints() {
    let inside = square(1, 50.0, 50.0);
    let outside = square(2, 500.0, 500.0);

    let mut world = Composite::new(0, "world");
    world.bodies = vec![inside, outside];
    world.constraints = vec![
        Constraint::between_points(1, Vector::new(10.0, 10.0), Vector::new(300.0, 300.0)),
        Constraint::between_points(2, Vector::new(300.0, 300.0), Vector::new(400.0, 400.0)),
    ];
    let scene = Scene::new(world);

    let mut render = Render::new(RenderOptions::default()).unwrap();
    render.options.has_bounds = true;
    render.bounds = Bounds::new(Vector::new(0.0, 0.0), Vector::new(200.0, 150.0));

    let mut surface = RecordingSurface::new(800.0, 600.0);
    render.world(&scene, &mut surface);

    let strokes = surface.strokes();
    // wireframes of the inside body, then the one constraint with an
    // anchor in view
    assert_eq!(strokes.len(), 2);
    assert_eq!(strokes[0].len(), 4);
    assert!(strokes[1][0].joins(Vector::new(10.0, 10.0), Vector::new(300.0, 300.0), 1e-9));
    assert!(surface
        .calls()
        .contains(&DrawCall::SetTransform(Transform::scale(4.0, 4.0))));
}

#[test]
fn constraint_with_missing_body_is_culled() {
    let mut constraint = Constraint::between_points(1, Vector::new(10.0, 10.0), Vector::ZERO);
    constraint.body_b = Some(BodyId(42));
    let mut world = Composite::new(0, "world");
    world.constraints.push(constraint);

    let mut render = Render::new(RenderOptions::default()).unwrap();
    render.options.has_bounds = true;
    render.bounds = Bounds::new(Vector::ZERO, Vector::new(800.0, 600.0));
    let mut surface = RecordingSurface::new(800.0, 600.0);
    render.world(&Scene::new(world), &mut surface);

    assert_eq!(surface.count(|c| matches!(c, DrawCall::Arc { .. })), 0);
}

// ---------------------------------------------------------------------------
// Textures
// ---------------------------------------------------------------------------

#[test]
fn shared_texture_loads_once_and_draws_after_ready() {
    let sprite_body = |id: u64, x: f64| {
        let mut body = square(id, x, 50.0);
        body.parts[0].render.sprite = Some(Sprite::new("crate.png"));
        body
    };
    let scene = scene_of(vec![sprite_body(1, 50.0), sprite_body(2, 150.0)]);

    let (textures, loads) = counting_cache();
    let mut render = Render::with_textures(filled(), textures).unwrap();
    let mut surface = RecordingSurface::new(800.0, 600.0);

    render.world(&scene, &mut surface);
    assert_eq!(surface.count(|c| matches!(c, DrawCall::DrawImage { .. })), 0);
    assert_eq!(render.textures().len(), 1);

    assert!(render.textures_mut().wait_pending(Duration::from_secs(5)));
    surface.clear();
    render.world(&scene, &mut surface);

    assert_eq!(surface.count(|c| matches!(c, DrawCall::DrawImage { .. })), 2);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(render.textures().loads_started(), 1);
}

// ---------------------------------------------------------------------------
// Overlays and events
// ---------------------------------------------------------------------------

#[test]
fn debug_overlays_follow_their_toggles() {
    let mut body = square(1, 50.0, 50.0);
    body.velocity = Vector::new(3.0, 0.0);
    let scene = scene_of(vec![body]);

    let mut render = Render::new(RenderOptions::default()).unwrap();
    render.options.show_positions = true;
    render.options.show_velocity = true;

    let mut surface = RecordingSurface::new(800.0, 600.0);
    render.world(&scene, &mut surface);
    assert_eq!(surface.count(|c| matches!(c, DrawCall::Arc { .. })), 0);

    render.options.debug = true;
    surface.clear();
    render.world(&scene, &mut surface);
    assert_eq!(surface.count(|c| matches!(c, DrawCall::Arc { .. })), 1);
    assert!(surface
        .calls()
        .contains(&DrawCall::SetStrokeStyle("cornflowerblue".to_owned())));
}

#[test]
fn removed_listener_stops_hearing_frames() {
    let count = Rc::new(RefCell::new(0));
    let mut render = Render::new(RenderOptions::default()).unwrap();
    let id = {
        let count = Rc::clone(&count);
        render.add_listener(move |event| {
            if matches!(event, RenderEvent::AfterRender { .. }) {
                *count.borrow_mut() += 1;
            }
        })
    };

    let scene = scene_of(vec![]);
    let mut surface = RecordingSurface::new(10.0, 10.0);
    render.world(&scene, &mut surface);
    assert!(render.remove_listener(id));
    render.world(&scene, &mut surface);

    assert_eq!(*count.borrow(), 1);
    assert_eq!(render.timing().frames(), 2);
}

#[test]
fn custom_overlays_replace_the_defaults() {
    struct Quiet;
    impl Overlays for Quiet {
        fn body_wireframes(&self, _: &RenderOptions, _: &[&Body], _: &mut dyn Surface) {}
    }

    let mut render = Render::new(RenderOptions::default())
        .unwrap()
        .with_overlays(Quiet);
    let mut surface = RecordingSurface::new(800.0, 600.0);
    render.world(&scene_of(vec![square(1, 50.0, 50.0)]), &mut surface);
    assert_eq!(surface.count(|c| *c == DrawCall::Stroke), 0);
}
