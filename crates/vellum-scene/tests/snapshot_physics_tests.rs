//! Snapshot tests against the rapier-backed world.
//!
//! These run the simulation for a few hundred steps and check what the
//! renderer will see: positions, sleeping flags, contact pairs and
//! constraints.

use vellum_scene::prelude::*;

const DT: f64 = 1.0 / 60.0;

/// A 1x1 box dropped onto a wide static floor.
fn box_on_floor() -> (PhysicsWorld, BodyId, BodyId) {
    let mut physics = PhysicsWorld::new(0.0, 9.81);
    let floor = physics
        .add_body(
            BodyDesc::new(Vector::new(0.0, 5.0), vec![box_part(20.0, 1.0)])
                .with_type(PhysicsBodyType::Static)
                .with_label("floor"),
        )
        .unwrap();
    let crate_body = physics
        .add_body(BodyDesc::new(Vector::new(0.0, 3.0), vec![box_part(1.0, 1.0)]).with_label("crate"))
        .unwrap();
    (physics, floor, crate_body)
}

#[test]
fn dropped_box_lands_and_reports_a_contact() {
    let (mut physics, floor, crate_body) = box_on_floor();

    let mut started = Vec::new();
    for _ in 0..120 {
        started.extend(physics.step(DT));
    }
    assert!(
        started
            .iter()
            .any(|c| (c.body_a, c.body_b) == (floor, crate_body) || (c.body_a, c.body_b) == (crate_body, floor)),
        "no collision start: {started:?}"
    );

    let scene = physics.snapshot();
    let bodies = scene.world.all_bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0].label, "floor");
    assert!(bodies[0].is_static);

    // resting on the floor top at y = 4.5
    let resting = bodies[1];
    assert!((resting.position.y - 4.0).abs() < 0.1, "{:?}", resting.position);

    let pair = scene.pairs.first().expect("active contact pair");
    assert!(pair.is_active);
    assert!(!pair.contacts.is_empty());
    assert!((pair.normal.magnitude() - 1.0).abs() < 1e-6);
    assert!(pair.body_a.is_static || pair.body_b.is_static);
}

#[test]
fn resting_box_falls_asleep() {
    let (mut physics, _, _) = box_on_floor();
    for _ in 0..600 {
        physics.step(DT);
    }
    let scene = physics.snapshot();
    assert!(scene.enable_sleeping);
    assert!(scene.world.all_bodies()[1].is_sleeping);
    assert!((scene.timestamp - 600.0 * DT * 1000.0).abs() < 1e-6);
}

#[test]
fn compound_body_snapshot_has_one_seam() {
    let mut physics = PhysicsWorld::new_zero_gravity();
    physics
        .add_body(BodyDesc::new(
            Vector::new(10.0, 10.0),
            vec![
                box_part(2.0, 2.0).at(Vector::new(-1.0, 0.0)),
                box_part(2.0, 2.0).at(Vector::new(1.0, 0.0)),
            ],
        ))
        .unwrap();

    let scene = physics.snapshot();
    let body = scene.world.all_bodies()[0];
    assert!(body.is_compound());
    assert_eq!(body.drawable_parts().count(), 2);
    let internal: usize = body
        .drawable_parts()
        .map(|p| p.vertices.iter().filter(|v| v.is_internal).count())
        .sum();
    assert_eq!(internal, 2);

    let aggregate = body.aggregate_part().expect("aggregate part");
    assert_eq!(aggregate.vertices.len(), 4);
    assert!((aggregate.bounds.width() - 4.0).abs() < 1e-4);
}

#[test]
fn spring_to_world_point_resolves_in_the_snapshot() {
    let mut physics = PhysicsWorld::new_zero_gravity();
    let bob = physics
        .add_body(BodyDesc::new(Vector::new(0.0, 0.0), vec![circle_part(0.5)]))
        .unwrap();
    physics
        .add_constraint(ConstraintDesc {
            body_a: bob,
            body_b: None,
            point_a: Vector::ZERO,
            point_b: Vector::new(0.0, -3.0),
            stiffness: 10.0,
            damping: 1.0,
            render: ConstraintRender {
                kind: ConstraintKind::Spring,
                ..ConstraintRender::default()
            },
        })
        .unwrap();

    let scene = physics.snapshot();
    let bodies = scene.world.all_bodies();
    let index = BodyIndex::new(&bodies);
    let constraint = scene.world.all_constraints()[0];

    let a = constraint.world_point_a(&index).expect("body a indexed");
    let b = constraint.world_point_b(&index).expect("world anchor");
    assert!(a.approx_eq(Vector::ZERO, 1e-5), "{a:?}");
    assert!(b.approx_eq(Vector::new(0.0, -3.0), 1e-5), "{b:?}");
    assert_eq!(constraint.render.kind, ConstraintKind::Spring);
}

#[test]
fn scene_serializes_to_json() {
    let (mut physics, _, _) = box_on_floor();
    physics.step(DT);
    let scene = physics.snapshot();

    let json = serde_json::to_string(&scene).unwrap();
    let back: Scene = serde_json::from_str(&json).unwrap();
    assert_eq!(back.world.all_bodies().len(), 2);
    assert_eq!(back.timestamp, scene.timestamp);
}

fn internal_vertex_count(scene: &Scene) -> usize {
    scene.world.bodies[0]
        .drawable_parts()
        .flat_map(|p| p.vertices.iter())
        .filter(|v| v.is_internal)
        .count()
}

#[test]
fn compound_seam_stays_hidden_away_from_the_origin() {
    for (position, angle) in [
        (Vector::new(0.0, 0.0), 0.0),
        (Vector::new(300.0, 200.0), 0.3),
        (Vector::new(412.7, 233.1), 1.1),
        (Vector::new(-5_000.3, 7_250.9), 2.7),
    ] {
        let mut physics = PhysicsWorld::new_zero_gravity();
        let mut desc = BodyDesc::new(
            position,
            vec![
                box_part(20.0, 20.0).at(Vector::new(-10.0, 0.0)),
                box_part(20.0, 20.0).at(Vector::new(10.0, 0.0)),
            ],
        );
        desc.angle = angle;
        desc.velocity = Vector::new(37.0, -11.0);
        physics.add_body(desc).unwrap();

        assert_eq!(internal_vertex_count(&physics.snapshot()), 2, "at {position:?} angle {angle}");
        for _ in 0..90 {
            physics.step(DT);
        }
        assert_eq!(
            internal_vertex_count(&physics.snapshot()),
            2,
            "after moving from {position:?} angle {angle}"
        );
    }
}
