//! Property tests for the geometry helpers.

use proptest::prelude::*;
use vellum_scene::geometry::{axes, hull, vertices_from_points, Bounds, Vector};

fn point() -> impl Strategy<Value = Vector> {
    (-1000i32..1000, -1000i32..1000).prop_map(|(x, y)| Vector::new(x as f64 * 0.1, y as f64 * 0.1))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1_000))]

    #[test]
    fn hull_contains_every_input_point(points in prop::collection::vec(point(), 3..40)) {
        let shell = hull(&points);
        prop_assume!(shell.len() >= 3);

        let n = shell.len();
        for p in &points {
            for i in 0..n {
                let a = shell[i];
                let b = shell[(i + 1) % n];
                // every point is on the same side of each hull edge
                prop_assert!(b.sub(a).cross(p.sub(a)) >= -1e-9, "{:?} outside edge {:?}->{:?}", p, a, b);
            }
        }
    }

    #[test]
    fn union_bounds_cover_both_inputs(a in prop::collection::vec(point(), 1..10), b in prop::collection::vec(point(), 1..10)) {
        let ba = Bounds::from_vertices(&vertices_from_points(&a));
        let bb = Bounds::from_vertices(&vertices_from_points(&b));
        let u = ba.union(&bb);
        for p in a.iter().chain(&b) {
            prop_assert!(u.contains(*p));
        }
        prop_assert!(u.overlaps(&ba) && u.overlaps(&bb));
    }

    #[test]
    fn axes_are_unit_length(points in prop::collection::vec(point(), 3..12)) {
        let shell = hull(&points);
        prop_assume!(shell.len() >= 3);
        for axis in axes(&vertices_from_points(&shell)) {
            prop_assert!((axis.magnitude() - 1.0).abs() < 1e-9);
        }
    }
}
