//! Debug overlays drawn on top of the bodies.
//!
//! Every overlay is a provided method of [`Overlays`], so a custom overlay
//! set only overrides what it wants to change and [`StandardOverlays`]
//! uses the defaults as-is. Colors switch between a wireframe palette and
//! a filled palette the same way for every overlay.

use std::f64::consts::TAU;

use vellum_scene::body::Body;
use vellum_scene::composite::{BodyIndex, Pair};
use vellum_scene::constraint::{Constraint, ConstraintKind};
use vellum_scene::geometry::Vector;

use crate::bodies::trace_outline;
use crate::options::RenderOptions;
use crate::pointer::Pointer;
use crate::surface::{CompositeOperation, FillStyle, Surface};

/// Length of an axis line in the axes overlay.
const AXIS_LENGTH: f64 = 20.0;
/// Radius of position and anchor dots.
const DOT_RADIUS: f64 = 3.0;
/// Side of a contact marker.
const CONTACT_SIZE: f64 = 3.5;
/// Length of a collision normal tick.
const NORMAL_LENGTH: f64 = 8.0;
/// Half-width of a spring's zig-zag.
const SPRING_AMPLITUDE: f64 = 4.0;

fn pick<'a>(options: &RenderOptions, wireframe: &'a str, filled: &'a str) -> &'a str {
    if options.wireframes {
        wireframe
    } else {
        filled
    }
}

/// The overlay drawers used by the frame orchestrator.
pub trait Overlays {
    /// Outline of every drawable part as one thin stroke.
    fn body_wireframes(&self, options: &RenderOptions, bodies: &[&Body], surface: &mut dyn Surface) {
        surface.begin_path();
        for body in bodies.iter().filter(|b| b.render.visible) {
            for part in body.drawable_parts() {
                trace_outline(surface, &part.vertices, options.show_internal_edges);
            }
        }
        surface.set_line_width(1.0);
        surface.set_stroke_style(&options.wireframe_stroke_style);
        surface.stroke();
    }

    /// Convex hull of every compound body.
    fn body_convex_hulls(&self, _options: &RenderOptions, bodies: &[&Body], surface: &mut dyn Surface) {
        surface.begin_path();
        for body in bodies.iter().filter(|b| b.render.visible && b.is_compound()) {
            let vertices = body.vertices();
            let Some(first) = vertices.first() else {
                continue;
            };
            surface.move_to(first.x, first.y);
            for v in &vertices[1..] {
                surface.line_to(v.x, v.y);
            }
            surface.line_to(first.x, first.y);
        }
        surface.set_line_width(1.0);
        surface.set_stroke_style("rgba(255,255,255,0.2)");
        surface.stroke();
    }

    /// Part axes, or with only the angle indicator on, a line from each
    /// part's position to the middle of its first and last vertex.
    fn body_axes(&self, options: &RenderOptions, bodies: &[&Body], surface: &mut dyn Surface) {
        surface.begin_path();
        for body in bodies.iter().filter(|b| b.render.visible) {
            for part in body.drawable_parts() {
                let p = part.position;
                if options.show_axes {
                    for axis in part.axes() {
                        let end = p.add(axis.mult(AXIS_LENGTH));
                        surface.move_to(p.x, p.y);
                        surface.line_to(end.x, end.y);
                    }
                } else if let (Some(first), Some(last)) = (part.vertices.first(), part.vertices.last()) {
                    surface.move_to(p.x, p.y);
                    surface.line_to((first.x + last.x) / 2.0, (first.y + last.y) / 2.0);
                }
            }
        }

        if options.wireframes {
            surface.set_stroke_style("indianred");
            surface.set_line_width(1.0);
        } else {
            surface.set_stroke_style("rgba(255, 255, 255, 0.4)");
            surface.set_composite_operation(CompositeOperation::Overlay);
            surface.set_line_width(2.0);
        }
        surface.stroke();
        surface.set_composite_operation(CompositeOperation::SourceOver);
    }

    /// A dot at every part position, the aggregate part included.
    fn body_positions(&self, options: &RenderOptions, bodies: &[&Body], surface: &mut dyn Surface) {
        surface.begin_path();
        for body in bodies.iter().filter(|b| b.render.visible) {
            for part in &body.parts {
                surface.arc(part.position.x, part.position.y, DOT_RADIUS, 0.0, TAU);
                surface.close_path();
            }
        }
        surface.set_fill_style(FillStyle::color(pick(options, "indianred", "rgba(0,0,0,0.5)")));
        surface.fill();
    }

    /// Velocity vectors, drawn two seconds long.
    fn body_velocity(&self, _options: &RenderOptions, bodies: &[&Body], surface: &mut dyn Surface) {
        surface.begin_path();
        for body in bodies.iter().filter(|b| b.render.visible) {
            let end = body.position.add(body.velocity.mult(2.0));
            surface.move_to(body.position.x, body.position.y);
            surface.line_to(end.x, end.y);
        }
        surface.set_line_width(3.0);
        surface.set_stroke_style("cornflowerblue");
        surface.stroke();
    }

    /// Part ids next to each drawable part.
    fn body_ids(&self, _options: &RenderOptions, bodies: &[&Body], surface: &mut dyn Surface) {
        for body in bodies.iter().filter(|b| b.render.visible) {
            for part in body.drawable_parts() {
                surface.set_font("12px Arial");
                surface.set_fill_style(FillStyle::color("rgba(255,255,255,0.5)"));
                surface.fill_text(&part.id.to_string(), part.position.x + 10.0, part.position.y - 10.0);
            }
        }
    }

    /// Contact points and collision normals of active pairs.
    fn collisions(&self, options: &RenderOptions, pairs: &[Pair], surface: &mut dyn Surface) {
        surface.begin_path();
        for pair in pairs.iter().filter(|p| p.is_active) {
            for contact in &pair.contacts {
                surface.rect(contact.x - 1.5, contact.y - 1.5, CONTACT_SIZE, CONTACT_SIZE);
            }
        }
        surface.set_fill_style(FillStyle::color(pick(options, "rgba(255,255,255,0.7)", "orange")));
        surface.fill();

        surface.begin_path();
        for pair in pairs.iter().filter(|p| p.is_active) {
            let Some(first) = pair.contacts.first() else {
                continue;
            };
            let at = match pair.contacts.get(1) {
                Some(second) if pair.contacts.len() == 2 => first.add(*second).mult(0.5),
                _ => *first,
            };
            let tick = pair.normal.mult(NORMAL_LENGTH);
            let from = if pair.body_a.is_static { at.sub(tick) } else { at.add(tick) };
            surface.move_to(from.x, from.y);
            surface.line_to(at.x, at.y);
        }
        surface.set_stroke_style(pick(options, "rgba(255,165,0,0.7)", "orange"));
        surface.set_line_width(1.0);
        surface.stroke();
    }

    /// How far each body of an active pair is pushed apart.
    fn separations(&self, options: &RenderOptions, pairs: &[Pair], surface: &mut dyn Surface) {
        surface.begin_path();
        for pair in pairs.iter().filter(|p| p.is_active) {
            let (a, b) = (&pair.body_a, &pair.body_b);
            let shared = if !a.is_static && !b.is_static { 0.5 } else { 1.0 };

            let k = if b.is_static { 0.0 } else { shared };
            let end = b.position.sub(pair.penetration.mult(k));
            surface.move_to(b.position.x, b.position.y);
            surface.line_to(end.x, end.y);

            let k = if a.is_static { 0.0 } else { shared };
            let end = a.position.add(pair.penetration.mult(k));
            surface.move_to(a.position.x, a.position.y);
            surface.line_to(end.x, end.y);
        }
        surface.set_stroke_style(pick(options, "rgba(255,165,0,0.5)", "orange"));
        surface.stroke();
    }

    /// `body_vertex` labels just inside each vertex.
    fn vertex_numbers(&self, _options: &RenderOptions, bodies: &[&Body], surface: &mut dyn Surface) {
        for (i, body) in bodies.iter().enumerate() {
            for part in body.drawable_parts() {
                for (j, v) in part.vertices.iter().enumerate() {
                    let at = part.position.add(v.point().sub(part.position).mult(0.8));
                    surface.set_fill_style(FillStyle::color("rgba(255,255,255,0.2)"));
                    surface.fill_text(&format!("{i}_{j}"), at.x, at.y);
                }
            }
        }
    }

    /// Pointer coordinates next to the pointer.
    fn mouse_position(&self, _options: &RenderOptions, pointer: &Pointer, surface: &mut dyn Surface) {
        let p = pointer.position;
        surface.set_fill_style(FillStyle::color("rgba(255,255,255,0.8)"));
        surface.fill_text(&format!("{}  {}", p.x, p.y), p.x + 5.0, p.y - 5.0);
    }

    /// Constraints as pins, lines or springs. Constraints whose anchors
    /// cannot be resolved are skipped.
    fn constraints(&self, constraints: &[&Constraint], index: &BodyIndex<'_>, surface: &mut dyn Surface) {
        for constraint in constraints {
            let render = &constraint.render;
            if !render.visible {
                continue;
            }
            let (Some(start), Some(end)) = (constraint.world_point_a(index), constraint.world_point_b(index)) else {
                continue;
            };

            surface.begin_path();
            if render.kind == ConstraintKind::Pin {
                surface.arc(start.x, start.y, DOT_RADIUS, 0.0, TAU);
                surface.close_path();
            } else {
                surface.move_to(start.x, start.y);
                if render.kind == ConstraintKind::Spring {
                    for point in spring_points(start, end) {
                        surface.line_to(point.x, point.y);
                    }
                }
                surface.line_to(end.x, end.y);
            }

            if render.line_width != 0.0 {
                surface.set_line_width(render.line_width);
                surface.set_stroke_style(&render.stroke_style);
                surface.stroke();
            }

            if render.anchors {
                surface.set_fill_style(FillStyle::color(render.stroke_style.clone()));
                surface.begin_path();
                surface.arc(start.x, start.y, DOT_RADIUS, 0.0, TAU);
                if render.kind != ConstraintKind::Pin {
                    surface.arc(end.x, end.y, DOT_RADIUS, 0.0, TAU);
                }
                surface.close_path();
                surface.fill();
            }
        }
    }
}

/// Inner zig-zag points of a spring from `start` to `end`.
///
/// The coil count grows with length: `ceil(clamp(length / 5, 12, 20))`.
pub fn spring_points(start: Vector, end: Vector) -> Vec<Vector> {
    let delta = end.sub(start);
    let normal = delta.normalise().perp();
    let coils = (delta.magnitude() / 5.0).clamp(12.0, 20.0).ceil() as usize;
    (1..coils)
        .map(|j| {
            let side = if j % 2 == 0 { 1.0 } else { -1.0 };
            start
                .add(delta.mult(j as f64 / coils as f64))
                .add(normal.mult(side * SPRING_AMPLITUDE))
        })
        .collect()
}

/// The default overlay set.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardOverlays;

impl Overlays for StandardOverlays {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
