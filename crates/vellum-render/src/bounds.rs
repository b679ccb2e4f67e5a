//! The bounds drawer.

use vellum_scene::body::Body;

use crate::options::RenderOptions;
use crate::overlays::Overlays;
use crate::surface::Surface;

/// Bounds stroke color in wireframe mode.
const WIREFRAME_BOUNDS: &str = "rgba(255,255,255,0.05)";

/// Stroke the bounding box of every drawable part of the visible bodies as
/// one path. Outside wireframe mode the wireframe outlines are drawn on
/// top through `overlays`.
pub fn draw_body_bounds(
    options: &RenderOptions,
    overlays: &dyn Overlays,
    bodies: &[&Body],
    surface: &mut dyn Surface,
) {
    surface.begin_path();
    for body in bodies.iter().filter(|b| b.render.visible) {
        for part in body.drawable_parts() {
            let bounds = &part.bounds;
            surface.rect(bounds.min.x, bounds.min.y, bounds.width(), bounds.height());
        }
    }

    if options.wireframes {
        surface.set_stroke_style(WIREFRAME_BOUNDS);
    } else {
        surface.set_stroke_style(&options.bound_color);
    }
    surface.set_line_width(1.0);
    surface.stroke();

    if !options.wireframes {
        overlays.body_wireframes(options, bodies, surface);
    }
}
