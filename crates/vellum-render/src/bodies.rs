//! The body drawer: fills, borders, sprites and text labels per part.
//!
//! Every visible part of every visible body goes through the same fixed
//! sequence:
//!
//! 1. opacity (half opacity for sleeping bodies when enabled),
//! 2. outline path (circle arc, or the vertex walk with pen-up across
//!    internal edges),
//! 3. fill and border, or a thin stroke in wireframe mode,
//! 4. sprite image, rotated with the part or the compound body,
//! 5. text label,
//!
//! and global alpha is back at 1 afterwards. Compound bodies draw their
//! real parts only; the aggregate part carries no style of its own.

use std::f64::consts::TAU;

use vellum_scene::body::{Body, Part, Sprite, TextLabel};
use vellum_scene::geometry::Vertex;

use crate::options::RenderOptions;
use crate::surface::{FillStyle, Surface};
use crate::texture::TextureCache;

/// Stroke color of the outline drawn around sprites.
const SPRITE_OUTLINE: &str = "#bbb";

/// Default text color.
const TEXT_COLOR: &str = "#000000";

/// Draw `bodies` with their full render styles.
pub fn draw_bodies(
    options: &RenderOptions,
    textures: &mut TextureCache,
    bodies: &[&Body],
    surface: &mut dyn Surface,
) {
    let show_internal_edges = options.draws_internal_edges();

    for body in bodies {
        if !body.render.visible {
            continue;
        }
        for part in body.drawable_parts() {
            if !part.render.visible {
                continue;
            }
            draw_part(options, textures, body, part, show_internal_edges, surface);
        }
    }
}

fn draw_part(
    options: &RenderOptions,
    textures: &mut TextureCache,
    body: &Body,
    part: &Part,
    show_internal_edges: bool,
    surface: &mut dyn Surface,
) {
    let opacity = part.render.opacity;
    if options.show_sleeping && body.is_sleeping {
        surface.set_global_alpha(0.5 * opacity);
    } else if opacity != 1.0 {
        surface.set_global_alpha(opacity);
    }

    let sprite = part
        .render
        .sprite
        .as_ref()
        .filter(|s| s.has_texture() && !options.wireframes);
    let sprite_pattern = sprite.is_some_and(|s| s.pattern);
    let fill_style = match sprite {
        Some(sprite) => sprite.fill_style.as_deref(),
        None => part.render.fill_style.as_deref(),
    };

    if fill_style.is_some() || options.show_borders || sprite_pattern {
        surface.begin_path();
        match part.circle_radius {
            Some(radius) => surface.arc(part.position.x, part.position.y, radius, 0.0, TAU),
            None => trace_outline(surface, &part.vertices, show_internal_edges),
        }

        if !options.wireframes {
            let pattern = sprite
                .filter(|s| s.pattern)
                .and_then(|s| textures.get(&s.texture).image());
            let fill = match (pattern, fill_style) {
                (Some(image), _) => Some(FillStyle::Pattern(image)),
                (None, Some(color)) => Some(FillStyle::color(color)),
                (None, None) => None,
            };
            let filled = fill.is_some();
            if let Some(fill) = fill {
                surface.set_fill_style(fill);
            }
            if part.render.line_width != 0.0 {
                surface.set_line_width(part.render.line_width);
                surface.set_stroke_style(&part.render.stroke_style);
                surface.stroke();
            }
            if filled {
                surface.fill();
            }
        } else {
            surface.set_line_width(1.0);
            surface.set_stroke_style(&options.wireframe_stroke_style);
            surface.stroke();
        }
    }

    if let Some(sprite) = sprite {
        draw_sprite(textures, body, part, sprite, surface);
    }

    if let Some(text) = &part.render.text {
        draw_text(body, part, text, surface);
    }

    surface.set_global_alpha(1.0);
}

/// Walk `vertices` into the current path and back to the first vertex.
///
/// When `show_internal_edges` is false the pen lifts across every edge
/// that starts at an internal vertex, so the shared seams of a compound
/// body are not drawn. Only an unbroken walk is closed with `close_path`.
pub fn trace_outline(surface: &mut dyn Surface, vertices: &[Vertex], show_internal_edges: bool) {
    let Some(first) = vertices.first() else {
        return;
    };
    let n = vertices.len();
    let mut lifted = false;
    surface.move_to(first.x, first.y);

    for j in 1..n {
        let previous = &vertices[j - 1];
        let vertex = &vertices[j];
        if !previous.is_internal || show_internal_edges {
            surface.line_to(vertex.x, vertex.y);
        } else {
            surface.move_to(vertex.x, vertex.y);
            lifted = true;
        }

        if vertex.is_internal && !show_internal_edges {
            let next = &vertices[(j + 1) % n];
            surface.move_to(next.x, next.y);
            lifted = true;
        }
    }

    surface.line_to(first.x, first.y);
    // closing after a pen-up would join back to the last jump target
    if !lifted {
        surface.close_path();
    }
}

/// Rotation used for images and text on `part`: the compound body's
/// rotation when it has one, else the part's own.
fn display_angle(body: &Body, part: &Part) -> f64 {
    match body.aggregate_part() {
        Some(aggregate) if aggregate.angle != 0.0 => aggregate.angle,
        _ => part.angle,
    }
}

fn draw_sprite(
    textures: &mut TextureCache,
    body: &Body,
    part: &Part,
    sprite: &Sprite,
    surface: &mut dyn Surface,
) {
    let texture = textures.get(&sprite.texture);
    let angle = display_angle(body, part);

    surface.translate(part.position.x, part.position.y);
    surface.rotate(angle);

    if let Some(bg) = &part.render.bg_sprite {
        if let Some(image) = textures.get(&bg.texture).image() {
            let (w, h) = (f64::from(image.width), f64::from(image.height));
            surface.draw_image(
                &image,
                w * -bg.x_offset * bg.x_scale,
                h * -bg.y_offset * bg.y_scale,
                w * bg.x_scale,
                h * bg.y_scale,
            );
        }
    }

    // Not loaded yet: blank this frame, the transforms still balance.
    if let Some(image) = texture.image() {
        let (w, h) = (f64::from(image.width), f64::from(image.height));
        surface.draw_image(
            &image,
            w * -sprite.x_offset * sprite.x_scale,
            h * -sprite.y_offset * sprite.y_scale,
            w * sprite.x_scale,
            h * sprite.y_scale,
        );
    }

    surface.set_line_width(1.0);
    surface.set_stroke_style(SPRITE_OUTLINE);
    surface.stroke();

    surface.rotate(-angle);
    surface.translate(-part.position.x, -part.position.y);
}

/// The text a label shows: the body angle when `variable` names a truthy
/// attribute of the part, else the literal label.
pub fn resolve_label(body: &Body, part: &Part, text: &TextLabel) -> Option<String> {
    let sampled = text
        .variable
        .as_deref()
        .is_some_and(|name| part.attribute_is_truthy(name));
    if sampled {
        return Some(match text.fixed {
            Some(digits) => format!("{:.*}", digits, body.angle),
            None => body.angle.to_string(),
        });
    }
    text.label.clone().filter(|label| !label.is_empty())
}

fn draw_text(body: &Body, part: &Part, text: &TextLabel, surface: &mut dyn Surface) {
    let Some(label) = resolve_label(body, part, text) else {
        return;
    };
    let angle = if body.is_compound() {
        body.aggregate_part().map_or(part.angle, |a| a.angle)
    } else {
        part.angle
    };

    surface.translate(part.position.x, part.position.y);
    surface.rotate(angle);
    surface.set_fill_style(FillStyle::color(
        text.color.as_deref().unwrap_or(TEXT_COLOR),
    ));
    surface.fill_text(&label, text.offset_x, text.offset_y);
    surface.rotate(-angle);
    surface.translate(-part.position.x, -part.position.y);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawCall, RecordingSurface};
    use crate::texture::{TextureImage, TextureLoader};
    use crate::RenderError;
    use std::time::Duration;
    use vellum_scene::body::{BackgroundSprite, BodyId, PartRender};
    use vellum_scene::geometry::Vector;

    struct Fixed;

    impl TextureLoader for Fixed {
        fn load(&self, path: &str) -> Result<TextureImage, RenderError> {
            Ok(TextureImage::solid(path, 20, 10, [0, 0, 0, 255]))
        }
    }

    fn filled_options() -> RenderOptions {
        RenderOptions {
            wireframes: false,
            ..RenderOptions::default()
        }
    }

    fn square(render: PartRender) -> Body {
        Body::single(
            BodyId(1),
            Part::rectangle(1, Vector::new(50.0, 50.0), 10.0, 10.0).with_render(render),
        )
    }

    /// Cache with `paths` already loaded and applied.
    fn loaded(paths: &[&str]) -> TextureCache {
        let mut textures = TextureCache::new(Fixed);
        for path in paths {
            textures.get(path);
        }
        assert!(textures.wait_pending(Duration::from_secs(5)));
        textures
    }

    fn draw_with(options: &RenderOptions, textures: &mut TextureCache, body: &Body) -> RecordingSurface {
        let mut surface = RecordingSurface::new(100.0, 100.0);
        draw_bodies(options, textures, &[body], &mut surface);
        surface
    }

    /// Two-part body whose first part carries `render`.
    fn compound(render: PartRender, aggregate_angle: f64, part_angle: f64) -> Body {
        let left = Part::rectangle(1, Vector::new(45.0, 50.0), 10.0, 10.0).with_render(render);
        let right = Part::rectangle(2, Vector::new(55.0, 50.0), 10.0, 10.0);
        let mut body = Body::compound(BodyId(3), vec![left, right]).unwrap();
        for part in &mut body.parts {
            part.angle = if part.is_aggregate { aggregate_angle } else { part_angle };
        }
        body
    }

    fn rotations(surface: &RecordingSurface) -> Vec<f64> {
        surface
            .calls()
            .iter()
            .filter_map(|c| match c {
                DrawCall::Rotate(angle) => Some(*angle),
                _ => None,
            })
            .collect()
    }

    fn draw(options: &RenderOptions, body: &Body) -> RecordingSurface {
        let mut textures = TextureCache::new(Fixed);
        let mut surface = RecordingSurface::new(100.0, 100.0);
        draw_bodies(options, &mut textures, &[body], &mut surface);
        surface
    }

    #[test]
    fn filled_part_strokes_border_before_fill() {
        let mut render = PartRender::filled("red");
        render.line_width = 2.0;
        let surface = draw(&filled_options(), &square(render));

        let calls = surface.calls();
        let stroke = calls.iter().position(|c| *c == DrawCall::Stroke).unwrap();
        let fill = calls.iter().position(|c| *c == DrawCall::Fill).unwrap();
        assert!(stroke < fill, "border must be stroked before the fill");
        assert!(calls.contains(&DrawCall::SetFillStyle(FillStyle::color("red"))));
        assert!(calls.contains(&DrawCall::SetLineWidth(2.0)));
    }

    #[test]
    fn wireframe_mode_strokes_thin_outline_only() {
        let surface = draw(&RenderOptions::default(), &square(PartRender::filled("red")));
        assert_eq!(surface.count(|c| *c == DrawCall::Fill), 0);
        assert_eq!(surface.count(|c| *c == DrawCall::Stroke), 1);
        assert!(surface
            .calls()
            .contains(&DrawCall::SetStrokeStyle("#bbb".into())));
    }

    #[test]
    fn part_without_style_draws_nothing() {
        let surface = draw(&filled_options(), &square(PartRender::default()));
        assert_eq!(surface.count(DrawCall::is_paint), 0);
    }

    #[test]
    fn circle_part_uses_an_arc() {
        let body = Body::single(
            BodyId(2),
            Part::circle(2, Vector::new(5.0, 5.0), 3.0, 8).with_render(PartRender::filled("blue")),
        );
        let surface = draw(&filled_options(), &body);
        assert!(surface.calls().contains(&DrawCall::Arc {
            x: 5.0,
            y: 5.0,
            radius: 3.0,
            start: 0.0,
            end: TAU
        }));
        assert_eq!(surface.count(|c| matches!(c, DrawCall::LineTo { .. })), 0);
    }

    #[test]
    fn sleeping_body_draws_at_half_opacity() {
        let mut body = square(PartRender::filled("red"));
        body.is_sleeping = true;
        let surface = draw(&filled_options(), &body);
        assert_eq!(surface.calls()[0], DrawCall::SetGlobalAlpha(0.5));
        assert_eq!(surface.global_alpha(), 1.0);
    }

    #[test]
    fn sprite_transforms_are_undone() {
        let mut render = PartRender::default();
        render.sprite = Some(Sprite::new("crate.png"));
        let body = square(render).with_angle(0.4);

        let mut textures = TextureCache::new(Fixed);
        textures.get("crate.png");
        textures.wait_pending(Duration::from_secs(5));

        let mut surface = RecordingSurface::new(100.0, 100.0);
        draw_bodies(&filled_options(), &mut textures, &[&body], &mut surface);

        assert!(surface.calls().contains(&DrawCall::DrawImage {
            path: "crate.png".into(),
            x: -10.0,
            y: -5.0,
            width: 20.0,
            height: 10.0
        }));
        assert!(surface
            .transform()
            .approx_eq(&crate::surface::Transform::IDENTITY, 1e-12));
    }

    #[test]
    fn unloaded_sprite_is_blank_but_balanced() {
        let mut render = PartRender::default();
        render.sprite = Some(Sprite::new("slow.png"));
        let surface = draw(&filled_options(), &square(render));
        // the loader may or may not have finished; nothing was polled
        assert_eq!(surface.count(|c| matches!(c, DrawCall::DrawImage { .. })), 0);
        assert_eq!(surface.count(|c| matches!(c, DrawCall::Translate { .. })), 2);
    }

    #[test]
    fn sprites_are_ignored_in_wireframe_mode() {
        let mut render = PartRender::default();
        render.sprite = Some(Sprite::new("crate.png"));
        let surface = draw(&RenderOptions::default(), &square(render));
        assert_eq!(surface.calls(), &[DrawCall::SetGlobalAlpha(1.0)]);
    }

    #[test]
    fn variable_label_formats_body_angle() {
        let body = square(PartRender::default()).with_angle(1.23456);
        let part = &body.parts[0];
        let text = TextLabel {
            label: Some("fallback".into()),
            variable: Some("angle".into()),
            fixed: Some(2),
            ..TextLabel::default()
        };
        assert_eq!(resolve_label(&body, part, &text).as_deref(), Some("1.23"));

        let still = square(PartRender::default());
        assert_eq!(
            resolve_label(&still, &still.parts[0], &text).as_deref(),
            Some("fallback")
        );
        assert_eq!(resolve_label(&still, &still.parts[0], &TextLabel::default()), None);
    }

    #[test]
    fn text_label_draws_in_default_color() {
        let mut render = PartRender::default();
        render.text = Some(TextLabel::literal("hello"));
        let surface = draw(&RenderOptions::default(), &square(render));
        assert!(surface
            .calls()
            .contains(&DrawCall::SetFillStyle(FillStyle::color("#000000"))));
        assert!(surface.calls().contains(&DrawCall::FillText {
            text: "hello".into(),
            x: 0.0,
            y: 0.0
        }));
    }

    #[test]
    fn compound_sprite_and_text_rotate_with_the_body() {
        let mut render = PartRender::default();
        render.sprite = Some(Sprite::new("crate.png"));
        render.text = Some(TextLabel::literal("L"));

        let turned = draw(&filled_options(), &compound(render.clone(), 0.7, 0.2));
        assert_eq!(rotations(&turned), vec![0.7, -0.7, 0.7, -0.7]);

        // an unrotated compound falls back to the part angle for sprites only
        let level = draw(&filled_options(), &compound(render, 0.0, 0.2));
        assert_eq!(rotations(&level), vec![0.2, -0.2, 0.0, 0.0]);
    }

    #[test]
    fn single_part_sprite_rotates_with_the_part() {
        let mut render = PartRender::default();
        render.sprite = Some(Sprite::new("crate.png"));
        let surface = draw(&filled_options(), &square(render).with_angle(0.3));
        assert_eq!(rotations(&surface), vec![0.3, -0.3]);
    }

    #[test]
    fn background_sprite_is_drawn_beneath_the_sprite() {
        let mut render = PartRender::default();
        render.sprite = Some(Sprite::new("crate.png"));
        render.bg_sprite = Some(BackgroundSprite {
            texture: "bg.png".into(),
            x_scale: 2.0,
            ..BackgroundSprite::default()
        });
        let mut textures = loaded(&["bg.png", "crate.png"]);
        let surface = draw_with(&filled_options(), &mut textures, &square(render));

        let images: Vec<&DrawCall> = surface
            .calls()
            .iter()
            .filter(|c| matches!(c, DrawCall::DrawImage { .. }))
            .collect();
        assert_eq!(
            images,
            vec![
                &DrawCall::DrawImage {
                    path: "bg.png".into(),
                    x: -20.0,
                    y: -5.0,
                    width: 40.0,
                    height: 10.0
                },
                &DrawCall::DrawImage {
                    path: "crate.png".into(),
                    x: -10.0,
                    y: -5.0,
                    width: 20.0,
                    height: 10.0
                },
            ]
        );
    }

    #[test]
    fn loaded_pattern_sprite_fills_with_the_texture() {
        let mut render = PartRender::default();
        render.sprite = Some(Sprite {
            pattern: true,
            fill_style: Some("green".into()),
            ..Sprite::new("tile.png")
        });
        let mut textures = loaded(&["tile.png"]);
        let surface = draw_with(&filled_options(), &mut textures, &square(render));

        let fills: Vec<&FillStyle> = surface
            .calls()
            .iter()
            .filter_map(|c| match c {
                DrawCall::SetFillStyle(style) => Some(style),
                _ => None,
            })
            .collect();
        assert_eq!(fills.len(), 1);
        assert!(matches!(fills[0], FillStyle::Pattern(image) if image.path == "tile.png"));
        assert_eq!(surface.count(|c| *c == DrawCall::Fill), 1);
    }

    #[test]
    fn pattern_sprite_falls_back_to_flat_fill_until_loaded() {
        let mut render = PartRender::default();
        render.sprite = Some(Sprite {
            pattern: true,
            fill_style: Some("green".into()),
            ..Sprite::new("tile.png")
        });
        let surface = draw(&filled_options(), &square(render));
        assert!(surface
            .calls()
            .contains(&DrawCall::SetFillStyle(FillStyle::color("green"))));
        assert_eq!(surface.count(|c| *c == DrawCall::Fill), 1);

        // no flat style either: the path is built but nothing is filled
        let mut bare = PartRender::default();
        bare.sprite = Some(Sprite {
            pattern: true,
            ..Sprite::new("tile.png")
        });
        let surface = draw(&filled_options(), &square(bare));
        assert_eq!(surface.count(|c| *c == DrawCall::BeginPath), 1);
        assert_eq!(surface.count(|c| *c == DrawCall::Fill), 0);
    }

    #[test]
    fn show_borders_outlines_an_unfilled_part() {
        let options = RenderOptions {
            show_borders: true,
            ..filled_options()
        };
        let mut render = PartRender::default();
        render.line_width = 1.5;
        render.stroke_style = "#ff8800".into();
        let surface = draw(&options, &square(render));

        assert_eq!(surface.count(|c| *c == DrawCall::BeginPath), 1);
        assert_eq!(surface.count(|c| matches!(c, DrawCall::LineTo { .. })), 4);
        assert!(surface.calls().contains(&DrawCall::SetStrokeStyle("#ff8800".into())));
        assert_eq!(surface.count(|c| *c == DrawCall::Stroke), 1);
        assert_eq!(surface.count(|c| *c == DrawCall::Fill), 0);

        let hidden = draw(&filled_options(), &square(PartRender::default()));
        assert_eq!(hidden.count(|c| *c == DrawCall::BeginPath), 0);
    }
}
