//! Bodies, parts and their render styles.
//!
//! A [`Body`] is an ordered list of convex [`Part`]s. Compound bodies carry
//! an extra synthetic part tagged [`Part::is_aggregate`] that describes the
//! whole body (convex hull, union bounds, body angle). Drawers skip the
//! aggregate part and draw the real parts; single-part bodies have no
//! aggregate part at all.
//!
//! # Example
//!
//! ```
//! use vellum_scene::body::{Body, BodyId, Part};
//! use vellum_scene::geometry::Vector;
//!
//! let left = Part::rectangle(1, Vector::new(0.0, 0.0), 10.0, 10.0);
//! let right = Part::rectangle(2, Vector::new(10.0, 0.0), 10.0, 10.0);
//! let body = Body::compound(BodyId(7), vec![left, right]).unwrap();
//!
//! assert_eq!(body.parts.len(), 3);
//! assert!(body.parts[0].is_aggregate);
//! assert_eq!(body.drawable_parts().count(), 2);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{self, Bounds, Vector, Vertex};
use crate::SceneError;

/// Relative distance under which two vertices of different parts are the
/// same point when looking for shared edges. Scaled by the coordinate
/// magnitude, so it holds for f32-derived geometry far from the origin.
const SHARED_EDGE_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// BodyId
// ---------------------------------------------------------------------------

/// Stable identifier of a body within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Render styles
// ---------------------------------------------------------------------------

/// Texture drawn centered on a part and rotated with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Sprite {
    /// Image path, also the texture cache key.
    pub texture: String,
    /// Normalized anchor inside the image, 0.5 is the center.
    pub x_offset: f64,
    /// Normalized anchor inside the image, 0.5 is the center.
    pub y_offset: f64,
    /// Horizontal scale of the drawn image.
    pub x_scale: f64,
    /// Vertical scale of the drawn image.
    pub y_scale: f64,
    /// Fill the part outline with the texture as a repeating pattern.
    pub pattern: bool,
    /// Flat fill used under the sprite instead of the part's fill style.
    pub fill_style: Option<String>,
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            texture: String::new(),
            x_offset: 0.5,
            y_offset: 0.5,
            x_scale: 1.0,
            y_scale: 1.0,
            pattern: false,
            fill_style: None,
        }
    }
}

impl Sprite {
    /// Sprite with default anchor and scale.
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            ..Default::default()
        }
    }

    /// Whether the sprite references a texture at all.
    pub fn has_texture(&self) -> bool {
        !self.texture.is_empty()
    }
}

/// Secondary image drawn beneath a part's primary sprite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackgroundSprite {
    /// Image path.
    pub texture: String,
    /// Normalized anchor, defaults to 0.5.
    pub x_offset: f64,
    /// Normalized anchor, defaults to 0.5.
    pub y_offset: f64,
    /// Horizontal scale, defaults to 1.
    pub x_scale: f64,
    /// Vertical scale, defaults to 1.
    pub y_scale: f64,
}

impl Default for BackgroundSprite {
    fn default() -> Self {
        Self {
            texture: String::new(),
            x_offset: 0.5,
            y_offset: 0.5,
            x_scale: 1.0,
            y_scale: 1.0,
        }
    }
}

impl BackgroundSprite {
    /// Background sprite with default anchor and scale.
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            ..Default::default()
        }
    }
}

/// Text drawn at a part's position and rotated with it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextLabel {
    /// Literal label.
    pub label: Option<String>,
    /// Name of a part attribute; when it is truthy the label shows the
    /// body's current angle instead of the literal.
    pub variable: Option<String>,
    /// Decimal places for the sampled value.
    pub fixed: Option<usize>,
    /// Pixel offset from the part position.
    pub offset_x: f64,
    /// Pixel offset from the part position.
    pub offset_y: f64,
    /// Text color, black when unset.
    pub color: Option<String>,
}

impl TextLabel {
    /// A literal label with no offset.
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            label: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Render style of a single part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartRender {
    /// Hidden parts draw nothing.
    pub visible: bool,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Flat fill color.
    pub fill_style: Option<String>,
    /// Border color.
    pub stroke_style: String,
    /// Border width; zero means no border stroke.
    pub line_width: f64,
    /// Primary sprite.
    pub sprite: Option<Sprite>,
    /// Image drawn beneath the primary sprite.
    pub bg_sprite: Option<BackgroundSprite>,
    /// Text label.
    pub text: Option<TextLabel>,
}

impl Default for PartRender {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 1.0,
            fill_style: None,
            stroke_style: "#000000".to_owned(),
            line_width: 0.0,
            sprite: None,
            bg_sprite: None,
            text: None,
        }
    }
}

impl PartRender {
    /// Visible style with a flat fill.
    pub fn filled(color: impl Into<String>) -> Self {
        Self {
            fill_style: Some(color.into()),
            ..Default::default()
        }
    }
}

/// Body-level render flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyRender {
    /// Hidden bodies draw nothing, including their parts.
    pub visible: bool,
}

impl Default for BodyRender {
    fn default() -> Self {
        Self { visible: true }
    }
}

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

/// A convex sub-shape of a body, in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Part identifier, shown by the ids overlay.
    pub id: u64,
    /// Synthetic whole-body part of a compound body.
    pub is_aggregate: bool,
    /// Outline in drawing order.
    pub vertices: Vec<Vertex>,
    /// Set for circles; the vertices then approximate the circle.
    pub circle_radius: Option<f64>,
    /// Part center.
    pub position: Vector,
    /// Rotation in radians.
    pub angle: f64,
    /// Axis-aligned bounds.
    pub bounds: Bounds,
    /// Render style.
    pub render: PartRender,
}

impl Part {
    /// Polygon part through `points`, centered on their mean.
    pub fn polygon(id: u64, points: &[Vector]) -> Self {
        let vertices = geometry::vertices_from_points(points);
        Self {
            id,
            is_aggregate: false,
            position: geometry::centre(&vertices),
            angle: 0.0,
            bounds: Bounds::from_vertices(&vertices),
            vertices,
            circle_radius: None,
            render: PartRender::default(),
        }
    }

    /// Axis-aligned rectangle centered on `position`.
    pub fn rectangle(id: u64, position: Vector, width: f64, height: f64) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self::polygon(
            id,
            &[
                Vector::new(position.x - hw, position.y - hh),
                Vector::new(position.x + hw, position.y - hh),
                Vector::new(position.x + hw, position.y + hh),
                Vector::new(position.x - hw, position.y + hh),
            ],
        )
    }

    /// Circle approximated by `sides` vertices for outline overlays.
    pub fn circle(id: u64, position: Vector, radius: f64, sides: usize) -> Self {
        let sides = sides.max(3);
        let points: Vec<Vector> = (0..sides)
            .map(|i| {
                let theta = std::f64::consts::TAU * i as f64 / sides as f64;
                Vector::new(
                    position.x + radius * theta.cos(),
                    position.y + radius * theta.sin(),
                )
            })
            .collect();
        let mut part = Self::polygon(id, &points);
        part.position = position;
        part.circle_radius = Some(radius);
        part.bounds = Bounds::from_circle(position, radius);
        part
    }

    /// Replace the render style.
    pub fn with_render(mut self, render: PartRender) -> Self {
        self.render = render;
        self
    }

    /// Unique edge normals of this part.
    pub fn axes(&self) -> Vec<Vector> {
        geometry::axes(&self.vertices)
    }

    /// Whether the named attribute is truthy on this part.
    ///
    /// Numeric attributes are truthy when non-zero; flags when set.
    /// Unknown names are falsy.
    pub fn attribute_is_truthy(&self, name: &str) -> bool {
        match name {
            "angle" => self.angle != 0.0,
            "circleRadius" | "circle_radius" => self.circle_radius.is_some_and(|r| r != 0.0),
            "id" => self.id != 0,
            "visible" => self.render.visible,
            "opacity" => self.render.opacity != 0.0,
            "isAggregate" | "is_aggregate" => self.is_aggregate,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// A simulation entity as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Identifier.
    pub id: BodyId,
    /// Free-form label.
    pub label: String,
    /// Parts; for compound bodies the aggregate part comes first.
    pub parts: Vec<Part>,
    /// Body position (center of the aggregate or of the single part).
    pub position: Vector,
    /// Body rotation in radians.
    pub angle: f64,
    /// Linear velocity in world units per second.
    pub velocity: Vector,
    /// Whether the simulation put this body to sleep.
    pub is_sleeping: bool,
    /// Whether the body never moves.
    pub is_static: bool,
    /// Body-level render flags.
    pub render: BodyRender,
}

impl Body {
    /// A body made of a single part.
    pub fn single(id: BodyId, part: Part) -> Self {
        Self {
            id,
            label: "Body".to_owned(),
            position: part.position,
            angle: part.angle,
            parts: vec![part],
            velocity: Vector::ZERO,
            is_sleeping: false,
            is_static: false,
            render: BodyRender::default(),
        }
    }

    /// A compound body. One part yields a single-part body.
    ///
    /// For two or more parts an aggregate part is prepended (convex hull of
    /// every part vertex, union of the part bounds, id 0) and edges shared
    /// between parts are flagged internal.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::EmptyBody`] when `parts` is empty.
    pub fn compound(id: BodyId, mut parts: Vec<Part>) -> Result<Self, SceneError> {
        if parts.len() > 1 {
            flag_internal_edges(&mut parts);
        }
        Self::from_flagged_parts(id, parts)
    }

    /// Like [`compound`](Self::compound), but keeps each vertex's
    /// `is_internal` flag as given instead of looking for shared edges.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::EmptyBody`] when `parts` is empty.
    pub fn from_flagged_parts(id: BodyId, mut parts: Vec<Part>) -> Result<Self, SceneError> {
        match parts.len() {
            0 => return Err(SceneError::EmptyBody { body: id }),
            1 => {
                let part = parts.remove(0);
                return Ok(Self::single(id, part));
            }
            _ => {}
        }

        for part in &mut parts {
            part.is_aggregate = false;
        }

        let all_points: Vec<Vector> = parts
            .iter()
            .flat_map(|p| p.vertices.iter().map(Vertex::point))
            .collect();
        let hull = geometry::hull(&all_points);
        let vertices = geometry::vertices_from_points(&hull);
        let bounds = parts
            .iter()
            .skip(1)
            .fold(parts[0].bounds, |acc, p| acc.union(&p.bounds));
        let position = geometry::centre(&vertices);

        let aggregate = Part {
            id: 0,
            is_aggregate: true,
            vertices,
            circle_radius: None,
            position,
            angle: 0.0,
            bounds,
            render: PartRender::default(),
        };

        let mut all = Vec::with_capacity(parts.len() + 1);
        all.push(aggregate);
        all.extend(parts);

        Ok(Self {
            id,
            label: "Body".to_owned(),
            parts: all,
            position,
            angle: 0.0,
            velocity: Vector::ZERO,
            is_sleeping: false,
            is_static: false,
            render: BodyRender::default(),
        })
    }

    /// Whether the body has an aggregate part plus real parts.
    pub fn is_compound(&self) -> bool {
        self.parts.len() > 1
    }

    /// The synthetic whole-body part, if any.
    pub fn aggregate_part(&self) -> Option<&Part> {
        self.parts.iter().find(|p| p.is_aggregate)
    }

    /// The parts that carry geometry and style: every non-aggregate part.
    pub fn drawable_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| !p.is_aggregate)
    }

    /// Bounds of the whole body.
    pub fn bounds(&self) -> Bounds {
        match self.aggregate_part() {
            Some(aggregate) => aggregate.bounds,
            None => self
                .parts
                .first()
                .map(|p| p.bounds)
                .unwrap_or_else(|| Bounds::new(self.position, self.position)),
        }
    }

    /// Outline of the whole body: the aggregate hull, or the single part.
    pub fn vertices(&self) -> &[Vertex] {
        self.aggregate_part()
            .or_else(|| self.parts.first())
            .map(|p| p.vertices.as_slice())
            .unwrap_or(&[])
    }

    /// Set the rotation of the body and its aggregate part.
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        if let Some(aggregate) = self.parts.iter_mut().find(|p| p.is_aggregate) {
            aggregate.angle = angle;
        }
        if !self.is_compound() {
            if let Some(part) = self.parts.first_mut() {
                part.angle = angle;
            }
        }
        self
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Flag every edge that appears, reversed, in another part as internal.
fn flag_internal_edges(parts: &mut [Part]) {
    let edges: Vec<Vec<(Vector, Vector)>> = parts
        .iter()
        .map(|p| {
            let n = p.vertices.len();
            (0..n)
                .map(|i| (p.vertices[i].point(), p.vertices[(i + 1) % n].point()))
                .collect()
        })
        .collect();

    for (pi, part) in parts.iter_mut().enumerate() {
        for (vi, vertex) in part.vertices.iter_mut().enumerate() {
            let (a, b) = edges[pi][vi];
            let same = |p: Vector, q: Vector| {
                let scale = 1.0 + p.x.abs().max(p.y.abs()).max(q.x.abs()).max(q.y.abs());
                p.approx_eq(q, SHARED_EDGE_EPSILON * scale)
            };
            let shared = edges.iter().enumerate().any(|(oi, other)| {
                oi != pi
                    && other
                        .iter()
                        .any(|&(c, d)| (same(a, d) && same(b, c)) || (same(a, c) && same(b, d)))
            });
            if shared {
                vertex.is_internal = true;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
