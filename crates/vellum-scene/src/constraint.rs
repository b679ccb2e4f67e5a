//! Constraints between bodies (or between a body and a fixed point).

use serde::{Deserialize, Serialize};

use crate::body::BodyId;
use crate::composite::BodyIndex;
use crate::geometry::Vector;

/// How a constraint is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintKind {
    /// Straight line between the two anchors.
    #[default]
    Line,
    /// Small circle at the first anchor only.
    Pin,
    /// Zig-zag between the two anchors.
    Spring,
}

/// Render style of a constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConstraintRender {
    /// Hidden constraints draw nothing.
    pub visible: bool,
    /// Stroke width; zero skips the stroke.
    pub line_width: f64,
    /// Stroke color, also used for the anchor dots.
    pub stroke_style: String,
    /// Shape of the drawn constraint.
    pub kind: ConstraintKind,
    /// Draw dots at both anchors.
    pub anchors: bool,
}

impl Default for ConstraintRender {
    fn default() -> Self {
        Self {
            visible: true,
            line_width: 2.0,
            stroke_style: "#ffffff".to_owned(),
            kind: ConstraintKind::Line,
            anchors: true,
        }
    }
}

/// A constraint snapshot.
///
/// `point_a` / `point_b` are offsets from the attached body's position when
/// `body_a` / `body_b` is set, and world coordinates otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Identifier.
    pub id: u64,
    /// First attached body.
    pub body_a: Option<BodyId>,
    /// Second attached body.
    pub body_b: Option<BodyId>,
    /// First anchor.
    pub point_a: Vector,
    /// Second anchor.
    pub point_b: Vector,
    /// Render style.
    pub render: ConstraintRender,
}

impl Constraint {
    /// Constraint between two world points.
    pub fn between_points(id: u64, point_a: Vector, point_b: Vector) -> Self {
        Self {
            id,
            body_a: None,
            body_b: None,
            point_a,
            point_b,
            render: ConstraintRender::default(),
        }
    }

    /// World position of the first anchor.
    ///
    /// Returns `None` when the attached body is not in `index`.
    pub fn world_point_a(&self, index: &BodyIndex<'_>) -> Option<Vector> {
        resolve(self.body_a, self.point_a, index)
    }

    /// World position of the second anchor.
    ///
    /// Returns `None` when the attached body is not in `index`.
    pub fn world_point_b(&self, index: &BodyIndex<'_>) -> Option<Vector> {
        resolve(self.body_b, self.point_b, index)
    }
}

fn resolve(body: Option<BodyId>, point: Vector, index: &BodyIndex<'_>) -> Option<Vector> {
    match body {
        Some(id) => index.get(id).map(|b| b.position.add(point)),
        None => Some(point),
    }
}
