//! Plain 2D geometry shared by the scene model and the renderer.
//!
//! Everything here is `f64` and `serde`-serializable so snapshots can be
//! dumped to JSON for debugging. The renderer never mutates these values;
//! it only reads them while building drawing calls.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vector
// ---------------------------------------------------------------------------

/// A 2D vector or point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate (grows downwards on screen).
    pub y: f64,
}

impl Vector {
    /// The zero vector.
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    /// Create a vector from components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise sum.
    pub fn add(self, other: Vector) -> Vector {
        Vector::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference `self - other`.
    pub fn sub(self, other: Vector) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y)
    }

    /// Scale both components by `scalar`.
    pub fn mult(self, scalar: f64) -> Vector {
        Vector::new(self.x * scalar, self.y * scalar)
    }

    /// Euclidean length.
    pub fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalise(self) -> Vector {
        let magnitude = self.magnitude();
        if magnitude == 0.0 {
            return Vector::ZERO;
        }
        Vector::new(self.x / magnitude, self.y / magnitude)
    }

    /// Perpendicular vector (rotated a quarter turn).
    pub fn perp(self) -> Vector {
        Vector::new(-self.y, self.x)
    }

    /// 2D cross product `self x other`.
    pub fn cross(self, other: Vector) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Rotate around the origin by `angle` radians.
    pub fn rotate(self, angle: f64) -> Vector {
        let (sin, cos) = angle.sin_cos();
        Vector::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Whether two points coincide within `epsilon` on both axes.
    pub fn approx_eq(self, other: Vector, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

// ---------------------------------------------------------------------------
// Vertex
// ---------------------------------------------------------------------------

/// A polygon vertex in world coordinates.
///
/// `is_internal` marks the edge that starts at this vertex and ends at the
/// next one (wrapping around) as shared with another part of the same
/// compound body. Outline tracing lifts the pen across such edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// Position of this vertex in its polygon.
    pub index: usize,
    /// Whether the edge leaving this vertex is internal to a compound body.
    pub is_internal: bool,
}

impl Vertex {
    /// Create an external vertex.
    pub fn new(x: f64, y: f64, index: usize) -> Self {
        Self {
            x,
            y,
            index,
            is_internal: false,
        }
    }

    /// The vertex position as a [`Vector`].
    pub fn point(&self) -> Vector {
        Vector::new(self.x, self.y)
    }
}

/// Build indexed external vertices from a list of points.
pub fn vertices_from_points(points: &[Vector]) -> Vec<Vertex> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| Vertex::new(p.x, p.y, i))
        .collect()
}

/// Mean of the vertex positions. Returns the origin for an empty list.
pub fn centre(vertices: &[Vertex]) -> Vector {
    if vertices.is_empty() {
        return Vector::ZERO;
    }
    let sum = vertices
        .iter()
        .fold(Vector::ZERO, |acc, v| acc.add(v.point()));
    sum.mult(1.0 / vertices.len() as f64)
}

/// Convex hull of a point cloud (Andrew's monotone chain).
///
/// The hull is returned in clockwise screen order (counter-clockwise in a
/// y-up frame) without repeating the first point. Inputs with fewer than
/// three distinct points are returned deduplicated as-is.
pub fn hull(points: &[Vector]) -> Vec<Vector> {
    let mut sorted: Vec<Vector> = points.to_vec();
    sorted.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    sorted.dedup_by(|a, b| a.approx_eq(*b, f64::EPSILON));

    if sorted.len() < 3 {
        return sorted;
    }

    let turn = |o: Vector, a: Vector, b: Vector| a.sub(o).cross(b.sub(o));

    let mut lower: Vec<Vector> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && turn(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Vector> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && turn(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Unique edge normals of a polygon, used by the axes overlay.
///
/// Parallel edges produce a single axis. Gradients are compared at three
/// decimal places.
pub fn axes(vertices: &[Vertex]) -> Vec<Vector> {
    let mut seen: Vec<(String, Vector)> = Vec::new();
    let n = vertices.len();
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let normal = Vector::new(b.y - a.y, a.x - b.x).normalise();
        let gradient = if normal.y == 0.0 {
            f64::INFINITY
        } else if normal.x == 0.0 {
            // avoid "-0.000" and "0.000" keys for the same direction
            0.0
        } else {
            normal.x / normal.y
        };
        let key = format!("{gradient:.3}");
        if !seen.iter().any(|(k, _)| *k == key) {
            seen.push((key, normal));
        }
    }
    seen.into_iter().map(|(_, axis)| axis).collect()
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Top-left corner.
    pub min: Vector,
    /// Bottom-right corner.
    pub max: Vector,
}

impl Bounds {
    /// Create bounds from corners.
    pub const fn new(min: Vector, max: Vector) -> Self {
        Self { min, max }
    }

    /// Tightest bounds around a vertex list. Empty input yields zero bounds.
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        let Some(first) = vertices.first() else {
            return Bounds::new(Vector::ZERO, Vector::ZERO);
        };
        let mut bounds = Bounds::new(first.point(), first.point());
        for v in &vertices[1..] {
            bounds.min.x = bounds.min.x.min(v.x);
            bounds.min.y = bounds.min.y.min(v.y);
            bounds.max.x = bounds.max.x.max(v.x);
            bounds.max.y = bounds.max.y.max(v.y);
        }
        bounds
    }

    /// Bounds of a circle.
    pub fn from_circle(centre: Vector, radius: f64) -> Self {
        Bounds::new(
            Vector::new(centre.x - radius, centre.y - radius),
            Vector::new(centre.x + radius, centre.y + radius),
        )
    }

    /// Smallest bounds containing both boxes.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            Vector::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Vector::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    /// Whether the two boxes intersect (touching edges count).
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.max.y >= other.min.y
            && self.min.y <= other.max.y
    }

    /// Whether `point` lies inside the box (edges inclusive).
    pub fn contains(&self, point: Vector) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Horizontal extent.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Vertical extent.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
