//! The immediate-mode 2D drawing target.
//!
//! [`Surface`] mirrors the subset of a canvas 2D context the renderer uses:
//! path building, fill and stroke, images, text, an affine transform,
//! global alpha and compositing. Implementations decide what a call means
//! ([`RecordingSurface`](crate::recording::RecordingSurface) logs it,
//! [`RasterSurface`](crate::raster::RasterSurface) rasterizes it).

use std::sync::Arc;

use crate::background::Background;
use crate::texture::TextureImage;

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// A 2D affine transform in canvas order `(a, b, c, d, e, f)`.
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Build a transform from its six components.
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Non-uniform scale about the origin.
    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// `self` followed by a translation in the local frame, like
    /// `ctx.translate`.
    pub fn translated(&self, x: f64, y: f64) -> Self {
        Transform {
            e: self.a * x + self.c * y + self.e,
            f: self.b * x + self.d * y + self.f,
            ..*self
        }
    }

    /// `self` followed by a rotation in the local frame, like `ctx.rotate`.
    pub fn rotated(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Transform {
            a: self.a * cos + self.c * sin,
            b: self.b * cos + self.d * sin,
            c: self.c * cos - self.a * sin,
            d: self.d * cos - self.b * sin,
            ..*self
        }
    }

    /// Apply to a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Inverse transform, or `None` when singular.
    pub fn invert(&self) -> Option<Transform> {
        let det = self.a * self.d - self.b * self.c;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Transform {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        })
    }

    /// Component-wise comparison within `epsilon`.
    pub fn approx_eq(&self, other: &Transform, epsilon: f64) -> bool {
        [
            (self.a, other.a),
            (self.b, other.b),
            (self.c, other.c),
            (self.d, other.d),
            (self.e, other.e),
            (self.f, other.f),
        ]
        .iter()
        .all(|(x, y)| (x - y).abs() <= epsilon)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// How new pixels combine with existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeOperation {
    /// Draw over existing content.
    #[default]
    SourceOver,
    /// Keep only where both exist; with a transparent source this clears.
    SourceIn,
    /// Overlay blend, used by the axes overlay.
    Overlay,
}

impl CompositeOperation {
    /// The canvas keyword for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeOperation::SourceOver => "source-over",
            CompositeOperation::SourceIn => "source-in",
            CompositeOperation::Overlay => "overlay",
        }
    }
}

/// Fill style: a CSS color or a repeating texture pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum FillStyle {
    /// Any CSS color string.
    Color(String),
    /// The image repeated in both directions.
    Pattern(Arc<TextureImage>),
}

impl FillStyle {
    /// Color fill from anything string-like.
    pub fn color(color: impl Into<String>) -> Self {
        FillStyle::Color(color.into())
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// A canvas-like immediate-mode drawing target.
///
/// Coordinates go through the current transform. Paths accumulate between
/// [`begin_path`](Surface::begin_path) calls and are consumed by
/// [`fill`](Surface::fill) and [`stroke`](Surface::stroke) without being
/// cleared.
pub trait Surface {
    /// Surface size in device pixels.
    fn size(&self) -> (f64, f64);

    /// Set the backdrop shown through transparent pixels.
    fn set_background(&mut self, background: &Background);

    fn set_global_alpha(&mut self, alpha: f64);
    fn set_composite_operation(&mut self, operation: CompositeOperation);
    fn set_fill_style(&mut self, style: FillStyle);
    fn set_stroke_style(&mut self, color: &str);
    fn set_line_width(&mut self, width: f64);
    fn set_font(&mut self, font: &str);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    /// Circular arc from `start` to `end` radians, clockwise on screen.
    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64);
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self);

    /// Fill a rectangle with the current fill style, ignoring the path.
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn fill_text(&mut self, text: &str, x: f64, y: f64);
    /// Draw `image` scaled into the given rectangle.
    fn draw_image(&mut self, image: &TextureImage, x: f64, y: f64, width: f64, height: f64);

    fn translate(&mut self, x: f64, y: f64);
    fn rotate(&mut self, angle: f64);
    /// Replace the current transform.
    fn set_transform(&mut self, transform: Transform);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
