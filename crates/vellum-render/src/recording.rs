//! A [`Surface`] that records every call for headless inspection.
//!
//! Used by tests, benches and the `headless_frames` demo the way a debug
//! renderer extracts draw commands without a GPU. Besides the raw call log
//! the recorder tracks the state a real context would (alpha, compositing,
//! transform) and can replay the path calls into the line segments each
//! `stroke` would have drawn.

use vellum_scene::geometry::Vector;

use crate::background::Background;
use crate::surface::{CompositeOperation, FillStyle, Surface, Transform};
use crate::texture::TextureImage;

// ---------------------------------------------------------------------------
// DrawCall
// ---------------------------------------------------------------------------

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    SetBackground(Background),
    SetGlobalAlpha(f64),
    SetCompositeOperation(CompositeOperation),
    SetFillStyle(FillStyle),
    SetStrokeStyle(String),
    SetLineWidth(f64),
    SetFont(String),
    BeginPath,
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    Arc { x: f64, y: f64, radius: f64, start: f64, end: f64 },
    Rect { x: f64, y: f64, width: f64, height: f64 },
    ClosePath,
    Fill,
    Stroke,
    FillRect { x: f64, y: f64, width: f64, height: f64 },
    FillText { text: String, x: f64, y: f64 },
    /// Image draws record the texture path rather than the pixels.
    DrawImage { path: String, x: f64, y: f64, width: f64, height: f64 },
    Translate { x: f64, y: f64 },
    Rotate(f64),
    SetTransform(Transform),
}

impl DrawCall {
    /// Whether the call puts pixels on the surface.
    pub fn is_paint(&self) -> bool {
        matches!(
            self,
            DrawCall::Fill
                | DrawCall::Stroke
                | DrawCall::FillRect { .. }
                | DrawCall::FillText { .. }
                | DrawCall::DrawImage { .. }
        )
    }
}

/// A straight segment of a stroked path, in path coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Vector,
    pub to: Vector,
}

impl Segment {
    /// Whether this segment joins `a` and `b` in either direction.
    pub fn joins(&self, a: Vector, b: Vector, epsilon: f64) -> bool {
        (self.from.approx_eq(a, epsilon) && self.to.approx_eq(b, epsilon))
            || (self.from.approx_eq(b, epsilon) && self.to.approx_eq(a, epsilon))
    }
}

// ---------------------------------------------------------------------------
// RecordingSurface
// ---------------------------------------------------------------------------

/// Records surface calls and tracks context state.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    calls: Vec<DrawCall>,
    global_alpha: f64,
    composite: CompositeOperation,
    transform: Transform,
}

impl RecordingSurface {
    /// Empty recorder of the given device size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            calls: Vec::new(),
            global_alpha: 1.0,
            composite: CompositeOperation::SourceOver,
            transform: Transform::IDENTITY,
        }
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Take the log, leaving it empty. Context state is kept.
    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    /// Forget the recorded calls. Context state is kept.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DrawCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    /// Current global alpha.
    pub fn global_alpha(&self) -> f64 {
        self.global_alpha
    }

    /// Current composite operation.
    pub fn composite_operation(&self) -> CompositeOperation {
        self.composite
    }

    /// Current transform.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Segments drawn by each `stroke` call, in order.
    ///
    /// Replays the path calls: `move_to` lifts the pen, `line_to` and
    /// `close_path` add segments, `rect` adds its four sides. Arcs add no
    /// segments. Zero-length segments are dropped.
    pub fn strokes(&self) -> Vec<Vec<Segment>> {
        let mut strokes = Vec::new();
        let mut path: Vec<Segment> = Vec::new();
        let mut current: Option<Vector> = None;
        let mut start: Option<Vector> = None;

        let push = |path: &mut Vec<Segment>, from: Vector, to: Vector| {
            if !from.approx_eq(to, 1e-12) {
                path.push(Segment { from, to });
            }
        };

        for call in &self.calls {
            match *call {
                DrawCall::BeginPath => {
                    path.clear();
                    current = None;
                    start = None;
                }
                DrawCall::MoveTo { x, y } => {
                    current = Some(Vector::new(x, y));
                    start = current;
                }
                DrawCall::LineTo { x, y } => {
                    let to = Vector::new(x, y);
                    match current {
                        Some(from) => push(&mut path, from, to),
                        None => start = Some(to),
                    }
                    current = Some(to);
                }
                DrawCall::ClosePath => {
                    if let (Some(from), Some(to)) = (current, start) {
                        push(&mut path, from, to);
                        current = Some(to);
                    }
                }
                DrawCall::Rect { x, y, width, height } => {
                    let corners = [
                        Vector::new(x, y),
                        Vector::new(x + width, y),
                        Vector::new(x + width, y + height),
                        Vector::new(x, y + height),
                    ];
                    for i in 0..4 {
                        push(&mut path, corners[i], corners[(i + 1) % 4]);
                    }
                    current = Some(corners[0]);
                    start = current;
                }
                DrawCall::Stroke => strokes.push(path.clone()),
                _ => {}
            }
        }
        strokes
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn set_background(&mut self, background: &Background) {
        self.calls.push(DrawCall::SetBackground(background.clone()));
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.global_alpha = alpha;
        self.calls.push(DrawCall::SetGlobalAlpha(alpha));
    }

    fn set_composite_operation(&mut self, operation: CompositeOperation) {
        self.composite = operation;
        self.calls.push(DrawCall::SetCompositeOperation(operation));
    }

    fn set_fill_style(&mut self, style: FillStyle) {
        self.calls.push(DrawCall::SetFillStyle(style));
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.calls.push(DrawCall::SetStrokeStyle(color.to_owned()));
    }

    fn set_line_width(&mut self, width: f64) {
        self.calls.push(DrawCall::SetLineWidth(width));
    }

    fn set_font(&mut self, font: &str) {
        self.calls.push(DrawCall::SetFont(font.to_owned()));
    }

    fn begin_path(&mut self) {
        self.calls.push(DrawCall::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.calls.push(DrawCall::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.calls.push(DrawCall::LineTo { x, y });
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64) {
        self.calls.push(DrawCall::Arc {
            x,
            y,
            radius,
            start,
            end,
        });
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(DrawCall::Rect {
            x,
            y,
            width,
            height,
        });
    }

    fn close_path(&mut self) {
        self.calls.push(DrawCall::ClosePath);
    }

    fn fill(&mut self) {
        self.calls.push(DrawCall::Fill);
    }

    fn stroke(&mut self) {
        self.calls.push(DrawCall::Stroke);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(DrawCall::FillRect {
            x,
            y,
            width,
            height,
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.calls.push(DrawCall::FillText {
            text: text.to_owned(),
            x,
            y,
        });
    }

    fn draw_image(&mut self, image: &TextureImage, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(DrawCall::DrawImage {
            path: image.path.clone(),
            x,
            y,
            width,
            height,
        });
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.transform = self.transform.translated(x, y);
        self.calls.push(DrawCall::Translate { x, y });
    }

    fn rotate(&mut self, angle: f64) {
        self.transform = self.transform.rotated(angle);
        self.calls.push(DrawCall::Rotate(angle));
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.calls.push(DrawCall::SetTransform(transform));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
