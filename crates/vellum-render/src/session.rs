//! Per-frame drawing session.
//!
//! A [`DrawSession`] borrows the surface exclusively for one frame. The
//! transient context state the drawers change (global alpha, compositing,
//! the view transform) is reset when the session is dropped, so a frame
//! cannot leak state into the next one even if a drawer bails out early.

use std::ops::{Deref, DerefMut};

use vellum_scene::geometry::Bounds;

use crate::surface::{CompositeOperation, Surface, Transform};

/// Exclusive access to a surface for one frame.
pub struct DrawSession<'a> {
    surface: &'a mut dyn Surface,
    pixel_ratio: f64,
    view_transform: bool,
}

impl<'a> DrawSession<'a> {
    /// Start a session on `surface`.
    pub fn begin(surface: &'a mut dyn Surface, pixel_ratio: f64) -> Self {
        Self {
            surface,
            pixel_ratio,
            view_transform: false,
        }
    }

    /// Map `bounds` onto a `width` x `height` viewport.
    ///
    /// Sets `scale(pixel_ratio / bounds_scale)` then translates by
    /// `-bounds.min`.
    pub fn start_view_transform(&mut self, bounds: &Bounds, width: f64, height: f64) {
        let scale_x = bounds.width() / width;
        let scale_y = bounds.height() / height;
        self.surface.set_transform(Transform::scale(
            self.pixel_ratio / scale_x,
            self.pixel_ratio / scale_y,
        ));
        self.surface.translate(-bounds.min.x, -bounds.min.y);
        self.view_transform = true;
    }

    /// Return to the plain pixel-ratio transform.
    pub fn end_view_transform(&mut self) {
        self.surface
            .set_transform(Transform::scale(self.pixel_ratio, self.pixel_ratio));
        self.view_transform = false;
    }

    /// Whether a view transform is active.
    pub fn has_view_transform(&self) -> bool {
        self.view_transform
    }

    /// Device pixels per CSS pixel for this frame.
    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }
}

impl<'a> Deref for DrawSession<'a> {
    type Target = dyn Surface + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.surface
    }
}

impl<'a> DerefMut for DrawSession<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.surface
    }
}

impl Drop for DrawSession<'_> {
    fn drop(&mut self) {
        if self.view_transform {
            self.end_view_transform();
        }
        self.surface.set_global_alpha(1.0);
        self.surface
            .set_composite_operation(CompositeOperation::SourceOver);
    }
}
