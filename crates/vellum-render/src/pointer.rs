//! Pointer position mapped into world coordinates.

use vellum_scene::geometry::Vector;

/// A pointer whose surface position is mapped through the view bounds.
///
/// `position = absolute * scale + offset`. The renderer updates `scale`
/// and `offset` every frame it draws with a view transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    /// Position in surface pixels.
    pub absolute: Vector,
    /// Position in world coordinates.
    pub position: Vector,
    pub offset: Vector,
    pub scale: Vector,
}

impl Default for Pointer {
    fn default() -> Self {
        Self {
            absolute: Vector::ZERO,
            position: Vector::ZERO,
            offset: Vector::ZERO,
            scale: Vector::new(1.0, 1.0),
        }
    }
}

impl Pointer {
    /// Pointer at the origin with unit scale.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the pointer to a surface position.
    pub fn move_to(&mut self, absolute: Vector) {
        self.absolute = absolute;
        self.update();
    }

    /// Set the view-to-surface scale.
    pub fn set_scale(&mut self, scale: Vector) {
        self.scale = scale;
        self.update();
    }

    /// Set the view offset.
    pub fn set_offset(&mut self, offset: Vector) {
        self.offset = offset;
        self.update();
    }

    fn update(&mut self) {
        self.position = Vector::new(
            self.absolute.x * self.scale.x + self.offset.x,
            self.absolute.y * self.scale.y + self.offset.y,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_follows_scale_and_offset() {
        let mut pointer = Pointer::new();
        pointer.move_to(Vector::new(100.0, 50.0));
        assert_eq!(pointer.position, Vector::new(100.0, 50.0));

        pointer.set_scale(Vector::new(0.5, 2.0));
        pointer.set_offset(Vector::new(10.0, -10.0));
        assert_eq!(pointer.position, Vector::new(60.0, 90.0));
    }
}
