//! Renderer configuration.

use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Options read by the renderer every frame.
///
/// Deserializes from camelCase JSON; missing keys take their defaults.
///
/// # Example
///
/// ```
/// use vellum_render::options::RenderOptions;
///
/// let options = RenderOptions::from_json_str(r#"{ "wireframes": false, "showBounds": true }"#).unwrap();
/// assert!(!options.wireframes);
/// assert!(options.show_bounds);
/// assert_eq!(options.width, 800.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Surface width in CSS pixels.
    pub width: f64,
    /// Surface height in CSS pixels.
    pub height: f64,
    /// Device pixels per CSS pixel.
    pub pixel_ratio: f64,
    /// Backdrop when wireframes are off.
    pub background: String,
    /// Backdrop when wireframes are on.
    pub wireframe_background: String,
    /// Stroke color of wireframe outlines.
    pub wireframe_stroke_style: String,
    /// Stroke color of the bounds overlay outside wireframe mode.
    pub bound_color: String,
    /// Cull to and transform by the renderer's view bounds.
    pub has_bounds: bool,
    pub wireframes: bool,
    /// Draw sleeping bodies at half opacity.
    pub show_sleeping: bool,
    /// Build outlines even for parts without a fill.
    pub show_borders: bool,
    /// Draw the seams between parts of compound bodies.
    pub show_internal_edges: bool,
    pub show_bounds: bool,
    pub show_convex_hulls: bool,
    /// Master switch for the debug overlays below.
    pub debug: bool,
    pub show_axes: bool,
    pub show_angle_indicator: bool,
    pub show_positions: bool,
    pub show_velocity: bool,
    pub show_ids: bool,
    pub show_separations: bool,
    pub show_collisions: bool,
    pub show_vertex_numbers: bool,
    pub show_mouse_position: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            pixel_ratio: 1.0,
            background: "#14151f".to_owned(),
            wireframe_background: "#14151f".to_owned(),
            wireframe_stroke_style: "#bbb".to_owned(),
            bound_color: "rgba(0,0,0,0.1)".to_owned(),
            has_bounds: false,
            wireframes: true,
            show_sleeping: true,
            show_borders: false,
            show_internal_edges: false,
            show_bounds: false,
            show_convex_hulls: false,
            debug: false,
            show_axes: false,
            show_angle_indicator: false,
            show_positions: false,
            show_velocity: false,
            show_ids: false,
            show_separations: false,
            show_collisions: false,
            show_vertex_numbers: false,
            show_mouse_position: false,
        }
    }
}

impl RenderOptions {
    /// Parse options from JSON and validate them.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidOptions`] for malformed JSON or values
    /// rejected by [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        let options: RenderOptions =
            serde_json::from_str(json).map_err(|e| RenderError::InvalidOptions {
                reason: e.to_string(),
            })?;
        options.validate()?;
        Ok(options)
    }

    /// Check that the surface size and pixel ratio are usable.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidOptions`] naming the first bad value.
    pub fn validate(&self) -> Result<(), RenderError> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("pixelRatio", self.pixel_ratio),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(RenderError::InvalidOptions {
                    reason: format!("{name} must be positive and finite, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Backdrop string for the current mode.
    pub fn active_background(&self) -> &str {
        if self.wireframes {
            &self.wireframe_background
        } else {
            &self.background
        }
    }

    /// Whether the body drawer draws seams between compound parts. Filled
    /// rendering always does, so fills keep the part shape.
    pub fn draws_internal_edges(&self) -> bool {
        self.show_internal_edges || !self.wireframes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = RenderOptions::default();
        assert!(options.wireframes);
        assert!(options.show_sleeping);
        assert!(!options.has_bounds);
        assert_eq!(options.active_background(), "#14151f");
        assert_eq!(options.wireframe_stroke_style, "#bbb");
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(RenderOptions::from_json_str("{}").unwrap(), RenderOptions::default());
    }

    #[test]
    fn camel_case_keys_are_recognized() {
        let options = RenderOptions::from_json_str(
            r##"{ "showInternalEdges": true, "pixelRatio": 2, "wireframeBackground": "#000" }"##,
        )
        .unwrap();
        assert!(options.show_internal_edges);
        assert_eq!(options.pixel_ratio, 2.0);
        assert_eq!(options.active_background(), "#000");
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = RenderOptions::from_json_str(r#"{ "pixelRatio": 0 }"#).unwrap_err();
        assert!(matches!(err, RenderError::InvalidOptions { ref reason } if reason.contains("pixelRatio")));
        assert!(RenderOptions::from_json_str("not json").is_err());
    }

    #[test]
    fn filled_mode_always_draws_internal_edges() {
        let mut options = RenderOptions::default();
        assert!(!options.draws_internal_edges());
        options.wireframes = false;
        assert!(options.draws_internal_edges());
    }
}
