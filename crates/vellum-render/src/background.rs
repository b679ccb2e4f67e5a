//! Surface backdrop: a CSS style token or an image path.

/// A resolved backdrop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    /// Applied verbatim (`"#14151f"`, `"transparent"`, ...).
    Style(String),
    /// Image scaled to fit inside the surface with its aspect ratio kept.
    Image {
        /// Image path.
        path: String,
    },
}

impl Background {
    /// Classify a backdrop string. Strings ending in `jpg`, `gif` or `png`
    /// (case-sensitive) are images; everything else is a style.
    pub fn parse(source: &str) -> Self {
        if ["jpg", "gif", "png"].iter().any(|ext| source.ends_with(ext)) {
            Background::Image {
                path: source.to_owned(),
            }
        } else {
            Background::Style(source.to_owned())
        }
    }

    /// The string this background was parsed from.
    pub fn source(&self) -> &str {
        match self {
            Background::Style(style) => style,
            Background::Image { path } => path,
        }
    }

    /// CSS `background` value: `url(path)` for images.
    pub fn css(&self) -> String {
        match self {
            Background::Style(style) => style.clone(),
            Background::Image { path } => format!("url({path})"),
        }
    }
}

/// Rectangle `(x, y, width, height)` that fits an image inside a surface
/// without cropping, centered, keeping the aspect ratio.
pub fn contain_rect(image_w: f64, image_h: f64, surface_w: f64, surface_h: f64) -> (f64, f64, f64, f64) {
    if image_w <= 0.0 || image_h <= 0.0 {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let scale = (surface_w / image_w).min(surface_h / image_h);
    let (w, h) = (image_w * scale, image_h * scale);
    ((surface_w - w) / 2.0, (surface_h - h) / 2.0, w, h)
}

/// Parse `source` and push it to the surface as its backdrop.
pub fn apply_background(surface: &mut dyn crate::surface::Surface, source: &str) -> Background {
    let background = Background::parse(source);
    tracing::debug!(background = %background.css(), "applying background");
    surface.set_background(&background);
    background
}
