//! A software [`Surface`] backed by a `tiny-skia` pixmap.
//!
//! Good enough to eyeball frames from headless runs and to save them as
//! PNG. Path points go through the current transform as they are added,
//! the way a canvas context records them, so every fill and stroke hands
//! `tiny-skia` a device-space path. Text uses the built-in bitmap glyphs.

use std::collections::HashMap;
use std::path::Path;

use image::{Rgba, RgbaImage};
use tiny_skia::{
    BlendMode, Color, ColorU8, FillRule, FilterQuality, Paint, PathBuilder, Pattern, Pixmap,
    PixmapPaint, SpreadMode, Stroke,
};

use crate::background::{contain_rect, Background};
use crate::color;
use crate::glyphs;
use crate::surface::{CompositeOperation, FillStyle, Surface, Transform};
use crate::texture::TextureImage;
use crate::RenderError;

type Point = (f64, f64);

#[derive(Debug, Clone, Default)]
struct SubPath {
    points: Vec<Point>,
    closed: bool,
}

/// Rasterizing surface.
pub struct RasterSurface {
    pixmap: Pixmap,
    background: Option<Background>,
    backdrop: Option<Pixmap>,
    /// Premultiplied copies of textures, by path.
    textures: HashMap<String, Pixmap>,
    global_alpha: f64,
    composite: CompositeOperation,
    fill: FillStyle,
    stroke_color: Color,
    line_width: f64,
    font: String,
    transform: Transform,
    path: Vec<SubPath>,
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("composite", &self.composite)
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}

impl RasterSurface {
    /// Transparent surface of `width` x `height` device pixels.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SurfaceSize`] when either side is zero or the
    /// pixmap would be too large.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let pixmap = Pixmap::new(width, height).ok_or(RenderError::SurfaceSize { width, height })?;
        Ok(Self {
            pixmap,
            background: None,
            backdrop: None,
            textures: HashMap::new(),
            global_alpha: 1.0,
            composite: CompositeOperation::SourceOver,
            fill: FillStyle::color("#000000"),
            stroke_color: Color::BLACK,
            line_width: 1.0,
            font: "10px sans-serif".to_owned(),
            transform: Transform::IDENTITY,
            path: Vec::new(),
        })
    }

    /// The underlying premultiplied pixmap, without the backdrop.
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// The drawn pixels as straight-alpha RGBA, without the backdrop.
    pub fn canvas(&self) -> RgbaImage {
        to_rgba_image(&self.pixmap)
    }

    /// The drawn pixels composited over the backdrop.
    pub fn to_image(&self) -> RgbaImage {
        let mut out = self.pixmap.clone();
        out.fill(Color::TRANSPARENT);

        match &self.background {
            Some(Background::Style(style)) => {
                if let Some(color) = color::parse(style) {
                    out.fill(color);
                }
            }
            Some(Background::Image { .. }) => {
                if let Some(backdrop) = &self.backdrop {
                    let (bw, bh) = (f64::from(backdrop.width()), f64::from(backdrop.height()));
                    let (x0, y0, dw, dh) = contain_rect(
                        bw,
                        bh,
                        f64::from(out.width()),
                        f64::from(out.height()),
                    );
                    let fit = Transform::new(dw / bw, 0.0, 0.0, dh / bh, x0, y0);
                    out.draw_pixmap(
                        0,
                        0,
                        backdrop.as_ref(),
                        &PixmapPaint {
                            quality: FilterQuality::Bilinear,
                            ..PixmapPaint::default()
                        },
                        to_skia(&fit),
                        None,
                    );
                }
            }
            None => {}
        }

        out.draw_pixmap(
            0,
            0,
            self.pixmap.as_ref(),
            &PixmapPaint::default(),
            tiny_skia::Transform::identity(),
            None,
        );
        to_rgba_image(&out)
    }

    /// Save [`to_image`](Self::to_image) as a PNG file.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Export`] when the file cannot be written.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        let path = path.as_ref();
        self.to_image()
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| RenderError::Export {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    fn device_scale(&self) -> f64 {
        let t = &self.transform;
        (t.a * t.d - t.b * t.c).abs().sqrt()
    }

    fn blend_mode(&self) -> BlendMode {
        match self.composite {
            CompositeOperation::SourceOver => BlendMode::SourceOver,
            CompositeOperation::SourceIn => BlendMode::SourceIn,
            CompositeOperation::Overlay => BlendMode::Overlay,
        }
    }

    fn current_subpath(&mut self) -> &mut SubPath {
        if self.path.last().map_or(true, |p| p.closed) {
            let start = self
                .path
                .last()
                .and_then(|p| p.points.first().copied());
            self.path.push(SubPath {
                points: start.into_iter().collect(),
                closed: false,
            });
        }
        let last = self.path.len() - 1;
        &mut self.path[last]
    }

    fn quad(&self, x: f64, y: f64, width: f64, height: f64) -> SubPath {
        let t = self.transform;
        SubPath {
            points: vec![
                t.apply(x, y),
                t.apply(x + width, y),
                t.apply(x + width, y + height),
                t.apply(x, y + height),
            ],
            closed: true,
        }
    }

    /// Fill device-space polygons with the current fill style.
    fn fill_subpaths(&mut self, subpaths: &[SubPath]) {
        let Some(path) = build_path(subpaths, true) else {
            return;
        };
        let blend_mode = self.blend_mode();
        let opacity = self.global_alpha as f32;
        let identity = tiny_skia::Transform::identity();

        match &self.fill {
            FillStyle::Color(css) => {
                let mut paint = Paint::default();
                paint.set_color(with_opacity(color::parse(css).unwrap_or(Color::BLACK), opacity));
                paint.blend_mode = blend_mode;
                self.pixmap
                    .fill_path(&path, &paint, FillRule::Winding, identity, None);
            }
            FillStyle::Pattern(image) => {
                let Some(tile) = texture_pixmap(&mut self.textures, image) else {
                    return;
                };
                // the pattern repeats in user space, anchored at its origin
                let paint = Paint {
                    shader: Pattern::new(
                        tile.as_ref(),
                        SpreadMode::Repeat,
                        FilterQuality::Nearest,
                        opacity,
                        to_skia(&self.transform),
                    ),
                    blend_mode,
                    ..Paint::default()
                };
                self.pixmap
                    .fill_path(&path, &paint, FillRule::Winding, identity, None);
            }
        }
    }
}

fn to_skia(t: &Transform) -> tiny_skia::Transform {
    tiny_skia::Transform::from_row(
        t.a as f32, t.b as f32, t.c as f32, t.d as f32, t.e as f32, t.f as f32,
    )
}

fn with_opacity(mut color: Color, opacity: f32) -> Color {
    color.apply_opacity(opacity);
    color
}

fn build_path(subpaths: &[SubPath], close_all: bool) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for sub in subpaths.iter().filter(|s| s.points.len() >= 2) {
        let (x, y) = sub.points[0];
        builder.move_to(x as f32, y as f32);
        for &(x, y) in &sub.points[1..] {
            builder.line_to(x as f32, y as f32);
        }
        if close_all || sub.closed {
            builder.close();
        }
    }
    builder.finish()
}

/// Premultiply straight RGBA8 rows into a pixmap.
fn rgba_pixmap(width: u32, height: u32, pixels: &[u8]) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(width, height)?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(pixels.chunks_exact(4)) {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
    }
    Some(pixmap)
}

/// Pixmap for `image`, converted once per texture path.
fn texture_pixmap<'a>(
    cache: &'a mut HashMap<String, Pixmap>,
    image: &TextureImage,
) -> Option<&'a Pixmap> {
    if !cache.contains_key(&image.path) {
        let pixmap = rgba_pixmap(image.width, image.height, &image.pixels)?;
        cache.insert(image.path.clone(), pixmap);
    }
    cache.get(&image.path)
}

fn to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    image
}

impl Surface for RasterSurface {
    fn size(&self) -> (f64, f64) {
        (f64::from(self.pixmap.width()), f64::from(self.pixmap.height()))
    }

    fn set_background(&mut self, background: &Background) {
        self.backdrop = match background {
            Background::Image { path } => match image::open(path) {
                Ok(decoded) => {
                    let rgba = decoded.to_rgba8();
                    rgba_pixmap(rgba.width(), rgba.height(), rgba.as_raw())
                }
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "background image failed to load");
                    None
                }
            },
            Background::Style(_) => None,
        };
        self.background = Some(background.clone());
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.global_alpha = alpha.clamp(0.0, 1.0);
    }

    fn set_composite_operation(&mut self, operation: CompositeOperation) {
        self.composite = operation;
    }

    fn set_fill_style(&mut self, style: FillStyle) {
        self.fill = style;
    }

    fn set_stroke_style(&mut self, css: &str) {
        self.stroke_color = color::parse(css).unwrap_or(Color::BLACK);
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    fn set_font(&mut self, font: &str) {
        self.font = font.to_owned();
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        let p = self.transform.apply(x, y);
        self.path.push(SubPath {
            points: vec![p],
            closed: false,
        });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let p = self.transform.apply(x, y);
        self.current_subpath().points.push(p);
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64) {
        let sweep = end - start;
        let steps = ((radius * self.device_scale() * sweep.abs() / 2.0).ceil() as usize).clamp(8, 96);
        for i in 0..=steps {
            let theta = start + sweep * i as f64 / steps as f64;
            let (px, py) = (x + radius * theta.cos(), y + radius * theta.sin());
            if i == 0 && self.path.last().map_or(true, |p| p.closed) {
                self.move_to(px, py);
            } else {
                self.line_to(px, py);
            }
        }
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let quad = self.quad(x, y, width, height);
        self.path.push(quad);
    }

    fn close_path(&mut self) {
        if let Some(last) = self.path.last_mut() {
            last.closed = true;
        }
    }

    fn fill(&mut self) {
        let subpaths = std::mem::take(&mut self.path);
        self.fill_subpaths(&subpaths);
        self.path = subpaths;
    }

    fn stroke(&mut self) {
        let Some(path) = build_path(&self.path, false) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color(with_opacity(self.stroke_color, self.global_alpha as f32));
        paint.blend_mode = self.blend_mode();
        let stroke = Stroke {
            width: (self.line_width * self.device_scale()) as f32,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, tiny_skia::Transform::identity(), None);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let quad = self.quad(x, y, width, height);
        self.fill_subpaths(&[quad]);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        let cell = glyphs::cell_size(&self.font);
        let top = y - cell * glyphs::GLYPH_HEIGHT as f64;
        let cells: Vec<SubPath> = glyphs::lit_cells(text)
            .into_iter()
            .map(|(col, row)| self.quad(x + col as f64 * cell, top + row as f64 * cell, cell, cell))
            .collect();
        self.fill_subpaths(&cells);
    }

    fn draw_image(&mut self, image: &TextureImage, x: f64, y: f64, width: f64, height: f64) {
        if image.width == 0 || image.height == 0 || width == 0.0 || height == 0.0 {
            return;
        }
        let placement = self.transform.translated(x, y);
        let placement = Transform {
            a: placement.a * width / f64::from(image.width),
            b: placement.b * width / f64::from(image.width),
            c: placement.c * height / f64::from(image.height),
            d: placement.d * height / f64::from(image.height),
            ..placement
        };
        let paint = PixmapPaint {
            opacity: self.global_alpha as f32,
            blend_mode: self.blend_mode(),
            quality: FilterQuality::Nearest,
        };
        let Some(tile) = texture_pixmap(&mut self.textures, image) else {
            return;
        };
        self.pixmap
            .draw_pixmap(0, 0, tile.as_ref(), &paint, to_skia(&placement), None);
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.transform = self.transform.translated(x, y);
    }

    fn rotate(&mut self, angle: f64) {
        self.transform = self.transform.rotated(angle);
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn surface(width: u32, height: u32) -> RasterSurface {
        RasterSurface::new(width, height).unwrap()
    }

    fn px(surface: &RasterSurface, x: u32, y: u32) -> [u8; 4] {
        surface.canvas().get_pixel(x, y).0
    }

    #[test]
    fn fill_rect_paints_inside_only() {
        let mut s = surface(20, 20);
        s.set_fill_style(FillStyle::color("red"));
        s.fill_rect(5.0, 5.0, 10.0, 10.0);
        assert_eq!(px(&s, 10, 10), [255, 0, 0, 255]);
        assert_eq!(px(&s, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn transparent_source_in_clears() {
        let mut s = surface(8, 8);
        s.set_fill_style(FillStyle::color("blue"));
        s.fill_rect(0.0, 0.0, 8.0, 8.0);
        s.set_composite_operation(CompositeOperation::SourceIn);
        s.set_fill_style(FillStyle::color("transparent"));
        s.fill_rect(0.0, 0.0, 8.0, 8.0);
        assert_eq!(px(&s, 4, 4)[3], 0);
    }

    #[test]
    fn path_fill_follows_transform() {
        let mut s = surface(40, 40);
        s.translate(20.0, 20.0);
        s.set_fill_style(FillStyle::color("#00ff00"));
        s.begin_path();
        s.move_to(-5.0, -5.0);
        s.line_to(5.0, -5.0);
        s.line_to(5.0, 5.0);
        s.line_to(-5.0, 5.0);
        s.close_path();
        s.fill();
        assert_eq!(px(&s, 20, 20), [0, 255, 0, 255]);
        assert_eq!(px(&s, 5, 5)[3], 0);
    }

    #[test]
    fn stroke_draws_the_outline_not_the_inside() {
        let mut s = surface(40, 40);
        s.set_stroke_style("white");
        s.set_line_width(2.0);
        s.begin_path();
        s.rect(10.0, 10.0, 20.0, 20.0);
        s.stroke();
        assert_eq!(px(&s, 20, 10), [255, 255, 255, 255]);
        assert_eq!(px(&s, 20, 20)[3], 0);
    }

    #[test]
    fn stroke_width_scales_with_the_view() {
        let mut s = surface(40, 40);
        s.set_transform(Transform::scale(4.0, 4.0));
        s.set_stroke_style("white");
        s.set_line_width(1.0);
        s.begin_path();
        s.move_to(0.0, 5.0);
        s.line_to(10.0, 5.0);
        s.stroke();
        // one user unit at 4x covers device rows 18..22
        assert_eq!(px(&s, 20, 19)[3], 255);
        assert_eq!(px(&s, 20, 21)[3], 255);
        assert_eq!(px(&s, 20, 24)[3], 0);
    }

    #[test]
    fn global_alpha_blends() {
        let mut s = surface(4, 4);
        s.set_global_alpha(0.5);
        s.set_fill_style(FillStyle::color("white"));
        s.fill_rect(0.0, 0.0, 4.0, 4.0);
        let alpha = px(&s, 1, 1)[3];
        assert!((127..=128).contains(&alpha), "alpha = {alpha}");
    }

    #[test]
    fn image_is_drawn_into_its_rect() {
        let mut s = surface(20, 20);
        let image = TextureImage::solid("t", 2, 2, [10, 20, 30, 255]);
        s.draw_image(&image, 4.0, 4.0, 8.0, 8.0);
        assert_eq!(px(&s, 6, 6), [10, 20, 30, 255]);
        assert_eq!(px(&s, 15, 15)[3], 0);
    }

    #[test]
    fn pattern_fill_repeats_the_texture() {
        let mut s = surface(16, 16);
        let tile = TextureImage {
            path: "checker".into(),
            width: 2,
            height: 1,
            pixels: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        s.set_fill_style(FillStyle::Pattern(Arc::new(tile)));
        s.fill_rect(0.0, 0.0, 16.0, 16.0);
        assert_eq!(px(&s, 0, 3), [255, 0, 0, 255]);
        assert_eq!(px(&s, 1, 3), [0, 0, 255, 255]);
        assert_eq!(px(&s, 8, 9), [255, 0, 0, 255]);
    }

    #[test]
    fn text_lights_some_pixels() {
        let mut s = surface(60, 20);
        s.set_font("8px Arial");
        s.set_fill_style(FillStyle::color("white"));
        s.fill_text("10", 2.0, 12.0);
        let lit = s.canvas().pixels().filter(|p| p.0[3] > 0).count();
        assert!(lit > 10, "expected glyph pixels, got {lit}");
    }

    #[test]
    fn backdrop_shows_through_transparent_pixels() {
        let mut s = surface(4, 4);
        s.set_background(&Background::Style("#14151f".into()));
        let image = s.to_image();
        assert_eq!(image.get_pixel(0, 0).0, [20, 21, 31, 255]);
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert!(matches!(
            RasterSurface::new(0, 10),
            Err(RenderError::SurfaceSize { width: 0, height: 10 })
        ));
    }
}
