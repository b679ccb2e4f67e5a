//! Vellum Render -- debug renderer for 2D physics scenes.
//!
//! Draws a [`Scene`](vellum_scene::composite::Scene) onto any [`Surface`](surface::Surface):
//! bodies with their fills, borders, sprites and text labels, plus optional
//! bounds, wireframes and debug overlays. [`Render`](render::Render) runs
//! the frame, [`TextureCache`](texture::TextureCache) loads sprite images
//! off the render thread, and [`RecordingSurface`](recording::RecordingSurface)
//! and [`RasterSurface`](raster::RasterSurface) are the two bundled
//! surfaces: one records calls for tests, one paints pixels.
//!
//! # Quick Start
//!
//! ```
//! use vellum_render::prelude::*;
//! use vellum_scene::prelude::*;
//!
//! let mut world = Composite::new(0, "world");
//! world.bodies.push(Body::single(
//!     BodyId(1),
//!     Part::rectangle(1, Vector::new(40.0, 30.0), 20.0, 20.0)
//!         .with_render(PartRender::filled("#4a90d9")),
//! ));
//! let scene = Scene::new(world);
//!
//! let options = RenderOptions { wireframes: false, width: 80.0, height: 60.0, ..Default::default() };
//! let mut render = Render::new(options).unwrap();
//! let mut surface = RasterSurface::new(80, 60).unwrap();
//! render.world(&scene, &mut surface);
//!
//! assert_eq!(surface.canvas().get_pixel(40, 30).0, [0x4a, 0x90, 0xd9, 255]);
//! ```

#![deny(unsafe_code)]

pub mod background;
pub mod bodies;
pub mod bounds;
pub mod color;
pub mod events;
pub mod glyphs;
pub mod options;
pub mod overlays;
pub mod pointer;
pub mod raster;
pub mod recording;
pub mod render;
pub mod runner;
pub mod session;
pub mod surface;
pub mod texture;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while configuring the renderer or exporting frames.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// Options failed validation or could not be parsed.
    #[error("invalid render options: {reason}")]
    InvalidOptions { reason: String },

    /// A texture could not be read or decoded.
    #[error("failed to load texture '{path}': {reason}")]
    TextureLoad { path: String, reason: String },

    /// A raster surface cannot be allocated at this size.
    #[error("cannot allocate a {width}x{height} raster surface")]
    SurfaceSize { width: u32, height: u32 },

    /// A rendered frame could not be written out.
    #[error("failed to export frame to '{path}': {reason}")]
    Export { path: String, reason: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::background::Background;
    pub use crate::events::{ListenerId, RenderEvent, RenderEvents};
    pub use crate::options::RenderOptions;
    pub use crate::overlays::{Overlays, StandardOverlays};
    pub use crate::pointer::Pointer;
    pub use crate::raster::RasterSurface;
    pub use crate::recording::{DrawCall, RecordingSurface};
    pub use crate::render::{Render, RenderTiming};
    pub use crate::runner::{FrameReport, HeadlessRunner, RunnerConfig};
    pub use crate::surface::{CompositeOperation, FillStyle, Surface, Transform};
    pub use crate::texture::{
        FileTextureLoader, TextureCache, TextureHandle, TextureImage, TextureLoader, TextureState,
    };
    pub use crate::RenderError;
}
