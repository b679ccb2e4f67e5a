//! Texture cache with future-like handles.
//!
//! [`TextureCache::get`] returns a [`TextureHandle`] immediately. A handle
//! starts out [`TextureState::Loading`] while a background thread decodes
//! the image through a [`TextureLoader`]; finished loads travel back over a
//! channel and are applied by [`TextureCache::poll`], which the renderer
//! calls at the start of every frame. Drawing with a handle that is not
//! ready draws nothing for that frame.
//!
//! The cache is append-only: entries are never evicted or reloaded.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use vellum_render::texture::{TextureCache, TextureImage, TextureLoader};
//! use vellum_render::RenderError;
//!
//! struct Solid;
//!
//! impl TextureLoader for Solid {
//!     fn load(&self, path: &str) -> Result<TextureImage, RenderError> {
//!         Ok(TextureImage::solid(path, 4, 4, [255, 0, 0, 255]))
//!     }
//! }
//!
//! let mut cache = TextureCache::new(Solid);
//! let first = cache.get("crate.png");
//! let second = cache.get("crate.png");
//! assert!(first.same_slot(&second));
//!
//! cache.wait_pending(Duration::from_secs(5));
//! assert!(first.is_ready());
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::RenderError;

// ---------------------------------------------------------------------------
// TextureImage
// ---------------------------------------------------------------------------

/// A decoded RGBA8 image.
#[derive(Clone, PartialEq, Eq)]
pub struct TextureImage {
    /// Path the image was loaded from.
    pub path: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// An image filled with a single color.
    pub fn solid(path: impl Into<String>, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            path: path.into(),
            width,
            height,
            pixels,
        }
    }

    /// RGBA of the pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl std::fmt::Debug for TextureImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureImage")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// TextureHandle
// ---------------------------------------------------------------------------

/// Load state of a texture.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureState {
    /// Still decoding.
    Loading,
    /// Decoded and ready to draw.
    Ready(Arc<TextureImage>),
    /// Loading failed; the texture stays blank.
    Failed(String),
}

/// Shared handle to a cached texture.
///
/// Clones share the same slot, so a handle obtained before the load
/// finished sees the image once [`TextureCache::poll`] has applied it.
#[derive(Debug, Clone)]
pub struct TextureHandle {
    path: Arc<str>,
    state: Arc<Mutex<TextureState>>,
}

impl TextureHandle {
    fn loading(path: &str) -> Self {
        Self {
            path: Arc::from(path),
            state: Arc::new(Mutex::new(TextureState::Loading)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TextureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, state: TextureState) {
        *self.lock() = state;
    }

    /// Path this handle was requested with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> TextureState {
        self.lock().clone()
    }

    /// The image, if loaded.
    pub fn image(&self) -> Option<Arc<TextureImage>> {
        match &*self.lock() {
            TextureState::Ready(image) => Some(Arc::clone(image)),
            _ => None,
        }
    }

    /// Whether the image has loaded.
    pub fn is_ready(&self) -> bool {
        matches!(*self.lock(), TextureState::Ready(_))
    }

    /// Whether the load is still in flight or not yet polled.
    pub fn is_loading(&self) -> bool {
        matches!(*self.lock(), TextureState::Loading)
    }

    /// Whether two handles share the same cache slot.
    pub fn same_slot(&self, other: &TextureHandle) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Decodes an image for a path. Runs on a background thread.
pub trait TextureLoader: Send + Sync + 'static {
    /// Load and decode `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::TextureLoad`] when the image cannot be read
    /// or decoded.
    fn load(&self, path: &str) -> Result<TextureImage, RenderError>;
}

/// Loads png, jpeg and gif files from disk with the `image` crate.
///
/// Relative paths are resolved against `root` when one is set.
#[derive(Debug, Clone, Default)]
pub struct FileTextureLoader {
    root: Option<PathBuf>,
}

impl FileTextureLoader {
    /// Loader that resolves paths as given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that resolves relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl TextureLoader for FileTextureLoader {
    fn load(&self, path: &str) -> Result<TextureImage, RenderError> {
        let full = match &self.root {
            Some(root) => root.join(path),
            None => PathBuf::from(path),
        };
        let decoded = image::open(&full).map_err(|e| RenderError::TextureLoad {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(TextureImage {
            path: path.to_owned(),
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

// ---------------------------------------------------------------------------
// TextureCache
// ---------------------------------------------------------------------------

type LoadResult = (String, Result<TextureImage, RenderError>);

/// Path-keyed texture cache. Lives as long as the renderer.
pub struct TextureCache {
    loader: Arc<dyn TextureLoader>,
    entries: HashMap<String, TextureHandle>,
    sender: Sender<LoadResult>,
    receiver: Receiver<LoadResult>,
    pending: usize,
    loads_started: usize,
}

impl TextureCache {
    /// Empty cache that loads through `loader`.
    pub fn new(loader: impl TextureLoader) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            loader: Arc::new(loader),
            entries: HashMap::new(),
            sender,
            receiver,
            pending: 0,
            loads_started: 0,
        }
    }

    /// The handle for `path`, starting a background load on first request.
    pub fn get(&mut self, path: &str) -> TextureHandle {
        if let Some(handle) = self.entries.get(path) {
            return handle.clone();
        }

        let handle = TextureHandle::loading(path);
        self.entries.insert(path.to_owned(), handle.clone());
        self.pending += 1;
        self.loads_started += 1;

        let loader = Arc::clone(&self.loader);
        let sender = self.sender.clone();
        let owned = path.to_owned();
        std::thread::spawn(move || {
            // a panicking loader still reports back, so the handle resolves
            let result = panic::catch_unwind(AssertUnwindSafe(|| loader.load(&owned)))
                .unwrap_or_else(|payload| {
                    Err(RenderError::TextureLoad {
                        path: owned.clone(),
                        reason: format!("loader panicked: {}", panic_message(payload.as_ref())),
                    })
                });
            // The cache may be gone by now; nothing to do then.
            let _ = sender.send((owned, result));
        });

        tracing::trace!(path, "texture load started");
        handle
    }

    /// Apply finished loads. Returns how many handles changed state.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.receiver.try_recv() {
            self.apply(result);
            applied += 1;
        }
        applied
    }

    /// Block until every started load has finished or `timeout` elapses.
    ///
    /// Returns `true` when nothing is pending anymore.
    pub fn wait_pending(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll();
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(result) => self.apply(result),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.pending == 0
    }

    fn apply(&mut self, (path, result): LoadResult) {
        self.pending = self.pending.saturating_sub(1);
        let Some(handle) = self.entries.get(&path) else {
            return;
        };
        match result {
            Ok(image) => {
                tracing::debug!(path = %path, width = image.width, height = image.height, "texture ready");
                handle.resolve(TextureState::Ready(Arc::new(image)));
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "texture failed to load, drawing blank");
                handle.resolve(TextureState::Failed(err.to_string()));
            }
        }
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no path has been requested yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads still in flight.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Total loads ever started. Equals [`len`](Self::len) since entries
    /// are never reloaded.
    pub fn loads_started(&self) -> usize {
        self.loads_started
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new(FileTextureLoader::new())
    }
}

impl std::fmt::Debug for TextureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureCache")
            .field("entries", &self.entries.len())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
