//! Engine seam and the process-wide lock around it
//!
//! The native page renderer is not reentrant: concurrent calls through the
//! same document handle corrupt engine state, not merely output. The handle
//! therefore lives inside a shared mutex: holding the guard *is* the
//! exclusive access, so no renderer or background task can bypass it.

use std::sync::{Arc, Mutex, MutexGuard};

use super::types::{PixelBuffer, RenderError};

/// Per-call paint parameters, in device (target pixel) space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintSpec {
    /// Uniform native-unit to pixel scale
    pub scale: f32,
    /// Horizontal translate applied after scaling; negative shifts the page
    /// left, selecting the right half of a dual-wide page
    pub shift_x: f32,
    /// Target buffer width in pixels
    pub width: u32,
    /// Target buffer height in pixels
    pub height: u32,
}

/// Minimal surface of the page-rendering engine.
///
/// Production uses [`MupdfBackend`]; tests substitute a deterministic fake.
/// Implementations are only ever called through [`EngineHandle`], so they may
/// assume exclusive access.
pub trait RenderBackend: Send {
    /// Number of pages in the loaded document
    fn page_count(&self) -> usize;

    /// Native size of a page in engine units.
    ///
    /// Slide decks have uniform page sizes; this reports the first page's.
    fn page_size(&self) -> (f32, f32);

    /// Paint page `index` into `target`, which arrives pre-filled with opaque
    /// white at exactly `spec.width` by `spec.height`.
    fn paint(
        &mut self,
        index: usize,
        spec: &PaintSpec,
        target: &mut PixelBuffer,
    ) -> Result<(), RenderError>;
}

/// Shared, lock-mediated access to the rendering engine.
///
/// Cloning is cheap and every clone funnels into the same lock.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Mutex<Box<dyn RenderBackend>>>,
}

impl EngineHandle {
    #[must_use]
    pub fn new(backend: Box<dyn RenderBackend>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(backend)),
        }
    }

    /// Acquire the engine. Hold the guard only around the foreign-call
    /// region; cache I/O must happen after it drops.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn RenderBackend>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Read-only document facts, probed once at startup
#[derive(Clone, Copy, Debug)]
pub struct DocumentMetadata {
    /// Number of slides in the deck
    pub slide_count: usize,
    /// Native page width in engine units
    pub page_width: f32,
    /// Native page height in engine units
    pub page_height: f32,
}

impl DocumentMetadata {
    /// Probe the loaded document under the engine lock.
    pub fn probe(engine: &EngineHandle) -> Result<Self, RenderError> {
        let guard = engine.lock();
        let slide_count = guard.page_count();
        if slide_count == 0 {
            return Err(RenderError::backend("document has no pages"));
        }
        let (page_width, page_height) = guard.page_size();
        if page_width <= 0.0 || page_height <= 0.0 {
            return Err(RenderError::backend(format!(
                "invalid page size {page_width}x{page_height}"
            )));
        }
        Ok(Self {
            slide_count,
            page_width,
            page_height,
        })
    }
}

/// Copy a scaled engine pixmap into the target buffer, dropping overflow.
///
/// The horizontal shift picks which half of a dual-wide page lands at x = 0;
/// rows past the target extent are cropped. The engine may round the scaled
/// page a pixel short of the target, so the final source row and column are
/// duplicated across any remainder rather than leaving a white seam.
#[cfg(any(test, feature = "pdf"))]
fn blit_cropped(
    samples: &[u8],
    n: usize,
    stride: usize,
    src_width: usize,
    src_height: usize,
    spec: &PaintSpec,
    target: &mut PixelBuffer,
) -> Result<(), RenderError> {
    use super::types::BYTES_PER_PIXEL;

    if n < 3 {
        return Err(RenderError::backend(format!(
            "unsupported pixmap format: {n} channels"
        )));
    }
    if samples.len() < stride.saturating_mul(src_height) || src_width * n > stride {
        return Err(RenderError::backend("pixmap buffer size mismatch"));
    }

    let src_x0 = (-spec.shift_x).round().max(0.0) as usize;
    if src_x0 >= src_width || src_height == 0 {
        return Ok(());
    }

    let copy_w = (src_width - src_x0).min(target.width as usize);
    let copy_h = src_height.min(target.height as usize);
    let dst_stride = target.width as usize * BYTES_PER_PIXEL;

    for y in 0..target.height as usize {
        let src_row = &samples[y.min(copy_h - 1) * stride..][..src_width * n];
        let dst_row = &mut target.pixels[y * dst_stride..][..dst_stride];
        if n == 3 {
            let start = src_x0 * n;
            dst_row[..copy_w * n].copy_from_slice(&src_row[start..start + copy_w * n]);
        } else {
            for (dst, src) in dst_row[..copy_w * BYTES_PER_PIXEL]
                .chunks_exact_mut(BYTES_PER_PIXEL)
                .zip(src_row[src_x0 * n..].chunks_exact(n))
            {
                dst.copy_from_slice(&src[..BYTES_PER_PIXEL]);
            }
        }
        if copy_w < target.width as usize {
            let p = (src_x0 + copy_w - 1) * n;
            let last = [src_row[p], src_row[p + 1], src_row[p + 2]];
            for pixel in dst_row[copy_w * BYTES_PER_PIXEL..].chunks_exact_mut(BYTES_PER_PIXEL) {
                pixel.copy_from_slice(&last);
            }
        }
    }

    Ok(())
}

#[cfg(feature = "pdf")]
pub use mupdf_backend::MupdfBackend;

#[cfg(feature = "pdf")]
mod mupdf_backend {
    use std::path::Path;

    use mupdf::{Colorspace, Document, Matrix};

    use super::{PaintSpec, RenderBackend, blit_cropped};
    use crate::render::types::{PixelBuffer, RenderError};

    /// MuPDF-backed rendering engine
    pub struct MupdfBackend {
        doc: Document,
        page_count: usize,
        page_size: (f32, f32),
    }

    impl MupdfBackend {
        /// Open a document and read its basic facts.
        pub fn open(path: &Path) -> Result<Self, RenderError> {
            let doc = Document::open(path.to_string_lossy().as_ref())?;
            let page_count = doc.page_count()? as usize;
            if page_count == 0 {
                return Err(RenderError::backend("document has no pages"));
            }
            let page = doc.load_page(0)?;
            let bounds = page.bounds()?;
            Ok(Self {
                doc,
                page_count,
                page_size: (bounds.x1 - bounds.x0, bounds.y1 - bounds.y0),
            })
        }
    }

    // SAFETY: `mupdf::Document` is not `Send` because raw engine handles are
    // not thread-safe, but a `MupdfBackend` is only ever reached through
    // `EngineHandle`'s mutex, so the handle is never used from two threads at
    // once.
    unsafe impl Send for MupdfBackend {}

    impl RenderBackend for MupdfBackend {
        fn page_count(&self) -> usize {
            self.page_count
        }

        fn page_size(&self) -> (f32, f32) {
            self.page_size
        }

        fn paint(
            &mut self,
            index: usize,
            spec: &PaintSpec,
            target: &mut PixelBuffer,
        ) -> Result<(), RenderError> {
            let page = self.doc.load_page(index as i32)?;
            let transform = Matrix::new_scale(spec.scale, spec.scale);
            let rgb = Colorspace::device_rgb();
            let pixmap = page.to_pixmap(&transform, &rgb, false, false)?;
            blit_cropped(
                pixmap.samples(),
                pixmap.n() as usize,
                pixmap.stride() as usize,
                pixmap.width() as usize,
                pixmap.height() as usize,
                spec,
                target,
            )
        }
    }
}
