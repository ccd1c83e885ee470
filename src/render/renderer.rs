//! Fixed-size page renderer with crop-to-fill geometry

use std::sync::{Arc, Mutex};

use log::{debug, trace};

use super::cache::SlideCache;
use super::engine::{DocumentMetadata, EngineHandle, PaintSpec};
use super::types::{HalfSelect, PixelBuffer, RenderError};

/// Renders one page index into a buffer of a fixed target size.
///
/// The scale factor is chosen so the page fully covers the target: overflow
/// is cropped, never letterboxed. Each view owns its renderer (target sizes
/// differ) but all renderers share one [`EngineHandle`].
pub struct PageRenderer {
    engine: EngineHandle,
    metadata: DocumentMetadata,
    target_width: u32,
    target_height: u32,
    half: HalfSelect,
    scale_factor: f32,
    cache: Mutex<Option<Arc<dyn SlideCache>>>,
}

impl PageRenderer {
    #[must_use]
    pub fn new(
        engine: EngineHandle,
        metadata: DocumentMetadata,
        target_width: u32,
        target_height: u32,
        half: HalfSelect,
    ) -> Self {
        let native_width = if half.is_split() {
            metadata.page_width / 2.0
        } else {
            metadata.page_width
        };
        let scale_factor = (target_width as f32 / native_width)
            .max(target_height as f32 / metadata.page_height);

        debug!(
            "renderer: target {target_width}x{target_height}, half {half:?}, scale {scale_factor}"
        );

        Self {
            engine,
            metadata,
            target_width,
            target_height,
            half,
            scale_factor,
            cache: Mutex::new(None),
        }
    }

    /// Uniform native-unit to pixel multiplier
    #[must_use]
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    #[must_use]
    pub fn slide_count(&self) -> usize {
        self.metadata.slide_count
    }

    #[must_use]
    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Attach or detach a cache. Only toggles whether lookups and stores
    /// happen; the render path itself is unchanged.
    pub fn set_cache(&self, cache: Option<Arc<dyn SlideCache>>) {
        *self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = cache;
    }

    #[must_use]
    pub fn cache(&self) -> Option<Arc<dyn SlideCache>> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Produce the buffer for `slide`, from cache when possible.
    ///
    /// On a miss the engine lock is held only for the paint; the cache store
    /// (including compression) runs after it drops, so a slow encode never
    /// blocks another renderer's paint.
    pub fn render(&self, slide: usize) -> Result<Arc<PixelBuffer>, RenderError> {
        let count = self.metadata.slide_count;
        if slide >= count {
            return Err(RenderError::SlideOutOfRange { slide, count });
        }

        let cache = self.cache();
        if let Some(cached) = cache.as_ref().and_then(|c| c.retrieve(slide)) {
            trace!("slide {slide}: cache hit");
            return Ok(cached);
        }

        let spec = self.paint_spec();
        let mut buffer = PixelBuffer::blank_white(self.target_width, self.target_height);
        {
            let mut engine = self.engine.lock();
            engine.paint(slide, &spec, &mut buffer)?;
        }

        let buffer = Arc::new(buffer);
        if let Some(cache) = cache {
            cache.store(slide, Arc::clone(&buffer));
        }
        trace!("slide {slide}: rendered");
        Ok(buffer)
    }

    fn paint_spec(&self) -> PaintSpec {
        // Selecting the right half shifts the scaled page left by one half
        // width, which equals one target width when scale is width-bound.
        let shift_x = match self.half {
            HalfSelect::Full | HalfSelect::Left => 0.0,
            HalfSelect::Right => -(self.metadata.page_width / 2.0 * self.scale_factor),
        };
        PaintSpec {
            scale: self.scale_factor,
            shift_x,
            width: self.target_width,
            height: self.target_height,
        }
    }
}
