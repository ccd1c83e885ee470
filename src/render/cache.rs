//! Slide cache strategies: disabled, plain, and deflate-compressed
//!
//! A deck never changes after load, so entries are written once and never
//! invalidated or evicted; the map grows to at most `slide_count` entries.
//! Stores are first-write-wins: the interactive path and the prerender task
//! may race on the same index, but both produce byte-equal buffers, so
//! dropping the second write is harmless.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use log::error;

use super::types::PixelBuffer;

/// Common contract for slide caches.
///
/// Implementations are internally synchronized; `store` and `retrieve` are
/// safe to call concurrently from the interactive path and a prerender task.
pub trait SlideCache: Send + Sync {
    /// Insert a rendered buffer if no entry exists for `slide` yet.
    fn store(&self, slide: usize, buffer: Arc<PixelBuffer>);

    /// Look up a rendered buffer; `None` is a miss.
    fn retrieve(&self, slide: usize) -> Option<Arc<PixelBuffer>>;

    /// Number of cached slides
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache used when caching is turned off: never hits, never stores.
pub struct DisabledCache;

impl SlideCache for DisabledCache {
    fn store(&self, _slide: usize, _buffer: Arc<PixelBuffer>) {}

    fn retrieve(&self, _slide: usize) -> Option<Arc<PixelBuffer>> {
        None
    }

    fn len(&self) -> usize {
        0
    }
}

/// Stores buffers by reference: zero decode cost, full memory cost.
#[derive(Default)]
pub struct PlainCache {
    slides: Mutex<HashMap<usize, Arc<PixelBuffer>>>,
}

impl PlainCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<usize, Arc<PixelBuffer>>> {
        self.slides
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SlideCache for PlainCache {
    fn store(&self, slide: usize, buffer: Arc<PixelBuffer>) {
        self.lock().entry(slide).or_insert(buffer);
    }

    fn retrieve(&self, slide: usize) -> Option<Arc<PixelBuffer>> {
        self.lock().get(&slide).cloned()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

struct CompressedSlide {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

/// Deflate-compresses buffers before insertion, decodes on every retrieve.
///
/// Flat slide content compresses around 30x against the raw buffer. The
/// codec is deterministic and lossless, which is what makes racing writes
/// for the same index byte-equal.
#[derive(Default)]
pub struct CompressedCache {
    slides: Mutex<HashMap<usize, CompressedSlide>>,
}

impl CompressedCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total compressed bytes held, for memory reporting
    #[must_use]
    pub fn stored_bytes(&self) -> usize {
        self.lock().values().map(|entry| entry.data.len()).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<usize, CompressedSlide>> {
        self.slides
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[cfg(test)]
    fn insert_corrupt(&self, slide: usize, data: Vec<u8>, width: u32, height: u32) {
        self.lock().insert(slide, CompressedSlide { data, width, height });
    }
}

impl SlideCache for CompressedCache {
    fn store(&self, slide: usize, buffer: Arc<PixelBuffer>) {
        // Compress before taking the map lock so a slow encode never blocks
        // a concurrent retrieve.
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
        if let Err(e) = encoder.write_all(&buffer.pixels) {
            error!("failed to compress slide {slide}: {e}");
            return;
        }
        let data = match encoder.finish() {
            Ok(data) => data,
            Err(e) => {
                error!("failed to compress slide {slide}: {e}");
                return;
            }
        };

        self.lock().entry(slide).or_insert(CompressedSlide {
            data,
            width: buffer.width,
            height: buffer.height,
        });
    }

    fn retrieve(&self, slide: usize) -> Option<Arc<PixelBuffer>> {
        let (data, width, height) = {
            let slides = self.lock();
            let entry = slides.get(&slide)?;
            (entry.data.clone(), entry.width, entry.height)
        };

        let expected = PixelBuffer::expected_len(width, height);
        let mut pixels = Vec::with_capacity(expected);
        match ZlibDecoder::new(data.as_slice()).read_to_end(&mut pixels) {
            Ok(_) if pixels.len() == expected => Some(Arc::new(PixelBuffer {
                pixels,
                width,
                height,
            })),
            // The process produced this data itself; a decode failure is an
            // internal defect. Drop the bad entry and report a miss so the
            // caller re-renders and the next store can replace it.
            Ok(n) => {
                error!("cached slide {slide} decoded to {n} bytes, expected {expected}");
                self.lock().remove(&slide);
                None
            }
            Err(e) => {
                error!("failed to decode cached slide {slide}: {e}");
                self.lock().remove(&slide);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Select a cache strategy from configuration. Chosen once at startup and
/// never switched at runtime.
#[must_use]
pub fn create_cache(disable_caching: bool, disable_compression: bool) -> Arc<dyn SlideCache> {
    if disable_caching {
        Arc::new(DisabledCache)
    } else if disable_compression {
        Arc::new(PlainCache::new())
    } else {
        Arc::new(CompressedCache::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_buffer(width: u32, height: u32, fill: u8) -> Arc<PixelBuffer> {
        Arc::new(PixelBuffer {
            pixels: vec![fill; PixelBuffer::expected_len(width, height)],
            width,
            height,
        })
    }

    #[test]
    fn disabled_never_stores() {
        let cache = DisabledCache;
        cache.store(0, test_buffer(4, 4, 0x10));
        assert!(cache.retrieve(0).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn plain_round_trip() {
        let cache = PlainCache::new();
        let buffer = test_buffer(4, 4, 0x10);
        cache.store(2, Arc::clone(&buffer));

        let hit = cache.retrieve(2).expect("hit");
        assert_eq!(*hit, *buffer);
        assert!(cache.retrieve(1).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn compressed_round_trip_is_lossless() {
        let cache = CompressedCache::new();
        let mut pixels = Vec::with_capacity(PixelBuffer::expected_len(50, 20));
        for i in 0..PixelBuffer::expected_len(50, 20) {
            pixels.push((i % 251) as u8);
        }
        let buffer = Arc::new(PixelBuffer {
            pixels,
            width: 50,
            height: 20,
        });

        cache.store(7, Arc::clone(&buffer));
        let hit = cache.retrieve(7).expect("hit");
        assert_eq!(hit.width, 50);
        assert_eq!(hit.height, 20);
        assert_eq!(hit.pixels, buffer.pixels);
    }

    #[test]
    fn compressed_flat_content_shrinks_sharply() {
        let cache = CompressedCache::new();
        let buffer = test_buffer(400, 300, 0xFF);
        cache.store(0, Arc::clone(&buffer));

        let raw = buffer.pixels.len();
        assert!(
            cache.stored_bytes() * 30 < raw,
            "expected a 30x ratio, got {raw} -> {}",
            cache.stored_bytes()
        );
    }

    #[test]
    fn store_is_first_write_wins() {
        let cache = PlainCache::new();
        let first = test_buffer(4, 4, 0x10);
        let second = test_buffer(4, 4, 0x20);

        cache.store(0, Arc::clone(&first));
        cache.store(0, second);

        assert_eq!(*cache.retrieve(0).expect("hit"), *first);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn repeated_equal_stores_keep_one_entry() {
        let cache = CompressedCache::new();
        let buffer = test_buffer(8, 8, 0x55);
        for _ in 0..3 {
            cache.store(1, Arc::clone(&buffer));
        }
        assert_eq!(cache.len(), 1);
        assert_eq!(*cache.retrieve(1).expect("hit"), *buffer);
    }

    #[test]
    fn garbage_compressed_entry_reports_a_miss() {
        let cache = CompressedCache::new();
        cache.insert_corrupt(0, vec![0xDE, 0xAD, 0xBE, 0xEF], 4, 4);

        assert!(cache.retrieve(0).is_none());
        // The bad entry is dropped so a fresh store can replace it.
        assert_eq!(cache.len(), 0);
        cache.store(0, test_buffer(4, 4, 0x10));
        assert!(cache.retrieve(0).is_some());
    }

    #[test]
    fn short_decoded_entry_reports_a_miss() {
        // Valid zlib stream, but the payload is shorter than the claimed
        // 4x4 buffer needs.
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&[0x10; 10]).expect("encode");
        let data = encoder.finish().expect("encode");

        let cache = CompressedCache::new();
        cache.insert_corrupt(3, data, 4, 4);

        assert!(cache.retrieve(3).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn renderer_rerenders_after_decode_failure() {
        use crate::render::engine::{DocumentMetadata, EngineHandle};
        use crate::render::renderer::PageRenderer;
        use crate::render::testing::FakeBackend;
        use crate::render::types::HalfSelect;

        let backend = FakeBackend::new(2, 800.0, 600.0);
        let counters = backend.probe();
        let engine = EngineHandle::new(Box::new(backend));
        let metadata = DocumentMetadata::probe(&engine).expect("probe metadata");
        let renderer = PageRenderer::new(engine, metadata, 40, 30, HalfSelect::Full);

        let cache = Arc::new(CompressedCache::new());
        cache.insert_corrupt(0, vec![0x00; 8], 40, 30);
        let store: Arc<dyn SlideCache> = cache.clone();
        renderer.set_cache(Some(store));

        let buffer = renderer.render(0).expect("render falls back to the engine");
        assert_eq!((buffer.width, buffer.height), (40, 30));
        assert_eq!(counters.paint_count(), 1);

        // The re-render stored a good entry, so the next lookup is a hit.
        let again = renderer.render(0).expect("cache hit");
        assert_eq!(counters.paint_count(), 1);
        assert_eq!(*again, *buffer);
    }

    #[test]
    fn factory_selects_strategy() {
        assert!(create_cache(true, true).retrieve(0).is_none());

        let plain = create_cache(false, true);
        plain.store(0, test_buffer(2, 2, 1));
        assert!(plain.retrieve(0).is_some());

        let compressed = create_cache(false, false);
        compressed.store(0, test_buffer(2, 2, 1));
        assert!(compressed.retrieve(0).is_some());
    }

    #[test]
    fn disabled_via_factory_ignores_compression_flag() {
        let cache = create_cache(true, false);
        cache.store(0, test_buffer(2, 2, 1));
        assert_eq!(cache.len(), 0);
    }
}
