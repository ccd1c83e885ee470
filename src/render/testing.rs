//! Deterministic fake backend for tests
//!
//! Compiled for unit tests and, via the `test-utils` feature, for
//! integration tests in `tests/`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::engine::{PaintSpec, RenderBackend};
use super::types::{BYTES_PER_PIXEL, PixelBuffer, RenderError};

/// Byte painted in the green channel for the left half of a page
pub const LEFT_HALF_BYTE: u8 = 0x40;
/// Byte painted in the green channel for the right half of a page
pub const RIGHT_HALF_BYTE: u8 = 0xC0;

/// Shared observation point for paints performed by a [`FakeBackend`]
#[derive(Clone, Default)]
pub struct PaintProbe {
    paints: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    overlapped: Arc<AtomicBool>,
    last_spec: Arc<Mutex<Option<PaintSpec>>>,
}

impl PaintProbe {
    /// Total number of paint calls so far
    pub fn paint_count(&self) -> usize {
        self.paints.load(Ordering::SeqCst)
    }

    /// Whether two paints were ever in flight at once.
    ///
    /// Always false when callers respect the engine lock.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    /// Spec of the most recent paint call
    pub fn last_spec(&self) -> Option<PaintSpec> {
        *self
            .last_spec
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// In-memory stand-in for the PDF engine.
///
/// Paints each page deterministically: the red channel carries the page
/// index, the green channel marks which half of the page a pixel came from.
/// Pixels outside the page stay white, which makes cropping visible.
pub struct FakeBackend {
    page_count: usize,
    page_width: f32,
    page_height: f32,
    paint_delay: Duration,
    probe: PaintProbe,
}

impl FakeBackend {
    #[must_use]
    pub fn new(page_count: usize, page_width: f32, page_height: f32) -> Self {
        Self {
            page_count,
            page_width,
            page_height,
            paint_delay: Duration::ZERO,
            probe: PaintProbe::default(),
        }
    }

    /// Make each paint take at least `delay`, widening race windows in
    /// concurrency tests.
    #[must_use]
    pub fn with_paint_delay(mut self, delay: Duration) -> Self {
        self.paint_delay = delay;
        self
    }

    /// Observation handle that stays valid after the backend moves into an
    /// [`super::EngineHandle`].
    #[must_use]
    pub fn probe(&self) -> PaintProbe {
        self.probe.clone()
    }
}

impl RenderBackend for FakeBackend {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self) -> (f32, f32) {
        (self.page_width, self.page_height)
    }

    fn paint(
        &mut self,
        index: usize,
        spec: &PaintSpec,
        target: &mut PixelBuffer,
    ) -> Result<(), RenderError> {
        if index >= self.page_count {
            return Err(RenderError::backend(format!("no such page {index}")));
        }

        if self.probe.active.fetch_add(1, Ordering::SeqCst) > 0 {
            self.probe.overlapped.store(true, Ordering::SeqCst);
        }
        if !self.paint_delay.is_zero() {
            std::thread::sleep(self.paint_delay);
        }

        let mid_x = self.page_width / 2.0;
        let row_bytes = target.width as usize * BYTES_PER_PIXEL;
        for y in 0..target.height as usize {
            let src_y = y as f32 / spec.scale;
            let row = &mut target.pixels[y * row_bytes..(y + 1) * row_bytes];
            for (x, px) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let src_x = (x as f32 - spec.shift_x) / spec.scale;
                if src_x < self.page_width && src_y < self.page_height {
                    px[0] = index as u8;
                    px[1] = if src_x < mid_x {
                        LEFT_HALF_BYTE
                    } else {
                        RIGHT_HALF_BYTE
                    };
                    px[2] = 0x00;
                }
            }
        }

        *self
            .probe
            .last_spec
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(*spec);
        self.probe.active.fetch_sub(1, Ordering::SeqCst);
        self.probe.paints.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
