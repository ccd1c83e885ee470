//! Background prerendering of the full deck
//!
//! One engine per renderer walks every slide ahead of navigation so that
//! interactive lookups become cache hits. The walk reuses
//! [`PageRenderer::render`] and thereby its lock discipline: only the paint
//! holds the engine lock, stores happen outside it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use log::{debug, error, info};

use super::progress::{EngineId, ProgressObserver};
use super::renderer::PageRenderer;

/// Fills a renderer's cache for every slide in the deck.
///
/// Configure and subscribe observers first, then [`spawn`](Self::spawn); the
/// engine runs once to completion and is never restarted.
pub struct PrerenderEngine {
    source: EngineId,
    renderer: Arc<PageRenderer>,
    observers: Vec<Arc<dyn ProgressObserver>>,
    start_at: usize,
}

impl PrerenderEngine {
    #[must_use]
    pub fn new(source: EngineId, renderer: Arc<PageRenderer>) -> Self {
        Self {
            source,
            renderer,
            observers: Vec::new(),
            start_at: 0,
        }
    }

    /// Visit `slide` first and wrap around, so the slide on screen is primed
    /// before the rest of the deck. Every index is still visited exactly
    /// once.
    #[must_use]
    pub fn starting_at(mut self, slide: usize) -> Self {
        self.start_at = slide;
        self
    }

    /// Register an observer notified after each completed slide.
    ///
    /// Observers run on the prerender thread and must not block; hand off to
    /// a queue for anything slow (see
    /// [`ChannelObserver`](super::progress::ChannelObserver)).
    pub fn subscribe(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observers.push(observer);
    }

    /// Start the background thread and hand back its lifetime handle.
    #[must_use]
    pub fn spawn(self) -> PrerenderHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let join = std::thread::spawn(move || self.run(&flag));
        PrerenderHandle {
            stop,
            join: Some(join),
        }
    }

    fn run(self, stop: &AtomicBool) {
        let count = self.renderer.slide_count();
        let start = self.start_at.min(count.saturating_sub(1));
        debug!(
            "prerender {:?}: {count} slides, starting at {start}",
            self.source
        );

        let mut rendered = 0usize;
        for slide in (start..count).chain(0..start) {
            if stop.load(Ordering::Relaxed) {
                debug!("prerender {:?}: cancelled at slide {slide}", self.source);
                return;
            }

            match self.renderer.render(slide) {
                Ok(_) => {
                    rendered += 1;
                    let fraction = rendered as f64 / count as f64;
                    for observer in &self.observers {
                        observer.prerender_progress(self.source, fraction);
                    }
                }
                Err(e) => {
                    error!("prerender {:?}: slide {slide} failed: {e}", self.source);
                    return;
                }
            }
        }

        info!("prerender {:?}: complete ({count} slides)", self.source);
    }
}

/// Handle binding a prerender thread to its owning view's lifetime.
///
/// Dropping the handle cancels the walk at the next slide boundary and joins
/// the thread; there is no mid-page cancellation.
pub struct PrerenderHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl PrerenderHandle {
    /// Request a stop at the next slide boundary without joining.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Whether the background thread has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Block until the walk finishes or a previously requested cancel takes
    /// effect.
    pub fn join(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for PrerenderHandle {
    fn drop(&mut self) {
        self.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
