//! Slide rendering infrastructure

mod cache;
mod engine;
mod prerender;
mod progress;
mod renderer;
mod types;
mod view;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use cache::{CompressedCache, DisabledCache, PlainCache, SlideCache, create_cache};
#[cfg(feature = "pdf")]
pub use engine::MupdfBackend;
pub use engine::{DocumentMetadata, EngineHandle, PaintSpec, RenderBackend};
pub use prerender::{PrerenderEngine, PrerenderHandle};
pub use progress::{CacheStatus, ChannelObserver, EngineId, ProgressEvent, ProgressObserver};
pub use renderer::PageRenderer;
pub use types::{BYTES_PER_PIXEL, HalfSelect, PixelBuffer, RenderError};
pub use view::{SlideView, ViewRole};
