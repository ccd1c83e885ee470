// Presenter core: the binary wires these together, tests drive them
// directly.
pub mod options;
pub mod render;

pub use render::{PageRenderer, PixelBuffer, RenderError, SlideView};
