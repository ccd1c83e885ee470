//! Core types for slide rendering

/// Bytes per pixel in rendered buffers (RGB)
pub const BYTES_PER_PIXEL: usize = 3;

/// Raw rendered slide image.
///
/// Dimensions always equal the owning renderer's target size, regardless of
/// the native page aspect ratio. Buffers are shared as `Arc<PixelBuffer>` and
/// never mutated after rendering completes.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Raw RGB pixel data (3 bytes per pixel: R, G, B)
    pub pixels: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl PixelBuffer {
    /// Allocate a buffer filled with opaque white.
    ///
    /// Source pages may have transparent backgrounds, so every render starts
    /// from a white canvas.
    #[must_use]
    pub fn blank_white(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![0xFF; width as usize * height as usize * BYTES_PER_PIXEL],
            width,
            height,
        }
    }

    /// Expected byte length for the given dimensions
    #[must_use]
    pub const fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Which part of a page a renderer shows.
///
/// Dual-wide decks carry slide content and presenter notes side by side on
/// every page; a renderer then selects one half before scaling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HalfSelect {
    /// Whole page
    #[default]
    Full,
    /// Left half of a dual-wide page
    Left,
    /// Right half of a dual-wide page
    Right,
}

impl HalfSelect {
    /// Whether this selection splits the page in two
    #[must_use]
    pub const fn is_split(self) -> bool {
        !matches!(self, Self::Full)
    }
}

/// Errors from the rendering subsystem
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("slide {slide} out of range (deck has {count} slides)")]
    SlideOutOfRange { slide: usize, count: usize },

    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Engine(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Backend { detail: String },
}

impl RenderError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend { detail: msg.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_white_has_target_dimensions() {
        let buffer = PixelBuffer::blank_white(400, 300);
        assert_eq!(buffer.width, 400);
        assert_eq!(buffer.height, 300);
        assert_eq!(buffer.pixels.len(), PixelBuffer::expected_len(400, 300));
        assert!(buffer.pixels.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn half_select_split() {
        assert!(!HalfSelect::Full.is_split());
        assert!(HalfSelect::Left.is_split());
        assert!(HalfSelect::Right.is_split());
    }
}
