//! Slide navigation state machine
//!
//! Relative moves clamp at the deck bounds; absolute jumps validate and
//! fail. Every transition delegates rendering to the view's renderer+cache
//! pair and is otherwise side-effect free on the cache subsystem.

use std::sync::Arc;

use log::trace;

use super::renderer::PageRenderer;
use super::types::{PixelBuffer, RenderError};

/// What a view shows relative to the presentation position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewRole {
    /// The slide being presented
    Primary,
    /// Preview of the upcoming slide. The last slide has no successor, so a
    /// request for `slide_count` silently clamps to the last slide.
    NextPreview,
}

/// Navigation state bound to one renderer+cache pair.
pub struct SlideView {
    renderer: Arc<PageRenderer>,
    role: ViewRole,
    current: usize,
}

impl SlideView {
    #[must_use]
    pub fn new(renderer: Arc<PageRenderer>, role: ViewRole) -> Self {
        Self {
            renderer,
            role,
            current: 0,
        }
    }

    #[must_use]
    pub fn current_slide(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn slide_count(&self) -> usize {
        self.renderer.slide_count()
    }

    #[must_use]
    pub fn renderer(&self) -> &Arc<PageRenderer> {
        &self.renderer
    }

    /// Advance one slide, clamped at the end of the deck.
    pub fn next(&mut self) -> Result<Arc<PixelBuffer>, RenderError> {
        self.jump_forward(1)
    }

    /// Go back one slide, clamped at the start of the deck.
    pub fn previous(&mut self) -> Result<Arc<PixelBuffer>, RenderError> {
        self.jump_back(1)
    }

    /// Advance `k` slides, clamped at the end of the deck.
    pub fn jump_forward(&mut self, k: usize) -> Result<Arc<PixelBuffer>, RenderError> {
        let last = self.slide_count().saturating_sub(1);
        self.current = self.current.saturating_add(k).min(last);
        self.render_current()
    }

    /// Go back `k` slides, clamped at the start of the deck.
    pub fn jump_back(&mut self, k: usize) -> Result<Arc<PixelBuffer>, RenderError> {
        self.current = self.current.saturating_sub(k);
        self.render_current()
    }

    /// Show a specific slide.
    ///
    /// Fails with [`RenderError::SlideOutOfRange`] outside the deck, except
    /// for the next-preview clamp described on [`ViewRole`].
    pub fn display(&mut self, slide: usize) -> Result<Arc<PixelBuffer>, RenderError> {
        let count = self.slide_count();
        let slide = match self.role {
            ViewRole::NextPreview if slide == count => count - 1,
            _ => slide,
        };
        if slide >= count {
            return Err(RenderError::SlideOutOfRange { slide, count });
        }

        trace!("{:?} view: slide {slide}", self.role);
        self.current = slide;
        self.render_current()
    }

    /// Alias for [`display`](Self::display), matching navigation keybindings.
    pub fn goto_page(&mut self, slide: usize) -> Result<Arc<PixelBuffer>, RenderError> {
        self.display(slide)
    }

    fn render_current(&mut self) -> Result<Arc<PixelBuffer>, RenderError> {
        self.renderer.render(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::engine::{DocumentMetadata, EngineHandle};
    use crate::render::testing::FakeBackend;
    use crate::render::types::HalfSelect;

    fn view(pages: usize, role: ViewRole) -> SlideView {
        let engine = EngineHandle::new(Box::new(FakeBackend::new(pages, 800.0, 600.0)));
        let metadata = DocumentMetadata::probe(&engine).expect("probe");
        let renderer = Arc::new(PageRenderer::new(
            engine,
            metadata,
            400,
            300,
            HalfSelect::Full,
        ));
        SlideView::new(renderer, role)
    }

    #[test]
    fn next_and_previous_saturate_at_bounds() {
        let mut view = view(3, ViewRole::Primary);
        assert_eq!(view.current_slide(), 0);

        view.previous().expect("render");
        assert_eq!(view.current_slide(), 0);

        view.next().expect("render");
        view.next().expect("render");
        view.next().expect("render");
        assert_eq!(view.current_slide(), 2);
    }

    #[test]
    fn jumps_clamp_instead_of_failing() {
        let mut view = view(5, ViewRole::Primary);
        view.jump_forward(100).expect("render");
        assert_eq!(view.current_slide(), 4);

        view.jump_back(100).expect("render");
        assert_eq!(view.current_slide(), 0);
    }

    #[test]
    fn display_validates_bounds() {
        let mut view = view(3, ViewRole::Primary);
        assert!(view.display(2).is_ok());
        let err = view.display(3).expect_err("out of range");
        assert!(matches!(
            err,
            RenderError::SlideOutOfRange { slide: 3, count: 3 }
        ));
        // A failed display leaves the position untouched.
        assert_eq!(view.current_slide(), 2);
    }

    #[test]
    fn goto_page_mirrors_display() {
        let mut view = view(3, ViewRole::Primary);
        assert!(view.goto_page(1).is_ok());
        assert_eq!(view.current_slide(), 1);
        assert!(view.goto_page(99).is_err());
    }

    #[test]
    fn next_preview_clamps_past_the_last_slide() {
        let mut view = view(3, ViewRole::NextPreview);
        let buffer = view.display(3).expect("clamped to last slide");
        assert_eq!(view.current_slide(), 2);
        assert_eq!(buffer.pixels[0], 2);

        // Only the one-past-the-end request clamps; farther is still fatal.
        assert!(view.display(4).is_err());
    }

    #[test]
    fn rendered_slide_matches_position() {
        let mut view = view(4, ViewRole::Primary);
        let buffer = view.display(2).expect("render");
        // Fake backend writes the page index into the red channel.
        assert_eq!(buffer.pixels[0], 2);
    }
}
