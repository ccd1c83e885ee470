//! Command line options consumed by the presenter core

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::render::HalfSelect;

/// Present a PDF slide deck: current view plus next-slide preview, with
/// background prerendering into an in-memory cache.
#[derive(Parser, Debug)]
#[command(name = "deckview", version)]
pub struct Options {
    /// Path to the PDF slide deck
    pub deck: PathBuf,

    /// Dual-wide deck layout: half of each page carrying the slides
    #[arg(long, value_enum)]
    pub notes: Option<NotesLayout>,

    /// Turn slide caching off entirely
    #[arg(long)]
    pub disable_cache: bool,

    /// Cache raw buffers instead of compressing them
    #[arg(long)]
    pub disable_compression: bool,

    /// Current-view target width in pixels
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Current-view target height in pixels
    #[arg(long, default_value_t = 768)]
    pub height: u32,

    /// Slide to show first (0-based)
    #[arg(long, default_value_t = 0)]
    pub start_slide: usize,

    /// Write the first displayed slide to this PNG path
    #[arg(long)]
    pub dump: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "deckview.log")]
    pub log_file: PathBuf,
}

/// Where the slide content sits on a dual-wide page
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotesLayout {
    Left,
    Right,
}

impl Options {
    /// Half selection the renderers should apply
    #[must_use]
    pub fn half_select(&self) -> HalfSelect {
        match self.notes {
            None => HalfSelect::Full,
            Some(NotesLayout::Left) => HalfSelect::Left,
            Some(NotesLayout::Right) => HalfSelect::Right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Options::command().debug_assert();
    }

    #[test]
    fn notes_flag_maps_to_half_select() {
        let options = Options::parse_from(["deckview", "deck.pdf", "--notes", "left"]);
        assert_eq!(options.half_select(), HalfSelect::Left);

        let options = Options::parse_from(["deckview", "deck.pdf"]);
        assert_eq!(options.half_select(), HalfSelect::Full);
        assert!(!options.disable_cache);
        assert!(!options.disable_compression);
    }
}
