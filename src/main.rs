use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use simplelog::{Config, LevelFilter, WriteLogger};

use deckview::options::Options;
use deckview::render::{
    CacheStatus, ChannelObserver, DocumentMetadata, EngineHandle, EngineId, MupdfBackend,
    PageRenderer, PrerenderEngine, SlideView, ViewRole, create_cache,
};

// Progress events normally arrive every slide; a long silence means the
// engine thread died or the deck render is pathologically slow.
const PROGRESS_STALL_TIMEOUT: Duration = Duration::from_secs(60);

fn main() -> Result<()> {
    let options = Options::parse();

    WriteLogger::init(
        LevelFilter::Debug,
        Config::default(),
        File::create(&options.log_file)?,
    )?;

    info!("Opening deck {}", options.deck.display());
    let backend = MupdfBackend::open(&options.deck)
        .with_context(|| format!("failed to load {}", options.deck.display()))?;
    let engine = EngineHandle::new(Box::new(backend));
    let metadata = DocumentMetadata::probe(&engine)?;
    info!(
        "{} slides, native {}x{}",
        metadata.slide_count, metadata.page_width, metadata.page_height
    );

    let half = options.half_select();
    let current_renderer = Arc::new(PageRenderer::new(
        engine.clone(),
        metadata,
        options.width,
        options.height,
        half,
    ));
    let next_renderer = Arc::new(PageRenderer::new(
        engine.clone(),
        metadata,
        (options.width / 2).max(1),
        (options.height / 2).max(1),
        half,
    ));
    for renderer in [&current_renderer, &next_renderer] {
        renderer.set_cache(Some(create_cache(
            options.disable_cache,
            options.disable_compression,
        )));
    }

    let status = Arc::new(CacheStatus::new(2));
    let (forwarder, progress_rx) = ChannelObserver::new();
    let forwarder = Arc::new(forwarder);

    let mut handles = Vec::new();
    for (id, renderer) in [&current_renderer, &next_renderer].into_iter().enumerate() {
        let mut prerender = PrerenderEngine::new(EngineId::new(id), Arc::clone(renderer))
            .starting_at(options.start_slide);
        prerender.subscribe(status.clone());
        prerender.subscribe(forwarder.clone());
        handles.push(prerender.spawn());
    }

    let mut current_view = SlideView::new(current_renderer, ViewRole::Primary);
    let mut next_view = SlideView::new(next_renderer, ViewRole::NextPreview);

    let buffer = current_view.display(options.start_slide)?;
    next_view.display(current_view.current_slide() + 1)?;
    info!(
        "displaying slide {} ({}x{})",
        current_view.current_slide(),
        buffer.width,
        buffer.height
    );

    if let Some(path) = &options.dump {
        image::save_buffer(
            path,
            &buffer.pixels,
            buffer.width,
            buffer.height,
            image::ExtendedColorType::Rgb8,
        )
        .with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote slide {} to {}", current_view.current_slide(), path.display());
    }

    while !status.is_complete() {
        match progress_rx.recv_timeout(PROGRESS_STALL_TIMEOUT) {
            Ok(event) => {
                debug!(
                    "engine {} at {:.0}%",
                    event.source.0,
                    event.fraction * 100.0
                );
            }
            Err(_) => {
                warn!(
                    "prerender stalled at {:.0}%",
                    status.combined() * 100.0
                );
                break;
            }
        }
    }
    info!("prerender combined progress {:.2}", status.combined());

    for handle in handles {
        handle.join();
    }
    Ok(())
}
