//! Showcase kiosk: auto-advancing feature carousel with a waitlist
//! questionnaire overlay.

use anyhow::{Context, Result};
use sdl2::pixels::Color;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

mod cache;
mod deck;
mod playback;
mod preload;
mod questionnaire;
mod renderer;
mod scheduler;
mod settings;

use cache::MediaCache;
use deck::{MediaKind, SlideDeck};
use playback::PlaybackController;
use preload::Preloader;
use questionnaire::{LogSink, Questionnaire};
use renderer::{Fonts, Renderer, Transition, UiEvent};
use scheduler::SlideScheduler;
use settings::Settings;

/// How long the submission confirmation stays on screen.
const SUBMIT_LINGER: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load().context("Failed to load settings")?;

    let deck = match settings.deck_path.as_deref() {
        Some(path) => SlideDeck::from_file(path)?,
        None => SlideDeck::builtin(),
    };
    let deck = Arc::new(deck);
    tracing::info!("Loaded deck with {} slides", deck.len());

    playback::VideoPlayer::init()?;

    let media_cache = MediaCache::new(settings.cache_dir.clone(), settings.cache_max_gb)?;
    tracing::debug!("Cache primed with {} entries", media_cache.entry_count());
    let cache = Arc::new(RwLock::new(media_cache));
    Preloader::new(cache.clone()).spawn(deck.clone());

    let mut renderer = Renderer::new(
        &settings.window_title,
        settings.fullscreen,
        Transition::from_str(&settings.transition),
        settings.transition_duration(),
    )?;
    let ttf = sdl2::ttf::init().map_err(|e| anyhow::anyhow!("TTF init failed: {}", e))?;
    let fonts = Fonts::load(&ttf, &settings.font_path)?;
    let texture_creator = renderer.texture_creator();

    let mut carousel =
        SlideScheduler::new(deck.len(), settings.autoplay_interval(), Instant::now());
    let mut playback = PlaybackController::new();
    let mut questionnaire: Option<Questionnaire> = None;
    let mut submitted_at: Option<Instant> = None;
    let mut sink = LogSink;

    // Forces activation of the first slide on the first pass.
    let mut shown_index = usize::MAX;

    'running: loop {
        for action in renderer.poll_events() {
            match action {
                UiEvent::Quit => break 'running,
                UiEvent::PointerEnter => carousel.pointer_enter(),
                UiEvent::PointerLeave => carousel.pointer_leave(Instant::now()),
                UiEvent::Next if questionnaire.is_none() => carousel.next(),
                UiEvent::Previous if questionnaire.is_none() => carousel.previous(),
                UiEvent::Next | UiEvent::Previous => {}
                UiEvent::ToggleQuestionnaire => {
                    if questionnaire.take().is_none() {
                        questionnaire = Some(Questionnaire::builtin());
                    }
                    submitted_at = None;
                }
                UiEvent::SelectOption(index) => {
                    if let Some(q) = questionnaire.as_mut() {
                        q.select(index);
                    }
                }
                UiEvent::Confirm => {
                    if let Some(q) = questionnaire.as_mut() {
                        if q.advance(&mut sink) && submitted_at.is_none() {
                            submitted_at = Some(Instant::now());
                        }
                    }
                }
            }
        }

        carousel.tick(Instant::now());

        if carousel.active_index() != shown_index {
            shown_index = carousel.active_index();
            let slide = deck.get(shown_index);
            // Lookup promotes the LRU entry, hence the write lock; skip the
            // cache when the preloader holds it and play the remote copy.
            let local = cache
                .try_write()
                .ok()
                .and_then(|mut c| c.cached_path(slide.id, &slide.media));
            playback.activate(slide, local.as_deref());
            renderer.start_transition();
        }

        playback.poll();

        if let Some(at) = submitted_at {
            if at.elapsed() >= SUBMIT_LINGER {
                questionnaire = None;
                submitted_at = None;
            }
        }

        draw_frame(
            &mut renderer,
            &texture_creator,
            &fonts,
            &deck,
            &carousel,
            &playback,
            questionnaire.as_ref(),
        )?;

        renderer.frame_delay();
    }

    // Release the autoplay timer and the media handle before the window
    // goes away; nothing may fire after teardown.
    carousel.shutdown();
    playback.stop();

    Ok(())
}

fn draw_frame(
    renderer: &mut Renderer,
    texture_creator: &sdl2::render::TextureCreator<sdl2::video::WindowContext>,
    fonts: &Fonts,
    deck: &SlideDeck,
    carousel: &SlideScheduler,
    playback: &PlaybackController,
    questionnaire: Option<&Questionnaire>,
) -> Result<()> {
    let alpha = renderer.transition_alpha();
    let (screen_w, screen_h) = renderer.screen_size();
    let slide = deck.get(carousel.active_index());

    renderer.clear();

    // Media layer.
    match slide.media_kind() {
        MediaKind::Direct => {
            if let Some(frame) = playback.current_frame() {
                renderer.draw_video_frame(
                    texture_creator,
                    &frame.pixels,
                    frame.width,
                    frame.height,
                    alpha,
                )?;
            }
        }
        MediaKind::SocialEmbed { embed_url } => {
            draw_embed_card(
                renderer,
                texture_creator,
                fonts,
                "Social post",
                &embed_url,
                alpha,
            )?;
        }
        MediaKind::VideoPlatform { embed_url } => {
            draw_embed_card(
                renderer,
                texture_creator,
                fonts,
                "Video clip",
                &embed_url,
                alpha,
            )?;
        }
    }

    // Text block.
    let margin = (screen_w / 12) as i32;
    let wrap = Some(screen_w * 2 / 3);
    let mut y = (screen_h / 3) as i32;

    let counter = format!(
        "{:02} \u{2022} {:02}",
        carousel.active_index() + 1,
        deck.len()
    );
    y += renderer.draw_text(
        texture_creator,
        &fonts.small,
        &counter,
        margin,
        y,
        Color::RGB(156, 163, 175),
        None,
        alpha,
    )? as i32
        + 12;

    y += renderer.draw_text(
        texture_creator,
        &fonts.title,
        &slide.title,
        margin,
        y,
        Color::RGB(255, 255, 255),
        wrap,
        alpha,
    )? as i32
        + 20;

    renderer.draw_text(
        texture_creator,
        &fonts.body,
        &slide.description,
        margin,
        y,
        Color::RGB(209, 213, 219),
        wrap,
        alpha,
    )?;

    // Autoplay is suppressed after manual navigation or while hovered;
    // show it so the kiosk does not look stuck.
    if !carousel.is_autoplaying() {
        renderer.draw_text(
            texture_creator,
            &fonts.small,
            "Paused",
            margin,
            (screen_h - screen_h / 12) as i32,
            Color::RGB(107, 114, 128),
            None,
            255,
        )?;
    }

    if let Some(q) = questionnaire {
        draw_questionnaire(renderer, texture_creator, fonts, q)?;
    }

    renderer.present();
    Ok(())
}

fn draw_embed_card(
    renderer: &mut Renderer,
    texture_creator: &sdl2::render::TextureCreator<sdl2::video::WindowContext>,
    fonts: &Fonts,
    label: &str,
    embed_url: &str,
    alpha: u8,
) -> Result<()> {
    let (screen_w, screen_h) = renderer.screen_size();
    let card_w = screen_w * 3 / 5;
    let card_h = screen_h / 3;
    let x = ((screen_w - card_w) / 2) as i32;
    let y = (screen_h / 8) as i32;

    renderer.fill_rect(x, y, card_w, card_h, Color::RGBA(31, 41, 55, alpha))?;
    renderer.draw_text(
        texture_creator,
        &fonts.body,
        label,
        x + 24,
        y + 24,
        Color::RGB(255, 255, 255),
        None,
        alpha,
    )?;
    renderer.draw_text(
        texture_creator,
        &fonts.small,
        embed_url,
        x + 24,
        y + 72,
        Color::RGB(96, 165, 250),
        Some(card_w - 48),
        alpha,
    )?;
    Ok(())
}

fn draw_questionnaire(
    renderer: &mut Renderer,
    texture_creator: &sdl2::render::TextureCreator<sdl2::video::WindowContext>,
    fonts: &Fonts,
    q: &Questionnaire,
) -> Result<()> {
    let (screen_w, screen_h) = renderer.screen_size();

    // Dim the carousel behind the overlay.
    renderer.fill_rect(0, 0, screen_w, screen_h, Color::RGBA(0, 0, 0, 160))?;

    let panel_w = screen_w * 2 / 3;
    let panel_h = screen_h * 2 / 3;
    let px = ((screen_w - panel_w) / 2) as i32;
    let py = ((screen_h - panel_h) / 2) as i32;
    renderer.fill_rect(px, py, panel_w, panel_h, Color::RGB(249, 250, 251))?;

    if q.is_complete() {
        renderer.draw_text(
            texture_creator,
            &fonts.body,
            "Form Successfully Submitted",
            px + 48,
            py + (panel_h / 2) as i32 - 48,
            Color::RGB(17, 24, 39),
            None,
            255,
        )?;
        renderer.draw_text(
            texture_creator,
            &fonts.small,
            "Thank you for joining our waitlist!",
            px + 48,
            py + (panel_h / 2) as i32 + 8,
            Color::RGB(75, 85, 99),
            None,
            255,
        )?;
        return Ok(());
    }

    let wrap = Some(panel_w - 96);
    let mut y = py + 48;
    y += renderer.draw_text(
        texture_creator,
        &fonts.body,
        &q.current_question().prompt,
        px + 48,
        y,
        Color::RGB(17, 24, 39),
        wrap,
        255,
    )? as i32
        + 24;

    for (i, option) in q.current_question().options.iter().enumerate() {
        let selected = q.answer_current() == option;
        let color = if selected {
            Color::RGB(37, 99, 235)
        } else {
            Color::RGB(55, 65, 81)
        };
        let line = format!("{}. {}", i + 1, option);
        y += renderer.draw_text(
            texture_creator,
            &fonts.small,
            &line,
            px + 48,
            y,
            color,
            wrap,
            255,
        )? as i32
            + 10;
    }

    // Progress bar along the bottom of the panel.
    let bar_w = panel_w - 96;
    let bar_y = py + panel_h as i32 - 72;
    let filled = (bar_w as f32 * q.progress()) as u32;
    renderer.fill_rect(px + 48, bar_y, bar_w, 8, Color::RGB(229, 231, 235))?;
    renderer.fill_rect(px + 48, bar_y, filled.max(1), 8, Color::RGB(37, 99, 235))?;

    let hint = if q.current_index() + 1 == q.len() {
        "Press a number to answer, Enter to submit"
    } else {
        "Press a number to answer, Enter for next"
    };
    renderer.draw_text(
        texture_creator,
        &fonts.small,
        hint,
        px + 48,
        bar_y + 20,
        Color::RGB(107, 114, 128),
        None,
        255,
    )?;

    Ok(())
}
