//! SDL2-based rendering and input for the kiosk.
//!
//! Owns the window, canvas and event pump. Translates raw SDL events into
//! the small set of UI actions the carousel and questionnaire understand,
//! and provides the drawing primitives the main loop composes frames from.

use anyhow::{Context, Result};
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::mouse::MouseButton;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::rect::Rect;
use sdl2::render::{BlendMode, Canvas, TextureCreator};
use sdl2::ttf::{Font, Sdl2TtfContext};
use sdl2::video::{Window, WindowContext};
use std::path::Path;
use std::time::{Duration, Instant};

/// Transition applied when the active slide changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Instant switch.
    Cut,
    /// Fade the incoming slide in.
    Fade,
}

impl Transition {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "fade" => Transition::Fade,
            _ => Transition::Cut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FadeState {
    Idle,
    FadingIn { started: Instant },
}

/// UI actions produced from raw input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Quit,
    Next,
    Previous,
    PointerEnter,
    PointerLeave,
    ToggleQuestionnaire,
    SelectOption(usize),
    Confirm,
}

/// Font set used by the kiosk.
pub struct Fonts<'ttf> {
    pub title: Font<'ttf, 'static>,
    pub body: Font<'ttf, 'static>,
    pub small: Font<'ttf, 'static>,
}

impl<'ttf> Fonts<'ttf> {
    pub fn load(ttf: &'ttf Sdl2TtfContext, path: &Path) -> Result<Self> {
        let load = |size: u16| {
            ttf.load_font(path, size)
                .map_err(|e| anyhow::anyhow!("Failed to load font {:?}: {}", path, e))
        };
        Ok(Self {
            title: load(64)?,
            body: load(28)?,
            small: load(20)?,
        })
    }
}

/// The main renderer.
pub struct Renderer {
    canvas: Canvas<Window>,
    event_pump: sdl2::EventPump,
    screen_width: u32,
    screen_height: u32,
    transition_type: Transition,
    transition_duration: Duration,
    fade: FadeState,
}

impl Renderer {
    /// Initialize SDL2 and create the kiosk window.
    pub fn new(
        title: &str,
        fullscreen: bool,
        transition: Transition,
        transition_duration: Duration,
    ) -> Result<Self> {
        let sdl_context = sdl2::init().map_err(|e| anyhow::anyhow!("SDL init failed: {}", e))?;
        let video_subsystem = sdl_context
            .video()
            .map_err(|e| anyhow::anyhow!("SDL video init failed: {}", e))?;

        let (screen_width, screen_height) = if fullscreen {
            let mode = video_subsystem
                .desktop_display_mode(0)
                .map_err(|e| anyhow::anyhow!("Failed to get display mode: {}", e))?;
            (mode.w as u32, mode.h as u32)
        } else {
            (1280, 720)
        };

        tracing::info!("Creating window: {}x{}", screen_width, screen_height);

        let mut builder = video_subsystem.window(title, screen_width, screen_height);
        if fullscreen {
            builder.fullscreen_desktop();
        }
        let window = builder.build().context("Failed to create window")?;

        let mut canvas = window
            .into_canvas()
            .accelerated()
            .present_vsync()
            .build()
            .context("Failed to create canvas")?;
        canvas.set_blend_mode(BlendMode::Blend);

        // Kiosk mode: no cursor.
        sdl_context.mouse().show_cursor(false);

        canvas.set_draw_color(Color::RGB(0, 0, 0));
        canvas.clear();
        canvas.present();

        let event_pump = sdl_context
            .event_pump()
            .map_err(|e| anyhow::anyhow!("Failed to get event pump: {}", e))?;

        Ok(Self {
            canvas,
            event_pump,
            screen_width,
            screen_height,
            transition_type: transition,
            transition_duration,
            fade: FadeState::Idle,
        })
    }

    pub fn texture_creator(&self) -> TextureCreator<WindowContext> {
        self.canvas.texture_creator()
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }

    /// Begin the fade-in for a newly active slide.
    pub fn start_transition(&mut self) {
        if self.transition_type == Transition::Fade {
            self.fade = FadeState::FadingIn {
                started: Instant::now(),
            };
        }
    }

    /// Advance the fade and return the alpha for this frame's content.
    pub fn transition_alpha(&mut self) -> u8 {
        match self.fade {
            FadeState::Idle => 255,
            FadeState::FadingIn { started } => {
                let progress = started.elapsed().as_secs_f32()
                    / self.transition_duration.as_secs_f32().max(f32::EPSILON);
                if progress >= 1.0 {
                    self.fade = FadeState::Idle;
                    255
                } else {
                    (progress * 255.0) as u8
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.canvas.set_draw_color(Color::RGB(10, 12, 24));
        self.canvas.clear();
    }

    pub fn present(&mut self) {
        self.canvas.present();
    }

    /// Draw an RGBA video frame aspect-fitted to the screen.
    pub fn draw_video_frame(
        &mut self,
        texture_creator: &TextureCreator<WindowContext>,
        pixels: &[u8],
        width: u32,
        height: u32,
        alpha: u8,
    ) -> Result<()> {
        let mut texture = texture_creator
            .create_texture_streaming(PixelFormatEnum::ABGR8888, width, height)
            .context("Failed to create texture")?;

        texture
            .with_lock(None, |buffer: &mut [u8], pitch: usize| {
                let row_bytes = (width as usize) * 4;
                for y in 0..height as usize {
                    let src = y * row_bytes;
                    let dst = y * pitch;
                    buffer[dst..dst + row_bytes].copy_from_slice(&pixels[src..src + row_bytes]);
                }
            })
            .map_err(|e| anyhow::anyhow!("Failed to update texture: {}", e))?;

        texture.set_blend_mode(BlendMode::Blend);
        texture.set_alpha_mod(alpha);

        let dest = self.aspect_fit(width, height);
        self.canvas
            .copy(&texture, None, dest)
            .map_err(|e| anyhow::anyhow!("Failed to render frame: {}", e))?;
        Ok(())
    }

    /// Draw text at (x, y), optionally word-wrapped. Returns the rendered
    /// height so callers can stack lines.
    pub fn draw_text(
        &mut self,
        texture_creator: &TextureCreator<WindowContext>,
        font: &Font,
        text: &str,
        x: i32,
        y: i32,
        color: Color,
        wrap_width: Option<u32>,
        alpha: u8,
    ) -> Result<u32> {
        if text.is_empty() {
            return Ok(0);
        }

        let surface = match wrap_width {
            Some(width) => font.render(text).blended_wrapped(color, width),
            None => font.render(text).blended(color),
        }
        .context("Failed to render text")?;

        let (w, h) = (surface.width(), surface.height());
        let mut texture = texture_creator
            .create_texture_from_surface(&surface)
            .context("Failed to create text texture")?;
        texture.set_blend_mode(BlendMode::Blend);
        texture.set_alpha_mod(alpha);

        self.canvas
            .copy(&texture, None, Rect::new(x, y, w, h))
            .map_err(|e| anyhow::anyhow!("Failed to render text: {}", e))?;
        Ok(h)
    }

    /// Filled rectangle, used for backdrops and the progress bar.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) -> Result<()> {
        self.canvas.set_draw_color(color);
        self.canvas
            .fill_rect(Rect::new(x, y, w, h))
            .map_err(|e| anyhow::anyhow!("Failed to fill rect: {}", e))?;
        Ok(())
    }

    fn aspect_fit(&self, img_width: u32, img_height: u32) -> Rect {
        let screen_ratio = self.screen_width as f32 / self.screen_height as f32;
        let img_ratio = img_width as f32 / img_height as f32;

        let (fit_width, fit_height) = if img_ratio > screen_ratio {
            let fit_width = self.screen_width;
            let fit_height = (self.screen_width as f32 / img_ratio) as u32;
            (fit_width, fit_height)
        } else {
            let fit_height = self.screen_height;
            let fit_width = (self.screen_height as f32 * img_ratio) as u32;
            (fit_width, fit_height)
        };

        let x = ((self.screen_width - fit_width) / 2) as i32;
        let y = ((self.screen_height - fit_height) / 2) as i32;
        Rect::new(x, y, fit_width, fit_height)
    }

    /// Drain pending SDL events into UI actions.
    pub fn poll_events(&mut self) -> Vec<UiEvent> {
        let mut actions = Vec::new();
        let width = self.screen_width as i32;

        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => actions.push(UiEvent::Quit),
                Event::KeyDown {
                    keycode: Some(key), ..
                } => {
                    if let Some(action) = keydown_action(key) {
                        actions.push(action);
                    }
                }
                Event::Window { win_event, .. } => match win_event {
                    WindowEvent::Enter => actions.push(UiEvent::PointerEnter),
                    WindowEvent::Leave => actions.push(UiEvent::PointerLeave),
                    _ => {}
                },
                Event::MouseButtonDown {
                    mouse_btn: MouseButton::Left,
                    x,
                    ..
                } => {
                    // Edge clicks navigate, like the on-screen arrows.
                    if x < width / 3 {
                        actions.push(UiEvent::Previous);
                    } else if x > width * 2 / 3 {
                        actions.push(UiEvent::Next);
                    }
                }
                _ => {}
            }
        }
        actions
    }

    /// Limit the loop to roughly 60 frames per second.
    pub fn frame_delay(&self) {
        std::thread::sleep(Duration::from_millis(16));
    }
}

fn keydown_action(key: Keycode) -> Option<UiEvent> {
    let action = match key {
        Keycode::Escape | Keycode::Q => UiEvent::Quit,
        Keycode::Left => UiEvent::Previous,
        Keycode::Right => UiEvent::Next,
        Keycode::W => UiEvent::ToggleQuestionnaire,
        Keycode::Return => UiEvent::Confirm,
        Keycode::Num1 => UiEvent::SelectOption(0),
        Keycode::Num2 => UiEvent::SelectOption(1),
        Keycode::Num3 => UiEvent::SelectOption(2),
        Keycode::Num4 => UiEvent::SelectOption(3),
        Keycode::Num5 => UiEvent::SelectOption(4),
        Keycode::Num6 => UiEvent::SelectOption(5),
        Keycode::Num7 => UiEvent::SelectOption(6),
        Keycode::Num8 => UiEvent::SelectOption(7),
        Keycode::Num9 => UiEvent::SelectOption(8),
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_parsing() {
        assert_eq!(Transition::from_str("fade"), Transition::Fade);
        assert_eq!(Transition::from_str("FADE"), Transition::Fade);
        assert_eq!(Transition::from_str("cut"), Transition::Cut);
        assert_eq!(Transition::from_str("unknown"), Transition::Cut);
    }

    #[test]
    fn test_digit_keys_map_to_options() {
        assert_eq!(keydown_action(Keycode::Num1), Some(UiEvent::SelectOption(0)));
        assert_eq!(keydown_action(Keycode::Num5), Some(UiEvent::SelectOption(4)));
        assert_eq!(keydown_action(Keycode::Left), Some(UiEvent::Previous));
        assert_eq!(keydown_action(Keycode::Space), None);
    }
}
