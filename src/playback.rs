//! GStreamer-based playback for the active slide's direct media.
//!
//! The carousel treats clips as muted looping backgrounds: a pipeline is
//! built when a slide becomes active, a single play request is issued once
//! the pipeline has prerolled, and the whole handle is dropped when the
//! active slide changes.

use crate::deck::{MediaKind, Slide};
use anyhow::{Context, Result};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// RGBA frame extracted from the pipeline.
#[derive(Clone)]
pub struct VideoFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Playable handle bound to one media reference.
pub struct VideoPlayer {
    pipeline: gst::Pipeline,
    current_frame: Arc<Mutex<Option<VideoFrame>>>,
    /// Set once the pipeline has prerolled and a play request makes sense.
    ready: Arc<AtomicBool>,
    /// Bus watch guard - must be kept alive for the watch to remain active.
    #[allow(dead_code)]
    bus_watch_guard: gst::bus::BusWatchGuard,
}

impl VideoPlayer {
    /// Initialize GStreamer (call once at startup).
    pub fn init() -> Result<()> {
        gst::init().context("Failed to initialize GStreamer")?;
        tracing::info!("GStreamer initialized: {}", gst::version_string());
        Ok(())
    }

    /// Build a pipeline for `uri` and start prerolling. Playback does not
    /// begin until [`VideoPlayer::play`] is called.
    pub fn open(uri: &str) -> Result<Self> {
        tracing::debug!("Opening media: {}", uri);

        let pipeline = gst::Pipeline::new();

        let src = gst::ElementFactory::make("uridecodebin")
            .name("source")
            .property("uri", uri)
            .build()
            .context("Failed to create uridecodebin")?;

        let convert = gst::ElementFactory::make("videoconvert")
            .name("convert")
            .build()
            .context("Failed to create videoconvert")?;

        let scale = gst::ElementFactory::make("videoscale")
            .name("scale")
            .build()
            .context("Failed to create videoscale")?;

        let appsink = gst_app::AppSink::builder()
            .name("sink")
            .caps(
                &gst_video::VideoCapsBuilder::new()
                    .format(gst_video::VideoFormat::Rgba)
                    .build(),
            )
            .build();

        pipeline
            .add_many([&src, &convert, &scale, appsink.upcast_ref()])
            .context("Failed to add elements to pipeline")?;
        gst::Element::link_many([&convert, &scale, appsink.upcast_ref()])
            .context("Failed to link elements")?;

        // uridecodebin exposes its pads late; hook up video pads as they
        // appear and ignore everything else (the carousel is muted).
        let convert_weak = convert.downgrade();
        src.connect_pad_added(move |_src, src_pad| {
            let Some(convert) = convert_weak.upgrade() else {
                return;
            };
            let Some(sink_pad) = convert.static_pad("sink") else {
                return;
            };
            if sink_pad.is_linked() {
                return;
            }

            let caps = src_pad
                .current_caps()
                .unwrap_or_else(|| src_pad.query_caps(None));
            let is_video = caps
                .structure(0)
                .map(|s| s.name().starts_with("video/"))
                .unwrap_or(false);

            if is_video {
                if let Err(e) = src_pad.link(&sink_pad) {
                    tracing::error!("Failed to link video pad: {:?}", e);
                }
            }
        });

        let current_frame = Arc::new(Mutex::new(None::<VideoFrame>));
        let ready = Arc::new(AtomicBool::new(false));

        let frame_slot = current_frame.clone();
        let ready_flag = ready.clone();
        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_preroll(move |appsink| {
                    let sample = appsink.pull_preroll().map_err(|_| gst::FlowError::Eos)?;
                    if let Some(frame) = frame_from_sample(&sample) {
                        if let Ok(mut guard) = frame_slot.lock() {
                            *guard = Some(frame);
                        }
                    }
                    ready_flag.store(true, Ordering::SeqCst);
                    Ok(gst::FlowSuccess::Ok)
                })
                .new_sample({
                    let frame_slot = current_frame.clone();
                    move |appsink| {
                        let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                        if let Some(frame) = frame_from_sample(&sample) {
                            if let Ok(mut guard) = frame_slot.lock() {
                                *guard = Some(frame);
                            }
                        }
                        Ok(gst::FlowSuccess::Ok)
                    }
                })
                .build(),
        );

        // Loop seamlessly: carousel clips play as endless backgrounds.
        let pipeline_weak = pipeline.downgrade();
        let bus = pipeline.bus().context("Pipeline has no bus")?;
        let bus_watch_guard = bus
            .add_watch(move |_bus, msg| {
                match msg.view() {
                    gst::MessageView::Eos(_) => {
                        if let Some(pipeline) = pipeline_weak.upgrade() {
                            let _ = pipeline.seek_simple(
                                gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
                                gst::ClockTime::ZERO,
                            );
                        }
                    }
                    gst::MessageView::Error(err) => {
                        tracing::error!(
                            "GStreamer error: {} ({:?})",
                            err.error(),
                            err.debug()
                        );
                    }
                    _ => {}
                }
                gst::glib::ControlFlow::Continue
            })
            .context("Failed to add bus watch")?;

        // Paused state starts the preroll without playing.
        pipeline
            .set_state(gst::State::Paused)
            .context("Failed to start preroll")?;

        Ok(Self {
            pipeline,
            current_frame,
            ready,
            bus_watch_guard,
        })
    }

    /// Whether the underlying data is ready for a play request.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Request playback. May be rejected by the host environment; the
    /// caller decides what to do with the error.
    pub fn play(&self) -> Result<()> {
        self.pipeline
            .set_state(gst::State::Playing)
            .context("Failed to set pipeline to playing")?;
        Ok(())
    }

    /// Tear the pipeline down.
    pub fn stop(&self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }

    /// Latest decoded frame, if any.
    pub fn current_frame(&self) -> Option<VideoFrame> {
        self.current_frame.lock().ok()?.clone()
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn frame_from_sample(sample: &gst::Sample) -> Option<VideoFrame> {
    let buffer = sample.buffer()?;
    let caps = sample.caps()?;
    let info = gst_video::VideoInfo::from_caps(caps).ok()?;
    let map = buffer.map_readable().ok()?;
    Some(VideoFrame {
        pixels: map.as_slice().to_vec(),
        width: info.width(),
        height: info.height(),
    })
}

struct ActivePlayback {
    slide_id: u32,
    player: VideoPlayer,
    play_requested: bool,
}

/// Owns at most one live player, bound to the active slide.
///
/// Activating a new slide abandons the previous handle; embed kinds and
/// empty references build nothing.
pub struct PlaybackController {
    current: Option<ActivePlayback>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Bind playback to the newly active slide. `local` is the cached copy
    /// of the slide's media, when the preloader has one.
    pub fn activate(&mut self, slide: &Slide, local: Option<&Path>) {
        self.stop();

        if !matches!(slide.media_kind(), MediaKind::Direct) || !slide.has_media() {
            return;
        }

        let Some(uri) = playback_uri(&slide.media, local) else {
            tracing::warn!("Slide {} media {:?} is not playable", slide.id, slide.media);
            return;
        };

        match VideoPlayer::open(&uri) {
            Ok(player) => {
                self.current = Some(ActivePlayback {
                    slide_id: slide.id,
                    player,
                    play_requested: false,
                });
            }
            Err(e) => {
                tracing::warn!("Failed to open media for slide {}: {:#}", slide.id, e);
            }
        }
    }

    /// Issue the one-shot play request once the pipeline has prerolled.
    /// A rejection is logged and dropped; playback is fire-and-forget and
    /// never retried.
    pub fn poll(&mut self) {
        let Some(active) = self.current.as_mut() else {
            return;
        };
        if active.play_requested || !active.player.is_ready() {
            return;
        }

        active.play_requested = true;
        if let Err(e) = active.player.play() {
            tracing::warn!(
                "Playback request rejected for slide {}: {:#}",
                active.slide_id,
                e
            );
        }
    }

    /// Abandon the current handle, if any.
    pub fn stop(&mut self) {
        if let Some(active) = self.current.take() {
            active.player.stop();
        }
    }

    pub fn current_frame(&self) -> Option<VideoFrame> {
        self.current.as_ref()?.player.current_frame()
    }
}

/// Resolve a media reference (plus optional cached copy) to a playback URI.
fn playback_uri(reference: &str, local: Option<&Path>) -> Option<String> {
    if let Some(path) = local {
        return Some(format!("file://{}", path.display()));
    }
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Some(reference.to_string());
    }

    let path = Path::new(reference);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::fs::canonicalize(path).ok()?
    };
    Some(format!("file://{}", absolute.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_playback_uri_prefers_cached_copy() {
        let uri = playback_uri(
            "https://example.com/clip.mp4",
            Some(Path::new("/cache/0001-ab.mp4")),
        );
        assert_eq!(uri.as_deref(), Some("file:///cache/0001-ab.mp4"));
    }

    #[test]
    fn test_playback_uri_passes_remote_through() {
        let uri = playback_uri("https://example.com/clip.mp4", None);
        assert_eq!(uri.as_deref(), Some("https://example.com/clip.mp4"));
    }

    #[test]
    fn test_playback_uri_resolves_relative_paths() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"x").unwrap();
        let absolute = file.path().to_path_buf();

        let uri = playback_uri(absolute.to_str().unwrap(), None).unwrap();
        assert_eq!(uri, format!("file://{}", absolute.display()));

        // Missing relative path cannot be resolved.
        assert!(playback_uri("no/such/clip.mp4", None).is_none());
    }
}
