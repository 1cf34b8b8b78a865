use eframe::epaint::ColorImage;
use gstreamer::prelude::*;
use gstreamer::{glib, Bin, ClockTime, Element, ElementFactory, MessageView, SeekFlags, State};
use gstreamer_app::AppSink;
use gstreamer_video::{VideoFrame, VideoInfo};
use log::{debug, error, info, warn};
use std::path::Path;
use tokio::sync::watch;

use crate::media::{MediaEngine, MediaError, MediaEvent, SOURCE_SWAP_DELAY};

fn engine_error(what: &str, e: impl std::fmt::Debug) -> MediaError {
    MediaError::Engine(format!("{}: {:?}", what, e))
}

/// GStreamer `playbin` backend. Frames are handed to the UI through a watch channel.
pub struct VideoPlayer {
    pipeline: Element,
    duration_reported: bool,
    last_position: Option<u64>,
}

impl VideoPlayer {
    pub fn new(texture_sender: watch::Sender<Option<ColorImage>>) -> Result<Self, MediaError> {
        let pipeline = ElementFactory::make("playbin")
            .name("playbin")
            .build()
            .map_err(|e| engine_error("Failed to create playbin", e))?;

        // Video branch: convert to RGBA for egui textures
        let video_bin = Bin::new();

        let videoconvert = ElementFactory::make("videoconvert")
            .build()
            .map_err(|e| engine_error("Failed to create videoconvert", e))?;
        let videoscale = ElementFactory::make("videoscale")
            .build()
            .map_err(|e| engine_error("Failed to create videoscale", e))?;
        let capsfilter = ElementFactory::make("capsfilter")
            .build()
            .map_err(|e| engine_error("Failed to create capsfilter", e))?;
        capsfilter.set_property(
            "caps",
            &gstreamer::Caps::builder("video/x-raw")
                .field("format", "RGBA")
                .build(),
        );

        let appsink = AppSink::builder().build();
        appsink.set_max_buffers(1);
        appsink.set_drop(true);
        let sink_element = appsink.clone().upcast::<Element>();

        video_bin
            .add_many([&videoconvert, &videoscale, &capsfilter, &sink_element])
            .map_err(|e| engine_error("Failed to populate video bin", e))?;
        Element::link_many([&videoconvert, &videoscale, &capsfilter, &sink_element])
            .map_err(|e| engine_error("Failed to link video bin", e))?;

        let pad = videoconvert
            .static_pad("sink")
            .ok_or_else(|| MediaError::Engine("Failed to get sink pad".to_string()))?;
        let ghost = gstreamer::GhostPad::with_target(&pad)
            .map_err(|e| engine_error("Failed to create ghost pad", e))?;
        video_bin
            .add_pad(&ghost)
            .map_err(|e| engine_error("Failed to add ghost pad", e))?;
        pipeline.set_property("video-sink", &video_bin);

        let audiosink = ElementFactory::make("autoaudiosink")
            .build()
            .map_err(|e| engine_error("Failed to create audio sink", e))?;
        pipeline.set_property("audio-sink", &audiosink);

        Self::start_frame_extraction(&appsink, texture_sender);

        Ok(Self {
            pipeline,
            duration_reported: false,
            last_position: None,
        })
    }

    fn start_frame_extraction(appsink: &AppSink, sender: watch::Sender<Option<ColorImage>>) {
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    match Self::pull_frame(appsink) {
                        Some(frame) => {
                            if sender.send(Some(frame)).is_err() {
                                debug!("Frame receiver is gone");
                            }
                        }
                        None => warn!("Failed to pull frame"),
                    }
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );
    }

    fn pull_frame(appsink: &AppSink) -> Option<ColorImage> {
        let sample = appsink.pull_sample().ok()?;
        let buffer = sample.buffer()?;
        let caps = sample.caps()?;
        let video_info = VideoInfo::from_caps(caps).ok()?;

        let frame = VideoFrame::from_buffer_readable(buffer.copy(), &video_info).ok()?;
        let width = video_info.width() as usize;
        let height = video_info.height() as usize;
        let plane_data = frame.plane_data(0).ok()?;

        Some(ColorImage::from_rgba_unmultiplied([width, height], plane_data))
    }

    fn set_state(&self, state: State) -> Result<(), MediaError> {
        debug!("Setting pipeline to {:?}", state);
        self.pipeline
            .set_state(state)
            .map_err(|e| engine_error(&format!("Failed to set pipeline to {:?}", state), e))?;
        Ok(())
    }

    fn drain_bus(&mut self, events: &mut Vec<MediaEvent>) {
        let Some(bus) = self.pipeline.bus() else {
            return;
        };
        while let Some(msg) = bus.pop() {
            match msg.view() {
                MessageView::Eos(_) => {
                    info!("End of stream reached");
                    events.push(MediaEvent::EndOfMedia);
                }
                MessageView::Error(err) => {
                    let message = format!(
                        "Error from {:?}: {} ({:?})",
                        err.src().map(|s| s.path_string()),
                        err.error(),
                        err.debug()
                    );
                    error!("GStreamer error: {}", message);
                    events.push(MediaEvent::Error(message));
                }
                MessageView::Warning(warning) => {
                    warn!(
                        "Warning from {:?}: {} ({:?})",
                        warning.src().map(|s| s.path_string()),
                        warning.error(),
                        warning.debug()
                    );
                }
                MessageView::DurationChanged(_) => self.duration_reported = false,
                MessageView::StateChanged(state_changed) => {
                    if let Some(element) = msg.src() {
                        if element.type_().name() == "GstPlayBin" {
                            debug!(
                                "Pipeline state changed from {:?} to {:?}",
                                state_changed.old(),
                                state_changed.current()
                            );
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

impl MediaEngine for VideoPlayer {
    fn set_source(&mut self, path: &Path) -> Result<(), MediaError> {
        self.set_state(State::Null)?;
        std::thread::sleep(SOURCE_SWAP_DELAY);

        let source_error = |reason: String| MediaError::Source {
            path: path.to_path_buf(),
            reason,
        };
        let abs_path = dunce::canonicalize(path).map_err(|e| source_error(e.to_string()))?;
        let uri = glib::filename_to_uri(&abs_path, None).map_err(|e| source_error(e.to_string()))?;

        info!("Loading media {}", uri);
        self.pipeline.set_property("uri", uri.as_str());
        self.duration_reported = false;
        self.last_position = None;

        // Preroll so the duration and first frame become available
        self.set_state(State::Paused)
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.set_state(State::Playing)
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        self.set_state(State::Paused)
    }

    fn stop(&mut self) -> Result<(), MediaError> {
        self.last_position = None;
        self.set_state(State::Ready)
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), MediaError> {
        debug!("Seeking to {} ms", position_ms);
        self.pipeline
            .seek_simple(
                SeekFlags::FLUSH | SeekFlags::KEY_UNIT,
                ClockTime::from_mseconds(position_ms),
            )
            .map_err(|e| engine_error("Failed to seek", e))
    }

    fn set_volume(&mut self, gain: f64) {
        self.pipeline.set_property("volume", gain);
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        let mut events = Vec::new();
        self.drain_bus(&mut events);

        if !self.duration_reported {
            if let Some(duration) = self.pipeline.query_duration::<ClockTime>() {
                self.duration_reported = true;
                events.push(MediaEvent::DurationChanged(duration.mseconds()));
            }
        }

        if let Some(position) = self.pipeline.query_position::<ClockTime>() {
            let ms = position.mseconds();
            if self.last_position != Some(ms) {
                self.last_position = Some(ms);
                events.push(MediaEvent::PositionChanged(ms));
            }
        }

        events
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        debug!("Dropping VideoPlayer, cleaning up pipeline");
        let _ = self.pipeline.set_state(State::Null);
    }
}
