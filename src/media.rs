use log::{debug, info};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Pause between releasing the old source and assigning the new one.
pub const SOURCE_SWAP_DELAY: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Cannot open {}: {reason}", .path.display())]
    Source { path: PathBuf, reason: String },

    #[error("Media engine error: {0}")]
    Engine(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    DurationChanged(u64),
    PositionChanged(u64),
    EndOfMedia,
    Error(String),
}

/// What the player panel needs from a playback backend.
pub trait MediaEngine {
    fn set_source(&mut self, path: &Path) -> Result<(), MediaError>;
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self) -> Result<(), MediaError>;
    fn stop(&mut self) -> Result<(), MediaError>;
    fn seek(&mut self, position_ms: u64) -> Result<(), MediaError>;
    /// Linear gain, 0.0 to 1.0.
    fn set_volume(&mut self, gain: f64);
    /// Drains everything that happened since the previous call.
    fn poll_events(&mut self) -> Vec<MediaEvent>;
}

/// Maps a 0-100 slider value onto the engine's linear gain (cubic curve).
pub fn perceptual_to_linear(percent: u8) -> f64 {
    let level = f64::from(percent.min(100)) / 100.0;
    level * level * level
}

/// Backend with no audio or video output.
///
/// Used when the crate is built without GStreamer; it keeps transport state
/// so the rest of the window behaves normally.
#[derive(Debug, Default)]
pub struct HeadlessEngine {
    source: Option<PathBuf>,
    playing: bool,
    gain: f64,
    seeks: Vec<u64>,
    pending: VecDeque<MediaEvent>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn seeks(&self) -> &[u64] {
        &self.seeks
    }

    /// Queues an event for the next [`MediaEngine::poll_events`].
    pub fn push_event(&mut self, event: MediaEvent) {
        self.pending.push_back(event);
    }
}

impl MediaEngine for HeadlessEngine {
    fn set_source(&mut self, path: &Path) -> Result<(), MediaError> {
        if !path.is_file() {
            return Err(MediaError::Source {
                path: path.to_path_buf(),
                reason: "not a readable file".to_string(),
            });
        }
        self.playing = false;
        self.source = Some(path.to_path_buf());
        info!("Headless source set to {}", path.display());
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.source.is_none() {
            return Err(MediaError::Engine("no source loaded".to_string()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        self.playing = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MediaError> {
        self.playing = false;
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), MediaError> {
        debug!("Headless seek to {} ms", position_ms);
        self.seeks.push(position_ms);
        Ok(())
    }

    fn set_volume(&mut self, gain: f64) {
        self.gain = gain;
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        self.pending.drain(..).collect()
    }
}
