//! Keeps the position slider and the engine's playback clock in step.
//!
//! The slider runs from 0 to 100 (percent of the duration). While the user
//! holds or drags it, engine position reports are ignored; on release the
//! engine is sent to the dragged position. A slider change that lands far
//! from the engine position (a click on the track) is treated as a seek
//! request and applied on the next position report.

/// Slider/engine disagreement, in slider points, that counts as a jump.
pub const JUMP_THRESHOLD: f64 = 9.0;
pub const UNKNOWN_DURATION: &str = "--:--:--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No media loaded.
    Idle,
    /// Duration known, nothing played yet.
    Ready,
    Playing,
    Paused,
    Stopped,
}

/// Position the engine has to be moved to, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seek(pub u64);

/// `hh:mm:ss` for a duration in milliseconds.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[derive(Debug, Clone)]
pub struct TransportClock {
    state: PlaybackState,
    duration_ms: Option<u64>,
    position_ms: u64,
    slider: f64,
    pressed: bool,
    moving: bool,
    jumped: bool,
    elapsed: String,
    total: String,
}

impl Default for TransportClock {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            duration_ms: None,
            position_ms: 0,
            slider: 0.0,
            pressed: false,
            moving: false,
            jumped: false,
            elapsed: format_duration(0),
            total: UNKNOWN_DURATION.to_string(),
        }
    }
}

impl TransportClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
    }

    pub fn slider(&self) -> f64 {
        self.slider
    }

    pub fn elapsed_text(&self) -> &str {
        &self.elapsed
    }

    pub fn total_text(&self) -> &str {
        &self.total
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn is_dragging(&self) -> bool {
        self.pressed || self.moving
    }

    fn target_ms(&self) -> u64 {
        let duration = self.duration_ms.unwrap_or(0) as f64;
        (duration * self.slider / 100.0) as u64
    }

    fn show_target(&mut self) -> u64 {
        let target = self.target_ms();
        self.elapsed = format_duration(target);
        target
    }

    /// A new source replaced the old one.
    pub fn source_changed(&mut self) {
        *self = Self::default();
    }

    /// Only the first report after a source change is used.
    pub fn duration_changed(&mut self, ms: u64) {
        if self.duration_ms.is_some() {
            return;
        }
        self.duration_ms = Some(ms);
        self.total = format_duration(ms);
        if self.state == PlaybackState::Idle {
            self.state = PlaybackState::Ready;
        }
    }

    pub fn slider_pressed(&mut self, value: f64) -> Seek {
        self.pressed = true;
        self.slider = value.clamp(0.0, 100.0);
        Seek(self.show_target())
    }

    pub fn slider_moved(&mut self, value: f64) {
        self.moving = true;
        self.slider = value.clamp(0.0, 100.0);
        self.show_target();
    }

    pub fn slider_released(&mut self) -> Seek {
        let target = self.show_target();
        self.pressed = false;
        self.moving = false;
        Seek(target)
    }

    /// Slider value changed without a drag, e.g. a click on the track.
    pub fn slider_value_changed(&mut self, value: f64) {
        self.slider = value.clamp(0.0, 100.0);
        match self.duration_ms {
            Some(duration) if duration > 0 => {
                let engine = 100.0 * self.position_ms as f64 / duration as f64;
                self.jumped = (self.slider - engine).abs() > JUMP_THRESHOLD;
            }
            _ => {}
        }
    }

    /// Engine position report. Returns a seek when a pending jump has to be applied.
    pub fn position_changed(&mut self, ms: u64) -> Option<Seek> {
        if self.is_dragging() {
            return None;
        }

        self.position_ms = ms;
        self.elapsed = format_duration(ms);

        let duration = match self.duration_ms {
            Some(duration) if duration > 0 => duration,
            _ => return None,
        };

        if self.jumped {
            self.jumped = false;
            Some(Seek(self.target_ms()))
        } else {
            self.slider = (100.0 * ms as f64 / duration as f64).min(100.0);
            None
        }
    }

    /// The engine reached the end: rewind and stop.
    pub fn end_of_media(&mut self) -> Seek {
        self.pressed = false;
        self.moving = false;
        self.jumped = false;
        self.position_ms = 0;
        self.slider = 0.0;
        self.elapsed = format_duration(0);
        self.state = PlaybackState::Stopped;
        Seek(0)
    }
}
