pub mod app;
pub mod clock;
pub mod header;
pub mod language;
pub mod language_dialog;
pub mod logging;
pub mod media;
pub mod paths;
pub mod player;
pub mod settings;
#[cfg(feature = "gstreamer")]
pub mod video_player;

pub use app::MainWindow;
pub use clock::{format_duration, TransportClock};
pub use language::{Translatable, TranslationRegistry, Translations};
pub use media::{HeadlessEngine, MediaEngine, MediaError};
pub use paths::{Environment, InstallMode, OsFamily, PathSet};
pub use settings::Settings;

pub const APP_VENDOR: &str = "catplayer";
pub const APP_NAME: &str = "catplayer";
pub const WINDOW_SIZE: [f32; 2] = [800.0, 600.0];
pub const FONT_SIZE: f32 = 14.0;
