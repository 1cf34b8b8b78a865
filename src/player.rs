use eframe::epaint::ColorImage;
use egui::{Color32, Rect, Sense, Vec2};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use crate::clock::{PlaybackState, Seek, TransportClock};
use crate::language::{TextHandle, TranslationRegistry, Translations};
use crate::media::{perceptual_to_linear, MediaEngine, MediaError, MediaEvent};
use crate::paths::PathSet;
use crate::settings::{Settings, DEFAULT_VOLUME};

/// Edge of a square control button, in points.
pub const ICON_SIZE: f32 = 28.0;
const VOLUME_SLIDER_WIDTH: f32 = 100.0;
const TIME_LABEL_WIDTH: f32 = 2.0 * ICON_SIZE;
const VOLUME_LABEL_WIDTH: f32 = 2.0 * ICON_SIZE;
const MIN_POSITION_SLIDER_WIDTH: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    FullScreen,
    NormalScreen,
    Exit,
    AudioMax,
    AudioMin,
}

impl Icon {
    pub fn name(self) -> &'static str {
        match self {
            Icon::FullScreen => "full_screen",
            Icon::NormalScreen => "normal_screen",
            Icon::Exit => "exit",
            Icon::AudioMax => "audio_max",
            Icon::AudioMin => "audio_min",
        }
    }

    /// Text used when the icon file is missing.
    fn glyph(self) -> &'static str {
        match self {
            Icon::FullScreen => "⛶",
            Icon::NormalScreen => "🗗",
            Icon::Exit => "⏏",
            Icon::AudioMax => "🔊",
            Icon::AudioMin => "🔇",
        }
    }
}

/// Requests the panel cannot carry out on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    ToggleFullScreen,
    Exit,
}

#[derive(Debug, Clone, Copy)]
struct PanelTexts {
    play: TextHandle,
    stop: TextHandle,
    screen: TextHandle,
    exit: TextHandle,
    audio: TextHandle,
}

/// Video surface plus the transport and volume controls.
pub struct PlayerPanel<E: MediaEngine> {
    engine: E,
    clock: TransportClock,
    source: Option<PathBuf>,
    volume: u8,
    last_audible: u8,
    full_screen: bool,
    texts: PanelTexts,
    paths: PathSet,
    frames: watch::Receiver<Option<ColorImage>>,
    texture: Option<egui::TextureHandle>,
}

impl<E: MediaEngine> PlayerPanel<E> {
    pub fn new(
        mut engine: E,
        frames: watch::Receiver<Option<ColorImage>>,
        settings: &Settings,
        paths: PathSet,
        registry: &mut TranslationRegistry,
        translations: &Translations,
    ) -> Self {
        let volume = settings.volume.min(100);
        engine.set_volume(perceptual_to_linear(volume));

        let texts = PanelTexts {
            play: registry.register("play1", translations),
            stop: registry.register("stop", translations),
            screen: registry.register("expand", translations),
            exit: registry.register("exit", translations),
            audio: registry.register(
                if volume == 0 {
                    "audiospento"
                } else {
                    "audioacceso"
                },
                translations,
            ),
        };

        Self {
            engine,
            clock: TransportClock::new(),
            source: None,
            volume,
            last_audible: if volume > 0 { volume } else { DEFAULT_VOLUME },
            full_screen: false,
            texts,
            paths,
            frames,
            texture: None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn clock(&self) -> &TransportClock {
        &self.clock
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.volume == 0
    }

    pub fn is_playing(&self) -> bool {
        self.clock.state() == PlaybackState::Playing
    }

    pub fn is_full_screen(&self) -> bool {
        self.full_screen
    }

    /// Replaces the current source without touching the settings record.
    pub fn load(&mut self, path: &Path) -> Result<(), MediaError> {
        if self.source.is_some() {
            self.stop()?;
        }
        self.clock.source_changed();
        self.texture = None;
        self.source = None;

        self.engine.set_source(path)?;
        self.source = Some(path.to_path_buf());
        info!("Loaded {}", path.display());
        Ok(())
    }

    /// Loads a file the user picked and records it in the session settings.
    pub fn open(&mut self, path: &Path, settings: &mut Settings) -> Result<(), MediaError> {
        self.load(path)?;
        settings.record_opened(path);
        Ok(())
    }

    pub fn play_pause(&mut self) -> Result<(), MediaError> {
        if self.is_playing() {
            self.engine.pause()?;
            self.clock.set_state(PlaybackState::Paused);
        } else {
            self.engine.play()?;
            self.clock.set_state(PlaybackState::Playing);
        }
        Ok(())
    }

    /// Stops playback. The slider keeps its position.
    pub fn stop(&mut self) -> Result<(), MediaError> {
        self.engine.stop()?;
        if self.clock.state() != PlaybackState::Idle {
            self.clock.set_state(PlaybackState::Stopped);
        }
        Ok(())
    }

    pub fn set_volume(&mut self, volume: u8, settings: &mut Settings) {
        let volume = volume.min(100);
        self.volume = volume;
        if volume > 0 {
            self.last_audible = volume;
        }
        self.engine.set_volume(perceptual_to_linear(volume));
        settings.volume = volume;
    }

    /// Mutes, or restores the last audible volume.
    pub fn toggle_mute(&mut self, settings: &mut Settings) {
        let volume = if self.is_muted() {
            self.last_audible
        } else {
            0
        };
        self.set_volume(volume, settings);
    }

    pub fn toggle_full_screen(&mut self) -> bool {
        self.full_screen = !self.full_screen;
        self.full_screen
    }

    fn seek(&mut self, Seek(ms): Seek) {
        if let Err(e) = self.engine.seek(ms) {
            warn!("Seek to {} ms failed: {}", ms, e);
        }
    }

    /// Feeds pending engine events into the transport clock.
    pub fn poll(&mut self) {
        for event in self.engine.poll_events() {
            match event {
                MediaEvent::DurationChanged(ms) => self.clock.duration_changed(ms),
                MediaEvent::PositionChanged(ms) => {
                    if let Some(seek) = self.clock.position_changed(ms) {
                        debug!("Slider jump, seeking to {} ms", seek.0);
                        self.seek(seek);
                    }
                }
                MediaEvent::EndOfMedia => {
                    let rewind = self.clock.end_of_media();
                    self.seek(rewind);
                    if let Err(e) = self.engine.stop() {
                        warn!("Stop after end of media failed: {}", e);
                    }
                }
                MediaEvent::Error(message) => {
                    error!("Playback error: {}", message);
                    if let Err(e) = self.stop() {
                        warn!("Stop after playback error failed: {}", e);
                    }
                }
            }
        }
    }

    fn sync_texts(&self, registry: &mut TranslationRegistry, translations: &Translations) {
        let wanted = [
            (self.texts.play, if self.is_playing() { "pause" } else { "play1" }),
            (
                self.texts.audio,
                if self.is_muted() {
                    "audiospento"
                } else {
                    "audioacceso"
                },
            ),
            (
                self.texts.screen,
                if self.full_screen { "reduce" } else { "expand" },
            ),
        ];
        for (handle, id) in wanted {
            if registry.id(handle) != id {
                registry.rebind(handle, id, translations);
            }
        }
    }

    fn refresh_texture(&mut self, ctx: &egui::Context) {
        if !self.frames.has_changed().unwrap_or(false) {
            return;
        }
        let frame = self.frames.borrow_and_update().clone();
        if let Some(image) = frame {
            match &mut self.texture {
                Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                None => {
                    self.texture = Some(ctx.load_texture(
                        "video_frame",
                        image,
                        egui::TextureOptions::LINEAR,
                    ))
                }
            }
        }
    }

    fn icon_button(&self, icon: Icon) -> egui::Button<'static> {
        let path = self.paths.icon(icon.name());
        if path.is_file() {
            let image = egui::Image::new(format!("file://{}", path.display()))
                .fit_to_exact_size(Vec2::splat(ICON_SIZE - 8.0));
            egui::Button::image(image)
        } else {
            egui::Button::new(icon.glyph())
        }
    }

    fn show_video(&self, ui: &mut egui::Ui, size: Vec2) {
        let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
        ui.painter().rect_filled(rect, 0.0, Color32::BLACK);

        if let Some(texture) = &self.texture {
            let frame_size = texture.size_vec2();
            if frame_size.x > 0.0 && frame_size.y > 0.0 {
                let scale = (rect.width() / frame_size.x).min(rect.height() / frame_size.y);
                let target = Rect::from_center_size(rect.center(), frame_size * scale);
                ui.painter().image(
                    texture.id(),
                    target,
                    Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
        }
    }

    fn show_position_slider(&mut self, ui: &mut egui::Ui, width: f32) {
        ui.spacing_mut().slider_width = width;
        let mut value = self.clock.slider();
        let response = ui.add(
            egui::Slider::new(&mut value, 0.0..=100.0)
                .show_value(false)
                .trailing_fill(true),
        );

        if response.drag_started() {
            let seek = self.clock.slider_pressed(value);
            self.seek(seek);
        } else if response.dragged() {
            if response.changed() {
                self.clock.slider_moved(value);
            }
        } else if response.changed() {
            self.clock.slider_value_changed(value);
        }

        if response.drag_stopped() {
            let seek = self.clock.slider_released();
            self.seek(seek);
        }
    }

    /// Draws the panel and returns what the window has to handle.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        registry: &mut TranslationRegistry,
        translations: &Translations,
        settings: &mut Settings,
    ) -> Option<PanelAction> {
        self.sync_texts(registry, translations);
        self.refresh_texture(ui.ctx());

        let spacing = ui.spacing().item_spacing;
        let bar_height = ICON_SIZE + 2.0 * spacing.y;
        let video_size = (ui.available_size() - Vec2::new(0.0, bar_height)).max(Vec2::ZERO);
        self.show_video(ui, video_size);

        let mut action = None;
        ui.horizontal(|ui| {
            let play_glyph = if self.is_playing() { "⏸" } else { "▶" };
            let play = ui
                .add_sized([ICON_SIZE, ICON_SIZE], egui::Button::new(play_glyph))
                .on_hover_text(registry.text(self.texts.play));
            if play.clicked() {
                if let Err(e) = self.play_pause() {
                    warn!("Play/pause failed: {}", e);
                }
            }

            ui.add_sized(
                [TIME_LABEL_WIDTH, ICON_SIZE],
                egui::Label::new(self.clock.elapsed_text()),
            )
            .on_hover_text("hh:mm:ss");

            let reserved = 4.0 * ICON_SIZE
                + TIME_LABEL_WIDTH
                + VOLUME_SLIDER_WIDTH
                + VOLUME_LABEL_WIDTH
                + 8.0 * spacing.x;
            let slider_width = (ui.available_width() - reserved).max(MIN_POSITION_SLIDER_WIDTH);
            self.show_position_slider(ui, slider_width);

            ui.add_sized(
                [TIME_LABEL_WIDTH, ICON_SIZE],
                egui::Label::new(self.clock.total_text()),
            )
            .on_hover_text("hh:mm:ss");

            let stop = ui
                .add_sized([ICON_SIZE, ICON_SIZE], egui::Button::new("⏹"))
                .on_hover_text(registry.text(self.texts.stop));
            if stop.clicked() {
                if let Err(e) = self.stop() {
                    warn!("Stop failed: {}", e);
                }
            }

            let audio_icon = if self.is_muted() {
                Icon::AudioMin
            } else {
                Icon::AudioMax
            };
            let audio = ui
                .add_sized([ICON_SIZE, ICON_SIZE], self.icon_button(audio_icon))
                .on_hover_text(registry.text(self.texts.audio));
            if audio.clicked() {
                self.toggle_mute(settings);
            }

            ui.spacing_mut().slider_width = VOLUME_SLIDER_WIDTH;
            let mut volume = self.volume;
            if ui
                .add(egui::Slider::new(&mut volume, 0..=100).show_value(false))
                .changed()
            {
                self.set_volume(volume, settings);
            }
            ui.add_sized(
                [VOLUME_LABEL_WIDTH, ICON_SIZE],
                egui::Label::new(format!("{}%", self.volume)),
            );

            let exit = ui
                .add_sized([ICON_SIZE, ICON_SIZE], self.icon_button(Icon::Exit))
                .on_hover_text(registry.text(self.texts.exit));
            if exit.clicked() {
                action = Some(PanelAction::Exit);
            }

            let screen_icon = if self.full_screen {
                Icon::NormalScreen
            } else {
                Icon::FullScreen
            };
            let screen = ui
                .add_sized([ICON_SIZE, ICON_SIZE], self.icon_button(screen_icon))
                .on_hover_text(registry.text(self.texts.screen));
            if screen.clicked() {
                action = Some(PanelAction::ToggleFullScreen);
            }
        });

        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::HeadlessEngine;
    use crate::paths::{InstallMode, OsFamily};
    use tempfile::{NamedTempFile, TempDir};

    const VOCABULARY: &str = r#"{
        "play1": {"en": "Play", "it": "Riproduci"},
        "pause": {"en": "Pause", "it": "Pausa"},
        "stop": {"en": "Stop", "it": "Ferma"},
        "expand": {"en": "Full screen", "it": "Schermo intero"},
        "reduce": {"en": "Window", "it": "Finestra"},
        "exit": {"en": "Exit", "it": "Esci"},
        "audioacceso": {"en": "Mute", "it": "Silenzia"},
        "audiospento": {"en": "Unmute", "it": "Riattiva"}
    }"#;

    struct Fixture {
        panel: PlayerPanel<HeadlessEngine>,
        settings: Settings,
        registry: TranslationRegistry,
        translations: Translations,
        _dir: TempDir,
    }

    fn fixture(volume: u8) -> Fixture {
        let dir = TempDir::new().unwrap();
        let paths = PathSet {
            mode: InstallMode::Source,
            os: OsFamily::Posix,
            exe: dir.path().to_path_buf(),
            read_only: dir.path().to_path_buf(),
            read_write: dir.path().to_path_buf(),
            logo: dir.path().to_path_buf(),
        };
        let mut translations = Translations::from_json(VOCABULARY).unwrap();
        translations.select(Some("en"));
        let mut registry = TranslationRegistry::new();
        let settings = Settings {
            volume,
            ..Default::default()
        };
        let (_tx, rx) = watch::channel(None);
        let panel = PlayerPanel::new(
            HeadlessEngine::new(),
            rx,
            &settings,
            paths,
            &mut registry,
            &translations,
        );
        Fixture {
            panel,
            settings,
            registry,
            translations,
            _dir: dir,
        }
    }

    #[test]
    fn test_initial_volume_applied_to_engine() {
        let f = fixture(50);
        assert_eq!(f.panel.volume(), 50);
        assert!((f.panel.engine().gain() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_set_volume_updates_settings() {
        let mut f = fixture(50);
        f.panel.set_volume(100, &mut f.settings);
        assert_eq!(f.settings.volume, 100);
        assert_eq!(f.panel.engine().gain(), 1.0);

        f.panel.set_volume(200, &mut f.settings);
        assert_eq!(f.panel.volume(), 100);
    }

    #[test]
    fn test_mute_restores_last_audible_volume() {
        let mut f = fixture(50);
        f.panel.set_volume(70, &mut f.settings);

        f.panel.toggle_mute(&mut f.settings);
        assert!(f.panel.is_muted());
        assert_eq!(f.settings.volume, 0);
        assert_eq!(f.panel.engine().gain(), 0.0);

        f.panel.toggle_mute(&mut f.settings);
        assert_eq!(f.panel.volume(), 70);
        assert_eq!(f.settings.volume, 70);
    }

    #[test]
    fn test_unmute_from_saved_zero_uses_default() {
        let mut f = fixture(0);
        assert!(f.panel.is_muted());
        f.panel.toggle_mute(&mut f.settings);
        assert_eq!(f.panel.volume(), DEFAULT_VOLUME);
    }

    #[test]
    fn test_open_records_folder_and_count() {
        let mut f = fixture(50);
        let file = NamedTempFile::new().unwrap();

        f.panel.open(file.path(), &mut f.settings).unwrap();
        assert_eq!(f.panel.source(), Some(file.path()));
        assert_eq!(f.settings.num_videos_opened, 1);
        assert_eq!(
            f.settings.folder.as_path(),
            file.path().parent()
        );
    }

    #[test]
    fn test_open_missing_file_keeps_settings() {
        let mut f = fixture(50);
        let before = f.settings.clone();
        let result = f
            .panel
            .open(Path::new("/definitely/nonexistent/file.mp4"), &mut f.settings);
        assert!(result.is_err());
        assert_eq!(f.settings, before);
        assert!(f.panel.source().is_none());
    }

    #[test]
    fn test_play_pause_toggles() {
        let mut f = fixture(50);
        let file = NamedTempFile::new().unwrap();
        f.panel.load(file.path()).unwrap();

        f.panel.play_pause().unwrap();
        assert!(f.panel.is_playing());
        assert!(f.panel.engine().is_playing());

        f.panel.play_pause().unwrap();
        assert!(!f.panel.is_playing());
        assert_eq!(f.panel.clock().state(), PlaybackState::Paused);
    }

    #[test]
    fn test_play_without_source_is_an_error() {
        let mut f = fixture(50);
        assert!(f.panel.play_pause().is_err());
        assert!(!f.panel.is_playing());
    }

    #[test]
    fn test_stop_keeps_slider_position() {
        let mut f = fixture(50);
        let file = NamedTempFile::new().unwrap();
        f.panel.load(file.path()).unwrap();
        f.panel.engine.push_event(MediaEvent::DurationChanged(100_000));
        f.panel.engine.push_event(MediaEvent::PositionChanged(30_000));
        f.panel.play_pause().unwrap();
        f.panel.poll();

        f.panel.stop().unwrap();
        assert_eq!(f.panel.clock().state(), PlaybackState::Stopped);
        assert_eq!(f.panel.clock().slider(), 30.0);
    }

    #[test]
    fn test_end_of_media_rewinds() {
        let mut f = fixture(50);
        let file = NamedTempFile::new().unwrap();
        f.panel.load(file.path()).unwrap();
        f.panel.play_pause().unwrap();
        f.panel.engine.push_event(MediaEvent::DurationChanged(10_000));
        f.panel.engine.push_event(MediaEvent::PositionChanged(9_900));
        f.panel.engine.push_event(MediaEvent::EndOfMedia);
        f.panel.poll();

        assert_eq!(f.panel.clock().state(), PlaybackState::Stopped);
        assert_eq!(f.panel.engine().seeks(), &[0]);
        assert!(!f.panel.engine().is_playing());
    }

    #[test]
    fn test_tooltips_follow_state() {
        let mut f = fixture(50);
        let file = NamedTempFile::new().unwrap();
        f.panel.load(file.path()).unwrap();

        f.panel.sync_texts(&mut f.registry, &f.translations);
        assert_eq!(f.registry.text(f.panel.texts.play), "Play");

        f.panel.play_pause().unwrap();
        f.panel.toggle_mute(&mut f.settings);
        f.panel.toggle_full_screen();
        f.panel.sync_texts(&mut f.registry, &f.translations);
        assert_eq!(f.registry.text(f.panel.texts.play), "Pause");
        assert_eq!(f.registry.text(f.panel.texts.audio), "Unmute");
        assert_eq!(f.registry.text(f.panel.texts.screen), "Window");

        f.translations.select(Some("it"));
        f.registry.retranslate(&f.translations, &mut []);
        assert_eq!(f.registry.text(f.panel.texts.play), "Pausa");
        assert_eq!(f.registry.text(f.panel.texts.stop), "Ferma");
    }
}
