use eframe::epaint::ColorImage;
use egui::{Key, KeyboardShortcut, Modifiers};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use crate::header::Header;
use crate::language::{TextHandle, Translatable, TranslationRegistry, Translations};
use crate::language_dialog::{LanguageAction, LanguageSelector};
use crate::logging::{trim_log, LOG_MAX_LINES};
use crate::media::MediaEngine;
use crate::paths::PathSet;
use crate::player::{PanelAction, PlayerPanel};
use crate::settings::{self, Settings, SettingsError, DEFAULT_LANGUAGE};
use crate::APP_NAME;

const OPEN_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::O);
const LANGUAGE_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::L);
const ABOUT_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::A);
const EXIT_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::NONE, Key::Escape);

pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "avi", "ts", "MOV"];

const ABOUT_TEXT: &str = "Copyright © 2024 Marco Catillo.\n\n\
This software is distributed under the terms of the GNU General Public \
License v3 (GPLv3), https://www.gnu.org/licenses/gpl-3.0.html.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Open,
    Language,
    About,
    Exit,
}

#[derive(Debug, Clone, Copy)]
struct MenuTexts {
    open: TextHandle,
    open_tip: TextHandle,
    language: TextHandle,
    language_tip: TextHandle,
    about: TextHandle,
    exit: TextHandle,
    open_video: TextHandle,
}

/// Loads the window icon; `None` when the file is missing or unreadable.
pub fn load_window_icon(path: &Path) -> Option<egui::IconData> {
    match image::open(path) {
        Ok(image) => {
            let rgba = image.to_rgba8();
            let (width, height) = rgba.dimensions();
            Some(egui::IconData {
                rgba: rgba.into_raw(),
                width,
                height,
            })
        }
        Err(e) => {
            warn!("Failed to load window icon {}: {}", path.display(), e);
            None
        }
    }
}

pub struct MainWindow<E: MediaEngine> {
    settings: Settings,
    translations: Translations,
    paths: PathSet,
    home: Option<PathBuf>,
    registry: TranslationRegistry,
    header: Header,
    panel: PlayerPanel<E>,
    menu: MenuTexts,
    language_dialog: LanguageSelector,
    show_about: bool,
    persisted: bool,
    // Set whenever the loaded file changes; the viewport title lags until the next frame.
    title_pending: bool,
}

impl<E: MediaEngine> MainWindow<E> {
    /// Builds the window around an already selected translation table.
    ///
    /// `file` is the media given on the command line, loaded straight away.
    pub fn new(
        file: Option<PathBuf>,
        saved: &Settings,
        translations: Translations,
        paths: PathSet,
        home: Option<PathBuf>,
        engine: E,
        frames: watch::Receiver<Option<ColorImage>>,
    ) -> Self {
        let settings = Settings::session(saved, file.as_deref());
        let mut registry = TranslationRegistry::new();

        let menu = MenuTexts {
            open: registry.register("open", &translations),
            open_tip: registry.register("opennewvideo", &translations),
            language: registry.register("language", &translations),
            language_tip: registry.register("selectlanguage", &translations),
            about: registry.register("about", &translations),
            exit: registry.register("exit", &translations),
            open_video: registry.register("open_video", &translations),
        };
        let language_dialog = LanguageSelector::new(&mut registry, &translations);
        let panel = PlayerPanel::new(
            engine,
            frames,
            &settings,
            paths.clone(),
            &mut registry,
            &translations,
        );

        let mut window = Self {
            header: Header::new(None, &translations),
            settings,
            translations,
            paths,
            home,
            registry,
            panel,
            menu,
            language_dialog,
            show_about: false,
            persisted: false,
            title_pending: false,
        };

        if let Some(path) = file {
            match window.panel.load(&path) {
                Ok(()) => {
                    window.header.set_file(Some(path), &window.translations);
                    window.title_pending = true;
                }
                Err(e) => warn!("Ignoring media error: {}", e),
            }
        }
        window
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn translations(&self) -> &Translations {
        &self.translations
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn panel(&self) -> &PlayerPanel<E> {
        &self.panel
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.panel.set_volume(volume, &mut self.settings);
    }

    pub fn text(&self, handle: TextHandle) -> &str {
        self.registry.text(handle)
    }

    pub fn title(&self) -> String {
        match self.header.file().and_then(Path::file_name) {
            Some(name) => format!("{} - {}", name.to_string_lossy(), APP_NAME),
            None => APP_NAME.to_string(),
        }
    }

    /// The window title still to be sent to the viewport, if the file changed.
    pub fn take_pending_title(&mut self) -> Option<String> {
        if !std::mem::take(&mut self.title_pending) {
            return None;
        }
        Some(self.title())
    }

    /// Folder the open dialog starts in.
    pub fn start_folder(&self) -> Option<PathBuf> {
        self.settings
            .folder
            .as_path()
            .filter(|folder| folder.is_dir())
            .map(Path::to_path_buf)
            .or_else(|| self.home.clone())
    }

    /// Asks the user for a media file; `None` when the dialog is cancelled.
    pub fn pick_video(&self) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new()
            .set_title(self.registry.text(self.menu.open_video))
            .add_filter("Videos", &VIDEO_EXTENSIONS)
            .add_filter("Any files", &["*"]);
        if let Some(folder) = self.start_folder() {
            dialog = dialog.set_directory(folder);
        }
        dialog.pick_file()
    }

    /// Opens a file chosen by the user. Media failures are logged and ignored.
    pub fn open_file(&mut self, path: PathBuf) {
        match self.panel.open(&path, &mut self.settings) {
            Ok(()) => {
                info!("Opened {}", path.display());
                self.header.set_file(Some(path), &self.translations);
                self.title_pending = true;
            }
            Err(e) => warn!("Ignoring media error: {}", e),
        }
        trim_log(&self.paths.log_file(), LOG_MAX_LINES);
    }

    fn retranslate(&mut self) {
        let mut extra: [&mut dyn Translatable; 1] = [&mut self.header];
        self.registry.retranslate(&self.translations, &mut extra);
    }

    /// Live selection from the language dialog. Nothing is committed yet.
    pub fn choose_language(&mut self, code: &str) {
        self.translations.select(Some(code));
        self.retranslate();
    }

    pub fn confirm_language(&mut self) {
        self.settings.language = self
            .translations
            .selected()
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();
        info!("Language set to {}", self.settings.language);
    }

    /// Restores the language active before the dialog opened.
    pub fn cancel_language(&mut self, original: Option<String>) {
        self.translations.select(original.as_deref());
        self.retranslate();
        self.confirm_language();
    }

    pub fn open_language_dialog(&mut self) {
        self.language_dialog.open(&self.translations);
    }

    fn apply_language_action(&mut self, action: LanguageAction) {
        match action {
            LanguageAction::Choose(code) => self.choose_language(&code),
            LanguageAction::Confirm => {
                self.language_dialog.close();
                self.confirm_language();
            }
            LanguageAction::Cancel => {
                let original = self.language_dialog.close();
                self.cancel_language(original);
            }
        }
    }

    /// Stamps the close date and writes the session record, once.
    pub fn persist(&mut self) -> Result<(), SettingsError> {
        if self.persisted {
            return Ok(());
        }
        self.settings.mark_closed();
        settings::save(&self.paths, &self.settings)?;
        self.persisted = true;
        Ok(())
    }

    fn persist_logged(&mut self) {
        if let Err(e) = self.persist() {
            error!("Failed to save settings: {}", e);
        }
    }

    fn toggle_full_screen(&mut self, ctx: &egui::Context) {
        let full_screen = self.panel.toggle_full_screen();
        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(full_screen));
    }

    fn exit(&mut self, ctx: &egui::Context) {
        self.persist_logged();
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    fn shortcut_action(&self, ctx: &egui::Context) -> Option<MenuAction> {
        ctx.input_mut(|i| {
            if i.consume_shortcut(&OPEN_SHORTCUT) {
                Some(MenuAction::Open)
            } else if i.consume_shortcut(&LANGUAGE_SHORTCUT) {
                Some(MenuAction::Language)
            } else if i.consume_shortcut(&ABOUT_SHORTCUT) {
                Some(MenuAction::About)
            } else if !self.language_dialog.is_open()
                && !self.show_about
                && i.consume_shortcut(&EXIT_SHORTCUT)
            {
                Some(MenuAction::Exit)
            } else {
                None
            }
        })
    }

    fn menu_bar(&self, ui: &mut egui::Ui) -> Option<MenuAction> {
        let mut action = None;
        let ctx = ui.ctx().clone();
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                let entries = [
                    (self.menu.open, Some(self.menu.open_tip), OPEN_SHORTCUT, MenuAction::Open),
                    (
                        self.menu.language,
                        Some(self.menu.language_tip),
                        LANGUAGE_SHORTCUT,
                        MenuAction::Language,
                    ),
                    (self.menu.about, None, ABOUT_SHORTCUT, MenuAction::About),
                    (self.menu.exit, None, EXIT_SHORTCUT, MenuAction::Exit),
                ];
                for (label, tip, shortcut, entry) in entries {
                    let button = egui::Button::new(self.registry.text(label))
                        .shortcut_text(ctx.format_shortcut(&shortcut));
                    let mut response = ui.add(button);
                    if let Some(tip) = tip {
                        response = response.on_hover_text(self.registry.text(tip));
                    }
                    if response.clicked() {
                        action = Some(entry);
                        ui.close_menu();
                    }
                }
            });
        });
        action
    }

    fn handle_menu_action(&mut self, ctx: &egui::Context, action: MenuAction) {
        match action {
            MenuAction::Open => {
                if let Some(path) = self.pick_video() {
                    self.open_file(path);
                    ctx.request_repaint();
                }
            }
            MenuAction::Language => self.open_language_dialog(),
            MenuAction::About => self.show_about = true,
            MenuAction::Exit => self.exit(ctx),
        }
    }

    fn about_window(&mut self, ctx: &egui::Context) {
        if !self.show_about {
            return;
        }
        let mut close = false;
        egui::Window::new(self.registry.text(self.menu.about))
            .id(egui::Id::new("about"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(ABOUT_TEXT);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        close = true;
                    }
                });
            });
        if close {
            self.show_about = false;
        }
    }
}

impl<E: MediaEngine> eframe::App for MainWindow<E> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.panel.poll();

        if let Some(title) = self.take_pending_title() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            self.persist_logged();
        }

        let mut menu_action = self.shortcut_action(ctx);

        if !self.panel.is_full_screen() {
            egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
                if let Some(action) = self.menu_bar(ui) {
                    menu_action = Some(action);
                }
            });
            egui::TopBottomPanel::top("header").show(ctx, |ui| {
                self.header.show(ui);
            });
        }

        let mut panel_action = None;
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                panel_action =
                    self.panel
                        .show(ui, &mut self.registry, &self.translations, &mut self.settings);
            });

        let selected = self.translations.selected().map(str::to_string);
        if let Some(action) = self
            .language_dialog
            .show(ctx, &self.registry, selected.as_deref())
        {
            self.apply_language_action(action);
        }
        self.about_window(ctx);

        match panel_action {
            Some(PanelAction::ToggleFullScreen) => self.toggle_full_screen(ctx),
            Some(PanelAction::Exit) => self.exit(ctx),
            None => {}
        }
        if let Some(action) = menu_action {
            self.handle_menu_action(ctx, action);
        }

        ctx.request_repaint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::HeadlessEngine;
    use crate::paths::{InstallMode, OsFamily};
    use crate::settings::Folder;
    use std::fs;
    use tempfile::{NamedTempFile, TempDir};

    const VOCABULARY: &str = r#"{
        "open": {"en": "Open", "it": "Apri"},
        "nofileselected": {"en": "No file selected", "it": "Nessun file selezionato"},
        "en": {"en": "English", "it": "Inglese"},
        "it": {"en": "Italian", "it": "Italiano"}
    }"#;

    fn paths(dir: &TempDir) -> PathSet {
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("config")).unwrap();
        PathSet {
            mode: InstallMode::Source,
            os: OsFamily::Posix,
            exe: root.clone(),
            read_only: root.clone(),
            read_write: root.clone(),
            logo: root,
        }
    }

    fn window(dir: &TempDir, file: Option<PathBuf>, saved: &Settings) -> MainWindow<HeadlessEngine> {
        let mut translations = Translations::from_json(VOCABULARY).unwrap();
        translations.select_initial(saved);
        let (_tx, rx) = watch::channel(None);
        MainWindow::new(
            file,
            saved,
            translations,
            paths(dir),
            Some(dir.path().to_path_buf()),
            HeadlessEngine::new(),
            rx,
        )
    }

    #[test]
    fn test_startup_without_file() {
        let dir = TempDir::new().unwrap();
        let window = window(&dir, None, &Settings::default());
        assert_eq!(window.header().text(), "No file selected");
        assert_eq!(window.settings().num_videos_opened, 0);
        assert_eq!(window.title(), APP_NAME);
        assert!(window.panel().source().is_none());
    }

    #[test]
    fn test_startup_with_file_counts_it() {
        let dir = TempDir::new().unwrap();
        let file = NamedTempFile::new_in(dir.path()).unwrap();
        let window = window(&dir, Some(file.path().to_path_buf()), &Settings::default());

        assert_eq!(window.settings().num_videos_opened, 1);
        assert_eq!(window.panel().source(), Some(file.path()));
        assert_eq!(window.header().file(), Some(file.path()));
        assert!(window.title().ends_with(" - catplayer"));
    }

    #[test]
    fn test_command_line_file_sets_window_title() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("cat.mp4");
        fs::write(&file, b"not really a video").unwrap();
        let mut loaded = window(&dir, Some(file), &Settings::default());

        assert_eq!(
            loaded.take_pending_title().as_deref(),
            Some("cat.mp4 - catplayer")
        );
        assert_eq!(loaded.take_pending_title(), None);

        let mut empty = window(&dir, None, &Settings::default());
        assert_eq!(empty.take_pending_title(), None);
    }

    #[test]
    fn test_open_file_refreshes_window_title() {
        let dir = TempDir::new().unwrap();
        let mut window = window(&dir, None, &Settings::default());
        window.open_file(dir.path().join("missing.mp4"));
        assert_eq!(window.take_pending_title(), None);

        let file = dir.path().join("dog.mkv");
        fs::write(&file, b"not really a video").unwrap();
        window.open_file(file);
        assert_eq!(
            window.take_pending_title().as_deref(),
            Some("dog.mkv - catplayer")
        );
    }

    #[test]
    fn test_open_file_updates_header_and_settings() {
        let dir = TempDir::new().unwrap();
        let mut window = window(&dir, None, &Settings::default());
        let file = NamedTempFile::new_in(dir.path()).unwrap();

        window.open_file(file.path().to_path_buf());
        assert_eq!(window.header().file(), Some(file.path()));
        assert_eq!(window.settings().num_videos_opened, 1);
        assert_eq!(window.settings().folder.as_path(), Some(dir.path()));
        assert_eq!(window.start_folder(), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_open_missing_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut window = window(&dir, None, &Settings::default());
        window.open_file(dir.path().join("missing.mp4"));
        assert!(window.header().file().is_none());
        assert_eq!(window.settings().num_videos_opened, 0);
        assert_eq!(window.settings().folder, Folder::Unset);
    }

    #[test]
    fn test_start_folder_falls_back_to_home() {
        let dir = TempDir::new().unwrap();
        let window = window(&dir, None, &Settings::default());
        assert_eq!(window.start_folder(), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_choose_then_confirm_language() {
        let dir = TempDir::new().unwrap();
        let mut window = window(&dir, None, &Settings::default());
        window.open_language_dialog();

        window.apply_language_action(LanguageAction::Choose("it".to_string()));
        assert_eq!(window.header().text(), "Nessun file selezionato");
        assert_eq!(window.text(window.menu.open), "Apri");
        assert_eq!(window.settings().language, "en");

        window.apply_language_action(LanguageAction::Confirm);
        assert_eq!(window.settings().language, "it");
        assert!(!window.language_dialog.is_open());
    }

    #[test]
    fn test_cancel_restores_language_at_open() {
        let dir = TempDir::new().unwrap();
        let mut window = window(&dir, None, &Settings::default());
        window.open_language_dialog();

        window.apply_language_action(LanguageAction::Choose("it".to_string()));
        window.apply_language_action(LanguageAction::Choose("en".to_string()));
        window.apply_language_action(LanguageAction::Choose("it".to_string()));
        window.apply_language_action(LanguageAction::Cancel);

        assert_eq!(window.translations().selected(), Some("en"));
        assert_eq!(window.settings().language, "en");
        assert_eq!(window.text(window.menu.open), "Open");
        assert_eq!(window.header().text(), "No file selected");
    }

    #[test]
    fn test_persist_writes_once() {
        let dir = TempDir::new().unwrap();
        let mut window = window(&dir, None, &Settings::default());
        window.set_volume(80);

        window.persist().unwrap();
        let first = settings::load(&window.paths).unwrap();
        assert_eq!(first.volume, 80);
        assert!(!first.close_date.is_empty());

        fs::remove_file(window.paths.settings_file()).unwrap();
        window.persist().unwrap();
        assert!(!window.paths.settings_file().exists());
    }

    #[test]
    fn test_load_window_icon_missing() {
        assert!(load_window_icon(Path::new("/definitely/nonexistent/logo.ico")).is_none());
    }
}
