use catplayer::app::load_window_icon;
use catplayer::language::PLACEHOLDER;
use catplayer::paths::{ensure_layout, locate, resolve};
use catplayer::player::Icon;
use catplayer::settings::{self, Folder};
use catplayer::{
    Environment, HeadlessEngine, InstallMode, MainWindow, OsFamily, PathSet, Settings, Translations,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::watch;

const UI_WORDS: [&str; 19] = [
    "open",
    "opennewvideo",
    "open_video",
    "nofileselected",
    "language",
    "selectlanguage",
    "okaylingua",
    "canclingua",
    "ok",
    "cancel",
    "about",
    "exit",
    "play1",
    "pause",
    "stop",
    "expand",
    "reduce",
    "audioacceso",
    "audiospento",
];

fn bundled_vocabulary() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join("vocabulary.json")
}

fn user_environment(home: &Path) -> Environment {
    Environment {
        family: "unix".to_string(),
        platform: "linux".to_string(),
        home: Some(home.to_path_buf()),
        current_dir: home.join("work"),
        exe_dir: home.join(".local").join("bin"),
        ..Default::default()
    }
}

// Lays out a per-user install with the bundled vocabulary in place
fn install_per_user(home: &Path) -> PathSet {
    let env = user_environment(home);
    let paths = resolve(InstallMode::PerUser, "catplayer", "catplayer", &env).unwrap();
    fs::create_dir_all(paths.read_only.join("config")).unwrap();
    fs::copy(bundled_vocabulary(), paths.vocabulary_file()).unwrap();
    paths
}

fn open_window(
    paths: &PathSet,
    file: Option<PathBuf>,
    home: &Path,
) -> MainWindow<HeadlessEngine> {
    let saved = settings::load(paths).unwrap();
    let mut translations = Translations::load(&paths.read_only).unwrap();
    translations.select_initial(&saved);
    let (_sender, receiver) = watch::channel(None);
    MainWindow::new(
        file,
        &saved,
        translations,
        paths.clone(),
        Some(home.to_path_buf()),
        HeadlessEngine::new(),
        receiver,
    )
}

#[test]
fn test_bundled_vocabulary_covers_every_ui_word() {
    let text = fs::read_to_string(bundled_vocabulary()).unwrap();
    let mut translations = Translations::from_json(&text).unwrap();
    assert_eq!(translations.languages(), ["en", "it"]);

    for code in ["en", "it"] {
        translations.select(Some(code));
        for word in UI_WORDS.iter().chain(["en", "it"].iter()) {
            let translated = translations.text_for(word);
            assert_ne!(translated, PLACEHOLDER, "{} has no {} text", word, code);
        }
    }
}

#[test]
fn test_locate_prefers_per_user_install() {
    let home = TempDir::new().unwrap();
    let installed = install_per_user(home.path());

    let env = user_environment(home.path());
    let located = locate("catplayer", "catplayer", &env).unwrap();
    assert_eq!(located, installed);
}

#[test]
fn test_locate_override_wins() {
    let home = TempDir::new().unwrap();
    install_per_user(home.path());

    let env = Environment {
        mode_override: Some("source".to_string()),
        ..user_environment(home.path())
    };
    let located = locate("catplayer", "catplayer", &env).unwrap();
    assert_eq!(located.mode, InstallMode::Source);
    assert_eq!(located.read_write, home.path().join("work"));
}

#[test]
fn test_first_run_seeds_defaults() {
    let home = TempDir::new().unwrap();
    let paths = install_per_user(home.path());

    assert!(ensure_layout(&paths, "linux").unwrap());
    assert!(!ensure_layout(&paths, "linux").unwrap());

    let saved = settings::load(&paths).unwrap();
    assert_eq!(saved.volume, 50);
    assert_eq!(saved.folder, Folder::Unset);
    assert_eq!(saved.num_videos_opened, 0);
    assert_eq!(saved.language, "en");
    assert!(paths.tmp_dir().is_dir());
}

#[test]
fn test_session_round_trip() {
    let home = TempDir::new().unwrap();
    let paths = install_per_user(home.path());
    ensure_layout(&paths, "linux").unwrap();

    let videos = home.path().join("videos");
    fs::create_dir_all(&videos).unwrap();
    let first = videos.join("cat.mp4");
    let second = videos.join("dog.mkv");
    fs::write(&first, b"not really a video").unwrap();
    fs::write(&second, b"not really a video").unwrap();

    let mut window = open_window(&paths, Some(first.clone()), home.path());
    assert_eq!(window.settings().num_videos_opened, 1);
    assert_eq!(window.header().file(), Some(first.as_path()));

    window.open_file(second.clone());
    window.set_volume(30);
    window.set_volume(0);
    window.set_volume(30);
    window.open_language_dialog();
    window.choose_language("it");
    window.confirm_language();
    assert_eq!(window.header().text(), second.display().to_string());
    window.persist().unwrap();

    let saved = settings::load(&paths).unwrap();
    assert_eq!(saved.volume, 30);
    assert_eq!(saved.folder, Folder::Path(videos.clone()));
    assert_eq!(saved.num_videos_opened, 2);
    assert_eq!(saved.language, "it");
    assert!(!saved.open_date.is_empty());
    assert!(!saved.close_date.is_empty());

    // Next run starts from what was saved
    let window = open_window(&paths, None, home.path());
    assert_eq!(window.translations().selected(), Some("it"));
    assert_eq!(window.header().text(), "Nessun file selezionato");
    assert_eq!(window.panel().volume(), 30);
    assert_eq!(window.settings().num_videos_opened, 0);
    assert_eq!(window.start_folder(), Some(videos));
}

#[test]
fn test_saved_record_reloads_unchanged() {
    let home = TempDir::new().unwrap();
    let paths = install_per_user(home.path());
    ensure_layout(&paths, "linux").unwrap();

    let record = Settings {
        volume: 77,
        folder: Folder::Path(home.path().to_path_buf()),
        num_videos_opened: 4,
        language: "it".to_string(),
        ..Settings::defaults("linux")
    };
    settings::save(&paths, &record).unwrap();
    assert_eq!(settings::load(&paths).unwrap(), record);
}

fn source_tree(os: OsFamily) -> PathSet {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    PathSet {
        mode: InstallMode::Source,
        os,
        exe: root.clone(),
        read_only: root.clone(),
        read_write: root.clone(),
        logo: root,
    }
}

#[test]
fn test_control_icons_ship_for_every_os() {
    let icons = [
        Icon::FullScreen,
        Icon::NormalScreen,
        Icon::Exit,
        Icon::AudioMax,
        Icon::AudioMin,
    ];
    for os in [OsFamily::Posix, OsFamily::Windows] {
        let paths = source_tree(os);
        for icon in icons {
            let file = paths.icon(icon.name());
            assert!(file.is_file(), "{} is missing", file.display());
        }
    }

    let windows = source_tree(OsFamily::Windows);
    let png = image::open(windows.icon(Icon::Exit.name())).unwrap();
    assert!(png.width() > 0 && png.height() > 0);
}

#[test]
fn test_bundled_logo_loads_as_window_icon() {
    let paths = source_tree(OsFamily::Windows);
    let icon = load_window_icon(&paths.logo_file()).unwrap();
    assert_eq!((icon.width, icon.height), (128, 128));
    assert_eq!(icon.rgba.len(), 128 * 128 * 4);
}
