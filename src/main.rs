use anyhow::{anyhow, Context};
use catplayer::logging::{self, LOG_MAX_LINES};
use catplayer::paths::{ensure_layout, locate, Environment};
use catplayer::{app, settings, MainWindow, Translations};
use catplayer::{APP_NAME, APP_VENDOR, FONT_SIZE, WINDOW_SIZE};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "catplayer", version, about = "Basic video/music player app.")]
struct Args {
    /// Video/Music input file
    filename: Option<PathBuf>,
}

#[cfg(feature = "gstreamer")]
fn init_media_backend() -> anyhow::Result<()> {
    // Set GStreamer plugin path for bundled plugins
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let gstreamer_plugin_path = exe_dir.join("lib").join("gstreamer-1.0");
            if gstreamer_plugin_path.exists() {
                info!(
                    "Found bundled GStreamer plugins at: {}",
                    gstreamer_plugin_path.display()
                );
                std::env::set_var("GST_PLUGIN_PATH", gstreamer_plugin_path);
            } else {
                warn!("Bundled GStreamer plugin directory not found. Relying on system-wide installation.");
            }
        }
    }

    gstreamer::init().context("Failed to initialize GStreamer")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env = Environment::from_process().context("Failed to read the process environment")?;
    let paths =
        locate(APP_VENDOR, APP_NAME, &env).context("Failed to locate the installation")?;
    let created = ensure_layout(&paths, &env.platform)
        .with_context(|| format!("Failed to prepare {}", paths.read_write.display()))?;

    let log_file = paths.log_file();
    logging::init(&log_file).context("Failed to set up logging")?;
    logging::trim_log(&log_file, LOG_MAX_LINES);

    info!("Starting {} ({:?} install)", APP_NAME, paths.mode);
    info!(
        "Executables: {}, assets: {}, data: {}",
        paths.exe.display(),
        paths.read_only.display(),
        paths.read_write.display()
    );
    if created {
        info!("Created default settings at {}", paths.settings_file().display());
    }

    let saved = match settings::load(&paths) {
        Ok(saved) => saved,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    let mut translations = match Translations::load(&paths.read_only) {
        Ok(translations) => translations,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    translations.select_initial(&saved);

    let (frame_sender, frame_receiver) = watch::channel(None);

    #[cfg(feature = "gstreamer")]
    let engine = {
        init_media_backend()?;
        catplayer::video_player::VideoPlayer::new(frame_sender)?
    };
    #[cfg(not(feature = "gstreamer"))]
    let engine = {
        warn!("Built without GStreamer, playback is disabled");
        drop(frame_sender);
        catplayer::media::HeadlessEngine::new()
    };

    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size(WINDOW_SIZE)
        .with_title(APP_NAME);
    if let Some(icon) = app::load_window_icon(&paths.logo_file()) {
        viewport = viewport.with_icon(icon);
    }
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let home = env.home.clone();
    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            cc.egui_ctx.style_mut(|style| {
                for text_style in [egui::TextStyle::Body, egui::TextStyle::Button] {
                    style
                        .text_styles
                        .insert(text_style, egui::FontId::proportional(FONT_SIZE));
                }
            });
            Ok(Box::new(MainWindow::new(
                args.filename,
                &saved,
                translations,
                paths,
                home,
                engine,
                frame_receiver,
            )))
        }),
    )
    .map_err(|e| anyhow!("Event loop failed: {:?}", e))
}
