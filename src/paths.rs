use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::settings::Settings;

pub const MODE_OVERRIDE_VAR: &str = "CATPLAYER_INSTALL_MODE";

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Environment variable {0} is not set")]
    MissingVariable(&'static str),

    #[error("Unknown installation mode: {0}")]
    UnknownMode(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to write initial settings: {0}")]
    Seed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Posix,
    Windows,
}

impl OsFamily {
    /// Maps a `std::env::consts::FAMILY` style string to a supported family.
    pub fn from_family(family: &str) -> Result<Self, PathError> {
        match family {
            "unix" => Ok(OsFamily::Posix),
            "windows" => Ok(OsFamily::Windows),
            other => Err(PathError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn icon_extension(self) -> &'static str {
        match self {
            OsFamily::Posix => "svg",
            OsFamily::Windows => "png",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Shared system install.
    Global,
    /// Install scoped to the current account.
    PerUser,
    /// No install: everything lives next to the sources.
    Source,
}

impl FromStr for InstallMode {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(InstallMode::Global),
            "user" | "local" => Ok(InstallMode::PerUser),
            "source" | "local_dir" => Ok(InstallMode::Source),
            other => Err(PathError::UnknownMode(other.to_string())),
        }
    }
}

/// Snapshot of the process environment the resolver reads from.
///
/// Kept as plain data so resolution can be exercised for any platform.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub family: String,
    pub platform: String,
    pub home: Option<PathBuf>,
    pub local_app_data: Option<PathBuf>,
    pub program_files_x86: Option<PathBuf>,
    pub current_dir: PathBuf,
    pub exe_dir: PathBuf,
    pub mode_override: Option<String>,
}

impl Environment {
    pub fn from_process() -> Result<Self, PathError> {
        let var = |name: &str| std::env::var_os(name).map(PathBuf::from);
        let current_dir = std::env::current_dir()?;
        let exe_dir = std::env::current_exe()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| current_dir.clone());

        Ok(Self {
            family: std::env::consts::FAMILY.to_string(),
            platform: std::env::consts::OS.to_string(),
            home: var("HOME").or_else(|| var("USERPROFILE")),
            local_app_data: var("LOCALAPPDATA"),
            program_files_x86: var("PROGRAMFILES(X86)"),
            current_dir,
            exe_dir,
            mode_override: std::env::var(MODE_OVERRIDE_VAR).ok(),
        })
    }

    fn home(&self) -> Result<&Path, PathError> {
        self.home.as_deref().ok_or(PathError::MissingVariable("HOME"))
    }

    fn local_app_data(&self) -> Result<&Path, PathError> {
        self.local_app_data
            .as_deref()
            .ok_or(PathError::MissingVariable("LOCALAPPDATA"))
    }

    fn program_files_x86(&self) -> Result<&Path, PathError> {
        self.program_files_x86
            .as_deref()
            .ok_or(PathError::MissingVariable("PROGRAMFILES(X86)"))
    }
}

/// The four directory roots of an installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    pub mode: InstallMode,
    pub os: OsFamily,
    pub exe: PathBuf,
    pub read_only: PathBuf,
    pub read_write: PathBuf,
    pub logo: PathBuf,
}

impl PathSet {
    pub fn config_dir(&self) -> PathBuf {
        self.read_write.join("config")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.read_write.join("tmp")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir().join("config.json")
    }

    pub fn vocabulary_file(&self) -> PathBuf {
        crate::language::vocabulary_path(&self.read_only)
    }

    pub fn icon(&self, name: &str) -> PathBuf {
        self.read_only
            .join("data")
            .join("media")
            .join(format!("{}.{}", name, self.os.icon_extension()))
    }

    pub fn logo_file(&self) -> PathBuf {
        self.logo
            .join("data")
            .join("logo")
            .join(format!("{}_128x128.ico", crate::APP_NAME))
    }

    pub fn log_file(&self) -> PathBuf {
        self.tmp_dir().join(format!("{}.log", crate::APP_NAME))
    }

    pub fn has_vocabulary(&self) -> bool {
        fs::File::open(self.vocabulary_file()).is_ok()
    }
}

/// Computes the roots for `mode` on the environment's OS family.
pub fn resolve(
    mode: InstallMode,
    vendor: &str,
    app: &str,
    env: &Environment,
) -> Result<PathSet, PathError> {
    let os = OsFamily::from_family(&env.family)?;

    let (exe, read_only, read_write) = match (os, mode) {
        (OsFamily::Posix, InstallMode::Global) => {
            let prefix = PathBuf::from("/usr");
            (
                prefix.join("bin"),
                prefix.join("share").join(app),
                env.home()?.join(".config").join(app),
            )
        }
        (OsFamily::Posix, InstallMode::PerUser) => {
            let prefix = env.home()?.join(".local");
            (
                prefix.join("bin"),
                prefix.join("share").join(app),
                env.home()?.join(".config").join(app),
            )
        }
        (OsFamily::Windows, InstallMode::Global) => {
            let install = env.program_files_x86()?.join(vendor).join(app);
            (
                install.clone(),
                install,
                env.local_app_data()?.join(vendor).join(app),
            )
        }
        (OsFamily::Windows, InstallMode::PerUser) => {
            let local = env.local_app_data()?;
            (
                local.join("Programs").join(vendor).join(app),
                local.join(vendor).join(app),
                local.join(vendor).join(app),
            )
        }
        (_, InstallMode::Source) => {
            let root = env.current_dir.clone();
            (root.clone(), root.clone(), root)
        }
    };

    Ok(PathSet {
        mode,
        os,
        logo: read_only.clone(),
        exe,
        read_only,
        read_write,
    })
}

/// Finds the installation this process runs from.
///
/// Precedence, first hit wins:
/// 1. `CATPLAYER_INSTALL_MODE` override (no probing)
/// 2. source checkout in the current directory
/// 3. per-user install
/// 4. system-wide install
/// 5. source layout next to the executable (always returned)
///
/// A candidate hits when its read-only root holds a readable vocabulary.
pub fn locate(vendor: &str, app: &str, env: &Environment) -> Result<PathSet, PathError> {
    if let Some(raw) = &env.mode_override {
        let mode: InstallMode = raw.parse()?;
        info!("Installation mode forced to {:?} by {}", mode, MODE_OVERRIDE_VAR);
        return resolve(mode, vendor, app, env);
    }

    for mode in [InstallMode::Source, InstallMode::PerUser, InstallMode::Global] {
        match resolve(mode, vendor, app, env) {
            Ok(paths) if paths.has_vocabulary() => {
                info!("Using {:?} installation at {}", mode, paths.read_only.display());
                return Ok(paths);
            }
            Ok(paths) => debug!(
                "No vocabulary under {}, skipping {:?}",
                paths.read_only.display(),
                mode
            ),
            Err(PathError::MissingVariable(var)) => {
                debug!("Skipping {:?}: {} is not set", mode, var)
            }
            Err(e) => return Err(e),
        }
    }

    let fallback = Environment {
        current_dir: env.exe_dir.clone(),
        ..env.clone()
    };
    info!(
        "Falling back to assets next to the executable in {}",
        fallback.current_dir.display()
    );
    resolve(InstallMode::Source, vendor, app, &fallback)
}

/// Creates the read-write tree and seeds the settings file when missing.
///
/// Returns whether anything was created.
pub fn ensure_layout(paths: &PathSet, platform: &str) -> Result<bool, PathError> {
    let mut created = false;

    for dir in [paths.read_write.clone(), paths.config_dir(), paths.tmp_dir()] {
        if !dir.is_dir() {
            fs::create_dir_all(&dir)?;
            info!("Created directory {}", dir.display());
            created = true;
        }
    }

    let settings_file = paths.settings_file();
    if !settings_file.exists() {
        let defaults = Settings::defaults(platform);
        fs::write(&settings_file, serde_json::to_string(&defaults)?)?;
        info!("Seeded settings file {}", settings_file.display());
        created = true;
    }

    Ok(created)
}
