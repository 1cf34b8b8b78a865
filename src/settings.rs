use log::info;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::paths::PathSet;

pub const DEFAULT_VOLUME: u8 = 50;
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings file {} is not readable: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Settings file {} is malformed: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write settings file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Last folder a file was opened from. Stored as `0` on disk when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Folder {
    #[default]
    Unset,
    Path(PathBuf),
}

impl Folder {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Folder::Unset => None,
            Folder::Path(path) => Some(path),
        }
    }

    fn from_text(text: &str) -> Self {
        let path = PathBuf::from(text);
        if !text.is_empty() && path.is_absolute() {
            Folder::Path(path)
        } else {
            Folder::Unset
        }
    }
}

impl Serialize for Folder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Folder::Unset => serializer.serialize_u8(0),
            Folder::Path(path) => serializer.serialize_str(&path.to_string_lossy()),
        }
    }
}

impl<'de> Deserialize<'de> for Folder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Text(text)) => Folder::from_text(&text),
            Some(Raw::Number(_)) | None => Folder::Unset,
        })
    }
}

/// Timestamps have been written both as strings and as a bare `0`.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(text)) => text,
        _ => String::new(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub os: String,
    #[serde(deserialize_with = "lenient_text")]
    pub open_date: String,
    #[serde(deserialize_with = "lenient_text")]
    pub close_date: String,
    pub volume: u8,
    pub folder: Folder,
    pub num_videos_opened: u32,
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            open_date: String::new(),
            close_date: String::new(),
            volume: DEFAULT_VOLUME,
            folder: Folder::Unset,
            num_videos_opened: 0,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Local time in the classic `ctime` layout, e.g. `Tue Oct 15 19:55:01 2026`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}

impl Settings {
    /// The record written when no settings file exists yet.
    pub fn defaults(platform: &str) -> Self {
        Self {
            os: platform.to_string(),
            open_date: timestamp(),
            ..Default::default()
        }
    }

    /// Builds the record for the current run from the one saved last time.
    pub fn session(saved: &Settings, opened_file: Option<&Path>) -> Self {
        let folder = match &saved.folder {
            Folder::Path(path) if path.is_absolute() => Folder::Path(path.clone()),
            _ => Folder::Unset,
        };

        Self {
            os: std::env::consts::OS.to_string(),
            open_date: timestamp(),
            close_date: String::new(),
            volume: saved.volume.min(100),
            folder,
            num_videos_opened: u32::from(opened_file.is_some()),
            language: saved.language.clone(),
        }
    }

    pub fn mark_closed(&mut self) {
        self.close_date = timestamp();
    }

    /// Records a file opened through the player.
    pub fn record_opened(&mut self, file: &Path) {
        if let Some(parent) = file.parent() {
            self.folder = Folder::from_text(&parent.to_string_lossy());
        }
        self.num_videos_opened += 1;
    }
}

pub fn load(paths: &PathSet) -> Result<Settings, SettingsError> {
    let path = paths.settings_file();
    let text = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
        path: path.clone(),
        source,
    })?;
    let settings =
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse { path, source })?;
    Ok(settings)
}

pub fn save(paths: &PathSet, settings: &Settings) -> Result<(), SettingsError> {
    let path = paths.settings_file();
    let json = serde_json::to_string(settings)?;
    fs::write(&path, json).map_err(|source| SettingsError::Write {
        path: path.clone(),
        source,
    })?;
    info!("Saved settings to {}", path.display());
    Ok(())
}
