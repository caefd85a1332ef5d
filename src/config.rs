use crate::constants::{
    APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, DEFAULT_SERVER_URL, LOG_FILE_NAME,
    SETTINGS_FILE_NAME,
};
use crate::error::AppError;
use crate::models::Theme;

use clap::Parser;
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Preview a YouTube link and fetch it as MP3 from a conversion server")]
pub struct Args {
    /// Base URL of the metadata/download server
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    pub server: Url,

    /// Directory downloaded files are written to, per default the user's Downloads folder
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Path of the settings file that remembers the theme
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Path to write the log to
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// How verbose the log should be, can be set up to 3 times. Has no effect if RUST_LOG is set
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            UserDirs::new()
                .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.config_dir().join(SETTINGS_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME))
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.data_dir().join(LOG_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
        })
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
}

/// Everything that survives a restart. Only the theme, for now.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
}

/// JSON file holding [`Settings`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files give the defaults.
    pub fn load(&self) -> Settings {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), "no settings loaded: {}", e);
                return Settings::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring corrupt settings file: {}", e);
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::Settings(e.to_string()))?;
            }
        }
        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Settings(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| AppError::Settings(e.to_string()))
    }
}
