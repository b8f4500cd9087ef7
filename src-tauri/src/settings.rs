use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model_cache::{CachePolicy, PresenceCheck};
use crate::voice::config::WAKEWORD_PROFILE;
use crate::voice::TraceLevel;

const APP_DIR: &str = "voice-skeleton";
const SETTINGS_FILE: &str = "settings.json";
pub const ENV_PREFIX: &str = "VOICE_";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Settings file is not valid: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub trace_level: TraceLevel,
    pub model_check: PresenceCheck,
    pub record_version_on_first_run: bool,
    pub pipeline_profile: String,
    pub tts_voice: Option<String>,
    pub auto_playback: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            trace_level: TraceLevel::Debug,
            model_check: PresenceCheck::Manifest,
            record_version_on_first_run: true,
            pipeline_profile: WAKEWORD_PROFILE.to_string(),
            tts_voice: None,
            auto_playback: true,
        }
    }
}

impl Settings {
    /// Missing file means defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No settings at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let mut settings = Self::load(path).unwrap_or_else(|err| {
            log::warn!("Failed to load settings from {}: {err}", path.display());
            Self::default()
        });
        settings.apply_env_overrides(ENV_PREFIX);
        settings
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            presence: self.model_check,
            record_version_on_first_run: self.record_version_on_first_run,
        }
    }

    pub fn apply_env_overrides(&mut self, prefix: &str) {
        let env = |suffix: &str| std::env::var(format!("{prefix}{suffix}")).ok();
        let flag = |suffix: &str| {
            env(suffix).and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                other => {
                    log::warn!("Ignoring invalid {prefix}{suffix} value '{other}'");
                    None
                }
            })
        };

        if let Some(v) = env("TRACE_LEVEL") {
            match TraceLevel::parse(&v) {
                Some(level) => self.trace_level = level,
                None => log::warn!("Ignoring invalid {prefix}TRACE_LEVEL value '{v}'"),
            }
        }
        if let Some(v) = env("MODEL_CHECK") {
            match v.trim().to_ascii_lowercase().as_str() {
                "sentinel" => self.model_check = PresenceCheck::Sentinel,
                "manifest" => self.model_check = PresenceCheck::Manifest,
                _ => log::warn!("Ignoring invalid {prefix}MODEL_CHECK value '{v}'"),
            }
        }
        if let Some(v) = flag("RECORD_VERSION_ON_FIRST_RUN") {
            self.record_version_on_first_run = v;
        }
        if let Some(v) = env("TTS_VOICE") {
            let v = v.trim();
            self.tts_voice = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = flag("AUTO_PLAYBACK") {
            self.auto_playback = v;
        }
    }
}

pub fn fallback_settings_path() -> PathBuf {
    base_dir(dirs_next::config_dir()).join(SETTINGS_FILE)
}

pub fn fallback_cache_dir() -> PathBuf {
    base_dir(dirs_next::cache_dir()).join("models")
}

fn base_dir(platform_dir: Option<PathBuf>) -> PathBuf {
    platform_dir
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
