use thiserror::Error;

use crate::model_cache::CacheError;
use crate::settings::SettingsError;
use crate::voice::VoiceError;

/// Unified app errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Model cache: {0}")]
    Cache(#[from] CacheError),

    #[error("Voice: {0}")]
    Voice(#[from] VoiceError),

    #[error("Settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Host: {0}")]
    Host(String),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Cache(err) => err.user_message(),
            Self::Voice(err) => err.user_message(),
            Self::Settings(_) => "The app settings could not be loaded. Defaults are in use.",
            Self::Host(_) => "The app failed to start. Please restart it.",
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
