pub mod config;
mod dialogue;
mod events;
mod sdk;

use std::path::PathBuf;

use thiserror::Error;

pub use config::{Credentials, ModelPaths, NluConfig, PipelineConfig, Property, TtsConfig};
pub use dialogue::{Dialogue, Reaction};
pub use events::{
    event_channel, Classification, EventReceiver, EventSender, SpeechEvent, TraceLevel, TtsEvent,
    VoiceEvent,
};
pub use sdk::{
    NaturalLanguage, SpeechPipeline, SynthesisMode, SynthesisRequest, TextToSpeech, VoiceSdk,
};

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Voice models are unavailable: {0}")]
    ModelsUnavailable(String),
    #[error("Model file missing at {}", .0.display())]
    MissingModel(PathBuf),
    #[error("Voice SDK error: {0}")]
    Sdk(String),
    #[error("Voice engine lock poisoned")]
    LockFailed,
}

impl VoiceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ModelsUnavailable(_) | Self::MissingModel(_) => {
                "Voice models are not available. Voice control is disabled."
            }
            Self::Sdk(_) => "The voice engine reported an error. Try restarting the app.",
            Self::LockFailed => "The voice engine is busy. Please try again.",
        }
    }
}
