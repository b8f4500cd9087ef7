//! Seams to the external voice SDK. Wakeword, ASR, NLU and TTS live behind
//! these traits; this crate only configures them and consumes their events.

use serde::Serialize;

use super::config::{NluConfig, PipelineConfig, TtsConfig};
use super::events::{Classification, EventSender};
use super::VoiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    #[default]
    Text,
    Ssml,
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub mode: SynthesisMode,
    pub voice: Option<String>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: SynthesisMode::Text,
            voice: None,
        }
    }

    pub fn with_mode(mut self, mode: SynthesisMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }
}

/// Wakeword + ASR pipeline. Emits [`SpeechEvent`](super::SpeechEvent)s.
pub trait SpeechPipeline: Send {
    fn start(&mut self) -> Result<(), VoiceError>;
    fn stop(&mut self);
    /// Skips the wakeword and starts listening immediately.
    fn activate(&mut self);
}

pub trait NaturalLanguage: Send {
    fn classify(&mut self, utterance: &str) -> Result<Classification, VoiceError>;
}

pub trait TextToSpeech: Send {
    fn synthesize(&mut self, request: SynthesisRequest) -> Result<(), VoiceError>;
    /// Re-acquires playback resources after the host surface was recreated.
    fn prepare(&mut self) -> Result<(), VoiceError>;
}

/// Factory for the SDK subsystems. Every subsystem reports on `events`.
pub trait VoiceSdk: Send + Sync {
    fn build_pipeline(
        &self,
        config: &PipelineConfig,
        events: EventSender,
    ) -> Result<Box<dyn SpeechPipeline>, VoiceError>;

    fn build_nlu(
        &self,
        config: &NluConfig,
        events: EventSender,
    ) -> Result<Box<dyn NaturalLanguage>, VoiceError>;

    fn build_tts(
        &self,
        config: &TtsConfig,
        events: EventSender,
    ) -> Result<Box<dyn TextToSpeech>, VoiceError>;
}
