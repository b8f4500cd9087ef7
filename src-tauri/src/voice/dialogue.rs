use super::events::{Classification, SpeechEvent, TraceLevel, TtsEvent, VoiceEvent};
use super::sdk::SynthesisRequest;

const LOG_TARGET: &str = "voice_skeleton::dialogue";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    None,
    Respond(SynthesisRequest),
}

/// Turns SDK events into log output and, for final transcripts, a reply.
#[derive(Debug, Clone, Default)]
pub struct Dialogue {
    voice: Option<String>,
}

impl Dialogue {
    pub fn new(voice: Option<String>) -> Self {
        Self { voice }
    }

    /// Parrots the utterance back as a question.
    pub fn response_for(&self, utterance: &str) -> SynthesisRequest {
        SynthesisRequest::new(format!("Why do you feel that {utterance}?"))
            .with_voice(self.voice.clone())
    }

    pub fn react(&self, event: &VoiceEvent) -> Reaction {
        match event {
            VoiceEvent::Speech { event } => self.on_speech(event),
            VoiceEvent::Classification { result } => {
                log_classification(result);
                Reaction::None
            }
            VoiceEvent::Tts { event } => {
                on_tts(event);
                Reaction::None
            }
            VoiceEvent::Trace { level, message } => {
                on_trace(*level, message);
                Reaction::None
            }
        }
    }

    fn on_speech(&self, event: &SpeechEvent) -> Reaction {
        match event {
            SpeechEvent::Activate => log::info!(target: LOG_TARGET, "Pipeline activated"),
            SpeechEvent::Deactivate => log::info!(target: LOG_TARGET, "Pipeline deactivated"),
            SpeechEvent::Recognize(transcript) => {
                let transcript = transcript.trim();
                if transcript.is_empty() {
                    log::debug!(target: LOG_TARGET, "Ignoring empty transcript");
                    return Reaction::None;
                }
                log::info!(target: LOG_TARGET, "Recognized: {transcript}");
                return Reaction::Respond(self.response_for(transcript));
            }
            SpeechEvent::PartialRecognize(transcript) => {
                log::debug!(target: LOG_TARGET, "Partial transcript: {transcript}")
            }
            SpeechEvent::Timeout => log::info!(target: LOG_TARGET, "ASR timeout"),
            SpeechEvent::Error(error) => log::warn!(target: LOG_TARGET, "ASR Error: {error}"),
            SpeechEvent::Trace(message) => log::warn!(target: LOG_TARGET, "TRACE: {message}"),
        }
        Reaction::None
    }
}

fn on_tts(event: &TtsEvent) {
    match event {
        TtsEvent::Error(error) => log::warn!(target: LOG_TARGET, "TTS error: {error}"),
        TtsEvent::AudioAvailable(uri) => log::info!(target: LOG_TARGET, "Audio received: {uri}"),
        TtsEvent::PlaybackComplete => log::info!(target: LOG_TARGET, "TTS playback complete"),
    }
}

fn on_trace(level: TraceLevel, message: &str) {
    log::log!(target: LOG_TARGET, level.log_level(), "{message}");
}

fn log_classification(result: &Classification) {
    let slots: Vec<&str> = result.slots.keys().map(String::as_str).collect();
    log::info!(
        target: LOG_TARGET,
        "Classified intent {} ({:.2}) slots=[{}]",
        result.intent,
        result.confidence,
        slots.join(", ")
    );
}
