use std::collections::BTreeMap;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};

/// Speech pipeline events, in the order the pipeline emits them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpeechEvent {
    Activate,
    Deactivate,
    Recognize(String),
    PartialRecognize(String),
    Timeout,
    Error(String),
    Trace(String),
}

/// Result of intent classification for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: String,
    pub confidence: f32,
    #[serde(default)]
    pub slots: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TtsEvent {
    Error(String),
    /// Synthesized audio is ready at the given locator.
    AudioAvailable(String),
    PlaybackComplete,
}

/// Verbosity of SDK trace output. Discriminants are the SDK's wire values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    #[default]
    Debug = 10,
    Perf = 20,
    Info = 30,
    Warn = 50,
    Error = 80,
    None = 100,
}

impl TraceLevel {
    pub fn value(self) -> i64 {
        self as i64
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            10 => Some(Self::Debug),
            20 => Some(Self::Perf),
            30 => Some(Self::Info),
            50 => Some(Self::Warn),
            80 => Some(Self::Error),
            100 => Some(Self::None),
            _ => None,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "perf" => Some(Self::Perf),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "none" => Some(Self::None),
            other => other.parse().ok().and_then(Self::from_value),
        }
    }

    /// Log level SDK trace messages at this level are written with.
    pub fn log_level(self) -> log::Level {
        match self {
            Self::Error => log::Level::Error,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
            Self::Debug => log::Level::Debug,
            Self::Perf | Self::None => log::Level::Trace,
        }
    }

    /// Most verbose host log filter that still shows everything the SDK emits
    /// at this trace level.
    pub fn log_filter(self) -> log::LevelFilter {
        match self {
            Self::None => log::LevelFilter::Info,
            level => level.log_level().to_level_filter().max(log::LevelFilter::Info),
        }
    }
}

/// Everything the SDK reports, multiplexed onto one ordered stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum VoiceEvent {
    Speech { event: SpeechEvent },
    Classification { result: Classification },
    Tts { event: TtsEvent },
    Trace { level: TraceLevel, message: String },
}

impl From<SpeechEvent> for VoiceEvent {
    fn from(event: SpeechEvent) -> Self {
        Self::Speech { event }
    }
}

impl From<TtsEvent> for VoiceEvent {
    fn from(event: TtsEvent) -> Self {
        Self::Tts { event }
    }
}

impl From<Classification> for VoiceEvent {
    fn from(result: Classification) -> Self {
        Self::Classification { result }
    }
}

pub type EventSender = mpsc::Sender<VoiceEvent>;
pub type EventReceiver = mpsc::Receiver<VoiceEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel()
}
