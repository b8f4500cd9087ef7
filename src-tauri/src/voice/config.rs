use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use crate::model_cache::{
    ModelCache, NLU_METADATA, NLU_MODEL, WAKE_DETECT_MODEL, WAKE_ENCODE_MODEL, WAKE_FILTER_MODEL,
    WORDPIECE_VOCAB,
};
use crate::voice::{TraceLevel, VoiceError};

pub const WAKEWORD_PROFILE: &str = "io.spokestack.spokestack.profile.TFWakewordAndroidASR";
pub const TTS_SERVICE_CLASS: &str = "io.spokestack.spokestack.tts.SpokestackTTSService";
pub const TTS_OUTPUT_CLASS: &str = "io.spokestack.spokestack.tts.SpokestackTTSOutput";

pub const WAKE_DETECT_PATH: &str = "wake-detect-path";
pub const WAKE_ENCODE_PATH: &str = "wake-encode-path";
pub const WAKE_FILTER_PATH: &str = "wake-filter-path";
pub const NLU_MODEL_PATH: &str = "nlu-model-path";
pub const NLU_METADATA_PATH: &str = "nlu-metadata-path";
pub const WORDPIECE_VOCAB_PATH: &str = "wordpiece-vocab-path";
pub const TRACE_LEVEL: &str = "trace-level";
pub const CLIENT_ID: &str = "spokestack-id";
pub const CLIENT_SECRET: &str = "spokestack-secret";

const CLIENT_ID_ENV: &str = "VOICE_CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "VOICE_CLIENT_SECRET";

/// Cached model locations handed to the SDK builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub wake_detect: PathBuf,
    pub wake_encode: PathBuf,
    pub wake_filter: PathBuf,
    pub nlu_model: PathBuf,
    pub nlu_metadata: PathBuf,
    pub wordpiece_vocab: PathBuf,
}

impl ModelPaths {
    pub fn in_dir<P: AsRef<Path>>(cache_dir: P) -> Self {
        let dir = cache_dir.as_ref();
        Self {
            wake_detect: dir.join(WAKE_DETECT_MODEL),
            wake_encode: dir.join(WAKE_ENCODE_MODEL),
            wake_filter: dir.join(WAKE_FILTER_MODEL),
            nlu_model: dir.join(NLU_MODEL),
            nlu_metadata: dir.join(NLU_METADATA),
            wordpiece_vocab: dir.join(WORDPIECE_VOCAB),
        }
    }

    pub fn for_cache(cache: &ModelCache) -> Self {
        Self::in_dir(cache.cache_dir())
    }

    pub fn wakeword(&self) -> [&Path; 3] {
        [&self.wake_detect, &self.wake_encode, &self.wake_filter]
    }

    pub fn nlu(&self) -> [&Path; 3] {
        [&self.nlu_model, &self.nlu_metadata, &self.wordpiece_vocab]
    }

    /// Fails on the first path that is not a readable regular file.
    pub fn verify<'a, I>(paths: I) -> Result<(), VoiceError>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        for path in paths {
            if !path.is_file() {
                return Err(VoiceError::MissingModel(path.to_path_buf()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Text(String),
    Int(i64),
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

impl From<&Path> for Property {
    fn from(path: &Path) -> Self {
        Self::Text(path.display().to_string())
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for Property {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

pub type Properties = BTreeMap<&'static str, Property>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub profile: String,
    pub properties: Properties,
}

impl PipelineConfig {
    pub fn new(paths: &ModelPaths) -> Self {
        let mut properties = Properties::new();
        properties.insert(WAKE_DETECT_PATH, paths.wake_detect.as_path().into());
        properties.insert(WAKE_ENCODE_PATH, paths.wake_encode.as_path().into());
        properties.insert(WAKE_FILTER_PATH, paths.wake_filter.as_path().into());

        Self {
            profile: WAKEWORD_PROFILE.to_string(),
            properties,
        }
    }

    pub fn with_profile(mut self, profile: &str) -> Self {
        self.profile = profile.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NluConfig {
    pub properties: Properties,
}

impl NluConfig {
    pub fn new(paths: &ModelPaths, trace_level: TraceLevel) -> Self {
        let mut properties = Properties::new();
        properties.insert(NLU_MODEL_PATH, paths.nlu_model.as_path().into());
        properties.insert(NLU_METADATA_PATH, paths.nlu_metadata.as_path().into());
        properties.insert(WORDPIECE_VOCAB_PATH, paths.wordpiece_vocab.as_path().into());
        properties.insert(TRACE_LEVEL, trace_level.value().into());

        Self { properties }
    }

    pub fn trace_level(&self) -> Option<TraceLevel> {
        match self.properties.get(TRACE_LEVEL) {
            Some(Property::Int(value)) => TraceLevel::from_value(*value),
            _ => None,
        }
    }
}

/// Service credentials for the hosted synthesis service.
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self::new(&self.client_id, self.expose_secret())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

impl Credentials {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: SecretString::from(client_secret.to_string()),
        }
    }

    pub fn from_env() -> Option<Self> {
        let id = std::env::var(CLIENT_ID_ENV).ok()?;
        let secret = std::env::var(CLIENT_SECRET_ENV).ok()?;
        if id.trim().is_empty() || secret.trim().is_empty() {
            log::warn!("{CLIENT_ID_ENV}/{CLIENT_SECRET_ENV} are set but empty; ignoring");
            return None;
        }
        Some(Self::new(id.trim(), secret.trim()))
    }

    pub fn expose_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }
}

#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub service_class: String,
    /// Output component for automatic playback; `None` leaves playback to
    /// whoever handles [`TtsEvent::AudioAvailable`](crate::voice::TtsEvent).
    pub output_class: Option<String>,
    pub credentials: Option<Credentials>,
    pub voice: Option<String>,
}

impl TtsConfig {
    pub fn new(credentials: Option<Credentials>, auto_playback: bool) -> Self {
        Self {
            service_class: TTS_SERVICE_CLASS.to_string(),
            output_class: auto_playback.then(|| TTS_OUTPUT_CLASS.to_string()),
            credentials,
            voice: None,
        }
    }

    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }

    /// Builder properties, credentials included. Never log the result.
    pub fn properties(&self) -> Properties {
        let mut properties = Properties::new();
        if let Some(credentials) = &self.credentials {
            properties.insert(CLIENT_ID, credentials.client_id.as_str().into());
            properties.insert(CLIENT_SECRET, credentials.expose_secret().into());
        }
        properties
    }
}
