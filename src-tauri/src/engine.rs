//! High-level voice engine facade: model caching, SDK construction and event
//! dispatch for a single-screen host.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::model_cache::{
    AssetManifest, AssetSource, CacheOutcome, CacheProgress, ModelCache, VersionStore,
};
use crate::permission::{MicPermission, PermissionStatus, AUDIO_PERMISSION_REQUEST};
use crate::settings::Settings;
use crate::voice::{
    event_channel, Classification, Credentials, Dialogue, EventReceiver, EventSender, ModelPaths,
    NaturalLanguage, NluConfig, PipelineConfig, Reaction, SpeechPipeline, SynthesisRequest,
    TextToSpeech, TtsConfig, VoiceError, VoiceEvent, VoiceSdk,
};

const DISPATCH_POLL: Duration = Duration::from_millis(100);

/// Where the bundled models come from and where they are cached.
pub struct ModelSetup {
    pub manifest: AssetManifest,
    pub cache_dir: PathBuf,
    pub assets: Box<dyn AssetSource + Send + Sync>,
    pub versions: Box<dyn VersionStore + Send>,
    pub app_version: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStatus {
    pub models_ready: bool,
    pub cache_outcome: Option<CacheOutcome>,
    pub pipeline_running: bool,
    pub nlu_ready: bool,
    pub tts_ready: bool,
    pub last_error: Option<String>,
    pub cache_progress: CacheProgress,
}

pub struct VoiceEngine {
    sdk: Box<dyn VoiceSdk>,
    settings: Settings,
    credentials: Option<Credentials>,
    dialogue: Dialogue,
    cache: ModelCache,
    assets: Box<dyn AssetSource + Send + Sync>,
    versions: Mutex<Box<dyn VersionStore + Send>>,
    app_version: i64,
    events: EventSender,
    models: Mutex<Option<CacheOutcome>>,
    pipeline: Mutex<Option<Box<dyn SpeechPipeline>>>,
    nlu: Mutex<Option<Box<dyn NaturalLanguage>>>,
    tts: Mutex<Option<Box<dyn TextToSpeech>>>,
    last_error: Mutex<Option<String>>,
    running: AtomicBool,
}

impl VoiceEngine {
    /// Returns the engine and the receiving end of its SDK event stream.
    pub fn new<S: VoiceSdk + 'static>(
        sdk: S,
        models: ModelSetup,
        settings: Settings,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = event_channel();
        let cache = ModelCache::new(models.manifest, &models.cache_dir)
            .with_policy(settings.cache_policy());
        let dialogue = Dialogue::new(settings.tts_voice.clone());

        let engine = Self {
            sdk: Box::new(sdk),
            settings,
            credentials: None,
            dialogue,
            cache,
            assets: models.assets,
            versions: Mutex::new(models.versions),
            app_version: models.app_version,
            events,
            models: Mutex::new(None),
            pipeline: Mutex::new(None),
            nlu: Mutex::new(None),
            tts: Mutex::new(None),
            last_error: Mutex::new(None),
            running: AtomicBool::new(true),
        };
        (engine, receiver)
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn model_cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn event_sender(&self) -> EventSender {
        self.events.clone()
    }

    /// Start-up path of the host screen. Models are cached before anything
    /// that reads them is built; the pipeline additionally needs the mic.
    pub fn on_create(&self, permission: &dyn MicPermission) -> EngineStatus {
        let start = Instant::now();
        log::info!("Voice engine starting for app version {}", self.app_version);

        let models = self.ensure_models();

        let has_pipeline = lock(&self.pipeline)
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        if !has_pipeline {
            match permission.status() {
                PermissionStatus::Granted if models.is_err() => {
                    log::warn!("Voice models unavailable; voice control disabled");
                }
                PermissionStatus::Granted => {
                    if let Err(err) = self.build_pipeline() {
                        self.record_failure("speech pipeline", &err);
                    }
                }
                status => {
                    log::info!("Microphone permission is {status:?}; requesting it");
                    permission.request(AUDIO_PERMISSION_REQUEST);
                }
            }
        }

        match models {
            Ok(_) => {
                if let Err(err) = self.build_nlu() {
                    self.record_failure("NLU", &err);
                }
            }
            Err(_) => log::warn!("Voice models unavailable; NLU disabled"),
        }

        if let Err(err) = self.build_or_prepare_tts() {
            self.record_failure("TTS", &err);
        }

        log::info!("Voice engine start-up finished in {:?}", start.elapsed());
        self.status()
    }

    /// Answer to a permission request issued by [`Self::on_create`].
    pub fn on_permission_result(&self, request_code: u32, granted: bool) {
        if request_code != AUDIO_PERMISSION_REQUEST {
            log::debug!("Ignoring permission result for request code {request_code}");
            return;
        }

        if granted {
            if let Err(err) = self.build_pipeline() {
                self.record_failure("speech pipeline", &err);
            }
        } else {
            log::warn!("Record permission not granted; voice control disabled!");
        }
    }

    pub fn ensure_models(&self) -> Result<CacheOutcome, VoiceError> {
        let mut versions = lock(&self.versions)?;
        let start = Instant::now();

        match self.cache.ensure(self.app_version, &*self.assets, &mut **versions) {
            Ok(outcome) => {
                log::info!(
                    "Voice models ready ({:?}) in {:?}",
                    outcome,
                    start.elapsed()
                );
                *lock(&self.models)? = Some(outcome);
                Ok(outcome)
            }
            Err(err) => {
                let message = err.to_string();
                log::error!("Failed to cache voice models: {message}");
                *lock(&self.models)? = None;
                self.set_last_error(err.user_message().to_string());
                Err(VoiceError::ModelsUnavailable(message))
            }
        }
    }

    fn require_models(&self) -> Result<(), VoiceError> {
        if lock(&self.models)?.is_some() {
            return Ok(());
        }
        self.ensure_models().map(|_| ())
    }

    pub fn build_pipeline(&self) -> Result<(), VoiceError> {
        self.require_models()?;

        let mut guard = lock(&self.pipeline)?;
        if guard.is_some() {
            return Ok(());
        }

        let paths = ModelPaths::for_cache(&self.cache);
        ModelPaths::verify(paths.wakeword())?;

        let config = PipelineConfig::new(&paths).with_profile(&self.settings.pipeline_profile);
        let mut pipeline = self.sdk.build_pipeline(&config, self.events.clone())?;
        pipeline.start()?;
        *guard = Some(pipeline);

        log::info!("Speech pipeline started with profile {}", config.profile);
        Ok(())
    }

    pub fn build_nlu(&self) -> Result<(), VoiceError> {
        self.require_models()?;

        let mut guard = lock(&self.nlu)?;
        if guard.is_some() {
            return Ok(());
        }

        let paths = ModelPaths::for_cache(&self.cache);
        ModelPaths::verify(paths.nlu())?;

        let config = NluConfig::new(&paths, self.settings.trace_level);
        *guard = Some(self.sdk.build_nlu(&config, self.events.clone())?);

        log::info!("NLU ready (trace level {:?})", self.settings.trace_level);
        Ok(())
    }

    /// Builds TTS once; on later calls re-prepares the existing instance so
    /// it can reattach to a recreated host surface.
    pub fn build_or_prepare_tts(&self) -> Result<(), VoiceError> {
        let mut guard = lock(&self.tts)?;

        if let Some(tts) = guard.as_mut() {
            log::debug!("Re-preparing existing TTS");
            return tts.prepare();
        }

        if self.credentials.is_none() {
            log::warn!("No synthesis credentials configured; TTS requests will likely fail");
        }

        let config = TtsConfig::new(self.credentials.clone(), self.settings.auto_playback)
            .with_voice(self.settings.tts_voice.clone());
        *guard = Some(self.sdk.build_tts(&config, self.events.clone())?);

        log::info!("TTS ready (automatic playback: {})", self.settings.auto_playback);
        Ok(())
    }

    pub fn activate(&self) -> Result<(), VoiceError> {
        let mut guard = lock(&self.pipeline)?;
        let pipeline = guard
            .as_mut()
            .ok_or_else(|| VoiceError::Sdk("speech pipeline is not running".to_string()))?;
        pipeline.activate();
        Ok(())
    }

    pub fn classify(&self, utterance: &str) -> Result<Classification, VoiceError> {
        let mut guard = lock(&self.nlu)?;
        let nlu = guard
            .as_mut()
            .ok_or_else(|| VoiceError::Sdk("NLU is not available".to_string()))?;
        nlu.classify(utterance)
    }

    pub fn synthesize(&self, request: SynthesisRequest) -> Result<(), VoiceError> {
        let mut guard = lock(&self.tts)?;
        let tts = guard
            .as_mut()
            .ok_or_else(|| VoiceError::Sdk("TTS is not available".to_string()))?;
        tts.synthesize(request)
    }

    pub fn handle_event(&self, event: VoiceEvent) {
        if let Reaction::Respond(request) = self.dialogue.react(&event) {
            if let Err(err) = self.synthesize(request) {
                log::warn!("Failed to synthesize response: {err}");
            }
        }
    }

    /// Handles whatever is queued without blocking; returns the count.
    pub fn dispatch_pending(&self, events: &EventReceiver) -> usize {
        let mut handled = 0;
        for event in events.try_iter() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Blocks handling events in emission order until [`Self::shutdown`] or
    /// until every sender is gone. `observe` sees each event first.
    pub fn run_dispatch<F>(&self, events: EventReceiver, mut observe: F)
    where
        F: FnMut(&VoiceEvent),
    {
        log::info!("Voice event dispatch started");
        while self.running.load(Ordering::Relaxed) {
            match events.recv_timeout(DISPATCH_POLL) {
                Ok(event) => {
                    observe(&event);
                    self.handle_event(event);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::info!("Voice event dispatch exiting");
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Ok(mut guard) = lock(&self.pipeline) {
            if let Some(mut pipeline) = guard.take() {
                pipeline.stop();
                log::info!("Speech pipeline stopped");
            }
        }
    }

    pub fn status(&self) -> EngineStatus {
        let cache_outcome = lock(&self.models).ok().and_then(|guard| *guard);
        let built = |present: Result<bool, VoiceError>| present.unwrap_or(false);

        EngineStatus {
            models_ready: cache_outcome.is_some(),
            cache_outcome,
            pipeline_running: built(lock(&self.pipeline).map(|g| g.is_some())),
            nlu_ready: built(lock(&self.nlu).map(|g| g.is_some())),
            tts_ready: built(lock(&self.tts).map(|g| g.is_some())),
            last_error: lock(&self.last_error).ok().and_then(|g| g.clone()),
            cache_progress: self.cache.progress().snapshot(),
        }
    }

    fn record_failure(&self, subsystem: &str, err: &VoiceError) {
        log::error!("Failed to build {subsystem}: {err}");
        self.set_last_error(err.user_message().to_string());
    }

    fn set_last_error(&self, message: String) {
        if let Ok(mut guard) = lock(&self.last_error) {
            *guard = Some(message);
        }
    }
}

impl Drop for VoiceEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, VoiceError> {
    mutex.lock().map_err(|_| VoiceError::LockFailed)
}
