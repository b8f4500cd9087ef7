use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use voice_skeleton_lib::engine::{ModelSetup, VoiceEngine};
use voice_skeleton_lib::model_cache::{
    AssetManifest, CacheOutcome, MemoryAssets, MemoryVersionStore, WAKE_ENCODE_MODEL,
};
use voice_skeleton_lib::permission::{MicPermission, PermissionStatus, AUDIO_PERMISSION_REQUEST};
use voice_skeleton_lib::settings::Settings;
use voice_skeleton_lib::voice::config::WAKE_FILTER_PATH;
use voice_skeleton_lib::voice::{
    Classification, Credentials, EventReceiver, EventSender, NaturalLanguage, NluConfig,
    PipelineConfig, SpeechEvent, SpeechPipeline, SynthesisRequest, TextToSpeech, TtsConfig,
    TtsEvent, VoiceError, VoiceEvent, VoiceSdk,
};

#[derive(Default)]
struct Journal {
    pipelines_built: usize,
    pipeline_starts: usize,
    pipeline_stops: usize,
    activations: usize,
    nlu_built: usize,
    tts_built: usize,
    tts_prepared: usize,
    tts_had_credentials: bool,
    filter_path: Option<String>,
    spoken: Vec<String>,
}

#[derive(Clone, Default)]
struct FakeSdk {
    journal: Arc<Mutex<Journal>>,
    fail_pipeline: bool,
}

impl FakeSdk {
    fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }
}

struct FakePipeline {
    journal: Arc<Mutex<Journal>>,
    events: EventSender,
}

impl SpeechPipeline for FakePipeline {
    fn start(&mut self) -> Result<(), VoiceError> {
        self.journal.lock().unwrap().pipeline_starts += 1;
        let _ = self.events.send(SpeechEvent::Activate.into());
        Ok(())
    }

    fn stop(&mut self) {
        self.journal.lock().unwrap().pipeline_stops += 1;
    }

    fn activate(&mut self) {
        self.journal.lock().unwrap().activations += 1;
    }
}

struct FakeNlu;

impl NaturalLanguage for FakeNlu {
    fn classify(&mut self, utterance: &str) -> Result<Classification, VoiceError> {
        Ok(Classification {
            intent: if utterance.contains("hello") {
                "greet".to_string()
            } else {
                "unknown".to_string()
            },
            confidence: 0.9,
            slots: BTreeMap::new(),
        })
    }
}

struct FakeTts {
    journal: Arc<Mutex<Journal>>,
    events: EventSender,
}

impl TextToSpeech for FakeTts {
    fn synthesize(&mut self, request: SynthesisRequest) -> Result<(), VoiceError> {
        self.journal.lock().unwrap().spoken.push(request.text);
        let _ = self
            .events
            .send(TtsEvent::AudioAvailable("file:///tmp/reply.mp3".to_string()).into());
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), VoiceError> {
        self.journal.lock().unwrap().tts_prepared += 1;
        Ok(())
    }
}

impl VoiceSdk for FakeSdk {
    fn build_pipeline(
        &self,
        config: &PipelineConfig,
        events: EventSender,
    ) -> Result<Box<dyn SpeechPipeline>, VoiceError> {
        if self.fail_pipeline {
            return Err(VoiceError::Sdk("no audio device".to_string()));
        }
        let mut journal = self.journal();
        journal.pipelines_built += 1;
        journal.filter_path = config.properties.get(WAKE_FILTER_PATH).map(|p| p.to_string());
        Ok(Box::new(FakePipeline {
            journal: self.journal.clone(),
            events,
        }))
    }

    fn build_nlu(
        &self,
        _config: &NluConfig,
        _events: EventSender,
    ) -> Result<Box<dyn NaturalLanguage>, VoiceError> {
        self.journal().nlu_built += 1;
        Ok(Box::new(FakeNlu))
    }

    fn build_tts(
        &self,
        config: &TtsConfig,
        events: EventSender,
    ) -> Result<Box<dyn TextToSpeech>, VoiceError> {
        let mut journal = self.journal();
        journal.tts_built += 1;
        journal.tts_had_credentials = config.credentials.is_some();
        Ok(Box::new(FakeTts {
            journal: self.journal.clone(),
            events,
        }))
    }
}

struct FakePermission {
    status: PermissionStatus,
    requests: RefCell<Vec<u32>>,
}

impl FakePermission {
    fn new(status: PermissionStatus) -> Self {
        Self {
            status,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl MicPermission for FakePermission {
    fn status(&self) -> PermissionStatus {
        self.status
    }

    fn request(&self, request_code: u32) {
        self.requests.borrow_mut().push(request_code);
    }
}

fn bundled_assets() -> MemoryAssets {
    let mut assets = MemoryAssets::new();
    for name in AssetManifest::default().files() {
        assets.insert(name, format!("{name}-bytes").into_bytes());
    }
    assets
}

fn engine_with(
    sdk: FakeSdk,
    assets: MemoryAssets,
    cache_dir: &Path,
) -> (VoiceEngine, EventReceiver) {
    let models = ModelSetup {
        manifest: AssetManifest::default(),
        cache_dir: cache_dir.to_path_buf(),
        assets: Box::new(assets),
        versions: Box::new(MemoryVersionStore::default()),
        app_version: 3,
    };
    VoiceEngine::new(sdk, models, Settings::default())
}

#[test]
fn granted_permission_builds_every_subsystem_after_caching_models() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk::default();
    let (engine, _events) = engine_with(sdk.clone(), bundled_assets(), dir.path());
    let permission = FakePermission::new(PermissionStatus::Granted);

    let status = engine.on_create(&permission);

    assert!(status.models_ready);
    assert_eq!(status.cache_outcome, Some(CacheOutcome::Populated));
    assert!(status.pipeline_running);
    assert!(status.nlu_ready);
    assert!(status.tts_ready);
    assert!(status.last_error.is_none());
    assert!(permission.requests.borrow().is_empty());

    let journal = sdk.journal();
    assert_eq!(journal.pipelines_built, 1);
    assert_eq!(journal.pipeline_starts, 1);
    assert_eq!(journal.nlu_built, 1);
    assert_eq!(journal.tts_built, 1);
    assert_eq!(
        journal.filter_path.as_deref(),
        Some(dir.path().join("filter.lite").display().to_string().as_str())
    );
    for name in AssetManifest::default().files() {
        assert!(dir.path().join(name).is_file(), "{name} should be cached");
    }
}

#[test]
fn missing_permission_is_requested_and_pipeline_waits_for_it() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk::default();
    let (engine, _events) = engine_with(sdk.clone(), bundled_assets(), dir.path());
    let permission = FakePermission::new(PermissionStatus::Undetermined);

    let status = engine.on_create(&permission);

    assert_eq!(*permission.requests.borrow(), vec![AUDIO_PERMISSION_REQUEST]);
    assert!(!status.pipeline_running);
    assert!(status.nlu_ready);
    assert!(status.tts_ready);

    engine.on_permission_result(AUDIO_PERMISSION_REQUEST + 1, true);
    assert!(!engine.status().pipeline_running);

    engine.on_permission_result(AUDIO_PERMISSION_REQUEST, true);
    assert!(engine.status().pipeline_running);
    assert_eq!(sdk.journal().pipelines_built, 1);
}

#[test]
fn denied_permission_leaves_voice_control_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk::default();
    let (engine, _events) = engine_with(sdk.clone(), bundled_assets(), dir.path());

    engine.on_create(&FakePermission::new(PermissionStatus::Denied));
    engine.on_permission_result(AUDIO_PERMISSION_REQUEST, false);

    assert!(!engine.status().pipeline_running);
    assert_eq!(sdk.journal().pipelines_built, 0);
}

#[test]
fn unavailable_models_disable_pipeline_and_nlu_but_not_tts() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk::default();
    let mut assets = MemoryAssets::new();
    for name in AssetManifest::default().files() {
        if name != WAKE_ENCODE_MODEL {
            assets.insert(name, b"bytes".to_vec());
        }
    }
    let (engine, _events) = engine_with(sdk.clone(), assets, dir.path());

    let status = engine.on_create(&FakePermission::new(PermissionStatus::Granted));

    assert!(!status.models_ready);
    assert!(!status.pipeline_running);
    assert!(!status.nlu_ready);
    assert!(status.tts_ready);
    assert!(status.last_error.is_some());
    assert!(status.cache_progress.error.is_some());
    assert_eq!(sdk.journal().pipelines_built, 0);
    assert_eq!(sdk.journal().nlu_built, 0);

    let err = engine.build_pipeline().unwrap_err();
    assert!(matches!(err, VoiceError::ModelsUnavailable(_)));
    assert!(err.to_string().contains(WAKE_ENCODE_MODEL));
}

#[test]
fn pipeline_build_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk {
        fail_pipeline: true,
        ..FakeSdk::default()
    };
    let (engine, _events) = engine_with(sdk, bundled_assets(), dir.path());

    let status = engine.on_create(&FakePermission::new(PermissionStatus::Granted));

    assert!(status.models_ready);
    assert!(!status.pipeline_running);
    assert!(status.last_error.is_some());
}

#[test]
fn recognized_speech_is_answered_through_tts() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk::default();
    let (engine, events) = engine_with(sdk.clone(), bundled_assets(), dir.path());
    engine.on_create(&FakePermission::new(PermissionStatus::Granted));

    engine
        .event_sender()
        .send(SpeechEvent::Recognize("I am tired".to_string()).into())
        .unwrap();

    // activation from start(), the transcript, then the TTS audio event it triggers
    assert_eq!(engine.dispatch_pending(&events), 3);
    assert_eq!(sdk.journal().spoken, vec!["Why do you feel that I am tired?"]);
}

#[test]
fn recreating_the_screen_reprepares_tts_instead_of_rebuilding() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk::default();
    let (engine, _events) = engine_with(sdk.clone(), bundled_assets(), dir.path());
    let permission = FakePermission::new(PermissionStatus::Granted);

    engine.on_create(&permission);
    let status = engine.on_create(&permission);

    assert_eq!(status.cache_outcome, Some(CacheOutcome::UpToDate));
    let journal = sdk.journal();
    assert_eq!(journal.pipelines_built, 1);
    assert_eq!(journal.nlu_built, 1);
    assert_eq!(journal.tts_built, 1);
    assert_eq!(journal.tts_prepared, 1);
}

#[test]
fn credentials_reach_the_tts_builder() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk::default();
    let (engine, _events) = engine_with(sdk.clone(), bundled_assets(), dir.path());
    let engine = engine.with_credentials(Some(Credentials::new("id", "secret")));

    engine.on_create(&FakePermission::new(PermissionStatus::Granted));

    assert!(sdk.journal().tts_had_credentials);
}

#[test]
fn classify_and_activate_use_built_subsystems() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk::default();
    let (engine, _events) = engine_with(sdk.clone(), bundled_assets(), dir.path());

    assert!(engine.classify("hello").is_err());
    assert!(engine.activate().is_err());

    engine.on_create(&FakePermission::new(PermissionStatus::Granted));

    assert_eq!(engine.classify("hello there").unwrap().intent, "greet");
    engine.activate().unwrap();
    assert_eq!(sdk.journal().activations, 1);
}

#[test]
fn shutdown_stops_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk::default();
    let (engine, _events) = engine_with(sdk.clone(), bundled_assets(), dir.path());
    engine.on_create(&FakePermission::new(PermissionStatus::Granted));

    engine.shutdown();

    assert!(!engine.status().pipeline_running);
    assert_eq!(sdk.journal().pipeline_stops, 1);
}

#[test]
fn dispatch_thread_handles_events_in_order_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = FakeSdk::default();
    let (engine, events) = engine_with(sdk.clone(), bundled_assets(), dir.path());
    let engine = Arc::new(engine);
    engine.on_create(&FakePermission::new(PermissionStatus::Granted));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = {
        let engine = engine.clone();
        let seen = seen.clone();
        thread::spawn(move || {
            engine.run_dispatch(events, |event: &VoiceEvent| {
                seen.lock().unwrap().push(event.clone());
            })
        })
    };

    let sender = engine.event_sender();
    sender.send(SpeechEvent::Deactivate.into()).unwrap();
    sender
        .send(SpeechEvent::Recognize("it rains".to_string()).into())
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while sdk.journal().spoken.is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    engine.shutdown();
    dispatcher.join().unwrap();

    assert_eq!(sdk.journal().spoken, vec!["Why do you feel that it rains?"]);
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], VoiceEvent::from(SpeechEvent::Activate));
    assert_eq!(seen[1], VoiceEvent::from(SpeechEvent::Deactivate));
    assert_eq!(
        seen[2],
        VoiceEvent::from(SpeechEvent::Recognize("it rains".to_string()))
    );
}
