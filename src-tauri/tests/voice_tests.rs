use std::collections::BTreeMap;
use std::path::Path;

use voice_skeleton_lib::voice::config::{
    CLIENT_ID, CLIENT_SECRET, NLU_METADATA_PATH, NLU_MODEL_PATH, TRACE_LEVEL, TTS_OUTPUT_CLASS,
    WAKEWORD_PROFILE, WAKE_DETECT_PATH, WAKE_ENCODE_PATH, WAKE_FILTER_PATH, WORDPIECE_VOCAB_PATH,
};
use voice_skeleton_lib::voice::{
    Classification, Credentials, Dialogue, ModelPaths, NluConfig, PipelineConfig, Property,
    Reaction, SpeechEvent, TraceLevel, TtsConfig, TtsEvent, VoiceError, VoiceEvent,
};

#[test]
fn pipeline_config_points_at_cached_wakeword_models() {
    let paths = ModelPaths::in_dir("/cache");
    let config = PipelineConfig::new(&paths);

    assert_eq!(config.profile, WAKEWORD_PROFILE);
    assert_eq!(
        config.properties.get(WAKE_DETECT_PATH),
        Some(&Property::Text(Path::new("/cache").join("detect.lite").display().to_string()))
    );
    assert_eq!(
        config.properties.get(WAKE_ENCODE_PATH).map(ToString::to_string),
        Some(Path::new("/cache").join("encode.lite").display().to_string())
    );
    assert_eq!(
        config.properties.get(WAKE_FILTER_PATH).map(ToString::to_string),
        Some(Path::new("/cache").join("filter.lite").display().to_string())
    );
    assert_eq!(config.properties.len(), 3);
}

#[test]
fn nlu_config_carries_paths_and_trace_level() {
    let paths = ModelPaths::in_dir("/cache");
    let config = NluConfig::new(&paths, TraceLevel::Debug);

    assert!(config.properties[NLU_MODEL_PATH]
        .to_string()
        .ends_with("nlu.tflite"));
    assert!(config.properties[NLU_METADATA_PATH]
        .to_string()
        .ends_with("metadata.json"));
    assert!(config.properties[WORDPIECE_VOCAB_PATH]
        .to_string()
        .ends_with("vocab.txt"));
    assert_eq!(config.properties[TRACE_LEVEL], Property::Int(10));
    assert_eq!(config.trace_level(), Some(TraceLevel::Debug));
}

#[test]
fn tts_config_exposes_credentials_only_through_properties() {
    let credentials = Credentials::new("client-id", "very-secret");
    let config = TtsConfig::new(Some(credentials.clone()), true);

    assert_eq!(config.output_class.as_deref(), Some(TTS_OUTPUT_CLASS));
    let properties = config.properties();
    assert_eq!(properties[CLIENT_ID], Property::Text("client-id".into()));
    assert_eq!(properties[CLIENT_SECRET], Property::Text("very-secret".into()));

    let debug = format!("{credentials:?}");
    assert!(debug.contains("client-id"));
    assert!(!debug.contains("very-secret"));
}

#[test]
fn tts_config_without_playback_or_credentials() {
    let config = TtsConfig::new(None, false);
    assert!(config.output_class.is_none());
    assert!(config.properties().is_empty());
}

#[test]
fn model_path_verification_names_first_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ModelPaths::in_dir(dir.path());
    std::fs::write(&paths.wake_detect, b"x").unwrap();

    let err = ModelPaths::verify(paths.wakeword()).unwrap_err();
    match err {
        VoiceError::MissingModel(path) => assert_eq!(path, paths.wake_encode),
        other => panic!("unexpected error: {other}"),
    }

    std::fs::write(&paths.wake_encode, b"x").unwrap();
    std::fs::write(&paths.wake_filter, b"x").unwrap();
    assert!(ModelPaths::verify(paths.wakeword()).is_ok());
}

#[test]
fn trace_levels_use_sdk_values() {
    assert_eq!(TraceLevel::Debug.value(), 10);
    assert_eq!(TraceLevel::Perf.value(), 20);
    assert_eq!(TraceLevel::Info.value(), 30);
    assert_eq!(TraceLevel::Warn.value(), 50);
    assert_eq!(TraceLevel::Error.value(), 80);
    assert_eq!(TraceLevel::None.value(), 100);
    assert_eq!(TraceLevel::from_value(50), Some(TraceLevel::Warn));
    assert_eq!(TraceLevel::from_value(42), None);
    assert_eq!(TraceLevel::parse("WARNING"), Some(TraceLevel::Warn));
    assert_eq!(TraceLevel::parse("80"), Some(TraceLevel::Error));
    assert_eq!(TraceLevel::parse("loud"), None);
}

#[test]
fn trace_levels_map_onto_log_levels() {
    assert_eq!(TraceLevel::Error.log_level(), log::Level::Error);
    assert_eq!(TraceLevel::Warn.log_level(), log::Level::Warn);
    assert_eq!(TraceLevel::Info.log_level(), log::Level::Info);
    assert_eq!(TraceLevel::Debug.log_level(), log::Level::Debug);
    assert_eq!(TraceLevel::Perf.log_level(), log::Level::Trace);
    assert_eq!(TraceLevel::Debug.log_filter(), log::LevelFilter::Debug);
    assert_eq!(TraceLevel::Error.log_filter(), log::LevelFilter::Info);
}

#[test]
fn recognized_transcript_gets_canned_response() {
    let dialogue = Dialogue::new(Some("demo-male".to_string()));
    let event = VoiceEvent::from(SpeechEvent::Recognize("the sky is green".to_string()));

    match dialogue.react(&event) {
        Reaction::Respond(request) => {
            assert_eq!(request.text, "Why do you feel that the sky is green?");
            assert_eq!(request.voice.as_deref(), Some("demo-male"));
        }
        Reaction::None => panic!("expected a response"),
    }
}

#[test]
fn other_events_are_only_logged() {
    let dialogue = Dialogue::default();
    let events = vec![
        VoiceEvent::from(SpeechEvent::Activate),
        VoiceEvent::from(SpeechEvent::Deactivate),
        VoiceEvent::from(SpeechEvent::PartialRecognize("the sky".to_string())),
        VoiceEvent::from(SpeechEvent::Recognize("   ".to_string())),
        VoiceEvent::from(SpeechEvent::Timeout),
        VoiceEvent::from(SpeechEvent::Error("mic busy".to_string())),
        VoiceEvent::from(SpeechEvent::Trace("vad on".to_string())),
        VoiceEvent::from(TtsEvent::AudioAvailable("file:///tmp/a.mp3".to_string())),
        VoiceEvent::from(TtsEvent::PlaybackComplete),
        VoiceEvent::from(TtsEvent::Error("quota".to_string())),
        VoiceEvent::from(Classification {
            intent: "greet".to_string(),
            confidence: 0.93,
            slots: BTreeMap::from([("name".to_string(), serde_json::json!("Ada"))]),
        }),
        VoiceEvent::Trace {
            level: TraceLevel::Info,
            message: "model loaded".to_string(),
        },
    ];

    for event in &events {
        assert_eq!(dialogue.react(event), Reaction::None, "{event:?}");
    }
}

#[test]
fn events_serialize_with_stable_tags() {
    let event = VoiceEvent::from(SpeechEvent::Recognize("hello".to_string()));
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["source"], "speech");
    assert_eq!(json["event"]["type"], "RECOGNIZE");
    assert_eq!(json["event"]["value"], "hello");

    let json = serde_json::to_value(VoiceEvent::from(TtsEvent::PlaybackComplete)).unwrap();
    assert_eq!(json["event"]["type"], "PLAYBACK_COMPLETE");
}

#[test]
fn voice_error_user_messages_are_not_empty() {
    let errors = [
        VoiceError::ModelsUnavailable("copy failed".to_string()),
        VoiceError::MissingModel("/cache/filter.lite".into()),
        VoiceError::Sdk("boom".to_string()),
        VoiceError::LockFailed,
    ];
    for err in errors {
        assert!(!err.to_string().is_empty());
        assert!(!err.user_message().is_empty());
    }
}
