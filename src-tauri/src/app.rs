use std::io;
use std::sync::Arc;

use serde_json::json;
use tauri::{App, AppHandle, Builder, Emitter, Manager, RunEvent, Wry};
use tauri_plugin_store::{Store, StoreExt};

use crate::commands;
use crate::engine::{ModelSetup, VoiceEngine};
use crate::model_cache::{AssetManifest, DirAssets, VersionStore, ABSENT_VERSION, VERSION_KEY};
use crate::permission::MicPermission;
use crate::settings::{fallback_cache_dir, fallback_settings_path, Settings};
use crate::voice::{Credentials, VoiceSdk};

pub(crate) const PREFS_STORE: &str = "AppPrefs.json";
pub(crate) const MIC_GRANTED_KEY: &str = "micPermissionGranted";
const MODELS_RESOURCE_DIR: &str = "models";

pub const PERMISSION_EVENT: &str = "request-mic-permission";
pub const VOICE_EVENT: &str = "voice-event";
pub const STATUS_EVENT: &str = "voice-status";

/// Runs the single-screen host with the given SDK. The caller supplies the
/// context from `tauri::generate_context!()`.
pub fn run<S: VoiceSdk + 'static>(context: tauri::Context<Wry>, sdk: S) {
    let settings = Settings::load_or_default(fallback_settings_path());
    let log_level = settings.trace_level.log_filter();

    let app = Builder::default()
        .plugin(
            tauri_plugin_log::Builder::new()
                .targets([
                    tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::Stdout),
                    tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::LogDir {
                        file_name: None,
                    }),
                ])
                .rotation_strategy(tauri_plugin_log::RotationStrategy::KeepAll)
                .max_file_size(2_000_000)
                .timezone_strategy(tauri_plugin_log::TimezoneStrategy::UseLocal)
                .level(log_level)
                .build(),
        )
        .plugin(tauri_plugin_store::Builder::default().build())
        .setup(move |app| setup(app, sdk, settings))
        .invoke_handler(tauri::generate_handler![
            commands::voice_status,
            commands::model_cache_progress,
            commands::mic_permission_result,
            commands::activate_voice
        ])
        .build(context)
        .expect("error while running tauri application");

    app.run(handle_run_event);
}

fn handle_run_event(app_handle: &AppHandle, event: RunEvent) {
    if let RunEvent::Exit = event {
        if let Some(engine) = app_handle.try_state::<Arc<VoiceEngine>>() {
            engine.shutdown();
        }
    }
}

fn setup<S: VoiceSdk + 'static>(
    app: &mut App,
    sdk: S,
    settings: Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = app.handle().clone();
    let prefs = handle.store(PREFS_STORE)?;

    let models = ModelSetup {
        manifest: AssetManifest::default(),
        cache_dir: handle.path().app_cache_dir().unwrap_or_else(|err| {
            log::warn!("No app cache dir ({err}); falling back to the user cache dir");
            fallback_cache_dir()
        }),
        assets: Box::new(DirAssets::new(
            handle.path().resource_dir()?.join(MODELS_RESOURCE_DIR),
        )),
        versions: Box::new(StorePrefs::new(prefs.clone())),
        app_version: version_code(&handle),
    };

    let (engine, events) = VoiceEngine::new(sdk, models, settings);
    let engine = Arc::new(engine.with_credentials(Credentials::from_env()));
    app.manage(engine.clone());

    let dispatcher = engine.clone();
    let emit_handle = handle.clone();
    std::thread::spawn(move || {
        dispatcher.run_dispatch(events, |event| {
            if let Err(err) = emit_handle.emit(VOICE_EVENT, event) {
                log::error!("Failed to emit {VOICE_EVENT}: {err}");
            }
        });
    });

    let permission = host_permission(&handle, prefs);
    std::thread::spawn(move || {
        let status = engine.on_create(permission.as_ref());
        if let Err(err) = handle.emit(STATUS_EVENT, status) {
            log::error!("Failed to emit {STATUS_EVENT}: {err}");
        }
    });

    Ok(())
}

/// Android-style integer version code derived from the semantic version.
fn version_code(app: &AppHandle) -> i64 {
    let version = &app.package_info().version;
    let code = version.major * 1_000_000 + version.minor * 1_000 + version.patch;
    i64::try_from(code).unwrap_or(i64::MAX)
}

/// Version marker kept in the app's persisted store.
struct StorePrefs {
    store: Arc<Store<Wry>>,
}

impl StorePrefs {
    fn new(store: Arc<Store<Wry>>) -> Self {
        Self { store }
    }
}

impl VersionStore for StorePrefs {
    fn get(&self) -> Option<i64> {
        self.store
            .get(VERSION_KEY)
            .and_then(|v| v.as_i64())
            .filter(|v| *v != ABSENT_VERSION)
    }

    fn set(&mut self, version: i64) -> io::Result<()> {
        self.store.set(VERSION_KEY, json!(version));
        self.store.save().map_err(io::Error::other)
    }
}

#[cfg(any(target_os = "android", target_os = "ios"))]
fn host_permission(app: &AppHandle, prefs: Arc<Store<Wry>>) -> Box<dyn MicPermission + Send> {
    Box::new(FrontendPermission {
        app: app.clone(),
        prefs,
    })
}

#[cfg(not(any(target_os = "android", target_os = "ios")))]
fn host_permission(_app: &AppHandle, _prefs: Arc<Store<Wry>>) -> Box<dyn MicPermission + Send> {
    Box::new(crate::permission::AlwaysGranted)
}

/// Mobile hosts ask the webview to run the OS prompt; the answer comes back
/// through `mic_permission_result`.
#[cfg(any(target_os = "android", target_os = "ios"))]
struct FrontendPermission {
    app: AppHandle,
    prefs: Arc<Store<Wry>>,
}

#[cfg(any(target_os = "android", target_os = "ios"))]
impl MicPermission for FrontendPermission {
    fn status(&self) -> crate::permission::PermissionStatus {
        use crate::permission::PermissionStatus;

        match self.prefs.get(MIC_GRANTED_KEY).and_then(|v| v.as_bool()) {
            Some(true) => PermissionStatus::Granted,
            Some(false) => PermissionStatus::Denied,
            None => PermissionStatus::Undetermined,
        }
    }

    fn request(&self, request_code: u32) {
        if let Err(err) = self.app.emit(PERMISSION_EVENT, request_code) {
            log::error!("Failed to emit {PERMISSION_EVENT}: {err}");
        }
    }
}
