use std::sync::Arc;

use serde_json::json;
use tauri::{AppHandle, State};
use tauri_plugin_store::StoreExt;

use crate::app::{MIC_GRANTED_KEY, PREFS_STORE};
use crate::engine::{EngineStatus, VoiceEngine};
use crate::model_cache::CacheProgress;

#[tauri::command]
pub fn voice_status(engine: State<'_, Arc<VoiceEngine>>) -> EngineStatus {
    engine.status()
}

#[tauri::command]
pub fn model_cache_progress(engine: State<'_, Arc<VoiceEngine>>) -> CacheProgress {
    engine.model_cache().progress().snapshot()
}

#[tauri::command]
pub fn mic_permission_result(
    app: AppHandle,
    engine: State<'_, Arc<VoiceEngine>>,
    request_code: u32,
    granted: bool,
) -> Result<(), String> {
    log::info!("Tauri command mic_permission_result invoked: granted={granted}");

    let prefs = app
        .store(PREFS_STORE)
        .map_err(|e| format!("Failed to open prefs store: {e}"))?;
    prefs.set(MIC_GRANTED_KEY, json!(granted));
    if let Err(err) = prefs.save() {
        log::warn!("Failed to persist mic permission: {err}");
    }

    engine.on_permission_result(request_code, granted);
    Ok(())
}

#[tauri::command]
pub fn activate_voice(engine: State<'_, Arc<VoiceEngine>>) -> Result<(), String> {
    engine
        .activate()
        .map_err(|e| e.user_message().to_string())
}
