//! Microphone permission contract between the engine and its host.

use serde::Serialize;

/// Request code the engine tags its microphone request with.
pub const AUDIO_PERMISSION_REQUEST: u32 = 1337;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Never asked, or the user has to be asked again.
    Undetermined,
}

/// Host-side microphone permission. Requests are answered asynchronously
/// through [`VoiceEngine::on_permission_result`](crate::engine::VoiceEngine::on_permission_result).
pub trait MicPermission {
    fn status(&self) -> PermissionStatus;
    fn request(&self, request_code: u32);
}

/// Hosts without a runtime permission model, e.g. desktop.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl MicPermission for AlwaysGranted {
    fn status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn request(&self, _request_code: u32) {}
}
