use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct CacheProgress {
    pub file_index: usize,
    pub file_count: usize,
    pub copied_bytes: u64,
    pub total_bytes: u64,
    pub done: bool,
    pub error: Option<String>,
}

/// Shared view of the current model copy, readable from another thread.
#[derive(Clone, Debug, Default)]
pub struct ProgressTracker {
    state: Arc<Mutex<CacheProgress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start_tracking(&self, file_count: usize) {
        if let Ok(mut progress) = self.state.lock() {
            *progress = CacheProgress {
                file_count,
                ..CacheProgress::default()
            };
        }
    }

    pub(crate) fn set_file_index(&self, file_index: usize, total_bytes: u64) {
        if let Ok(mut progress) = self.state.lock() {
            progress.file_index = file_index;
            // bytes are per file
            progress.copied_bytes = 0;
            progress.total_bytes = total_bytes;
        }
    }

    pub(crate) fn update_copied_bytes(&self, copied: u64) {
        if let Ok(mut progress) = self.state.lock() {
            progress.copied_bytes = copied;
        }
    }

    pub(crate) fn mark_finished(&self) {
        if let Ok(mut progress) = self.state.lock() {
            progress.file_index = progress.file_count;
            progress.done = true;
        }
    }

    pub(crate) fn record_failure(&self, error: String) {
        if let Ok(mut progress) = self.state.lock() {
            progress.error = Some(error);
            progress.done = true;
        }
    }

    pub fn snapshot(&self) -> CacheProgress {
        self.state
            .lock()
            .map(|progress| progress.clone())
            .unwrap_or_default()
    }
}
