use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::upload::{object_name, object_path, FinishedRecording, ImportedAudio, IMPORT_LABEL};

/// Recording status once stored: captured recordings are complete,
/// imports still need processing
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_IN_PROGRESS: &str = "in_progress";

/// One stored audio object, published to NATS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingUploadMessage {
    pub user_id: String,
    /// `achievement`, `excuse`, or `x` for imported files
    pub label: String,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub extension: String,
    /// Seconds; unknown for imports
    pub duration: Option<u64>,
    pub status: String,
    pub payload: String, // Base64-encoded audio bytes
    pub timestamp: String,
}

impl RecordingUploadMessage {
    pub fn for_recording(user_id: &str, recording: &FinishedRecording, timestamp: &str) -> Self {
        Self::build(
            user_id,
            recording.channel.as_str(),
            timestamp,
            &recording.file_extension,
            recording.mime_type(),
            recording.payload(),
            Some(recording.duration_seconds),
            STATUS_SUCCESS,
        )
    }

    pub fn for_import(user_id: &str, import: &ImportedAudio, timestamp: &str) -> Self {
        Self::build(
            user_id,
            IMPORT_LABEL,
            timestamp,
            &import.file_extension,
            import.content_type(),
            import.payload(),
            None,
            STATUS_IN_PROGRESS,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        user_id: &str,
        label: &str,
        timestamp: &str,
        extension: &str,
        file_type: &str,
        payload: &[u8],
        duration: Option<u64>,
        status: &str,
    ) -> Self {
        let file_name = object_name(user_id, label, timestamp, extension);
        Self {
            user_id: user_id.to_string(),
            label: label.to_string(),
            file_path: object_path(user_id, &file_name),
            file_name,
            file_type: file_type.to_string(),
            extension: extension.to_string(),
            duration,
            status: status.to_string(),
            payload: base64::engine::general_purpose::STANDARD.encode(payload),
            timestamp: timestamp.to_string(),
        }
    }

    /// `<prefix>.<user>.<label>`
    pub fn subject(&self, prefix: &str) -> String {
        format!("{}.{}.{}", prefix, self.user_id, self.label)
    }
}
