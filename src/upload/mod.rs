//! Upload boundary
//!
//! The recorder hands finished recordings to an `Uploader` as
//! `(payload, mime type, extension, duration)` tuples. MP3 conversion
//! happens here, before the hand-off, and never loses a recording: a failed
//! conversion falls back to the original artifact with a notice.

mod batch;
mod import;
mod naming;

pub use batch::{prepare_batch, FinishedRecording, UploadBatch, UploadReceipt};
pub use import::{validate_import, ImportedAudio, IMPORT_LABEL, IMPORT_SIZE_LIMIT_MB};
pub use naming::{object_name, object_path, upload_timestamp};

use crate::error::UploadError;

/// Storage collaborator that receives finished recordings
#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    /// Store every recording of the batch; all or nothing from the
    /// recorder's point of view
    async fn upload(&self, batch: &UploadBatch) -> Result<UploadReceipt, UploadError>;

    /// Store an imported audio file as-is
    async fn upload_import(&self, import: &ImportedAudio) -> Result<UploadReceipt, UploadError>;
}
