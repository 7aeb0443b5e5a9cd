use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::channel::{ActiveChannel, Channel};
use super::config::{CaptureSettings, SessionContext};
use super::session::CaptureSession;
use super::state::SessionSnapshot;
use crate::audio::{AudioSink, CaptureBackend, HandleRegistry};
use crate::error::{CaptureError, ImportError, PlaybackError, UploadError};
use crate::transcode::{Transcoder, DEFAULT_BITRATE_KBPS};
use crate::upload::{
    prepare_batch, validate_import, FinishedRecording, ImportedAudio, UploadBatch, UploadReceipt, Uploader,
};

/// Two-channel recorder
///
/// Owns one `CaptureSession` per channel. The sessions share the capture
/// backend, the playback sink, the handle registry and the active-channel
/// token, so at most one of them is ever recording or paused.
pub struct Recorder {
    achievement: CaptureSession,
    excuse: CaptureSession,
    active: ActiveChannel,
    handles: HandleRegistry,
    transcoder: Transcoder,
    import: Mutex<Option<ImportedAudio>>,
}

/// Both channels plus the pending import, for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct RecorderSnapshot {
    pub active_channel: Option<Channel>,
    pub achievement: SessionSnapshot,
    pub excuse: SessionSnapshot,
    pub import: Option<ImportSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub name: String,
    pub content_type: String,
    pub bytes: usize,
}

impl Recorder {
    pub fn new(backend: Arc<dyn CaptureBackend>, sink: Arc<dyn AudioSink>, settings: CaptureSettings) -> Self {
        Self::with_transcoder(backend, sink, settings, Transcoder::lame(DEFAULT_BITRATE_KBPS))
    }

    pub fn with_transcoder(
        backend: Arc<dyn CaptureBackend>,
        sink: Arc<dyn AudioSink>,
        settings: CaptureSettings,
        transcoder: Transcoder,
    ) -> Self {
        let ctx = SessionContext {
            backend,
            sink,
            handles: HandleRegistry::new(),
            active: ActiveChannel::new(),
            settings,
        };

        Self {
            achievement: CaptureSession::new(Channel::Achievement, ctx.clone()),
            excuse: CaptureSession::new(Channel::Excuse, ctx.clone()),
            active: ctx.active,
            handles: ctx.handles,
            transcoder,
            import: Mutex::new(None),
        }
    }

    pub fn session(&self, channel: Channel) -> &CaptureSession {
        match channel {
            Channel::Achievement => &self.achievement,
            Channel::Excuse => &self.excuse,
        }
    }

    /// The channel currently recording or paused, if any
    pub fn active_channel(&self) -> Option<Channel> {
        self.active.holder()
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    pub async fn start(&self, channel: Channel) -> Result<(), CaptureError> {
        self.session(channel).start().await
    }

    pub async fn pause(&self, channel: Channel) -> Result<(), CaptureError> {
        self.session(channel).pause().await
    }

    pub async fn resume(&self, channel: Channel) -> Result<(), CaptureError> {
        self.session(channel).resume().await
    }

    pub async fn stop(&self, channel: Channel) -> Result<(), CaptureError> {
        self.session(channel).stop().await
    }

    pub async fn clear(&self, channel: Channel) -> Result<(), CaptureError> {
        self.session(channel).clear().await
    }

    pub async fn toggle_playback(&self, channel: Channel) -> Result<bool, PlaybackError> {
        self.session(channel).toggle_playback().await
    }

    pub async fn snapshot(&self) -> RecorderSnapshot {
        let import = self.import.lock().await.as_ref().map(|file| ImportSummary {
            name: file.name.clone(),
            content_type: file.content_type().to_string(),
            bytes: file.len(),
        });

        RecorderSnapshot {
            active_channel: self.active_channel(),
            achievement: self.achievement.snapshot().await,
            excuse: self.excuse.snapshot().await,
            import,
        }
    }

    /// Finished recordings across both channels, achievement first
    pub async fn finished(&self) -> Vec<FinishedRecording> {
        let mut finished = Vec::new();
        for channel in Channel::ALL {
            if let Some(recording) = self.session(channel).finished().await {
                finished.push(recording);
            }
        }
        finished
    }

    /// Collect finished recordings and convert them as requested
    pub async fn prepare_upload(&self, convert_to_mp3: bool) -> Result<UploadBatch, UploadError> {
        let finished = self.finished().await;
        if finished.is_empty() {
            return Err(UploadError::NothingToUpload);
        }

        Ok(prepare_batch(finished, &self.transcoder, convert_to_mp3).await)
    }

    /// Upload every finished recording, then clear the channels that
    /// contributed one. A failed upload clears nothing.
    pub async fn submit(&self, uploader: &dyn Uploader, convert_to_mp3: bool) -> Result<UploadReceipt, UploadError> {
        let batch = self.prepare_upload(convert_to_mp3).await?;

        let mut receipt = uploader.upload(&batch).await.map_err(|e| {
            error!("Upload error: {}", e);
            e
        })?;
        receipt.notices.extend(batch.notices.iter().cloned());

        for channel in batch.channels() {
            if let Err(e) = self.session(channel).clear().await {
                error!("Failed to clear {} after upload: {}", channel, e);
            }
        }

        info!("Recordings uploaded successfully ({} objects)", receipt.objects.len());
        Ok(receipt)
    }

    /// Select an existing audio file for upload
    ///
    /// Replaces any finished achievement recording.
    pub async fn select_import(&self, file: ImportedAudio) -> Result<(), ImportError> {
        validate_import(&file.name, file.content_type(), file.len() as u64)?;

        if self.achievement.artifact().await.is_some() {
            if let Err(e) = self.achievement.clear().await {
                error!("Failed to clear achievement recording for import: {}", e);
            }
        }

        info!("File \"{}\" selected ({} bytes)", file.name, file.len());
        *self.import.lock().await = Some(file);
        Ok(())
    }

    pub async fn clear_import(&self) -> bool {
        self.import.lock().await.take().is_some()
    }

    pub async fn submit_import(&self, uploader: &dyn Uploader) -> Result<UploadReceipt, UploadError> {
        let mut import = self.import.lock().await;
        let file = import.as_ref().ok_or(UploadError::NothingToUpload)?;

        let receipt = uploader.upload_import(file).await.map_err(|e| {
            error!("Failed to upload file: {}", e);
            e
        })?;

        info!("File \"{}\" uploaded successfully", file.name);
        *import = None;
        Ok(receipt)
    }

    /// Stop timers and captures, stop previews, revoke every handle
    pub async fn shutdown(&self) {
        join_all(Channel::ALL.map(|channel| self.session(channel).shutdown())).await;
        self.import.lock().await.take();
        info!("Recorder shut down ({} live handles)", self.handles.live_count());
    }
}
