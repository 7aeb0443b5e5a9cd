use serde::Serialize;
use tracing::{info, warn};

use crate::audio::format;
use crate::audio::AudioArtifact;
use crate::session::Channel;
use crate::transcode::Transcoder;

/// A channel's finished artifact, ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedRecording {
    pub channel: Channel,
    pub artifact: AudioArtifact,
    pub file_extension: String,
    pub duration_seconds: u64,
}

impl FinishedRecording {
    pub fn new(channel: Channel, artifact: AudioArtifact, duration_seconds: u64) -> Self {
        let file_extension = artifact.file_extension().to_string();
        Self {
            channel,
            artifact,
            file_extension,
            duration_seconds,
        }
    }

    pub fn payload(&self) -> &[u8] {
        self.artifact.payload()
    }

    pub fn mime_type(&self) -> &str {
        self.artifact.mime_type()
    }
}

/// Recordings prepared for one submit, plus the user-facing notices raised
/// while preparing them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadBatch {
    pub recordings: Vec<FinishedRecording>,
    pub notices: Vec<String>,
}

impl UploadBatch {
    pub fn get(&self, channel: Channel) -> Option<&FinishedRecording> {
        self.recordings.iter().find(|r| r.channel == channel)
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.recordings.iter().map(|r| r.channel).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

/// What the uploader stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    /// Object paths, in upload order
    pub objects: Vec<String>,
    pub notices: Vec<String>,
}

/// Convert each recording to MP3 when asked
///
/// Artifacts already in MP3 pass through. A failed conversion keeps the
/// original artifact and records a notice; the batch always carries every
/// input recording.
pub async fn prepare_batch(
    recordings: Vec<FinishedRecording>,
    transcoder: &Transcoder,
    convert_to_mp3: bool,
) -> UploadBatch {
    let mut batch = UploadBatch::default();

    for recording in recordings {
        if !convert_to_mp3 || format::is_mp3(recording.mime_type()) {
            batch.recordings.push(recording);
            continue;
        }

        info!("Converting {} recording to MP3...", recording.channel);
        match transcoder.encode(&recording.artifact).await {
            Ok(mp3) => {
                batch
                    .recordings
                    .push(FinishedRecording::new(recording.channel, mp3, recording.duration_seconds));
            }
            Err(e) => {
                let notice = format!(
                    "MP3 conversion failed, uploading as {}",
                    format::format_name(recording.mime_type())
                );
                warn!("{} ({} recording): {}", notice, recording.channel, e);
                batch.notices.push(notice);
                batch.recordings.push(recording);
            }
        }
    }

    batch
}
