use anyhow::{Context, Result};
use async_nats::Client;
use tracing::info;

use super::messages::RecordingUploadMessage;
use crate::error::UploadError;
use crate::upload::{upload_timestamp, ImportedAudio, UploadBatch, UploadReceipt, Uploader};

/// Uploader that publishes each recording to NATS
pub struct NatsUploader {
    client: Client,
    subject_prefix: String,
    user_id: String,
}

impl NatsUploader {
    /// Connect to NATS server
    pub async fn connect(url: &str, subject_prefix: impl Into<String>, user_id: impl Into<String>) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            subject_prefix: subject_prefix.into(),
            user_id: user_id.into(),
        })
    }

    async fn publish(&self, message: &RecordingUploadMessage) -> Result<(), UploadError> {
        let subject = message.subject(&self.subject_prefix);
        let payload = serde_json::to_vec(message).map_err(|e| UploadError::Rejected(e.to_string()))?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| UploadError::Rejected(format!("{} upload failed: {}", message.label, e)))?;

        info!(
            "Published {} to {} (type={}, duration={:?})",
            message.file_path, subject, message.file_type, message.duration
        );

        Ok(())
    }

    async fn flush(&self) -> Result<(), UploadError> {
        self.client
            .flush()
            .await
            .map_err(|e| UploadError::Rejected(format!("NATS flush failed: {}", e)))
    }
}

#[async_trait::async_trait]
impl Uploader for NatsUploader {
    async fn upload(&self, batch: &UploadBatch) -> Result<UploadReceipt, UploadError> {
        if batch.is_empty() {
            return Err(UploadError::NothingToUpload);
        }

        let timestamp = upload_timestamp(chrono::Utc::now());
        let mut receipt = UploadReceipt::default();

        for recording in &batch.recordings {
            let message = RecordingUploadMessage::for_recording(&self.user_id, recording, &timestamp);
            self.publish(&message).await?;
            receipt.objects.push(message.file_path);
        }

        self.flush().await?;
        Ok(receipt)
    }

    async fn upload_import(&self, import: &ImportedAudio) -> Result<UploadReceipt, UploadError> {
        let timestamp = upload_timestamp(chrono::Utc::now());
        let message = RecordingUploadMessage::for_import(&self.user_id, import, &timestamp);

        self.publish(&message).await?;
        self.flush().await?;

        Ok(UploadReceipt {
            objects: vec![message.file_path],
            notices: Vec::new(),
        })
    }
}
