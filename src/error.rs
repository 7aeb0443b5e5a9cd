//! Error taxonomy for capture, transcoding, playback and upload.
//!
//! Capture and busy-channel errors are terminal for the call that raised
//! them. Transcode and playback errors never cost the captured artifact.

use thiserror::Error;

use crate::session::{CaptureState, Channel};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Microphone access denied, or no container type could be negotiated
    #[error("Capture unavailable: {0}")]
    Unavailable(String),

    /// The other channel is currently recording or paused
    #[error("Please finish the current {active} recording before starting a new one")]
    ChannelBusy { active: Channel },

    #[error("Cannot {operation} the {channel} recording while it is {state}")]
    InvalidState {
        channel: Channel,
        operation: &'static str,
        state: CaptureState,
    },

    /// Cleared or shut down before `start` or `stop` could finish
    #[error("The {channel} recording was cancelled")]
    Cancelled { channel: Channel },

    /// Terminal device error reported by the capture primitive mid-recording
    #[error("Capture device failed: {0}")]
    Device(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscodeError {
    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),

    #[error("Failed to encode MP3: {0}")]
    EncodeFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("Failed to play audio: {0}")]
    Failed(String),

    #[error("Playable handle {0} has been revoked")]
    Revoked(String),

    #[error("No finished {0} recording to play")]
    NothingToPlay(Channel),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("No recordings to upload")]
    NothingToUpload,

    #[error("Upload failed: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("Please select an MP3 or MP4 file")]
    UnsupportedType,

    #[error("File size must be less than {limit_mb}MB")]
    TooLarge { limit_mb: u64 },
}
