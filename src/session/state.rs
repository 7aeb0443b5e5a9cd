use std::fmt;

use serde::{Deserialize, Serialize};

use super::channel::Channel;

/// Capture lifecycle of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    #[default]
    Idle,
    Recording,
    Paused,
    /// Holds a finished artifact
    Stopped,
}

impl CaptureState {
    /// Recording or paused
    pub fn is_capturing(&self) -> bool {
        matches!(self, CaptureState::Recording | CaptureState::Paused)
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaptureState::Idle => "idle",
            CaptureState::Recording => "recording",
            CaptureState::Paused => "paused",
            CaptureState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of a capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub channel: Channel,
    pub state: CaptureState,
    /// Waiting on the device to open
    pub starting: bool,
    pub duration_seconds: u64,
    /// `m:ss` rendering of `duration_seconds`
    pub duration: String,
    pub is_playing: bool,
    /// Negotiated container type of the current or last capture
    pub mime_type: Option<String>,
    /// Chunks buffered by the current capture
    pub chunk_count: usize,
    pub artifact_bytes: Option<usize>,
    pub playback_handle: Option<String>,
    pub last_error: Option<String>,
}
