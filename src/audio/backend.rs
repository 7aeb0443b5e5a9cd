use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::error::CaptureError;

/// Events delivered by a live capture, in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// One fragment of encoded audio (delivered every timeslice)
    Data(Vec<u8>),
    /// Capture finished; no further data follows
    Stopped,
    /// Terminal device error (unplugged, revoked permission, ...)
    Error(String),
}

/// Constraints requested when opening the microphone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    /// Sample rate hint in Hz (the device may pick another rate)
    pub sample_rate_hint: u32,
    /// Interval between data events in milliseconds
    pub timeslice_ms: u64,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            sample_rate_hint: 44100,
            timeslice_ms: 100,
        }
    }
}

/// An opened capture: its control surface plus the event stream
pub struct CaptureStream {
    pub control: Box<dyn LiveCapture>,
    pub events: mpsc::UnboundedReceiver<CaptureEvent>,
}

/// Platform capture primitive
///
/// Implementations:
/// - `MicrophoneBackend`: cpal input device (feature `microphone`)
/// - `FileCaptureBackend`: replays a file in timeslice chunks
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Whether this backend can produce the given container type
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Acquire the device and start delivering events
    ///
    /// Fails with `CaptureError::Unavailable` when access is denied.
    async fn open(
        &self,
        constraints: &CaptureConstraints,
        mime_type: &str,
    ) -> Result<CaptureStream, CaptureError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Control surface of an opened capture
///
/// The capture owns the device exclusively until `stop()` returns or the
/// value is dropped; both release every underlying track.
#[async_trait::async_trait]
pub trait LiveCapture: Send {
    fn pause(&mut self) -> Result<(), CaptureError>;

    fn resume(&mut self) -> Result<(), CaptureError>;

    /// Flush pending data, emit `CaptureEvent::Stopped` and release the device
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Whether the device is still held
    fn is_live(&self) -> bool;
}

/// Capture source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    /// Default microphone (requires the `microphone` feature)
    Microphone,
    /// Replay an existing audio file
    File(PathBuf),
}

impl CaptureSource {
    /// Parse a config value: `microphone` or a file path
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "microphone" | "mic" | "default" => Self::Microphone,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(source: &CaptureSource, bytes_per_slice: usize) -> Result<Arc<dyn CaptureBackend>> {
        match source {
            CaptureSource::Microphone => Self::microphone(),

            CaptureSource::File(path) => Ok(Arc::new(super::file::FileCaptureBackend::new(
                path.clone(),
                bytes_per_slice,
            ))),
        }
    }

    #[cfg(feature = "microphone")]
    fn microphone() -> Result<Arc<dyn CaptureBackend>> {
        Ok(Arc::new(super::microphone::MicrophoneBackend::new()))
    }

    #[cfg(not(feature = "microphone"))]
    fn microphone() -> Result<Arc<dyn CaptureBackend>> {
        anyhow::bail!("Microphone capture requires building with the `microphone` feature")
    }
}
