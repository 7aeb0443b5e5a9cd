pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod session;
pub mod transcode;
pub mod upload;

pub use audio::{
    AudioArtifact, AudioSink, CaptureBackend, CaptureBackendFactory, CaptureConstraints, CaptureEvent,
    CaptureSource, FileCaptureBackend, HandleRegistry, HeadlessSink, LiveCapture, PlaybackHandle,
};
pub use config::Config;
pub use error::{CaptureError, ImportError, PlaybackError, TranscodeError, UploadError};
pub use http::{create_router, AppState};
pub use nats::{NatsUploader, RecordingUploadMessage};
pub use session::{CaptureSession, CaptureSettings, CaptureState, Channel, Recorder, SessionSnapshot};
pub use transcode::Transcoder;
pub use upload::{FinishedRecording, ImportedAudio, UploadBatch, UploadReceipt, Uploader};
