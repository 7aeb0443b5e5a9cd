pub mod artifact;
pub mod backend;
pub mod file;
pub mod format;
pub mod handles;
pub mod playback;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use artifact::AudioArtifact;
pub use backend::{
    CaptureBackend, CaptureBackendFactory, CaptureConstraints, CaptureEvent, CaptureSource, CaptureStream,
    LiveCapture,
};
pub use file::FileCaptureBackend;
pub use handles::{HandleRegistry, PlaybackHandle};
pub use playback::{AudioSink, HeadlessSink, LoadedRenderer, PlaybackEvent, PlaybackUpdate, Renderer};

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneBackend;
#[cfg(feature = "microphone")]
pub use playback::SpeakerSink;
