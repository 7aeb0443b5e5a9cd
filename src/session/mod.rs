//! Capture sessions
//!
//! Each recording channel owns a `CaptureSession` that drives the capture
//! state machine (idle → recording ⇄ paused → stopped), counts duration,
//! buffers chunks and previews the finished artifact. The `Recorder`
//! composes the two channels and enforces that only one records at a time.

mod channel;
mod config;
mod recorder;
mod session;
mod state;
mod timer;

pub use channel::{ActiveChannel, Channel};
pub use config::{CaptureSettings, SessionContext};
pub use recorder::{ImportSummary, Recorder, RecorderSnapshot};
pub use session::CaptureSession;
pub use state::{CaptureState, SessionSnapshot};
pub use timer::DurationTimer;
