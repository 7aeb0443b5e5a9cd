// File replay capture backend
//
// Replays an existing audio file as if it were being captured: the bytes
// are delivered in fixed slices, one per timeslice, while not paused. Only
// the container implied by the file extension is supported.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use super::backend::{CaptureBackend, CaptureConstraints, CaptureEvent, CaptureStream, LiveCapture};
use super::format;
use crate::error::CaptureError;

/// Default slice size when the config does not set one
pub const DEFAULT_BYTES_PER_SLICE: usize = 4096;

pub struct FileCaptureBackend {
    path: PathBuf,
    mime_type: &'static str,
    bytes_per_slice: usize,
}

impl FileCaptureBackend {
    pub fn new(path: PathBuf, bytes_per_slice: usize) -> Self {
        let mime_type = format::mime_for_path(&path);
        Self {
            path,
            mime_type,
            bytes_per_slice: bytes_per_slice.max(1),
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileCaptureBackend {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        mime_type == self.mime_type
    }

    async fn open(
        &self,
        constraints: &CaptureConstraints,
        mime_type: &str,
    ) -> Result<CaptureStream, CaptureError> {
        if !self.is_type_supported(mime_type) {
            return Err(CaptureError::Unavailable(format!(
                "{} cannot produce {}",
                self.path.display(),
                mime_type
            )));
        }

        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            CaptureError::Unavailable(format!("Failed to open {}: {}", self.path.display(), e))
        })?;

        info!(
            "Replaying {} as capture ({} bytes, {} bytes every {}ms)",
            self.path.display(),
            bytes.len(),
            self.bytes_per_slice,
            constraints.timeslice_ms
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let paused = Arc::new(AtomicBool::new(false));
        let live = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(replay(
            bytes,
            self.bytes_per_slice,
            Duration::from_millis(constraints.timeslice_ms.max(1)),
            Arc::clone(&paused),
            Arc::clone(&live),
            event_tx,
            stop_rx,
        ));

        Ok(CaptureStream {
            control: Box::new(FileCapture {
                paused,
                live,
                stop_tx: Some(stop_tx),
                task: Some(task),
            }),
            events: event_rx,
        })
    }

    fn name(&self) -> &str {
        "file replay"
    }
}

async fn replay(
    bytes: Vec<u8>,
    bytes_per_slice: usize,
    timeslice: Duration,
    paused: Arc<AtomicBool>,
    live: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<CaptureEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + timeslice, timeslice);
    let mut slices = bytes.chunks(bytes_per_slice);

    loop {
        tokio::select! {
            // Fires on an explicit stop and when the control is dropped
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                if paused.load(Ordering::SeqCst) {
                    continue;
                }
                if let Some(slice) = slices.next() {
                    if events.send(CaptureEvent::Data(slice.to_vec())).is_err() {
                        warn!("Capture consumer went away, ending replay");
                        break;
                    }
                }
            }
        }
    }

    let _ = events.send(CaptureEvent::Stopped);
    live.store(false, Ordering::SeqCst);
    debug!("File replay finished");
}

struct FileCapture {
    paused: Arc<AtomicBool>,
    live: Arc<AtomicBool>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl LiveCapture for FileCapture {
    fn pause(&mut self) -> Result<(), CaptureError> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), CaptureError> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| CaptureError::Device(format!("Replay task failed: {}", e)))?;
        }
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}
