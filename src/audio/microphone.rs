// Microphone capture backend using cpal
//
// cpal streams are not `Send`, so each capture owns a dedicated thread that
// builds the input stream, drains the sample buffer every timeslice and
// obeys pause/resume/stop commands. Audio is delivered as a streaming
// 16-bit mono WAV: the first chunk carries the header, later chunks carry
// raw little-endian PCM, so the concatenation of all chunks is one file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::backend::{CaptureBackend, CaptureConstraints, CaptureEvent, CaptureStream, LiveCapture};
use crate::error::CaptureError;

const WAV_MIME: &str = "audio/wav";

/// Declared data length of the streaming header (the real length is unknown)
const STREAMING_DATA_LEN: u32 = 0xFFFF_FF00;

pub struct MicrophoneBackend;

impl MicrophoneBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MicrophoneBackend {
    fn default() -> Self {
        Self::new()
    }
}

enum Command {
    Pause,
    Resume,
    Stop(oneshot::Sender<()>),
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        mime_type == WAV_MIME
    }

    async fn open(
        &self,
        constraints: &CaptureConstraints,
        mime_type: &str,
    ) -> Result<CaptureStream, CaptureError> {
        if !self.is_type_supported(mime_type) {
            return Err(CaptureError::Unavailable(format!(
                "Microphone capture cannot produce {}",
                mime_type
            )));
        }

        if constraints.echo_cancellation || constraints.noise_suppression {
            debug!("Echo cancellation / noise suppression are not available through cpal; capturing raw input");
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = std_mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let live = Arc::new(AtomicBool::new(false));

        let thread_live = Arc::clone(&live);
        let constraints = constraints.clone();
        std::thread::Builder::new()
            .name("loqa-microphone".to_string())
            .spawn(move || run_capture(constraints, event_tx, command_rx, ready_tx, thread_live))
            .map_err(|e| CaptureError::Unavailable(format!("Failed to spawn capture thread: {}", e)))?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(message)) => return Err(CaptureError::Unavailable(message)),
            Err(_) => {
                return Err(CaptureError::Unavailable(
                    "Capture thread exited during startup".to_string(),
                ))
            }
        }

        Ok(CaptureStream {
            control: Box::new(MicrophoneCapture {
                commands: command_tx,
                live,
            }),
            events: event_rx,
        })
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

fn run_capture(
    constraints: CaptureConstraints,
    events: mpsc::UnboundedSender<CaptureEvent>,
    commands: std_mpsc::Receiver<Command>,
    ready: oneshot::Sender<Result<(), String>>,
    live: Arc<AtomicBool>,
) {
    let samples = Arc::new(Mutex::new(Vec::<i16>::new()));
    let (err_tx, err_rx) = std_mpsc::channel::<String>();

    let (stream, sample_rate) = match build_stream(&constraints, Arc::clone(&samples), err_tx) {
        Ok(built) => built,
        Err(message) => {
            let _ = ready.send(Err(message));
            return;
        }
    };

    live.store(true, Ordering::SeqCst);
    let _ = ready.send(Ok(()));

    let timeslice = Duration::from_millis(constraints.timeslice_ms.max(1));
    let mut header = Some(streaming_wav_header(sample_rate));

    loop {
        match commands.recv_timeout(timeslice) {
            Ok(Command::Pause) => {
                if let Err(e) = stream.pause() {
                    warn!("Failed to pause input stream: {}", e);
                }
            }
            Ok(Command::Resume) => {
                if let Err(e) = stream.play() {
                    warn!("Failed to resume input stream: {}", e);
                }
            }
            Ok(Command::Stop(done)) => {
                drop(stream);
                live.store(false, Ordering::SeqCst);
                flush(&samples, &mut header, &events);
                let _ = events.send(CaptureEvent::Stopped);
                let _ = done.send(());
                info!("Microphone capture stopped");
                return;
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => flush(&samples, &mut header, &events),
            Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                debug!("Capture control dropped, releasing microphone");
                live.store(false, Ordering::SeqCst);
                return;
            }
        }

        if let Ok(message) = err_rx.try_recv() {
            error!("Audio stream error: {}", message);
            drop(stream);
            live.store(false, Ordering::SeqCst);
            let _ = events.send(CaptureEvent::Error(message));
            return;
        }
    }
}

fn build_stream(
    constraints: &CaptureConstraints,
    samples: Arc<Mutex<Vec<i16>>>,
    err_tx: std_mpsc::Sender<String>,
) -> Result<(cpal::Stream, u32), String> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| "No audio input device available".to_string())?;

    let device_name = device.name().unwrap_or_else(|_| "Unknown device".to_string());
    info!("Recording device: {}", device_name);

    let config = device
        .default_input_config()
        .map_err(|e| format!("Microphone access denied: {}", e))?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    if sample_rate != constraints.sample_rate_hint {
        warn!(
            "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
            constraints.sample_rate_hint, sample_rate
        );
    }

    let err_fn = move |err: cpal::StreamError| {
        let _ = err_tx.send(err.to_string());
    };

    let stream_config: cpal::StreamConfig = config.clone().into();
    let stream = match config.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                push_mono(data, channels, &samples, |s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| push_mono(data, channels, &samples, |s| s),
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                push_mono(data, channels, &samples, |s| (s as i32 - 32768) as i16)
            },
            err_fn,
            None,
        ),
        other => return Err(format!("Unsupported input sample format {:?}", other)),
    }
    .map_err(|e| format!("Failed to open input stream: {}", e))?;

    stream
        .play()
        .map_err(|e| format!("Failed to start input stream: {}", e))?;

    Ok((stream, sample_rate))
}

/// Average interleaved frames down to mono and append them
fn push_mono<T: Copy>(data: &[T], channels: usize, samples: &Mutex<Vec<i16>>, convert: impl Fn(T) -> i16) {
    let Ok(mut samples) = samples.lock() else {
        return;
    };

    if channels <= 1 {
        samples.extend(data.iter().map(|&s| convert(s)));
        return;
    }

    for frame in data.chunks_exact(channels) {
        let sum: i32 = frame.iter().map(|&s| convert(s) as i32).sum();
        samples.push((sum / channels as i32) as i16);
    }
}

/// Emit buffered samples as one chunk (prefixed by the header on first use)
fn flush(
    samples: &Mutex<Vec<i16>>,
    header: &mut Option<Vec<u8>>,
    events: &mpsc::UnboundedSender<CaptureEvent>,
) {
    let drained: Vec<i16> = match samples.lock() {
        Ok(mut samples) => std::mem::take(&mut *samples),
        Err(_) => return,
    };

    if drained.is_empty() && header.is_none() {
        return;
    }

    let mut chunk = header.take().unwrap_or_default();
    chunk.reserve(drained.len() * 2);
    for sample in drained {
        chunk.extend_from_slice(&sample.to_le_bytes());
    }

    let _ = events.send(CaptureEvent::Data(chunk));
}

/// 16-bit mono PCM WAV header with open-ended lengths
fn streaming_wav_header(sample_rate: u32) -> Vec<u8> {
    let block_align: u16 = 2;
    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&(STREAMING_DATA_LEN + 36).to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes()); // PCM
    header.extend_from_slice(&1u16.to_le_bytes()); // mono
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&16u16.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&STREAMING_DATA_LEN.to_le_bytes());
    header
}

struct MicrophoneCapture {
    commands: std_mpsc::Sender<Command>,
    live: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl LiveCapture for MicrophoneCapture {
    fn pause(&mut self) -> Result<(), CaptureError> {
        self.commands
            .send(Command::Pause)
            .map_err(|_| CaptureError::Device("Capture thread has exited".to_string()))
    }

    fn resume(&mut self) -> Result<(), CaptureError> {
        self.commands
            .send(Command::Resume)
            .map_err(|_| CaptureError::Device("Capture thread has exited".to_string()))
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Stop(done_tx)).is_err() {
            // Thread already gone (device error); the microphone is released
            return Ok(());
        }
        let _ = done_rx.await;
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}
