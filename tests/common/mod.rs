// Shared fakes for integration tests
//
// FakeBackend stands in for the platform microphone, FakeSink for the
// speaker, RecordingUploader for storage. Each hands the test a probe to
// drive events and observe device state.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use loqa_recorder::audio::{
    AudioArtifact, AudioSink, CaptureBackend, CaptureConstraints, CaptureEvent, CaptureStream, LiveCapture,
    LoadedRenderer, PlaybackEvent, PlaybackUpdate, Renderer,
};
use loqa_recorder::error::{CaptureError, PlaybackError, TranscodeError, UploadError};
use loqa_recorder::session::{CaptureSettings, Recorder};
use loqa_recorder::transcode::{BlockEncoder, DecodedAudio, EncoderFactory, PcmDecoder, Transcoder};
use loqa_recorder::upload::{ImportedAudio, UploadBatch, UploadReceipt, Uploader};
use tokio::sync::{mpsc, Notify};

// ============================================================================
// Capture
// ============================================================================

/// Test handle onto one opened fake capture
#[derive(Clone)]
pub struct CaptureProbe {
    pub mime_type: String,
    pub constraints: CaptureConstraints,
    events: Arc<Mutex<Option<mpsc::UnboundedSender<CaptureEvent>>>>,
    live: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    final_chunk: Arc<Mutex<Option<Vec<u8>>>>,
    stop_gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl CaptureProbe {
    /// Deliver one data event, as the platform does every timeslice
    pub fn emit(&self, chunk: &[u8]) {
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            let _ = events.send(CaptureEvent::Data(chunk.to_vec()));
        }
    }

    /// Report a terminal device error
    pub fn fail(&self, message: &str) {
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            let _ = events.send(CaptureEvent::Error(message.to_string()));
        }
    }

    /// Data the capture flushes when stopped
    pub fn set_final_chunk(&self, chunk: &[u8]) {
        *self.final_chunk.lock().unwrap() = Some(chunk.to_vec());
    }

    /// Make the next `stop` wait until the returned gate is notified
    pub fn hold_stop(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.stop_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

pub struct FakeBackend {
    supported: Vec<String>,
    open_error: Mutex<Option<CaptureError>>,
    open_gate: Mutex<Option<Arc<Notify>>>,
    captures: Mutex<Vec<CaptureProbe>>,
}

impl FakeBackend {
    pub fn new(supported: &[&str]) -> Self {
        Self {
            supported: supported.iter().map(|m| m.to_string()).collect(),
            open_error: Mutex::new(None),
            open_gate: Mutex::new(None),
            captures: Mutex::new(Vec::new()),
        }
    }

    /// Supports only WebM
    pub fn webm() -> Self {
        Self::new(&["audio/webm"])
    }

    /// The next open fails with this error
    pub fn fail_next_open(&self, error: CaptureError) {
        *self.open_error.lock().unwrap() = Some(error);
    }

    /// Make the next open wait, as a permission prompt does, until the
    /// returned gate is notified
    pub fn hold_next_open(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.open_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn open_count(&self) -> usize {
        self.captures.lock().unwrap().len()
    }

    /// The most recently opened capture
    pub fn last(&self) -> CaptureProbe {
        self.captures.lock().unwrap().last().cloned().expect("no capture opened")
    }

    pub fn any_live(&self) -> bool {
        self.captures.lock().unwrap().iter().any(CaptureProbe::is_live)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FakeBackend {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|m| m == mime_type)
    }

    async fn open(&self, constraints: &CaptureConstraints, mime_type: &str) -> Result<CaptureStream, CaptureError> {
        let gate = self.open_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(error) = self.open_error.lock().unwrap().take() {
            return Err(error);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let probe = CaptureProbe {
            mime_type: mime_type.to_string(),
            constraints: constraints.clone(),
            events: Arc::new(Mutex::new(Some(tx))),
            live: Arc::new(AtomicBool::new(true)),
            paused: Arc::new(AtomicBool::new(false)),
            final_chunk: Arc::new(Mutex::new(None)),
            stop_gate: Arc::new(Mutex::new(None)),
        };
        self.captures.lock().unwrap().push(probe.clone());

        Ok(CaptureStream {
            control: Box::new(FakeCapture { probe }),
            events: rx,
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeCapture {
    probe: CaptureProbe,
}

impl FakeCapture {
    fn release(&mut self) {
        self.probe.live.store(false, Ordering::SeqCst);
        self.probe.events.lock().unwrap().take();
    }
}

#[async_trait::async_trait]
impl LiveCapture for FakeCapture {
    fn pause(&mut self) -> Result<(), CaptureError> {
        self.probe.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), CaptureError> {
        self.probe.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        let gate = self.probe.stop_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let final_chunk = self.probe.final_chunk.lock().unwrap().take();
        if let Some(events) = self.probe.events.lock().unwrap().as_ref() {
            if let Some(chunk) = final_chunk {
                let _ = events.send(CaptureEvent::Data(chunk));
            }
            let _ = events.send(CaptureEvent::Stopped);
        }
        self.release();
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.probe.is_live()
    }
}

impl Drop for FakeCapture {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Playback
// ============================================================================

#[derive(Clone)]
pub struct RendererProbe {
    pub artifact: AudioArtifact,
    events: mpsc::UnboundedSender<PlaybackUpdate>,
    plays: Arc<AtomicUsize>,
    current_play: Arc<AtomicU64>,
    playing: Arc<AtomicBool>,
}

impl RendererProbe {
    /// Simulate the natural end of the current play
    pub fn finish(&self) {
        self.playing.store(false, Ordering::SeqCst);
        self.end_play(self.current_play());
    }

    /// Deliver a natural end for a specific play, current or not
    pub fn end_play(&self, play: u64) {
        let _ = self.events.send(PlaybackUpdate {
            play,
            event: PlaybackEvent::Ended,
        });
    }

    pub fn fail(&self, message: &str) {
        self.playing.store(false, Ordering::SeqCst);
        let _ = self.events.send(PlaybackUpdate {
            play: self.current_play(),
            event: PlaybackEvent::Failed(message.to_string()),
        });
    }

    /// Sequence number passed to the latest `play`
    pub fn current_play(&self) -> u64 {
        self.current_play.load(Ordering::SeqCst)
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeSink {
    fail_load: AtomicBool,
    load_gate: Mutex<Option<Arc<Notify>>>,
    renderers: Mutex<Vec<RendererProbe>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    /// Make the next load wait until the returned gate is notified
    pub fn hold_next_load(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.load_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn last(&self) -> RendererProbe {
        self.renderers.lock().unwrap().last().cloned().expect("no renderer loaded")
    }

    pub fn load_count(&self) -> usize {
        self.renderers.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl AudioSink for FakeSink {
    async fn load(&self, artifact: AudioArtifact) -> Result<LoadedRenderer, PlaybackError> {
        let gate = self.load_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_load.load(Ordering::SeqCst) {
            return Err(PlaybackError::Failed("unsupported source".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let probe = RendererProbe {
            artifact,
            events: tx,
            plays: Arc::new(AtomicUsize::new(0)),
            current_play: Arc::new(AtomicU64::new(0)),
            playing: Arc::new(AtomicBool::new(false)),
        };
        self.renderers.lock().unwrap().push(probe.clone());

        Ok(LoadedRenderer {
            renderer: Box::new(FakeRenderer { probe }),
            events: rx,
        })
    }
}

struct FakeRenderer {
    probe: RendererProbe,
}

impl Renderer for FakeRenderer {
    fn play(&mut self, play: u64) -> Result<(), PlaybackError> {
        self.probe.plays.fetch_add(1, Ordering::SeqCst);
        self.probe.current_play.store(play, Ordering::SeqCst);
        self.probe.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) {
        self.probe.playing.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Transcoding
// ============================================================================

/// Decoder that always fails, to exercise the upload fallback
pub struct FailingDecoder;

impl PcmDecoder for FailingDecoder {
    fn decode(&self, _payload: &[u8], _mime_type: &str) -> Result<DecodedAudio, TranscodeError> {
        Err(TranscodeError::DecodeFailed("corrupt container".to_string()))
    }
}

/// Decoder that returns fixed samples regardless of input
pub struct FixedDecoder {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl PcmDecoder for FixedDecoder {
    fn decode(&self, _payload: &[u8], _mime_type: &str) -> Result<DecodedAudio, TranscodeError> {
        Ok(DecodedAudio {
            sample_rate: self.sample_rate,
            channels: self.channels.clone(),
        })
    }
}

/// What a `FakeEncoderFactory` was asked to do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderLog {
    pub created: Vec<(u8, u32, u32)>,
    pub blocks: Vec<usize>,
    pub flushes: usize,
}

/// Encoder emitting one marker byte per block and `0xFF` on flush
#[derive(Default)]
pub struct FakeEncoderFactory {
    pub log: Arc<Mutex<EncoderLog>>,
}

impl EncoderFactory for FakeEncoderFactory {
    fn create(&self, channels: u8, sample_rate: u32, bitrate_kbps: u32) -> Result<Box<dyn BlockEncoder>, TranscodeError> {
        self.log.lock().unwrap().created.push((channels, sample_rate, bitrate_kbps));
        Ok(Box::new(FakeEncoder {
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeEncoder {
    log: Arc<Mutex<EncoderLog>>,
}

impl BlockEncoder for FakeEncoder {
    fn encode_block(&mut self, samples: &[i16]) -> Result<Vec<u8>, TranscodeError> {
        let mut log = self.log.lock().unwrap();
        log.blocks.push(samples.len());
        Ok(vec![log.blocks.len() as u8])
    }

    fn flush(&mut self) -> Result<Vec<u8>, TranscodeError> {
        self.log.lock().unwrap().flushes += 1;
        Ok(vec![0xFF])
    }
}

pub fn failing_transcoder() -> Transcoder {
    Transcoder::new(Arc::new(FailingDecoder), Arc::new(FakeEncoderFactory::default()), 128)
}

// ============================================================================
// Upload
// ============================================================================

#[derive(Default)]
pub struct RecordingUploader {
    pub batches: Mutex<Vec<UploadBatch>>,
    pub imports: Mutex<Vec<ImportedAudio>>,
    reject: AtomicBool,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_uploads(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Uploader for RecordingUploader {
    async fn upload(&self, batch: &UploadBatch) -> Result<UploadReceipt, UploadError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(UploadError::Rejected("storage unavailable".to_string()));
        }
        self.batches.lock().unwrap().push(batch.clone());
        Ok(UploadReceipt {
            objects: batch
                .recordings
                .iter()
                .map(|r| format!("test/{}.{}", r.channel, r.file_extension))
                .collect(),
            notices: Vec::new(),
        })
    }

    async fn upload_import(&self, import: &ImportedAudio) -> Result<UploadReceipt, UploadError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(UploadError::Rejected("storage unavailable".to_string()));
        }
        self.imports.lock().unwrap().push(import.clone());
        Ok(UploadReceipt {
            objects: vec![format!("test/x.{}", import.file_extension)],
            notices: Vec::new(),
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub sink: Arc<FakeSink>,
    pub recorder: Recorder,
}

pub fn harness() -> Harness {
    harness_with(FakeBackend::webm(), failing_transcoder())
}

pub fn harness_with(backend: FakeBackend, transcoder: Transcoder) -> Harness {
    let backend = Arc::new(backend);
    let sink = Arc::new(FakeSink::new());
    let recorder = Recorder::with_transcoder(
        backend.clone(),
        sink.clone(),
        CaptureSettings::default(),
        transcoder,
    );
    Harness { backend, sink, recorder }
}

/// Let spawned tasks (chunk buffer, playback watcher) run
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// 16-bit mono WAV bytes of a 440 Hz tone
pub fn wav_tone(sample_rate: u32, samples: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..samples {
            let t = i as f32 / sample_rate as f32;
            let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
