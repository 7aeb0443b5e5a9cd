// Audio sink abstraction for previewing finished recordings
//
// A sink loads an artifact into a renderer. The renderer always plays from
// the start and reports natural end or render errors on its event channel,
// tagged with the sequence number the caller gave that play.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::artifact::AudioArtifact;
use crate::error::PlaybackError;
use crate::transcode::{PcmDecoder, SymphoniaDecoder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Natural end of playback
    Ended,
    /// Render error; playback has stopped
    Failed(String),
}

/// An event and the play it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackUpdate {
    pub play: u64,
    pub event: PlaybackEvent,
}

/// A loaded artifact ready to render
pub trait Renderer: Send {
    /// Start rendering from the beginning; events for this play carry `play`
    fn play(&mut self, play: u64) -> Result<(), PlaybackError>;

    fn pause(&mut self);
}

/// Loaded renderer plus its event stream
pub struct LoadedRenderer {
    pub renderer: Box<dyn Renderer>,
    pub events: mpsc::UnboundedReceiver<PlaybackUpdate>,
}

#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    async fn load(&self, artifact: AudioArtifact) -> Result<LoadedRenderer, PlaybackError>;
}

/// Sink for hosts without an output device
///
/// Decodes the artifact to learn its length, then reports natural end
/// after that much wall-clock time.
pub struct HeadlessSink {
    decoder: Arc<dyn PcmDecoder>,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self::with_decoder(Arc::new(SymphoniaDecoder::new()))
    }

    pub fn with_decoder(decoder: Arc<dyn PcmDecoder>) -> Self {
        Self { decoder }
    }
}

impl Default for HeadlessSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AudioSink for HeadlessSink {
    async fn load(&self, artifact: AudioArtifact) -> Result<LoadedRenderer, PlaybackError> {
        let decoder = Arc::clone(&self.decoder);
        let decoded = tokio::task::spawn_blocking(move || {
            decoder.decode(artifact.payload(), artifact.mime_type())
        })
        .await
        .map_err(|e| PlaybackError::Failed(e.to_string()))?
        .map_err(|e| PlaybackError::Failed(e.to_string()))?;

        let length = decoded.duration();
        debug!("Headless renderer loaded ({:.2}s)", length.as_secs_f64());

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(LoadedRenderer {
            renderer: Box::new(HeadlessRenderer {
                length,
                events: events_tx,
                task: None,
            }),
            events: events_rx,
        })
    }
}

struct HeadlessRenderer {
    length: Duration,
    events: mpsc::UnboundedSender<PlaybackUpdate>,
    task: Option<JoinHandle<()>>,
}

impl Renderer for HeadlessRenderer {
    fn play(&mut self, play: u64) -> Result<(), PlaybackError> {
        self.pause();
        let length = self.length;
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(length).await;
            let _ = events.send(PlaybackUpdate {
                play,
                event: PlaybackEvent::Ended,
            });
        }));
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for HeadlessRenderer {
    fn drop(&mut self) {
        self.pause();
    }
}

#[cfg(feature = "microphone")]
pub use self::speaker::SpeakerSink;

#[cfg(feature = "microphone")]
mod speaker {
    //! Speaker output through cpal. Each play runs on its own thread, since
    //! cpal streams cannot cross threads.

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use tokio::sync::mpsc;

    use super::{AudioSink, LoadedRenderer, PlaybackEvent, PlaybackUpdate, Renderer};
    use crate::audio::artifact::AudioArtifact;
    use crate::error::PlaybackError;
    use crate::transcode::{PcmDecoder, SymphoniaDecoder};

    pub struct SpeakerSink {
        decoder: Arc<dyn PcmDecoder>,
    }

    impl SpeakerSink {
        pub fn new() -> Self {
            Self {
                decoder: Arc::new(SymphoniaDecoder::new()),
            }
        }
    }

    impl Default for SpeakerSink {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait::async_trait]
    impl AudioSink for SpeakerSink {
        async fn load(&self, artifact: AudioArtifact) -> Result<LoadedRenderer, PlaybackError> {
            let decoder = Arc::clone(&self.decoder);
            let decoded = tokio::task::spawn_blocking(move || {
                decoder.decode(artifact.payload(), artifact.mime_type())
            })
            .await
            .map_err(|e| PlaybackError::Failed(e.to_string()))?
            .map_err(|e| PlaybackError::Failed(e.to_string()))?;

            let samples = decoded.channels.into_iter().next().unwrap_or_default();
            let (events_tx, events_rx) = mpsc::unbounded_channel();

            Ok(LoadedRenderer {
                renderer: Box::new(SpeakerRenderer {
                    samples: Arc::new(samples),
                    sample_rate: decoded.sample_rate,
                    events: events_tx,
                    cancel: None,
                }),
                events: events_rx,
            })
        }
    }

    struct SpeakerRenderer {
        samples: Arc<Vec<f32>>,
        sample_rate: u32,
        events: mpsc::UnboundedSender<PlaybackUpdate>,
        cancel: Option<Arc<AtomicBool>>,
    }

    impl Renderer for SpeakerRenderer {
        fn play(&mut self, play: u64) -> Result<(), PlaybackError> {
            self.pause();

            let cancel = Arc::new(AtomicBool::new(false));
            self.cancel = Some(Arc::clone(&cancel));

            let samples = Arc::clone(&self.samples);
            let source_rate = self.sample_rate;
            let events = self.events.clone();

            std::thread::Builder::new()
                .name("loqa-speaker".to_string())
                .spawn(move || {
                    let outcome = render(samples, source_rate, &cancel);
                    if cancel.load(Ordering::SeqCst) {
                        return;
                    }
                    let event = match outcome {
                        Ok(()) => PlaybackEvent::Ended,
                        Err(message) => PlaybackEvent::Failed(message),
                    };
                    let _ = events.send(PlaybackUpdate { play, event });
                })
                .map_err(|e| PlaybackError::Failed(e.to_string()))?;

            Ok(())
        }

        fn pause(&mut self) {
            if let Some(cancel) = self.cancel.take() {
                cancel.store(true, Ordering::SeqCst);
            }
        }
    }

    impl Drop for SpeakerRenderer {
        fn drop(&mut self) {
            self.pause();
        }
    }

    fn render(samples: Arc<Vec<f32>>, source_rate: u32, cancel: &AtomicBool) -> Result<(), String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "No audio output device available".to_string())?;
        let config = device.default_output_config().map_err(|e| e.to_string())?;
        let output_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        // Nearest-sample rate conversion is enough for a preview
        let step = source_rate as f64 / output_rate as f64;
        let position = Arc::new(AtomicUsize::new(0));
        let callback_position = Arc::clone(&position);
        let total_frames = (samples.len() as f64 / step) as usize;

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let index = callback_position.fetch_add(1, Ordering::Relaxed);
                        let source_index = (index as f64 * step) as usize;
                        let value = samples.get(source_index).copied().unwrap_or(0.0);
                        frame.iter_mut().for_each(|s| *s = value);
                    }
                },
                |err| tracing::error!("Audio output error: {}", err),
                None,
            )
            .map_err(|e| e.to_string())?;

        stream.play().map_err(|e| e.to_string())?;

        while position.load(Ordering::Relaxed) < total_frames {
            if cancel.load(Ordering::SeqCst) {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        Ok(())
    }
}
