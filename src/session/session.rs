use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::channel::{ActiveChannel, Channel};
use super::config::SessionContext;
use super::state::{CaptureState, SessionSnapshot};
use super::timer::DurationTimer;
use crate::audio::format;
use crate::audio::{AudioArtifact, CaptureEvent, LiveCapture, PlaybackEvent, PlaybackHandle, PlaybackUpdate, Renderer};
use crate::audio::{CaptureStream, HandleRegistry};
use crate::error::{CaptureError, PlaybackError};
use crate::upload::FinishedRecording;

/// One recording channel: capture lifecycle, duration counter, finished
/// artifact and its preview playback
pub struct CaptureSession {
    channel: Channel,
    ctx: SessionContext,
    inner: Arc<Mutex<SessionInner>>,
}

struct SessionInner {
    channel: Channel,
    state: CaptureState,
    mime_type: Option<String>,
    chunk_count: Arc<AtomicUsize>,
    /// Live capture control; present only while recording or paused
    live: Option<Box<dyn LiveCapture>>,
    /// Task buffering capture chunks in arrival order
    pump: Option<JoinHandle<PumpOutcome>>,
    /// Set while `start` waits on the backend without holding the lock
    opening: bool,
    /// Set while stop/clear drain the capture without holding the lock
    finalizing: bool,
    /// Bumped by every reset; work begun under an older epoch is discarded
    epoch: u64,
    timer: DurationTimer,
    artifact: Option<AudioArtifact>,
    handle: Option<PlaybackHandle>,
    renderer: Option<Box<dyn Renderer>>,
    playback_watch: Option<JoinHandle<()>>,
    /// Set while the sink loads the artifact without holding the lock
    loading: bool,
    /// Sequence number of the most recent play
    play_seq: u64,
    is_playing: bool,
    last_error: Option<String>,
    handles: HandleRegistry,
    active: ActiveChannel,
}

#[derive(Debug, Default)]
struct PumpOutcome {
    chunks: Vec<Vec<u8>>,
    error: Option<String>,
}

impl CaptureSession {
    pub fn new(channel: Channel, ctx: SessionContext) -> Self {
        let inner = SessionInner {
            channel,
            state: CaptureState::Idle,
            mime_type: None,
            chunk_count: Arc::new(AtomicUsize::new(0)),
            live: None,
            pump: None,
            opening: false,
            finalizing: false,
            epoch: 0,
            timer: DurationTimer::new(),
            artifact: None,
            handle: None,
            renderer: None,
            playback_watch: None,
            loading: false,
            play_seq: 0,
            is_playing: false,
            last_error: None,
            handles: ctx.handles.clone(),
            active: ctx.active.clone(),
        };

        Self {
            channel,
            ctx,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Open the microphone and start buffering chunks
    ///
    /// The session lock is released while the backend opens the device, so
    /// status reads and `clear` stay responsive during a permission prompt.
    /// A `clear` or `shutdown` in that window cancels the start.
    pub async fn start(&self) -> Result<(), CaptureError> {
        let epoch = {
            let mut inner = self.inner.lock().await;
            if inner.state != CaptureState::Idle || inner.finalizing || inner.opening {
                return Err(self.invalid("start", inner.state));
            }

            self.ctx.active.acquire(self.channel)?;
            inner.opening = true;
            inner.epoch
        };

        let opened = self.open_capture().await;

        let mut guard = self.inner.lock().await;
        if guard.epoch != epoch {
            drop(guard);
            if let Ok((stream, _)) = opened {
                release_capture(self.channel, Some(stream.control)).await;
            }
            info!("{} recording cancelled while opening", self.channel.label());
            return Err(CaptureError::Cancelled { channel: self.channel });
        }

        let inner = &mut *guard;
        inner.opening = false;

        let (stream, mime_type) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                self.ctx.active.release(self.channel);
                error!("Failed to start {} recording: {}", self.channel, e);
                inner.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        inner.state = CaptureState::Recording;
        inner.mime_type = Some(mime_type.clone());
        inner.last_error = None;
        inner.chunk_count.store(0, Ordering::SeqCst);
        inner.timer.reset();
        inner.timer.start();
        inner.live = Some(stream.control);
        inner.pump = Some(tokio::spawn(pump(
            self.channel,
            stream.events,
            Arc::clone(&inner.chunk_count),
            Arc::downgrade(&self.inner),
        )));

        info!(
            "{} recording started ({}, via {})",
            self.channel.label(),
            mime_type,
            self.ctx.backend.name()
        );

        Ok(())
    }

    async fn open_capture(&self) -> Result<(CaptureStream, String), CaptureError> {
        let settings = &self.ctx.settings;
        let backend = &self.ctx.backend;

        let mime_type = format::negotiate_mime(&settings.mime_preferences, |mime| {
            backend.is_type_supported(mime)
        })
        .ok_or_else(|| {
            CaptureError::Unavailable(format!(
                "No supported audio container (tried {})",
                settings.mime_preferences.join(", ")
            ))
        })?;

        let stream = backend.open(&settings.constraints, &mime_type).await?;
        Ok((stream, mime_type))
    }

    pub async fn pause(&self) -> Result<(), CaptureError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if inner.state != CaptureState::Recording || inner.finalizing {
            return Err(self.invalid("pause", inner.state));
        }

        if let Some(live) = inner.live.as_mut() {
            live.pause()?;
        }
        inner.timer.stop();
        inner.state = CaptureState::Paused;

        info!("{} recording paused at {}s", self.channel.label(), inner.timer.seconds());
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), CaptureError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if inner.state != CaptureState::Paused || inner.finalizing {
            return Err(self.invalid("resume", inner.state));
        }

        if let Some(live) = inner.live.as_mut() {
            live.resume()?;
        }
        inner.timer.start();
        inner.state = CaptureState::Recording;

        info!("{} recording resumed", self.channel.label());
        Ok(())
    }

    /// Finish the capture and materialize the artifact
    ///
    /// Every chunk delivered before the capture reports `Stopped` ends up in
    /// the artifact, in arrival order.
    pub async fn stop(&self) -> Result<(), CaptureError> {
        let (live, pump, epoch) = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;

            if !inner.state.is_capturing() || inner.finalizing {
                return Err(self.invalid("stop", inner.state));
            }

            inner.finalizing = true;
            inner.timer.stop();
            (inner.live.take(), inner.pump.take(), inner.epoch)
        };

        release_capture(self.channel, live).await;

        let outcome = match pump {
            Some(pump) => pump.await.unwrap_or_else(|e| {
                error!("{} chunk buffer task failed: {}", self.channel, e);
                PumpOutcome::default()
            }),
            None => PumpOutcome::default(),
        };

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        // Shut down while draining: the chunks go with the session
        if inner.epoch != epoch {
            info!("{} recording discarded during teardown", self.channel.label());
            return Err(CaptureError::Cancelled { channel: self.channel });
        }

        let mime_type = inner.mime_type.clone().unwrap_or_default();
        let artifact = AudioArtifact::from_chunks(&outcome.chunks, mime_type);
        let handle = self.ctx.handles.issue(artifact.clone());

        if let Some(e) = outcome.error {
            warn!("{} capture reported an error while stopping: {}", self.channel, e);
        }

        info!(
            "{} recording stopped: {}s, {} chunks, {} bytes",
            self.channel.label(),
            inner.timer.seconds(),
            outcome.chunks.len(),
            artifact.len()
        );

        inner.artifact = Some(artifact);
        inner.handle = Some(handle);
        inner.state = CaptureState::Stopped;
        inner.finalizing = false;
        self.ctx.active.release(self.channel);

        Ok(())
    }

    /// Discard the recording and return to idle
    ///
    /// From `Stopped` this revokes the playable handle and stops any
    /// preview; from `Recording`/`Paused` it cancels the capture, and while
    /// `start` is still opening the device it cancels the start.
    pub async fn clear(&self) -> Result<(), CaptureError> {
        let (live, pump, epoch) = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;

            if inner.finalizing {
                return Err(self.invalid("clear", inner.state));
            }

            inner.timer.stop();
            if inner.state.is_capturing() {
                inner.finalizing = true;
            }
            (inner.live.take(), inner.pump.take(), inner.epoch)
        };

        release_capture(self.channel, live).await;
        if let Some(pump) = pump {
            pump.abort();
        }

        let mut inner = self.inner.lock().await;
        // A shutdown in between already reset the session
        if inner.epoch == epoch {
            inner.reset();
        }
        info!("{} recording cleared", self.channel.label());
        Ok(())
    }

    /// Start or pause preview playback of the finished artifact
    ///
    /// Returns whether the artifact is now playing. The first play loads
    /// the artifact into the sink without holding the session lock; a
    /// toggle while that load is pending has no effect. Render failures
    /// leave the artifact untouched.
    pub async fn toggle_playback(&self) -> Result<bool, PlaybackError> {
        let (handle, epoch) = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;

            let handle = match (&inner.state, &inner.handle) {
                (CaptureState::Stopped, Some(handle)) => handle.clone(),
                _ => return Err(PlaybackError::NothingToPlay(self.channel)),
            };

            if inner.is_playing {
                if let Some(renderer) = inner.renderer.as_mut() {
                    renderer.pause();
                }
                inner.is_playing = false;
                debug!("{} preview paused", self.channel);
                return Ok(false);
            }

            if inner.renderer.is_some() {
                inner.play_preview()?;
                return Ok(true);
            }

            if inner.loading {
                debug!("{} preview still loading", self.channel);
                return Ok(false);
            }

            inner.loading = true;
            (handle, inner.epoch)
        };

        let loaded = match self.ctx.handles.resolve(&handle) {
            Some(artifact) => self.ctx.sink.load(artifact).await,
            None => Err(PlaybackError::Revoked(handle.to_string())),
        };

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        // Cleared or shut down while loading
        if inner.epoch != epoch {
            return Err(PlaybackError::NothingToPlay(self.channel));
        }
        inner.loading = false;

        let loaded = loaded.map_err(|e| {
            warn!("Failed to load {} preview: {}", self.channel, e);
            e
        })?;

        inner.renderer = Some(loaded.renderer);
        inner.playback_watch = Some(tokio::spawn(watch_playback(
            self.channel,
            loaded.events,
            Arc::downgrade(&self.inner),
        )));

        inner.play_preview()?;
        Ok(true)
    }

    /// Tear everything down: capture, timer, preview and handle
    ///
    /// A `stop` or `start` still in flight finds the session reset and
    /// discards its result.
    pub async fn shutdown(&self) {
        let (live, pump) = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            inner.timer.stop();
            (inner.live.take(), inner.pump.take())
        };

        if let Some(pump) = pump {
            pump.abort();
        }
        release_capture(self.channel, live).await;

        self.inner.lock().await.reset();
        debug!("{} session shut down", self.channel);
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        let duration_seconds = inner.timer.seconds();

        SessionSnapshot {
            channel: self.channel,
            state: inner.state,
            starting: inner.opening,
            duration_seconds,
            duration: format::format_duration(duration_seconds),
            is_playing: inner.is_playing,
            mime_type: inner.mime_type.clone(),
            chunk_count: inner.chunk_count.load(Ordering::SeqCst),
            artifact_bytes: inner.artifact.as_ref().map(AudioArtifact::len),
            playback_handle: inner.handle.as_ref().map(|h| h.to_string()),
            last_error: inner.last_error.clone(),
        }
    }

    pub async fn state(&self) -> CaptureState {
        self.inner.lock().await.state
    }

    pub async fn duration_seconds(&self) -> u64 {
        self.inner.lock().await.timer.seconds()
    }

    pub async fn is_playing(&self) -> bool {
        self.inner.lock().await.is_playing
    }

    pub async fn artifact(&self) -> Option<AudioArtifact> {
        self.inner.lock().await.artifact.clone()
    }

    pub async fn playback_handle(&self) -> Option<PlaybackHandle> {
        self.inner.lock().await.handle.clone()
    }

    /// The upload tuple for this channel, if a finished artifact exists
    pub async fn finished(&self) -> Option<FinishedRecording> {
        let inner = self.inner.lock().await;
        inner
            .artifact
            .clone()
            .map(|artifact| FinishedRecording::new(self.channel, artifact, inner.timer.seconds()))
    }

    fn invalid(&self, operation: &'static str, state: CaptureState) -> CaptureError {
        CaptureError::InvalidState {
            channel: self.channel,
            operation,
            state,
        }
    }
}

impl SessionInner {
    /// Release preview, handle and token; back to a fresh idle session
    fn reset(&mut self) {
        self.stop_preview();
        if let Some(handle) = self.handle.take() {
            self.handles.revoke(&handle);
        }
        self.artifact = None;
        self.timer.stop();
        self.timer.reset();
        self.chunk_count.store(0, Ordering::SeqCst);
        self.mime_type = None;
        self.last_error = None;
        self.opening = false;
        self.finalizing = false;
        self.loading = false;
        self.epoch += 1;
        self.state = CaptureState::Idle;
        self.active.release(self.channel);
    }

    /// Play the loaded renderer from the start under a fresh sequence number
    fn play_preview(&mut self) -> Result<(), PlaybackError> {
        self.play_seq += 1;
        let play = self.play_seq;

        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = renderer.play(play) {
                warn!("Failed to play {} preview: {}", self.channel, e);
                self.is_playing = false;
                return Err(e);
            }
        }

        self.is_playing = true;
        debug!("{} preview playing (play {})", self.channel, play);
        Ok(())
    }

    fn stop_preview(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.pause();
        }
        if let Some(watch) = self.playback_watch.take() {
            watch.abort();
        }
        self.is_playing = false;
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.stop_preview();
        if let Some(handle) = self.handle.take() {
            self.handles.revoke(&handle);
        }
        self.active.release(self.channel);
        // Dropping `live` releases the device
    }
}

/// Stop a live capture and drop it; dropping releases the device even when
/// `stop` fails
async fn release_capture(channel: Channel, live: Option<Box<dyn LiveCapture>>) {
    if let Some(mut live) = live {
        if let Err(e) = live.stop().await {
            warn!("Failed to stop {} capture cleanly: {}", channel, e);
        }
    }
}

/// Buffer capture chunks in arrival order until the capture stops
///
/// A device error while not finalizing is fatal: the session returns to
/// idle with the error recorded and the microphone released.
async fn pump(
    channel: Channel,
    mut events: mpsc::UnboundedReceiver<CaptureEvent>,
    chunk_count: Arc<AtomicUsize>,
    session: Weak<Mutex<SessionInner>>,
) -> PumpOutcome {
    let mut outcome = PumpOutcome::default();

    while let Some(event) = events.recv().await {
        match event {
            CaptureEvent::Data(chunk) => {
                // Empty data events carry nothing
                if chunk.is_empty() {
                    continue;
                }
                outcome.chunks.push(chunk);
                chunk_count.fetch_add(1, Ordering::SeqCst);
            }
            CaptureEvent::Stopped => break,
            CaptureEvent::Error(message) => {
                error!("{} capture failed: {}", channel, message);
                outcome.error = Some(message.clone());
                if let Some(session) = session.upgrade() {
                    fail_capture(channel, &session, message).await;
                }
                break;
            }
        }
    }

    outcome
}

async fn fail_capture(channel: Channel, session: &Mutex<SessionInner>, message: String) {
    let live = {
        let mut inner = session.lock().await;
        if inner.finalizing || !inner.state.is_capturing() {
            return;
        }

        inner.timer.stop();
        inner.pump.take();
        inner.state = CaptureState::Idle;
        inner.chunk_count.store(0, Ordering::SeqCst);
        inner.last_error = Some(CaptureError::Device(message).to_string());
        inner.active.release(channel);
        inner.live.take()
    };

    release_capture(channel, live).await;
}

async fn watch_playback(
    channel: Channel,
    mut events: mpsc::UnboundedReceiver<PlaybackUpdate>,
    session: Weak<Mutex<SessionInner>>,
) {
    while let Some(update) = events.recv().await {
        let session = match session.upgrade() {
            Some(session) => session,
            None => break,
        };
        let mut inner = session.lock().await;

        // Queued from a play that has since been restarted
        if update.play != inner.play_seq {
            debug!("{} ignoring event from play {}", channel, update.play);
            continue;
        }

        match update.event {
            PlaybackEvent::Ended => debug!("{} preview finished", channel),
            PlaybackEvent::Failed(message) => warn!("Failed to play {} preview: {}", channel, message),
        }
        inner.is_playing = false;
    }
}
