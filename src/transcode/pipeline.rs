use std::sync::Arc;

use tracing::{debug, info};

use super::decode::{PcmDecoder, SymphoniaDecoder};
use super::encode::{BlockEncoder, EncoderFactory, LameEncoderFactory};
use crate::audio::format::MP3_MIME;
use crate::audio::AudioArtifact;
use crate::error::TranscodeError;

/// Samples per MP3 frame granule
pub const MP3_BLOCK_SIZE: usize = 1152;

/// Default target bitrate in kbps
pub const DEFAULT_BITRATE_KBPS: u32 = 128;

/// Decode → 16-bit PCM → block MP3 encode
///
/// Stateless: every call builds a fresh encoder. Only channel 0 of the
/// source is encoded, at the source sample rate.
#[derive(Clone)]
pub struct Transcoder {
    decoder: Arc<dyn PcmDecoder>,
    encoders: Arc<dyn EncoderFactory>,
    bitrate_kbps: u32,
}

impl Transcoder {
    pub fn new(decoder: Arc<dyn PcmDecoder>, encoders: Arc<dyn EncoderFactory>, bitrate_kbps: u32) -> Self {
        Self {
            decoder,
            encoders,
            bitrate_kbps,
        }
    }

    /// symphonia decoding + LAME encoding
    pub fn lame(bitrate_kbps: u32) -> Self {
        Self::new(
            Arc::new(SymphoniaDecoder::new()),
            Arc::new(LameEncoderFactory),
            bitrate_kbps,
        )
    }

    pub fn bitrate_kbps(&self) -> u32 {
        self.bitrate_kbps
    }

    /// Transcode off the async executor
    pub async fn encode(&self, artifact: &AudioArtifact) -> Result<AudioArtifact, TranscodeError> {
        let this = self.clone();
        let artifact = artifact.clone();
        tokio::task::spawn_blocking(move || this.encode_blocking(&artifact))
            .await
            .map_err(|e| TranscodeError::EncodeFailed(format!("Encoder task failed: {}", e)))?
    }

    pub fn encode_blocking(&self, artifact: &AudioArtifact) -> Result<AudioArtifact, TranscodeError> {
        let decoded = self.decoder.decode(artifact.payload(), artifact.mime_type())?;

        let first_channel = decoded
            .channels
            .first()
            .ok_or_else(|| TranscodeError::DecodeFailed("No audio channels".to_string()))?;
        let samples = to_i16_samples(first_channel);

        let mut encoder = self.encoders.create(1, decoded.sample_rate, self.bitrate_kbps)?;
        let mp3 = encode_blocks(encoder.as_mut(), &samples)?;

        info!(
            "Transcoded {} ({} bytes) to MP3 ({} bytes, {} samples at {}Hz)",
            artifact.mime_type(),
            artifact.len(),
            mp3.len(),
            samples.len(),
            decoded.sample_rate
        );

        Ok(AudioArtifact::new(mp3, MP3_MIME))
    }
}

/// Clamp to [-1, 1] and scale by 32767, truncating toward zero
pub fn to_i16_samples(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Feed samples in `MP3_BLOCK_SIZE` blocks, flush, and concatenate output
/// in emission order
pub fn encode_blocks(encoder: &mut dyn BlockEncoder, samples: &[i16]) -> Result<Vec<u8>, TranscodeError> {
    let mut mp3 = Vec::new();
    let mut blocks = 0usize;

    for block in samples.chunks(MP3_BLOCK_SIZE) {
        mp3.extend_from_slice(&encoder.encode_block(block)?);
        blocks += 1;
    }
    mp3.extend_from_slice(&encoder.flush()?);

    debug!("Encoded {} blocks into {} bytes", blocks, mp3.len());
    Ok(mp3)
}
