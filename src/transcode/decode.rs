use std::io::Cursor;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::format;
use crate::error::TranscodeError;

/// Linear PCM, one sample vector per channel
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Generic audio decode primitive
pub trait PcmDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8], mime_type: &str) -> Result<DecodedAudio, TranscodeError>;
}

/// Decoder backed by symphonia's format probe and codec registry
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl PcmDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8], mime_type: &str) -> Result<DecodedAudio, TranscodeError> {
        let failed = |e: SymphoniaError| TranscodeError::DecodeFailed(e.to_string());

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let mut hint = Hint::new();
        hint.mime_type(mime_type);
        if let Some(ext) = format::probe_hint(mime_type) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(failed)?;
        let mut reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| TranscodeError::DecodeFailed("No audio track found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels: Vec<Vec<f32>> = track
            .codec_params
            .channels
            .map(|c| vec![Vec::new(); c.count()])
            .unwrap_or_default();

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(failed)?;

        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(failed(e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(failed(e)),
            };

            let spec = *decoded.spec();
            let channel_count = spec.channels.count();
            sample_rate.get_or_insert(spec.rate);
            if channels.len() != channel_count {
                channels.resize(channel_count, Vec::new());
            }

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            for frame in sample_buf.samples().chunks_exact(channel_count) {
                for (channel, &sample) in channels.iter_mut().zip(frame) {
                    channel.push(sample);
                }
            }
        }

        let sample_rate = sample_rate
            .ok_or_else(|| TranscodeError::DecodeFailed("Unknown sample rate".to_string()))?;

        if channels.is_empty() {
            return Err(TranscodeError::DecodeFailed("No audio channels".to_string()));
        }

        let decoded = DecodedAudio { sample_rate, channels };
        debug!(
            "Decoded {} ({} frames, {}Hz, {} channels)",
            mime_type,
            decoded.frames(),
            decoded.sample_rate,
            decoded.channels.len()
        );

        Ok(decoded)
    }
}
