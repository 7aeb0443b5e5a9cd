use mp3lame_encoder::{Bitrate, Builder, Encoder, FlushNoGap, MonoPcm};
use tracing::debug;

use crate::error::TranscodeError;

/// Minimum output space LAME needs for a flush
const FLUSH_BUFFER_SIZE: usize = 7200;

/// Block-based MP3 encoder primitive
pub trait BlockEncoder {
    /// Encode one block of mono samples; may return no bytes while LAME buffers
    fn encode_block(&mut self, block: &[i16]) -> Result<Vec<u8>, TranscodeError>;

    /// Emit any trailing buffered frame data
    fn flush(&mut self) -> Result<Vec<u8>, TranscodeError>;
}

/// Creates encoders configured for a given stream
pub trait EncoderFactory: Send + Sync {
    fn create(
        &self,
        channels: u8,
        sample_rate: u32,
        bitrate_kbps: u32,
    ) -> Result<Box<dyn BlockEncoder>, TranscodeError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LameEncoderFactory;

impl EncoderFactory for LameEncoderFactory {
    fn create(
        &self,
        channels: u8,
        sample_rate: u32,
        bitrate_kbps: u32,
    ) -> Result<Box<dyn BlockEncoder>, TranscodeError> {
        Ok(Box::new(LameEncoder::new(channels, sample_rate, bitrate_kbps)?))
    }
}

pub struct LameEncoder {
    encoder: Encoder,
}

impl LameEncoder {
    pub fn new(channels: u8, sample_rate: u32, bitrate_kbps: u32) -> Result<Self, TranscodeError> {
        let mut builder = Builder::new()
            .ok_or_else(|| TranscodeError::EncodeFailed("Failed to create LAME builder".to_string()))?;

        builder
            .set_num_channels(channels)
            .map_err(|e| TranscodeError::EncodeFailed(format!("channels={}: {:?}", channels, e)))?;
        builder
            .set_sample_rate(sample_rate)
            .map_err(|e| TranscodeError::EncodeFailed(format!("sample rate={}: {:?}", sample_rate, e)))?;
        builder
            .set_brate(bitrate(bitrate_kbps)?)
            .map_err(|e| TranscodeError::EncodeFailed(format!("bitrate={}: {:?}", bitrate_kbps, e)))?;

        let encoder = builder
            .build()
            .map_err(|e| TranscodeError::EncodeFailed(format!("Failed to initialize LAME: {:?}", e)))?;

        debug!(
            "LAME encoder ready ({} channel(s), {}Hz, {}kbps)",
            channels, sample_rate, bitrate_kbps
        );

        Ok(Self { encoder })
    }
}

impl BlockEncoder for LameEncoder {
    fn encode_block(&mut self, block: &[i16]) -> Result<Vec<u8>, TranscodeError> {
        let mut out = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(block.len()));
        self.encoder
            .encode_to_vec(MonoPcm(block), &mut out)
            .map_err(|e| TranscodeError::EncodeFailed(format!("{:?}", e)))?;
        Ok(out)
    }

    fn flush(&mut self) -> Result<Vec<u8>, TranscodeError> {
        let mut out = Vec::with_capacity(FLUSH_BUFFER_SIZE);
        self.encoder
            .flush_to_vec::<FlushNoGap>(&mut out)
            .map_err(|e| TranscodeError::EncodeFailed(format!("{:?}", e)))?;
        Ok(out)
    }
}

fn bitrate(kbps: u32) -> Result<Bitrate, TranscodeError> {
    Ok(match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => {
            return Err(TranscodeError::EncodeFailed(format!(
                "Unsupported MP3 bitrate {}kbps",
                other
            )))
        }
    })
}
