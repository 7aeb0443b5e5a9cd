//! In-process MP3 transcoding
//!
//! Turns a finished recording in any container symphonia can read into an
//! MP3 artifact without leaving the process:
//! - decode to linear PCM (`decode`)
//! - quantize channel 0 to 16-bit samples (`pipeline`)
//! - feed LAME in 1152-sample blocks and flush (`encode`)

mod decode;
mod encode;
mod pipeline;

pub use decode::{DecodedAudio, PcmDecoder, SymphoniaDecoder};
pub use encode::{BlockEncoder, EncoderFactory, LameEncoder, LameEncoderFactory};
pub use pipeline::{encode_blocks, to_i16_samples, Transcoder, DEFAULT_BITRATE_KBPS, MP3_BLOCK_SIZE};
