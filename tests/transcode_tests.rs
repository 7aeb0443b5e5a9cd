// Integration tests for the MP3 transcoding pipeline

mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{wav_tone, FailingDecoder, FakeEncoderFactory, FixedDecoder};
use loqa_recorder::audio::AudioArtifact;
use loqa_recorder::error::TranscodeError;
use loqa_recorder::transcode::{
    encode_blocks, LameEncoderFactory, PcmDecoder, SymphoniaDecoder, Transcoder, MP3_BLOCK_SIZE,
};

#[test]
fn test_symphonia_decodes_wav() -> Result<()> {
    let wav = wav_tone(16000, 8000);

    let decoded = SymphoniaDecoder::new().decode(&wav, "audio/wav")?;

    assert_eq!(decoded.sample_rate, 16000);
    assert_eq!(decoded.channels.len(), 1);
    assert_eq!(decoded.frames(), 8000);
    assert!((decoded.duration().as_secs_f64() - 0.5).abs() < 0.001);
    assert!(decoded.channels[0].iter().all(|s| (-1.0..=1.0).contains(s)));

    Ok(())
}

#[test]
fn test_symphonia_rejects_garbage() {
    let result = SymphoniaDecoder::new().decode(b"definitely not audio", "audio/webm");
    assert!(matches!(result, Err(TranscodeError::DecodeFailed(_))));
}

#[test]
fn test_blocks_of_1152_then_flush() -> Result<()> {
    let factory = FakeEncoderFactory::default();
    let log = Arc::clone(&factory.log);

    // 2.5 blocks of samples
    let samples = vec![0.25f32; MP3_BLOCK_SIZE * 2 + MP3_BLOCK_SIZE / 2];
    let transcoder = Transcoder::new(
        Arc::new(FixedDecoder {
            sample_rate: 22050,
            channels: vec![samples, vec![1.0; 10]],
        }),
        Arc::new(factory),
        128,
    );

    let mp3 = transcoder.encode_blocking(&AudioArtifact::new(b"ignored".to_vec(), "audio/webm"))?;

    // Block outputs in order, then the flush output
    assert_eq!(mp3.payload(), &[1, 2, 3, 0xFF]);
    assert_eq!(mp3.mime_type(), "audio/mp3");
    assert_eq!(mp3.file_extension(), "mp3");

    let log = log.lock().unwrap();
    assert_eq!(log.created, vec![(1, 22050, 128)]);
    assert_eq!(log.blocks, vec![MP3_BLOCK_SIZE, MP3_BLOCK_SIZE, MP3_BLOCK_SIZE / 2]);
    assert_eq!(log.flushes, 1);

    Ok(())
}

#[test]
fn test_empty_input_still_flushes() -> Result<()> {
    let factory = FakeEncoderFactory::default();
    let log = Arc::clone(&factory.log);
    let mut encoder = loqa_recorder::transcode::EncoderFactory::create(&factory, 1, 44100, 128)?;

    let mp3 = encode_blocks(encoder.as_mut(), &[])?;

    assert_eq!(mp3, vec![0xFF]);
    assert!(log.lock().unwrap().blocks.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_wav_to_mp3_with_lame() -> Result<()> {
    let wav = AudioArtifact::new(wav_tone(44100, 44100), "audio/wav");

    let mp3 = Transcoder::lame(128).encode(&wav).await?;

    assert_eq!(mp3.mime_type(), "audio/mp3");
    assert!(!mp3.is_empty());
    // One second at 128 kbps is roughly 16 KB
    assert!(mp3.len() > 8_000 && mp3.len() < 32_000, "unexpected size {}", mp3.len());

    // The result decodes back to about one second
    let decoded = SymphoniaDecoder::new().decode(mp3.payload(), mp3.mime_type())?;
    assert_eq!(decoded.sample_rate, 44100);
    assert!((decoded.duration().as_secs_f64() - 1.0).abs() < 0.1);

    Ok(())
}

#[tokio::test]
async fn test_decode_failure_surfaces() {
    let transcoder = Transcoder::new(Arc::new(FailingDecoder), Arc::new(LameEncoderFactory), 128);
    let artifact = AudioArtifact::new(b"raw".to_vec(), "audio/webm");

    let err = transcoder.encode(&artifact).await.unwrap_err();
    assert!(matches!(err, TranscodeError::DecodeFailed(_)));
}

#[tokio::test]
async fn test_unsupported_bitrate_is_encode_failure() {
    let wav = AudioArtifact::new(wav_tone(16000, 1600), "audio/wav");

    let err = Transcoder::lame(127).encode(&wav).await.unwrap_err();
    assert!(matches!(err, TranscodeError::EncodeFailed(_)));
}
