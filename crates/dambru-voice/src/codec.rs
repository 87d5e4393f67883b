//! Codec utilities: PCM ⇄ transport-safe text, 16-bit ⇄ float.
//!
//! Outbound frames are normalised `f32` samples scaled by 32768, converted
//! to `i16`, packed little-endian and base64 encoded. Inbound chunks go the
//! other way and are de-interleaved into one buffer per channel.
//!
//! Quantisation uses Rust's saturating float→int cast: samples outside
//! `[-1, 1]` clip to `i16::MIN`/`i16::MAX` and `NaN` becomes silence. This
//! is expected behaviour, not a defect.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use dambru_core::{CAPTURE_MIME_TYPE, EncodedFrame, IncomingAudioChunk};

/// Scale between normalised samples and signed 16-bit PCM.
pub const PCM16_SCALE: f32 = 32_768.0;

/// Errors raised while decoding incoming audio.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("chunk of {len} bytes is not a whole number of {channels}-channel 16-bit frames")]
    MisalignedLength { len: usize, channels: u16 },

    #[error("channel count must be at least 1")]
    ZeroChannels,

    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
}

/// A decoded, de-interleaved block of audio.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Build a buffer from per-channel sample vectors of equal length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        debug_assert!(channels.windows(2).all(|w| w[0].len() == w[1].len()));
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![samples])
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Playback duration in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Collapse to a single channel by averaging.
    #[allow(clippy::cast_precision_loss)]
    pub fn into_mono(mut self) -> Vec<f32> {
        match self.channels.len() {
            0 => Vec::new(),
            1 => self.channels.swap_remove(0),
            n => {
                let scale = 1.0 / n as f32;
                (0..self.frames())
                    .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() * scale)
                    .collect()
            }
        }
    }
}

/// Quantise one normalised sample to signed 16-bit.
#[allow(clippy::cast_possible_truncation)]
pub fn quantize(sample: f32) -> i16 {
    (sample * PCM16_SCALE) as i16
}

/// Pack normalised samples as little-endian 16-bit PCM.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&quantize(sample).to_le_bytes());
    }
    bytes
}

/// Encode one capture frame for the live session.
pub fn encode_frame(samples: &[f32]) -> EncodedFrame {
    EncodedFrame {
        mime_type: CAPTURE_MIME_TYPE.to_string(),
        data: STANDARD.encode(encode_pcm16(samples)),
    }
}

/// Unpack interleaved little-endian 16-bit PCM into normalised channels.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<PcmBuffer, CodecError> {
    if channels == 0 {
        return Err(CodecError::ZeroChannels);
    }
    if sample_rate == 0 {
        return Err(CodecError::ZeroSampleRate);
    }

    let channel_count = usize::from(channels);
    if bytes.len() % (2 * channel_count) != 0 {
        return Err(CodecError::MisalignedLength {
            len: bytes.len(),
            channels,
        });
    }

    let frames = bytes.len() / (2 * channel_count);
    let mut out = vec![Vec::with_capacity(frames); channel_count];
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let value = i16::from_le_bytes([pair[0], pair[1]]);
        out[i % channel_count].push(f32::from(value) / PCM16_SCALE);
    }

    Ok(PcmBuffer::new(sample_rate, out))
}

/// Decode an incoming chunk into a playable buffer.
pub fn decode_to_samples(
    chunk: &IncomingAudioChunk,
    sample_rate: u32,
    channels: u16,
) -> Result<PcmBuffer, CodecError> {
    let bytes = STANDARD.decode(chunk.data.as_bytes())?;
    decode_pcm16(&bytes, sample_rate, channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_of(bytes: &[u8]) -> IncomingAudioChunk {
        IncomingAudioChunk::new(STANDARD.encode(bytes))
    }

    #[test]
    fn test_encode_packs_little_endian() {
        assert_eq!(encode_pcm16(&[0.5]), vec![0x00, 0x40]);
        assert_eq!(encode_pcm16(&[-1.0]), vec![0x00, 0x80]);
        assert_eq!(encode_pcm16(&[0.0, 1.0 / PCM16_SCALE]), vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_out_of_range_samples_clip() {
        assert_eq!(quantize(1.0), i16::MAX);
        assert_eq!(quantize(1.5), i16::MAX);
        assert_eq!(quantize(-1.5), i16::MIN);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn test_quantization_truncates_toward_zero() {
        assert_eq!(quantize(0.9 / PCM16_SCALE), 0);
        assert_eq!(quantize(-1.9 / PCM16_SCALE), -1);
    }

    #[test]
    fn test_encode_frame_tags_mime_type() {
        let frame = encode_frame(&[0.0; 4]);
        assert_eq!(frame.mime_type, "audio/pcm;rate=16000");
        assert_eq!(frame.data, STANDARD.encode([0u8; 8]));
    }

    #[test]
    fn test_round_trip_of_quantized_samples_is_exact() {
        let samples: Vec<f32> = [-32768i16, -12345, -1, 0, 1, 777, 32767]
            .iter()
            .map(|&v| f32::from(v) / PCM16_SCALE)
            .collect();

        let frame = encode_frame(&samples);
        let chunk = IncomingAudioChunk::new(frame.data);
        let decoded = decode_to_samples(&chunk, 16_000, 1).unwrap();

        let restored = decoded.channel(0).unwrap();
        assert_eq!(restored.len(), samples.len());
        for (a, b) in samples.iter().zip(restored) {
            assert!((a - b).abs() <= 1.0 / PCM16_SCALE, "{a} vs {b}");
        }
    }

    #[test]
    fn test_double_encoding_loses_no_precision() {
        let samples = [0.25f32, -0.75, 0.123_456];
        let once = decode_pcm16(&encode_pcm16(&samples), 24_000, 1).unwrap();
        let twice = decode_pcm16(&encode_pcm16(once.channel(0).unwrap()), 24_000, 1).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_odd_length_is_decode_error() {
        let err = decode_to_samples(&chunk_of(&[1, 2, 3]), 24_000, 1).unwrap_err();
        assert_eq!(err, CodecError::MisalignedLength { len: 3, channels: 1 });
    }

    #[test]
    fn test_stereo_requires_four_byte_frames() {
        let err = decode_pcm16(&[0; 6], 24_000, 2).unwrap_err();
        assert!(matches!(err, CodecError::MisalignedLength { len: 6, channels: 2 }));
    }

    #[test]
    fn test_stereo_is_deinterleaved() {
        // L = 0.5, R = -0.5, L = 0.25, R = 0
        let bytes = [0x00, 0x40, 0x00, 0xC0, 0x00, 0x20, 0x00, 0x00];
        let buffer = decode_pcm16(&bytes, 24_000, 2).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0).unwrap(), &[0.5, 0.25]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.5, 0.0]);
        assert_eq!(buffer.into_mono(), vec![0.0, 0.125]);
    }

    #[test]
    fn test_invalid_base64_is_decode_error() {
        let chunk = IncomingAudioChunk::new("not base64!!");
        assert!(matches!(
            decode_to_samples(&chunk, 24_000, 1),
            Err(CodecError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_zero_channels_and_rate_rejected() {
        assert_eq!(decode_pcm16(&[], 24_000, 0), Err(CodecError::ZeroChannels));
        assert_eq!(decode_pcm16(&[], 0, 1), Err(CodecError::ZeroSampleRate));
    }

    #[test]
    fn test_duration_follows_sample_rate() {
        let buffer = decode_pcm16(&vec![0; 24_000 * 2], 24_000, 1).unwrap();
        assert!((buffer.duration_secs() - 1.0).abs() < f64::EPSILON);

        let empty = decode_to_samples(&chunk_of(&[]), 24_000, 1).unwrap();
        assert!(empty.is_empty());
        assert!(empty.duration_secs().abs() < f64::EPSILON);
    }
}
