//! Audio capture module: microphone input via `cpal`.
//!
//! Acquires the default input device, downmixes to mono, resamples to
//! 16 kHz and cuts the stream into fixed-size frames for the live session.
//! The device is held open from [`AudioCapture::open`] until
//! [`AudioCapture::release`]; frames flow only once a callback is installed
//! with [`AudioCapture::start_streaming`].

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use dambru_core::CAPTURE_SAMPLE_RATE;
use rubato::{FftFixedIn, Resampler as _};

use crate::audio_io::FrameCallback;
use crate::error::VoiceError;

/// Input chunk size for the FFT resampler.
const RESAMPLE_CHUNK: usize = 1024;

/// Microphone capture handle.
///
/// Wraps a `cpal` input stream. Must stay on the thread that created it
/// (see [`crate::audio_thread`]).
pub struct AudioCapture {
    /// The active cpal input stream (None once released).
    stream: Option<Stream>,

    /// Installed frame consumer; `None` until streaming starts.
    forwarder: Arc<Mutex<Option<FrameForwarder>>>,

    /// Samples per emitted frame.
    frame_size: usize,

    /// The device sample rate (used for resampling).
    device_sample_rate: u32,
}

impl AudioCapture {
    /// Acquire the default input device and start its stream.
    pub fn open(frame_size: usize) -> Result<Self, VoiceError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(VoiceError::NoInputDevice)?;

        let config = device.default_input_config().map_err(|e| match e {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => {
                VoiceError::MicrophonePermissionDenied
            }
            other => VoiceError::InputStreamError(other.to_string()),
        })?;

        let device_sample_rate = config.sample_rate().0;
        let device_channels = config.channels();
        let forwarder = Arc::new(Mutex::new(None));

        let stream = build_input_stream(&device, &config, Arc::clone(&forwarder))?;
        stream
            .play()
            .map_err(|e| VoiceError::InputStreamError(e.to_string()))?;

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = device_sample_rate,
            channels = device_channels,
            frame_size,
            "Microphone acquired"
        );

        Ok(Self {
            stream: Some(stream),
            forwarder,
            frame_size,
            device_sample_rate,
        })
    }

    /// Deliver 16 kHz mono frames of `frame_size` samples to `on_frame`.
    pub fn start_streaming(&self, on_frame: FrameCallback) -> Result<(), VoiceError> {
        if self.stream.is_none() {
            return Err(VoiceError::InputStreamError(
                "microphone already released".to_string(),
            ));
        }

        let resampler = if self.device_sample_rate == CAPTURE_SAMPLE_RATE {
            None
        } else {
            Some(StreamResampler::new(
                self.device_sample_rate,
                CAPTURE_SAMPLE_RATE,
            )?)
        };

        let forwarder = FrameForwarder {
            on_frame,
            resampler,
            chunker: FrameChunker::new(self.frame_size),
            scratch: Vec::new(),
        };

        let mut slot = self
            .forwarder
            .lock()
            .map_err(|e| VoiceError::InputStreamError(e.to_string()))?;
        *slot = Some(forwarder);

        tracing::debug!(
            device_rate = self.device_sample_rate,
            frame_size = self.frame_size,
            "Capture streaming started"
        );
        Ok(())
    }

    /// Stop the stream and release the microphone.
    pub fn release(&mut self) {
        if let Ok(mut slot) = self.forwarder.lock() {
            slot.take();
        }
        if self.stream.take().is_some() {
            tracing::info!("Microphone released");
        }
    }

    pub const fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// Build a cpal input stream that feeds the shared forwarder.
fn build_input_stream(
    device: &Device,
    config: &cpal::SupportedStreamConfig,
    forwarder: Arc<Mutex<Option<FrameForwarder>>>,
) -> Result<Stream, VoiceError> {
    let stream_config: StreamConfig = config.clone().into();
    let sample_format = config.sample_format();
    let channels = config.channels();

    let err_fn = |err: cpal::StreamError| {
        tracing::error!(%err, "Audio input stream error");
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                deliver(&forwarder, data, channels);
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let float_data: Vec<f32> =
                    data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                deliver(&forwarder, &float_data, channels);
            },
            err_fn,
            None,
        ),
        SampleFormat::I32 => device.build_input_stream(
            &stream_config,
            move |data: &[i32], _: &cpal::InputCallbackInfo| {
                #[allow(clippy::cast_precision_loss)]
                let float_data: Vec<f32> =
                    data.iter().map(|&s| s as f32 / 2_147_483_648.0).collect();
                deliver(&forwarder, &float_data, channels);
            },
            err_fn,
            None,
        ),
        _ => {
            return Err(VoiceError::InputStreamError(format!(
                "Unsupported sample format: {sample_format:?}"
            )));
        }
    };

    // cpal reports a denied or revoked microphone grant as an unavailable device.
    stream.map_err(|e| match e {
        cpal::BuildStreamError::DeviceNotAvailable => VoiceError::MicrophonePermissionDenied,
        other => VoiceError::InputStreamError(other.to_string()),
    })
}

/// Hand one device callback's worth of interleaved samples to the forwarder.
fn deliver(forwarder: &Mutex<Option<FrameForwarder>>, interleaved: &[f32], channels: u16) {
    let Ok(mut slot) = forwarder.lock() else {
        return;
    };
    let Some(forwarder) = slot.as_mut() else {
        return;
    };
    if channels > 1 {
        forwarder.push(&stereo_to_mono(interleaved, channels));
    } else {
        forwarder.push(interleaved);
    }
}

struct FrameForwarder {
    on_frame: FrameCallback,
    resampler: Option<StreamResampler>,
    chunker: FrameChunker,
    scratch: Vec<f32>,
}

impl FrameForwarder {
    fn push(&mut self, mono: &[f32]) {
        let Self {
            on_frame,
            resampler,
            chunker,
            scratch,
        } = self;

        match resampler {
            Some(resampler) => {
                scratch.clear();
                if let Err(err) = resampler.process(mono, scratch) {
                    tracing::warn!(%err, "Dropping capture block");
                    return;
                }
                chunker.push(scratch, |frame| on_frame(frame));
            }
            None => chunker.push(mono, |frame| on_frame(frame)),
        }
    }
}

/// Cuts a continuous sample stream into frames of exactly `frame_size`.
///
/// At most one partial frame is buffered.
#[derive(Debug)]
pub struct FrameChunker {
    frame_size: usize,
    pending: Vec<f32>,
}

impl FrameChunker {
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size),
        }
    }

    /// Append samples, calling `emit` once per completed frame, in order.
    pub fn push(&mut self, mut samples: &[f32], mut emit: impl FnMut(&[f32])) {
        while !samples.is_empty() {
            let take = (self.frame_size - self.pending.len()).min(samples.len());
            self.pending.extend_from_slice(&samples[..take]);
            samples = &samples[take..];

            if self.pending.len() == self.frame_size {
                emit(&self.pending);
                self.pending.clear();
            }
        }
    }

    /// Samples waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub const fn frame_size(&self) -> usize {
        self.frame_size
    }
}

/// Streaming mono resampler; carries leftover input between calls.
pub struct StreamResampler {
    resampler: FftFixedIn<f32>,
    input: Vec<f32>,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32) -> Result<Self, VoiceError> {
        let resampler = FftFixedIn::<f32>::new(
            from_rate as usize,
            to_rate as usize,
            RESAMPLE_CHUNK,
            2, // sub-chunks for quality
            1, // mono
        )
        .map_err(|e| VoiceError::ResampleError(e.to_string()))?;

        Ok(Self {
            resampler,
            input: Vec::with_capacity(RESAMPLE_CHUNK * 2),
        })
    }

    /// Resample as many whole chunks as are available, appending to `out`.
    pub fn process(&mut self, samples: &[f32], out: &mut Vec<f32>) -> Result<(), VoiceError> {
        self.input.extend_from_slice(samples);

        let mut pos = 0;
        loop {
            let needed = self.resampler.input_frames_next();
            if self.input.len() - pos < needed {
                break;
            }
            let chunk = &self.input[pos..pos + needed];
            let result = self
                .resampler
                .process(&[chunk], None)
                .map_err(|e| VoiceError::ResampleError(e.to_string()))?;
            if let Some(channel) = result.first() {
                out.extend_from_slice(channel);
            }
            pos += needed;
        }

        self.input.drain(..pos);
        Ok(())
    }

    /// Zero-pad and resample any buffered input, keeping only the
    /// proportional share of the padded output.
    pub fn flush(&mut self, out: &mut Vec<f32>) -> Result<(), VoiceError> {
        if self.input.is_empty() {
            return Ok(());
        }
        let remaining = self.input.len();
        let needed = self.resampler.input_frames_next();
        let mut padded = std::mem::take(&mut self.input);
        padded.resize(needed.max(remaining), 0.0);

        let result = self
            .resampler
            .process(&[&padded[..needed]], None)
            .map_err(|e| VoiceError::ResampleError(e.to_string()))?;
        if let Some(channel) = result.first() {
            #[allow(
                clippy::cast_precision_loss,
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss
            )]
            let take = ((remaining as f64 / needed as f64) * channel.len() as f64).ceil() as usize;
            out.extend_from_slice(&channel[..take.min(channel.len())]);
        }
        Ok(())
    }
}

/// Convert interleaved multi-channel audio to mono by averaging channels.
fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels);
    #[allow(clippy::cast_precision_loss)]
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Resample a complete mono buffer from one sample rate to another.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, VoiceError> {
    if samples.is_empty() || from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let mut resampler = StreamResampler::new(from_rate, to_rate)?;
    let mut output = Vec::new();
    resampler.process(samples, &mut output)?;
    resampler.flush(&mut output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_frames(chunker: &mut FrameChunker, samples: &[f32]) -> Vec<Vec<f32>> {
        let mut frames = Vec::new();
        chunker.push(samples, |f| frames.push(f.to_vec()));
        frames
    }

    #[test]
    fn test_chunker_emits_exact_frames_across_pushes() {
        let mut chunker = FrameChunker::new(4);

        assert!(collect_frames(&mut chunker, &[1.0, 2.0, 3.0]).is_empty());
        assert_eq!(chunker.pending(), 3);

        let frames = collect_frames(&mut chunker, &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(
            frames,
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]]
        );
        assert_eq!(chunker.pending(), 1);
    }

    #[test]
    fn test_chunker_large_push_yields_many_frames_in_order() {
        let mut chunker = FrameChunker::new(2);
        let samples: Vec<f32> = (0..7u8).map(f32::from).collect();
        let frames = collect_frames(&mut chunker, &samples);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], vec![4.0, 5.0]);
        assert_eq!(chunker.pending(), 1);
    }

    #[test]
    fn test_chunker_zero_size_is_clamped() {
        assert_eq!(FrameChunker::new(0).frame_size(), 1);
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let mono = stereo_to_mono(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_stream_resampler_buffers_partial_chunks() {
        let mut resampler = StreamResampler::new(48_000, 16_000).unwrap();
        let mut out = Vec::new();

        resampler.process(&[0.0; 500], &mut out).unwrap();
        assert!(out.is_empty());

        resampler.process(&[0.0; 2048], &mut out).unwrap();
        assert!(!out.is_empty());
        assert!(out.len() < 2548 / 2);
    }

    #[test]
    fn test_resample_identity_and_ratio() {
        let same = resample(&[0.1, 0.2], 24_000, 24_000).unwrap();
        assert_eq!(same, vec![0.1, 0.2]);

        let up = resample(&vec![0.0; 16_000], 16_000, 24_000).unwrap();
        assert!(up.len().abs_diff(24_000) <= 2, "got {}", up.len());
    }
}
