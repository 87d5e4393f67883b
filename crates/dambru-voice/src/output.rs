//! Audio output module: speaker playback via `rodio`.
//!
//! Opens the default output device and attaches a single endless
//! [`MixerSource`]. All scheduling happens on the shared mixer state; this
//! type only keeps the device stream alive.

use rodio::{OutputStream, StreamError};

use crate::audio_io::PlaybackCompletion;
use crate::error::VoiceError;
use crate::mixer::{MixerSource, MixerState, SharedMixer, lock};

/// Output device context.
///
/// `rodio::OutputStream` must be kept alive for audio to play and is
/// `!Send` on some platforms, so this type lives on the audio thread.
pub struct AudioPlayback {
    /// rodio output stream (must be kept alive).
    _stream: OutputStream,

    /// Voices and device clock, shared with the rodio mixer thread.
    mixer: SharedMixer,
}

impl AudioPlayback {
    /// Open the default output device at `sample_rate` (mono).
    pub fn open(sample_rate: u32, on_complete: PlaybackCompletion) -> Result<Self, VoiceError> {
        let (stream, stream_handle) = OutputStream::try_default().map_err(|e| match e {
            StreamError::NoDevice => VoiceError::NoOutputDevice,
            other => VoiceError::OutputStreamError(other.to_string()),
        })?;

        let mixer = MixerState::shared(sample_rate);
        stream_handle
            .play_raw(MixerSource::new(mixer.clone(), on_complete))
            .map_err(|e| VoiceError::OutputStreamError(e.to_string()))?;

        tracing::info!(sample_rate, "Audio output opened on default device");

        Ok(Self {
            _stream: stream,
            mixer,
        })
    }

    /// Handle to the mixer for scheduling from other threads.
    pub fn mixer(&self) -> SharedMixer {
        self.mixer.clone()
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        let stopped = lock(&self.mixer).stop_all();
        tracing::info!(stopped, "Audio output released");
    }
}
