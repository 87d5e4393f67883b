//! Voice core error types.

use dambru_core::{LivePortError, SendFailure};

use crate::codec::CodecError;

/// Errors that can occur in the audio streaming core.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// No audio input device found.
    #[error("No audio input device found")]
    NoInputDevice,

    /// No audio output device found.
    #[error("No audio output device found")]
    NoOutputDevice,

    /// Failed to open audio input stream.
    #[error("Failed to open audio input stream: {0}")]
    InputStreamError(String),

    /// Failed to open audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStreamError(String),

    /// Microphone permission denied.
    #[error("Microphone permission denied")]
    MicrophonePermissionDenied,

    /// Audio resampling error.
    #[error("Audio resampling failed: {0}")]
    ResampleError(String),

    /// An incoming audio chunk could not be decoded.
    #[error("Audio decode failed: {0}")]
    Decode(#[from] CodecError),

    /// The live transport could not be started or reported a failure.
    #[error("Live transport error: {0}")]
    Transport(String),

    /// An outbound frame could not be sent.
    #[error(transparent)]
    Send(#[from] SendFailure),

    /// The playback handle is unknown to the output device.
    #[error("Unknown playback handle {0}")]
    UnknownPlayback(u64),

    /// The dedicated audio thread exited unexpectedly.
    #[error("Audio thread died unexpectedly")]
    AudioThreadDied,

    /// The session service has shut down.
    #[error("Session service is not running")]
    ServiceStopped,
}

impl From<LivePortError> for VoiceError {
    fn from(err: LivePortError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl VoiceError {
    /// Whether this error ends a live session.
    ///
    /// Decode and send failures affect a single chunk or frame only.
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Decode(_) | Self::Send(_) | Self::UnknownPlayback(_)
        )
    }
}
