//! Audio device traits: the seam between the session core and real hardware.
//!
//! The session state machine only talks to these traits. The production
//! implementation ([`crate::audio_local`]) routes every call to the
//! dedicated audio thread; tests substitute in-memory fakes.
//!
//! All methods take `&self` so implementations can be shared behind `Arc`
//! or boxed without exclusive borrows.

use std::fmt;
use std::sync::Arc;

use crate::codec::PcmBuffer;
use crate::error::VoiceError;

/// Identifies one scheduled playback unit on an output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(pub u64);

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receives each fixed-size 16 kHz mono capture frame.
pub type FrameCallback = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// Fired by an output device when a playback unit finishes on its own.
///
/// Not fired for units removed with [`AudioOutput::stop`].
pub type PlaybackCompletion = Arc<dyn Fn(PlaybackId) + Send + Sync + 'static>;

/// A granted microphone stream.
pub trait AudioInput: Send + Sync {
    /// Start delivering frames to `on_frame`, replacing any previous callback.
    fn start_streaming(&self, on_frame: FrameCallback) -> Result<(), VoiceError>;

    /// Stop the stream and release the device.
    fn release(&self) -> Result<(), VoiceError>;
}

/// An output device context with its own clock.
pub trait AudioOutput: Send + Sync {
    /// Sample rate of the device context.
    fn sample_rate(&self) -> u32;

    /// Current device time in seconds since the context was opened.
    fn current_time(&self) -> f64;

    /// Schedule `buffer` to start at device time `when` (seconds).
    fn start_at(&self, id: PlaybackId, buffer: PcmBuffer, when: f64) -> Result<(), VoiceError>;

    /// Stop a unit immediately. Fails for unknown or finished units.
    fn stop(&self, id: PlaybackId) -> Result<(), VoiceError>;

    /// Stop everything and release the device.
    fn release(&self) -> Result<(), VoiceError>;
}

/// Opens device contexts for a session.
pub trait AudioBackend: Send + Sync {
    /// Acquire the microphone. `frame_size` is the number of samples per frame.
    fn open_input(&self, frame_size: usize) -> Result<Box<dyn AudioInput>, VoiceError>;

    /// Open an output context; `on_complete` reports natural completions.
    fn open_output(&self, on_complete: PlaybackCompletion)
    -> Result<Box<dyn AudioOutput>, VoiceError>;
}
