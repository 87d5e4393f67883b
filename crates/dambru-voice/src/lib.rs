#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod audio_io;
pub mod audio_local;
pub mod audio_thread;
pub mod capture;
pub mod codec;
pub mod devices;
pub mod error;
pub mod mixer;
pub mod output;
pub mod playback;
pub mod service;
pub mod session;
pub mod status;
pub mod uplink;

// Re-export commonly used types for convenience
pub use audio_io::{
    AudioBackend, AudioInput, AudioOutput, FrameCallback, PlaybackCompletion, PlaybackId,
};
pub use audio_local::LocalAudioBackend;
pub use codec::{CodecError, PcmBuffer};
pub use devices::{AudioDeviceInfo, list_input_devices, list_output_devices};
pub use error::VoiceError;
pub use playback::{PlaybackScheduler, ScheduledPlayback};
pub use service::CompanionService;
pub use session::{SessionConfig, SessionEvent, SessionManager, StartOutcome};
pub use status::StatusProjection;
pub use uplink::{CapturePipeline, CaptureStats};

// Silence unused dev-dependency warnings for test-only crates
#[cfg(test)]
use mockall as _;
