#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{PersonaCatalog, PersonaConfig, PrebuiltVoice, UnknownVoice};
pub use events::{
    SEARCH_FAILED_MESSAGE, START_FAILED_MESSAGE, SessionState, SessionStatus,
    TRANSPORT_ERROR_MESSAGE,
};
pub use ports::{
    CAPTURE_MIME_TYPE, CAPTURE_SAMPLE_RATE, EncodedFrame, GroundedSearchPort, IncomingAudioChunk,
    LiveConnectConfig, LiveMessage, LivePortError, LiveSessionHandle, LiveTransport,
    PLAYBACK_SAMPLE_RATE, ResponseModality, SEARCH_INSTRUCTION_SUFFIX, SearchAnswer,
    SearchPortError, SearchSource, SendFailure, TransportEvent, TransportEventSink,
    search_instruction,
};
pub use settings::{
    DEFAULT_CAPTURE_FRAME_SIZE, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_LIVE_MODEL,
    DEFAULT_PERSONA_ID, DEFAULT_SEARCH_MODEL, Settings, SettingsError, validate_settings,
};

// Silence unused dev-dependency warnings for test-only crates
#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use tokio as _;
#[cfg(test)]
use tokio_test as _;
