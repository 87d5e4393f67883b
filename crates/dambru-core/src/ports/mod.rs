//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No WebSocket, HTTP or audio-device types in any signature
//! - Traits are object safe so adapters can be injected as `Arc<dyn _>`
//! - Transport callbacks are plain closures; ordering is the adapter's job

pub mod live;
pub mod search;

pub use live::{
    CAPTURE_MIME_TYPE, CAPTURE_SAMPLE_RATE, EncodedFrame, IncomingAudioChunk, LiveConnectConfig,
    LiveMessage, LivePortError, LiveSessionHandle, LiveTransport, PLAYBACK_SAMPLE_RATE,
    ResponseModality, SendFailure, TransportEvent, TransportEventSink,
};
pub use search::{
    GroundedSearchPort, SEARCH_INSTRUCTION_SUFFIX, SearchAnswer, SearchPortError, SearchSource,
    search_instruction,
};
