//! Live session port: the bidirectional audio transport.
//!
//! # Design Rules
//!
//! - No WebSocket or wire-format types in any signature; `dambru-live`
//!   converts its protocol messages into these DTOs.
//! - `connect` never blocks on the handshake. It returns a handle at once and
//!   reports progress through the [`TransportEventSink`].
//! - A handle is closed at most once by its owner; after `close` the
//!   transport emits no further events for it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PersonaConfig;

/// Microphone frames are sent at this rate (mono).
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Model audio arrives at this rate (mono) unless its MIME type says otherwise.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// MIME descriptor attached to every outbound frame.
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Output modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseModality {
    #[default]
    Audio,
}

/// Parameters bound at connect time. Not mutable mid-session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConnectConfig {
    /// Model name without the `models/` prefix.
    pub model: String,
    /// Prebuilt voice name.
    pub voice_id: String,
    pub system_instruction: String,
    pub response_modality: ResponseModality,
}

impl LiveConnectConfig {
    /// Build the connect parameters for a persona.
    pub fn for_persona(model: impl Into<String>, persona: &PersonaConfig) -> Self {
        Self {
            model: model.into(),
            voice_id: persona.voice_id.as_str().to_string(),
            system_instruction: persona.system_instruction.clone(),
            response_modality: ResponseModality::Audio,
        }
    }
}

/// An outbound microphone frame in transport-safe form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedFrame {
    pub mime_type: String,
    /// Base64 of little-endian 16-bit PCM.
    pub data: String,
}

/// A model-produced audio segment, still base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingAudioChunk {
    pub mime_type: Option<String>,
    pub data: String,
}

impl IncomingAudioChunk {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            mime_type: None,
            data: data.into(),
        }
    }

    /// Sample rate declared by a `rate=` parameter in the MIME type, if any.
    pub fn declared_sample_rate(&self) -> Option<u32> {
        let mime = self.mime_type.as_deref()?;
        mime.split(';')
            .filter_map(|param| param.trim().strip_prefix("rate="))
            .find_map(|rate| rate.trim().parse().ok())
    }
}

/// One inbound message from the live session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveMessage {
    /// Audio payloads in the order the model produced them.
    pub audio: Vec<IncomingAudioChunk>,
    /// The user started talking over the model.
    pub interrupted: bool,
    /// The model finished its turn.
    pub turn_complete: bool,
}

impl LiveMessage {
    pub fn audio(chunk: IncomingAudioChunk) -> Self {
        Self {
            audio: vec![chunk],
            ..Self::default()
        }
    }

    pub fn interruption() -> Self {
        Self {
            interrupted: true,
            ..Self::default()
        }
    }
}

/// Lifecycle events reported by a transport for one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake finished; the handle accepts audio.
    Opened,
    Message(LiveMessage),
    /// Unrecoverable failure. The connection is gone.
    Error(String),
    /// Remote close. Not an error by itself.
    Closed { reason: Option<String> },
}

/// Callback through which a transport reports events.
pub type TransportEventSink = Arc<dyn Fn(TransportEvent) + Send + Sync + 'static>;

/// Returned by [`LiveSessionHandle::send_audio`]. Callers drop the frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to send audio frame: {0}")]
pub struct SendFailure(pub String);

/// Errors raised synchronously by [`LiveTransport::connect`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LivePortError {
    /// No API key was configured.
    #[error("No API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    /// The transport configuration is unusable.
    #[error("Invalid live transport configuration: {0}")]
    InvalidConfig(String),

    /// The connection could not be initiated.
    #[error("Failed to initiate live connection: {0}")]
    Connect(String),
}

/// An open (or opening) bidirectional session.
pub trait LiveSessionHandle: Send + Sync {
    /// Queue a frame for sending. Never blocks.
    fn send_audio(&self, frame: EncodedFrame) -> Result<(), SendFailure>;

    /// Close the session. Idempotent on the transport side.
    fn close(&self);
}

/// Factory for live sessions.
pub trait LiveTransport: Send + Sync {
    /// Begin a handshake. Events for the returned handle go to `on_event`.
    fn connect(
        &self,
        config: LiveConnectConfig,
        on_event: TransportEventSink,
    ) -> Result<Arc<dyn LiveSessionHandle>, LivePortError>;
}
