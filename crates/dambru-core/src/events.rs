//! Session status events and DTOs.
//!
//! [`SessionStatus`] is the signal consumed by front ends (avatar, panels,
//! CLI). It is a wire-shape DTO: serialised camelCase, no voice-crate types.

use serde::{Deserialize, Serialize};

/// Shown when the live transport reports an error.
pub const TRANSPORT_ERROR_MESSAGE: &str = "Connection encountered an error. Please try again.";

/// Shown when a session cannot be started (microphone or connection failure).
pub const START_FAILED_MESSAGE: &str = "Could not access microphone or connect to AI service.";

/// Shown when a grounded web search fails.
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to perform research. Please check your connection.";

/// Lifecycle state of the live session.
///
/// `Idle → Connecting → Active → (Closing) → Idle`; errors and remote
/// closes also return to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Active,
    Closing,
}

impl SessionState {
    /// Label used in logs and CLI output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closing => "closing",
        }
    }

    /// Whether a session handle may exist in this state.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Connecting | Self::Active)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible session status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Current lifecycle state.
    pub state: SessionState,
    /// True exactly while the session is `Active`.
    pub connected: bool,
    /// True while a start is in progress and the transport has not opened.
    pub initializing: bool,
    /// Last user-visible error, cleared when a new start begins.
    pub last_error: Option<String>,
}

impl SessionStatus {
    /// Status of a freshly constructed, idle session.
    pub fn idle() -> Self {
        Self::default()
    }
}
