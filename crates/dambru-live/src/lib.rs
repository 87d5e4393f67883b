#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

mod config;
mod error;
pub mod protocol;
mod search;
mod transport;

// ============================================================================
// Public API
// ============================================================================

// Configuration
pub use config::{DEFAULT_API_BASE_URL, DEFAULT_LIVE_ENDPOINT, LiveClientConfig};

// Errors
pub use error::{LiveError, LiveResult};

// Adapters
pub use search::GeminiSearchClient;
pub use transport::{GeminiLiveTransport, GeminiSession, OUTBOUND_QUEUE_FRAMES};
