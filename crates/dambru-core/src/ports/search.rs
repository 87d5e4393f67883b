//! Grounded web search port.
//!
//! A one-shot text query answered by the model with web grounding, phrased
//! in the selected persona's voice. No retries are performed by callers or
//! implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PersonaConfig;

/// Appended to the persona instruction for search requests.
pub const SEARCH_INSTRUCTION_SUFFIX: &str =
    " Additionally, summarize the information found from the web accurately.";

/// A web page the answer was grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSource {
    pub title: String,
    pub uri: String,
}

/// The model's answer and its sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAnswer {
    pub text: String,
    pub sources: Vec<SearchSource>,
}

/// Errors from the search port.
#[derive(Debug, Error)]
pub enum SearchPortError {
    /// The query was empty or whitespace.
    #[error("Search query is empty")]
    EmptyQuery,

    /// No API key was configured.
    #[error("No API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    /// The request could not be completed.
    #[error("Search request failed: {0}")]
    Request(String),

    /// The service answered with something unusable.
    #[error("Invalid search response: {0}")]
    InvalidResponse(String),
}

/// System instruction used for a grounded search as `persona`.
pub fn search_instruction(persona: &PersonaConfig) -> String {
    format!("{}{SEARCH_INSTRUCTION_SUFFIX}", persona.system_instruction)
}

/// Port for grounded web search.
#[async_trait]
pub trait GroundedSearchPort: Send + Sync {
    /// Answer `query` as `persona`, grounded on web results.
    async fn search(
        &self,
        query: &str,
        persona: &PersonaConfig,
    ) -> Result<SearchAnswer, SearchPortError>;
}
