//! Grounded web search via `generateContent` with the `googleSearch` tool.

use async_trait::async_trait;
use dambru_core::{
    DEFAULT_SEARCH_MODEL, GroundedSearchPort, PersonaConfig, SearchAnswer, SearchPortError,
    search_instruction,
};

use crate::config::LiveClientConfig;
use crate::error::{LiveError, LiveResult};
use crate::protocol::{self, GenerateContentResponse};

/// Production [`GroundedSearchPort`] for the Gemini API.
///
/// Requests are made once; failures are returned to the caller as-is.
pub struct GeminiSearchClient {
    http: reqwest::Client,
    config: LiveClientConfig,
    model: String,
}

impl GeminiSearchClient {
    /// Create a client for the default search model.
    pub fn new(config: LiveClientConfig) -> LiveResult<Self> {
        Self::with_model(config, DEFAULT_SEARCH_MODEL)
    }

    /// Create a client for `model`.
    pub fn with_model(config: LiveClientConfig, model: impl Into<String>) -> LiveResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            config,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, query: &str, persona: &PersonaConfig) -> LiveResult<SearchAnswer> {
        let api_key = self.config.require_api_key()?;
        let url = self.config.generate_content_url(&self.model)?;
        let body = protocol::search_request(query, &search_instruction(persona))?;

        tracing::debug!(model = %self.model, persona = %persona.id, "Sending grounded search");
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LiveError::ApiRequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        protocol::parse_search_response(parsed)
    }
}

#[async_trait]
impl GroundedSearchPort for GeminiSearchClient {
    async fn search(
        &self,
        query: &str,
        persona: &PersonaConfig,
    ) -> Result<SearchAnswer, SearchPortError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchPortError::EmptyQuery);
        }

        match self.generate(query, persona).await {
            Ok(answer) => {
                tracing::info!(sources = answer.sources.len(), "Grounded search complete");
                Ok(answer)
            }
            Err(err) => {
                tracing::error!(%err, "Grounded search failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dambru_core::PersonaCatalog;

    use super::*;

    #[tokio::test]
    async fn test_blank_query_is_rejected_before_request() {
        let client = GeminiSearchClient::new(
            LiveClientConfig::new()
                .with_api_key("k")
                .with_api_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        let catalog = PersonaCatalog::builtin();

        let err = client
            .search("   ", catalog.default_persona())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchPortError::EmptyQuery));
    }

    #[test]
    fn test_missing_key_is_reported() {
        let client = GeminiSearchClient::new(LiveClientConfig::new()).unwrap();
        let catalog = PersonaCatalog::builtin();

        let err = tokio_test::block_on(client.search("weather", catalog.default_persona()))
            .unwrap_err();
        assert!(matches!(err, SearchPortError::MissingApiKey));
    }

    #[test]
    fn test_persona_instruction_asks_for_web_summary() {
        let catalog = PersonaCatalog::builtin();
        let detective = catalog.get("detective").unwrap();

        let instruction = search_instruction(detective);
        assert!(instruction.starts_with(&detective.system_instruction));
        assert!(instruction.ends_with(dambru_core::SEARCH_INSTRUCTION_SUFFIX));
    }

    #[test]
    fn test_default_model() {
        let client = GeminiSearchClient::new(LiveClientConfig::new()).unwrap();
        assert_eq!(client.model(), DEFAULT_SEARCH_MODEL);
    }
}
