//! Public configuration for the Gemini clients.

use std::time::Duration;

use dambru_core::Settings;
use url::Url;

use crate::error::{LiveError, LiveResult};

/// Default bidirectional streaming endpoint.
pub const DEFAULT_LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default REST base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration shared by [`crate::GeminiLiveTransport`] and
/// [`crate::GeminiSearchClient`].
///
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use dambru_live::LiveClientConfig;
/// use std::time::Duration;
///
/// let config = LiveClientConfig::new()
///     .with_api_key("secret")
///     .with_request_timeout(Duration::from_secs(60))
///     .with_user_agent("my-app/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct LiveClientConfig {
    /// API key sent with every request
    pub(crate) api_key: Option<String>,
    /// WebSocket endpoint for live sessions
    pub(crate) live_endpoint: String,
    /// Base URL for REST calls
    pub(crate) api_base_url: String,
    /// Upper bound on the WebSocket handshake
    pub(crate) connect_timeout: Duration,
    /// Upper bound on a single REST request
    pub(crate) request_timeout: Duration,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
}

impl Default for LiveClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            live_endpoint: DEFAULT_LIVE_ENDPOINT.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(60),
            user_agent: concat!("dambru-live/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LiveClientConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from resolved application settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .with_optional_api_key(settings.api_key.clone())
            .with_connect_timeout(Duration::from_secs(settings.effective_connect_timeout_secs()))
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set an optional API key.
    #[must_use]
    pub fn with_optional_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Set the live WebSocket endpoint (without the key parameter).
    #[must_use]
    pub fn with_live_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.live_endpoint = endpoint.into();
        self
    }

    /// Set the REST base URL.
    ///
    /// Defaults to `https://generativelanguage.googleapis.com/v1beta`.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the WebSocket handshake timeout.
    ///
    /// Defaults to 15 seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the REST request timeout.
    ///
    /// Defaults to 60 seconds.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the user agent string for HTTP requests.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    pub(crate) fn require_api_key(&self) -> LiveResult<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(LiveError::MissingApiKey)
    }

    /// Full WebSocket URL including the key query parameter.
    pub(crate) fn live_url(&self) -> LiveResult<Url> {
        let key = self.require_api_key()?;
        let mut url = Url::parse(&self.live_endpoint)?;
        url.query_pairs_mut().append_pair("key", key);
        Ok(url)
    }

    /// REST URL for `generateContent` on `model`.
    pub(crate) fn generate_content_url(&self, model: &str) -> LiveResult<Url> {
        let base = self.api_base_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/models/{model}:generateContent"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LiveClientConfig::new();
        assert!(config.api_key.is_none());
        assert_eq!(config.live_endpoint, DEFAULT_LIVE_ENDPOINT);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert!(config.user_agent.contains("dambru-live"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = LiveClientConfig::new()
            .with_api_key("secret")
            .with_live_endpoint("ws://127.0.0.1:9000/live")
            .with_api_base_url("http://127.0.0.1:9001/v1/")
            .with_connect_timeout(Duration::from_secs(3))
            .with_request_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent");

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.live_endpoint, "ws://127.0.0.1:9000/live");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_live_url_carries_key() {
        let url = LiveClientConfig::new().with_api_key("abc").live_url().unwrap();
        assert_eq!(url.scheme(), "wss");
        assert!(url.path().ends_with("BidiGenerateContent"));
        assert_eq!(url.query(), Some("key=abc"));
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = LiveClientConfig::new().with_api_key("   ");
        assert!(!config.has_api_key());
        assert!(matches!(config.live_url(), Err(LiveError::MissingApiKey)));
    }

    #[test]
    fn test_generate_content_url_trims_trailing_slash() {
        let url = LiveClientConfig::new()
            .with_api_base_url("http://localhost:1234/v1beta/")
            .generate_content_url("gemini-3-flash-preview")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1234/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            api_key: Some("k".to_string()),
            connect_timeout_secs: Some(7),
            ..Settings::default()
        };
        let config = LiveClientConfig::from_settings(&settings);
        assert!(config.has_api_key());
        assert_eq!(config.connect_timeout, Duration::from_secs(7));
    }
}
