//! Settings domain types and validation.
//!
//! This module contains the core settings types used across the application.
//! Values come from the process environment (after `.env` loading by the
//! binary); lookups go through a closure so they can be tested without
//! touching the real environment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default native-audio model for live sessions.
pub const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Default model for grounded web search.
pub const DEFAULT_SEARCH_MODEL: &str = "gemini-3-flash-preview";

/// Default capture frame size in samples (256 ms at 16 kHz).
pub const DEFAULT_CAPTURE_FRAME_SIZE: usize = 4096;

/// Default persona when none is selected.
pub const DEFAULT_PERSONA_ID: &str = "friend";

/// Default live handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

const MIN_FRAME_SIZE: usize = 256;
const MAX_FRAME_SIZE: usize = 16_384;
const MAX_CONNECT_TIMEOUT_SECS: u64 = 120;

/// Application settings structure.
///
/// All fields are optional to support partial configuration and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// API key for the generative language service.
    pub api_key: Option<String>,

    /// Model used for live audio sessions.
    pub live_model: Option<String>,

    /// Model used for grounded search.
    pub search_model: Option<String>,

    /// Samples per outbound capture frame (power of two, 256-16384).
    pub capture_frame_size: Option<usize>,

    /// Persona selected at startup.
    pub default_persona: Option<String>,

    /// Seconds to wait for the live handshake.
    pub connect_timeout_secs: Option<u64>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            api_key: None,
            live_model: Some(DEFAULT_LIVE_MODEL.to_string()),
            search_model: Some(DEFAULT_SEARCH_MODEL.to_string()),
            capture_frame_size: Some(DEFAULT_CAPTURE_FRAME_SIZE),
            default_persona: Some(DEFAULT_PERSONA_ID.to_string()),
            connect_timeout_secs: Some(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Recognised keys: `GEMINI_API_KEY` (falling back to `API_KEY`),
    /// `DAMBRU_LIVE_MODEL`, `DAMBRU_SEARCH_MODEL`, `DAMBRU_FRAME_SIZE`,
    /// `DAMBRU_PERSONA`, `DAMBRU_CONNECT_TIMEOUT_SECS`. Blank values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Self::with_defaults();
        settings.api_key = get("GEMINI_API_KEY").or_else(|| get("API_KEY"));
        if let Some(model) = get("DAMBRU_LIVE_MODEL") {
            settings.live_model = Some(model);
        }
        if let Some(model) = get("DAMBRU_SEARCH_MODEL") {
            settings.search_model = Some(model);
        }
        if let Some(raw) = get("DAMBRU_FRAME_SIZE") {
            settings.capture_frame_size = Some(parse_number("DAMBRU_FRAME_SIZE", &raw)?);
        }
        if let Some(persona) = get("DAMBRU_PERSONA") {
            settings.default_persona = Some(persona);
        }
        if let Some(raw) = get("DAMBRU_CONNECT_TIMEOUT_SECS") {
            settings.connect_timeout_secs =
                Some(parse_number("DAMBRU_CONNECT_TIMEOUT_SECS", &raw)?);
        }

        tracing::debug!(
            has_api_key = settings.api_key.is_some(),
            live_model = %settings.effective_live_model(),
            frame_size = settings.effective_capture_frame_size(),
            "Settings loaded"
        );

        Ok(settings)
    }

    /// Get the effective live model (with default fallback).
    pub fn effective_live_model(&self) -> &str {
        self.live_model.as_deref().unwrap_or(DEFAULT_LIVE_MODEL)
    }

    /// Get the effective search model (with default fallback).
    pub fn effective_search_model(&self) -> &str {
        self.search_model.as_deref().unwrap_or(DEFAULT_SEARCH_MODEL)
    }

    /// Get the effective capture frame size (with default fallback).
    #[must_use]
    pub const fn effective_capture_frame_size(&self) -> usize {
        match self.capture_frame_size {
            Some(size) => size,
            None => DEFAULT_CAPTURE_FRAME_SIZE,
        }
    }

    /// Get the effective startup persona id (with default fallback).
    pub fn effective_persona(&self) -> &str {
        self.default_persona.as_deref().unwrap_or(DEFAULT_PERSONA_ID)
    }

    /// Get the effective handshake timeout in seconds (with default fallback).
    #[must_use]
    pub const fn effective_connect_timeout_secs(&self) -> u64 {
        match self.connect_timeout_secs {
            Some(secs) => secs,
            None => DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, SettingsError> {
    raw.parse().map_err(|_| SettingsError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

/// Settings validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Capture frame size must be a power of two between 256 and 16384, got {0}")]
    InvalidFrameSize(usize),

    #[error("Connect timeout must be between 1 and 120 seconds, got {0}")]
    InvalidConnectTimeout(u64),

    #[error("Model name cannot be empty")]
    EmptyModel,
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(size) = settings.capture_frame_size {
        if !(MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&size) || !size.is_power_of_two() {
            return Err(SettingsError::InvalidFrameSize(size));
        }
    }

    if let Some(secs) = settings.connect_timeout_secs {
        if secs == 0 || secs > MAX_CONNECT_TIMEOUT_SECS {
            return Err(SettingsError::InvalidConnectTimeout(secs));
        }
    }

    for model in [&settings.live_model, &settings.search_model]
        .into_iter()
        .flatten()
    {
        if model.trim().is_empty() {
            return Err(SettingsError::EmptyModel);
        }
    }

    Ok(())
}
