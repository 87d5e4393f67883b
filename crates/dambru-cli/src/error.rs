//! CLI-specific error types and mappings.
//!
//! This module provides the error type for the CLI adapter and mappings
//! from library errors to exit codes and user-facing messages.

use dambru_core::SettingsError;
use dambru_live::LiveError;
use dambru_voice::VoiceError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument parsing or validation error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio device error.
    #[error("Audio error: {0}")]
    Audio(String),

    /// Remote service error, carrying the user-facing message.
    #[error("{0}")]
    Service(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Service(_) => 69,  // EX_UNAVAILABLE
            Self::Audio(_) => 71,    // EX_OSERR
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<LiveError> for CliError {
    fn from(err: LiveError) -> Self {
        match err {
            LiveError::MissingApiKey | LiveError::InvalidUrl(_) | LiveError::NoRuntime(_) => {
                Self::Config(err.to_string())
            }
            other => Self::Service(other.to_string()),
        }
    }
}

impl From<VoiceError> for CliError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::ServiceStopped | VoiceError::Transport(_) => Self::Service(err.to_string()),
            other => Self::Audio(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Arguments(String::new()).exit_code(), 2);
        assert_eq!(CliError::Config(String::new()).exit_code(), 78);
        assert_eq!(CliError::Io(String::new()).exit_code(), 74);
        assert_eq!(CliError::Audio(String::new()).exit_code(), 71);
        assert_eq!(CliError::Service(String::new()).exit_code(), 69);
    }

    #[test]
    fn test_settings_errors_are_config_errors() {
        let err: CliError = SettingsError::InvalidFrameSize(1000).into();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_voice_error_mapping() {
        assert!(matches!(
            CliError::from(VoiceError::NoInputDevice),
            CliError::Audio(_)
        ));
        assert!(matches!(
            CliError::from(VoiceError::ServiceStopped),
            CliError::Service(_)
        ));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        assert!(matches!(
            CliError::from(LiveError::MissingApiKey),
            CliError::Config(_)
        ));
    }
}
