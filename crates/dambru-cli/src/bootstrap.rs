//! CLI bootstrap - the composition root.
//!
//! Settings are resolved here once; handlers receive a [`CliContext`] and
//! build the adapters (live transport, search client, audio backend) they
//! need from it.

use std::collections::HashMap;
use std::path::Path;

use dambru_core::{PersonaCatalog, PersonaConfig, Settings, validate_settings};

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Resolved settings.
    pub settings: Settings,
}

impl CliConfig {
    /// Resolve settings from the process environment, with `env_file`
    /// supplying values the environment does not set.
    pub fn load(env_file: Option<&Path>) -> Result<Self, CliError> {
        let file_vars = match env_file {
            Some(path) => read_env_file(path)?,
            None => HashMap::new(),
        };
        let settings = Settings::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_vars.get(key).cloned())
        })?;
        Self::from_settings(settings)
    }

    /// Validate already resolved settings.
    pub fn from_settings(settings: Settings) -> Result<Self, CliError> {
        validate_settings(&settings)?;
        Ok(Self { settings })
    }
}

/// Read `KEY=value` pairs from a dotenv file without touching the process
/// environment.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, CliError> {
    let iter = dotenvy::from_path_iter(path)
        .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
    iter.map(|item| item.map_err(|e| CliError::Config(format!("{}: {e}", path.display()))))
        .collect()
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    settings: Settings,
    catalog: PersonaCatalog,
}

impl CliContext {
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn catalog(&self) -> &PersonaCatalog {
        &self.catalog
    }

    /// Look up `requested`, or the configured default persona.
    pub fn resolve_persona(&self, requested: Option<&str>) -> Result<&PersonaConfig, CliError> {
        let key = requested.unwrap_or_else(|| self.settings.effective_persona());
        self.catalog.get(key).ok_or_else(|| {
            let known: Vec<&str> = self.catalog.iter().map(|p| p.id.as_str()).collect();
            CliError::Arguments(format!(
                "unknown persona '{key}' (available: {})",
                known.join(", ")
            ))
        })
    }

    /// Fail early when a command needs the API key.
    pub fn require_api_key(&self) -> Result<(), CliError> {
        if self.settings.api_key.is_some() {
            Ok(())
        } else {
            Err(CliError::Config(
                "GEMINI_API_KEY is not set (export it or add it to .env)".to_string(),
            ))
        }
    }
}

/// Bootstrap the CLI application.
pub fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let context = CliContext {
        settings: config.settings,
        catalog: PersonaCatalog::builtin(),
    };
    // Reject a bad DAMBRU_PERSONA before any command runs.
    context.resolve_persona(None)?;
    Ok(context)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn context(settings: Settings) -> CliContext {
        bootstrap(CliConfig::from_settings(settings).unwrap()).unwrap()
    }

    #[test]
    fn test_read_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "DAMBRU_PERSONA=poet").unwrap();
        writeln!(file, "DAMBRU_FRAME_SIZE=2048").unwrap();

        let vars = read_env_file(file.path()).unwrap();
        assert_eq!(vars.get("DAMBRU_PERSONA").map(String::as_str), Some("poet"));

        let settings = Settings::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(settings.effective_persona(), "poet");
        assert_eq!(settings.effective_capture_frame_size(), 2048);
    }

    #[test]
    fn test_missing_env_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_env_file(&dir.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let settings = Settings {
            capture_frame_size: Some(1000),
            ..Settings::with_defaults()
        };
        assert!(matches!(
            CliConfig::from_settings(settings),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_persona() {
        let ctx = context(Settings::with_defaults());
        assert_eq!(ctx.resolve_persona(None).unwrap().id, "friend");
        assert_eq!(ctx.resolve_persona(Some("Zen Master")).unwrap().id, "zen-master");

        let err = ctx.resolve_persona(Some("pirate")).unwrap_err();
        assert!(err.to_string().contains("detective"));
    }

    #[test]
    fn test_unknown_default_persona_fails_bootstrap() {
        let settings = Settings {
            default_persona: Some("pirate".to_string()),
            ..Settings::with_defaults()
        };
        let config = CliConfig::from_settings(settings).unwrap();
        assert!(matches!(bootstrap(config), Err(CliError::Arguments(_))));
    }

    #[test]
    fn test_require_api_key() {
        assert!(context(Settings::with_defaults()).require_api_key().is_err());

        let settings = Settings {
            api_key: Some("k".to_string()),
            ..Settings::with_defaults()
        };
        assert!(context(settings).require_api_key().is_ok());
    }
}
