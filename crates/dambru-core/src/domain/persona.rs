//! Persona domain types.
//!
//! A persona is the externally selected character the companion speaks as.
//! Its voice and system instruction are bound when a live session connects
//! and cannot change mid-session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prebuilt voices offered by the live model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrebuiltVoice {
    Kore,
    Puck,
    Charon,
    Fenrir,
    Zephyr,
}

impl PrebuiltVoice {
    /// All supported voices, in display order.
    pub const ALL: [Self; 5] = [
        Self::Kore,
        Self::Puck,
        Self::Charon,
        Self::Fenrir,
        Self::Zephyr,
    ];

    /// Voice name as the live API expects it.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kore => "Kore",
            Self::Puck => "Puck",
            Self::Charon => "Charon",
            Self::Fenrir => "Fenrir",
            Self::Zephyr => "Zephyr",
        }
    }
}

impl fmt::Display for PrebuiltVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a voice name is not one of [`PrebuiltVoice::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown voice '{0}' (expected one of Kore, Puck, Charon, Fenrir, Zephyr)")]
pub struct UnknownVoice(pub String);

impl FromStr for PrebuiltVoice {
    type Err = UnknownVoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVoice(s.to_string()))
    }
}

/// Configuration of a single persona.
///
/// Immutable once constructed; the session layer reads `voice_id` and
/// `system_instruction` at connect time only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaConfig {
    /// Stable kebab-case identifier (e.g. `"zen-master"`).
    pub id: String,
    /// Human-readable name (e.g. `"Zen Master"`).
    pub display_name: String,
    /// Prebuilt voice used for the live session.
    pub voice_id: PrebuiltVoice,
    /// Accent color as a CSS hex string.
    pub display_color: String,
    /// Icon identifier for front ends.
    pub icon: String,
    /// One-line description.
    pub description: String,
    /// System instruction sent when the session is opened.
    pub system_instruction: String,
}

impl PersonaConfig {
    fn builtin(
        id: &str,
        display_name: &str,
        voice_id: PrebuiltVoice,
        display_color: &str,
        icon: &str,
        description: &str,
        system_instruction: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            voice_id,
            display_color: display_color.to_string(),
            icon: icon.to_string(),
            description: description.to_string(),
            system_instruction: system_instruction.to_string(),
        }
    }
}

/// The set of personas a user can choose from.
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    personas: Vec<PersonaConfig>,
    default_id: String,
}

impl PersonaCatalog {
    /// The built-in catalog of ten personas. Defaults to `friend`.
    pub fn builtin() -> Self {
        use PrebuiltVoice::{Charon, Fenrir, Kore, Puck, Zephyr};

        let personas = vec![
            PersonaConfig::builtin(
                "teacher",
                "Teacher",
                Kore,
                "#3b82f6",
                "fa-graduation-cap",
                "Patient, structured, and informative.",
                "You are a supportive and knowledgeable teacher. Speak clearly, explain concepts simply, and encourage curiosity. Use a warm but professional tone.",
            ),
            PersonaConfig::builtin(
                "friend",
                "Friend",
                Puck,
                "#10b981",
                "fa-comments",
                "Casual, supportive, and relatable.",
                "You are a close, loyal friend. Use casual language, show empathy, and be supportive. Use slang occasionally if natural. Be a good listener.",
            ),
            PersonaConfig::builtin(
                "mentor",
                "Mentor",
                Charon,
                "#f59e0b",
                "fa-chess-knight",
                "Wise, reflective, and challenging.",
                "You are a wise mentor. Ask deep questions, offer perspective rather than just answers, and guide the user toward their own conclusions.",
            ),
            PersonaConfig::builtin(
                "hype-man",
                "Hype-Man",
                Fenrir,
                "#ef4444",
                "fa-fire",
                "High energy, motivating, and cheerful.",
                "You are an energetic hype-man. Be extremely enthusiastic, celebrate small wins, and use high-energy language to motivate the user!",
            ),
            PersonaConfig::builtin(
                "zen-master",
                "Zen Master",
                Zephyr,
                "#8b5cf6",
                "fa-leaf",
                "Soft-spoken, meditative, and peaceful.",
                "You are a Zen Master. Speak slowly, use peaceful metaphors, and focus on mindfulness and relaxation. Help the user find their center.",
            ),
            PersonaConfig::builtin(
                "comedian",
                "Comedian",
                Puck,
                "#f97316",
                "fa-laugh-beam",
                "Witty, funny, and full of jokes.",
                "You are a professional stand-up comedian. Be witty, tell jokes, use puns, and keep the mood light and hilarious. Don't be afraid to be a bit silly.",
            ),
            PersonaConfig::builtin(
                "scientist",
                "Scientist",
                Kore,
                "#06b6d4",
                "fa-flask",
                "Analytical, precise, and curious.",
                "You are a brilliant scientist. Use technical terms correctly, be precise in your explanations, and show immense curiosity about the laws of the universe.",
            ),
            PersonaConfig::builtin(
                "gamer-pro",
                "Gamer Pro",
                Fenrir,
                "#ec4899",
                "fa-gamepad",
                "Casual, competitive, and high-energy.",
                "You are a pro gamer. Use gaming slang (GG, AFK, Noob, Buff), be enthusiastic about strategy and hardware, and have a competitive but friendly spirit.",
            ),
            PersonaConfig::builtin(
                "poet",
                "Poet",
                Zephyr,
                "#a855f7",
                "fa-feather-alt",
                "Lyrical, emotional, and artistic.",
                "You are a soulful poet. Speak in metaphors, use beautiful and evocative language, and focus on the emotional depth of every topic.",
            ),
            PersonaConfig::builtin(
                "detective",
                "Detective",
                Charon,
                "#475569",
                "fa-search",
                "Mysterious, logical, and observant.",
                "You are a hard-boiled detective. Speak in a slightly noir style, be very observant of details, and approach everything as a mystery to be solved.",
            ),
        ];

        Self {
            personas,
            default_id: "friend".to_string(),
        }
    }

    /// Look up a persona by id or display name (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&PersonaConfig> {
        let key = key.trim();
        self.personas
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(key) || p.display_name.eq_ignore_ascii_case(key))
    }

    /// The persona selected when none is specified.
    pub fn default_persona(&self) -> &PersonaConfig {
        self.get(&self.default_id)
            .unwrap_or_else(|| &self.personas[0])
    }

    /// Iterate personas in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &PersonaConfig> {
        self.personas.iter()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

impl Default for PersonaCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
