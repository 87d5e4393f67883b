//! Available subcommands.

use clap::Subcommand;

/// Commands of the `dambru` binary.
#[derive(Subcommand)]
pub enum Commands {
    /// List the built-in personas
    Personas,

    /// List audio input and output devices
    Devices,

    /// Start a live voice conversation
    Talk {
        /// Persona id or display name (defaults to DAMBRU_PERSONA or "friend")
        #[arg(short, long)]
        persona: Option<String>,
        /// Live model name
        #[arg(short, long)]
        model: Option<String>,
        /// Samples per microphone frame (power of two, 256-16384)
        #[arg(long)]
        frame_size: Option<usize>,
    },

    /// Ask a persona to research something on the web
    Search {
        /// The question to research
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Persona id or display name
        #[arg(short, long)]
        persona: Option<String>,
    },
}
