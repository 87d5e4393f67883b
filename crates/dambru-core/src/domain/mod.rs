//! Domain types for dambru.
//!
//! These are pure data types with no infrastructure dependencies.

pub mod persona;

pub use persona::{PersonaCatalog, PersonaConfig, PrebuiltVoice, UnknownVoice};
