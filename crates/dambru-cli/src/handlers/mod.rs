//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that:
//!   1. Validate CLI-specific input
//!   2. Build the adapters they need from the context
//!   3. Format output for the terminal
//!
//! Failures are raised as [`CliError`](crate::CliError) so `main` can pick
//! the exit code.

pub mod devices;
pub mod personas;
pub mod search;
pub mod talk;
