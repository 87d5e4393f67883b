//! Search command handler.
//!
//! Runs one grounded web search in the voice of a persona and prints the
//! answer followed by its sources.

use anyhow::Result;
use dambru_core::{GroundedSearchPort, SEARCH_FAILED_MESSAGE, SearchPortError};
use dambru_live::{GeminiSearchClient, LiveClientConfig};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::print_search_answer;

/// Execute the search command.
///
/// # Errors
///
/// Returns [`CliError::Arguments`] for an empty query or unknown persona,
/// [`CliError::Config`] when no API key is configured and
/// [`CliError::Service`] when the request fails.
pub async fn execute(ctx: &CliContext, query: &[String], persona: Option<&str>) -> Result<()> {
    let query = query.join(" ");
    if query.trim().is_empty() {
        return Err(CliError::Arguments("search query is empty".to_string()).into());
    }
    ctx.require_api_key()?;
    let persona = ctx.resolve_persona(persona)?;

    let settings = ctx.settings();
    let client = GeminiSearchClient::with_model(
        LiveClientConfig::from_settings(settings),
        settings.effective_search_model(),
    )
    .map_err(CliError::from)?;

    println!("{} is researching...\n", persona.display_name);
    match client.search(&query, persona).await {
        Ok(answer) => {
            print_search_answer(&answer);
            Ok(())
        }
        Err(SearchPortError::EmptyQuery) => {
            Err(CliError::Arguments("search query is empty".to_string()).into())
        }
        Err(err) => {
            tracing::debug!(%err, "Search command failed");
            Err(CliError::Service(SEARCH_FAILED_MESSAGE.to_string()).into())
        }
    }
}
