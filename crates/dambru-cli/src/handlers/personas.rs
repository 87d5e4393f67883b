//! Personas command handler.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::presentation::{print_separator, truncate_string};

/// Print the built-in personas, marking the configured default.
pub fn execute(ctx: &CliContext) -> Result<()> {
    let default_id = ctx.resolve_persona(None)?.id.clone();

    println!(
        "{:<2} {:<12} {:<18} {:<8} Description",
        "", "ID", "Name", "Voice"
    );
    print_separator(90);

    for persona in ctx.catalog().iter() {
        let marker = if persona.id == default_id { "*" } else { "" };
        println!(
            "{:<2} {:<12} {:<18} {:<8} {}",
            marker,
            persona.id,
            truncate_string(&persona.display_name, 17),
            persona.voice_id.as_str(),
            truncate_string(&persona.description, 48),
        );
    }

    println!();
    println!("* default (set DAMBRU_PERSONA to change)");
    Ok(())
}
