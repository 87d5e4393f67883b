//! Shared CLI presentation utilities.
//!
//! Keep this module format-only: no session logic.

pub mod tables;

pub use tables::{print_separator, truncate_string};

use dambru_core::{SearchAnswer, SessionState, SessionStatus};

/// One-line rendering of a session status for the talk prompt.
pub fn format_status(status: &SessionStatus) -> String {
    match status.state {
        SessionState::Active => "[live] listening - speak any time".to_string(),
        SessionState::Connecting => "[....] connecting".to_string(),
        SessionState::Closing => "[....] closing".to_string(),
        SessionState::Idle => match &status.last_error {
            Some(error) => format!("[err ] {error}"),
            None => "[idle] not connected".to_string(),
        },
    }
}

/// Print a grounded answer followed by its numbered sources.
pub fn print_search_answer(answer: &SearchAnswer) {
    println!("{}", answer.text.trim());

    if answer.sources.is_empty() {
        return;
    }
    println!();
    println!("Sources:");
    for (index, source) in answer.sources.iter().enumerate() {
        println!("  [{}] {}", index + 1, truncate_string(&source.title, 70));
        println!("      {}", source.uri);
    }
}
