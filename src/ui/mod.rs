//! User interface module - messages and report formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Report printing

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{display_error, display_status, display_success, format_state};

use crate::domain::RepositoryState;

/// Prints the `stat` report to stdout; nothing is printed without a state.
pub fn print_state(state: Option<&RepositoryState>) {
    if let Some(state) = state {
        println!("{}", format_state(state));
    }
}
