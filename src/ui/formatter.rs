//! Pure formatting functions for UI output.
//!
//! Everything but [format_state] prints to stderr; stdout carries only the
//! machine-readable results of `stat`, `next` and `load`.

use console::style;

use crate::domain::RepositoryState;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    eprintln!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    eprintln!("{} {}", style("→").yellow(), message);
}

/// Formats the `stat` report for a repository state.
///
/// Fields are aligned on the value column:
///
/// ```text
/// Tag:      v1.0
/// Distance: 2
/// Revision: 4d6b1d1
/// Dirty:    False
/// Branch:   master
/// ```
///
/// The tag is left out while the repository has none, revision and branch
/// when the backend does not know them.
pub fn format_state(state: &RepositoryState) -> String {
    let mut lines = Vec::with_capacity(5);
    if state.has_tag() {
        lines.push(format!("Tag:      {}", state.tag));
    }
    lines.push(format!("Distance: {}", state.distance));
    if let Some(revision) = &state.revision {
        lines.push(format!("Revision: {}", revision));
    }
    lines.push(format!(
        "Dirty:    {}",
        if state.dirty { "True" } else { "False" }
    ));
    if let Some(branch) = &state.branch {
        lines.push(format!("Branch:   {}", branch));
    }
    lines.join("\n")
}
