pub mod tracker;

use console::Term;
use tracing::debug;

/// Prepare stderr for colored spinners. Never fails: a terminal that cannot
/// do colors simply gets plain output.
pub fn init_terminal() {
    let term = Term::stderr();
    let colors = term.is_term() && term.features().colors_supported();
    console::set_colors_enabled_stderr(colors);
    debug!(colors, "terminal initialized");
}

/// Whether interactive progress should be drawn on stderr.
pub fn interactive() -> bool {
    Term::stderr().is_term()
}
