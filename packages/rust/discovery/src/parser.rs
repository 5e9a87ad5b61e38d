//! Notebook link scanner for Markdown page sources.
//!
//! Recognized forms:
//! - `[Display text](path/to/notebook.ipynb)`
//! - `[Display text](path/to/folder/notebook.ipynb?clone_folder=True)`

use regex::Regex;
use std::sync::LazyLock;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches a Markdown link whose target ends in `.ipynb`, optionally followed
/// by the clone-folder query. Never spans lines.
static NOTEBOOK_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[.*?\]\(([^()\s]*\.ipynb(?:\?clone_folder=True)?)\)")
        .expect("notebook link regex")
});

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Return every notebook link target in `source`, exactly as written between
/// the parentheses (query suffix included), in document order.
pub(crate) fn find_notebook_links(source: &str) -> Vec<&str> {
    NOTEBOOK_LINK_RE
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}
