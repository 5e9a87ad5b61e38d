//! Class-based syntax highlighting for code cells, via `syntect`.

use std::sync::LazyLock;

use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use swangallery_shared::{GalleryError, Result};

/// CSS class prefix shared by the generated spans and the generated stylesheet.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Highlight `code` as `language`. Returns `None` when no syntax matches.
pub(crate) fn highlight(code: &str, language: &str) -> Option<String> {
    let syntax = SYNTAX_SET.find_syntax_by_token(language)?;
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, CLASS_STYLE);

    for line in LinesWithEndings::from(code) {
        if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
            tracing::debug!(error = %e, language, "highlighting failed, using plain text");
            return None;
        }
    }

    Some(generator.finalize())
}

/// Stylesheet matching the spans produced by [`highlight`].
pub(crate) fn stylesheet(theme_name: &str) -> Result<String> {
    let themes = ThemeSet::load_defaults();
    let theme = themes.themes.get(theme_name).ok_or_else(|| {
        GalleryError::Render(format!("unknown highlighting theme '{theme_name}'"))
    })?;

    css_for_theme_with_class_style(theme, CLASS_STYLE)
        .map_err(|e| GalleryError::Render(format!("highlighting stylesheet: {e}")))
}
