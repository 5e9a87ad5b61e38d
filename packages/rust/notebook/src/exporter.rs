//! Notebook → HTML rendering engine.
//!
//! [`HtmlExporter`] produces the cell markup of a "basic" notebook export:
//! prompts, highlighted inputs and rich outputs, with no page chrome. The
//! site theme wraps it.

use std::fmt::{self, Write};
use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};
use pulldown_cmark_escape::{FmtWriter, escape_html};
use regex::Regex;
use tracing::{debug, instrument};

use swangallery_shared::{GalleryError, Result};

use crate::format::{Cell, MimeBundle, Notebook, Output};
use crate::highlight;

/// Highlighting theme used when none is configured.
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Display outputs, most preferred first.
const RICH_MIME_ORDER: &[&str] = &[
    "text/html",
    "image/svg+xml",
    "image/png",
    "image/jpeg",
    "text/markdown",
    "text/plain",
];

/// Attachment payloads that can be inlined as images.
const ATTACHMENT_MIMES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/svg+xml"];

/// Terminal colour codes found in tracebacks and stream output.
static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("ANSI regex"));

/// Base notebook layout. The site theme ships its own copy.
const BASE_CSS: &str = r#"
div.cell { display: flex; flex-direction: column; margin: 0.5em 0; }
div.input, div.output_area { display: flex; flex-direction: row; }
div.prompt { min-width: 11ex; padding: 0.4em; text-align: right; font-family: monospace; }
div.inner_cell, div.output_subarea { flex: 1; min-width: 0; }
"#;

/// Output area tweaks applied on top of the site theme.
const OUTPUT_CSS: &str = r#"
div.input_prompt { color: #303f9f; }
div.output_prompt { color: #d84315; }
div.input_area { border: 1px solid #cfcfcf; border-radius: 2px; background: #f7f7f7; }
div.input_area pre { margin: 0; padding: 0.4em; overflow-x: auto; }
div.output_subarea { overflow-x: auto; padding: 0.4em; }
div.output_subarea pre { margin: 0; }
div.output_stderr { background: #fdd; }
div.output_error pre { color: #b71c1c; }
div.output_png img, div.output_jpeg img { max-width: 100%; }
"#;

// ---------------------------------------------------------------------------
// Renderer seam
// ---------------------------------------------------------------------------

/// Rendered notebook markup plus the stylesheet fragments it relies on.
#[derive(Debug, Clone)]
pub struct RenderedNotebook {
    /// Cell markup.
    pub body: String,
    /// Stylesheet fragments. The first one is the base notebook layout,
    /// which page composition leaves to the site theme.
    pub stylesheets: Vec<String>,
}

/// Converts a notebook into markup and stylesheet fragments.
pub trait NotebookRenderer {
    fn render(&self, notebook: &Notebook) -> Result<RenderedNotebook>;
}

// ---------------------------------------------------------------------------
// HtmlExporter
// ---------------------------------------------------------------------------

/// The bundled rendering engine.
#[derive(Debug, Clone)]
pub struct HtmlExporter {
    stylesheets: Vec<String>,
}

impl HtmlExporter {
    /// Exporter using [`DEFAULT_THEME`] for code highlighting.
    pub fn new() -> Result<Self> {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Exporter using a named `syntect` default theme for code highlighting.
    pub fn with_theme(theme: &str) -> Result<Self> {
        let highlight_css = highlight::stylesheet(theme)?;
        Ok(Self {
            stylesheets: vec![BASE_CSS.to_string(), highlight_css, OUTPUT_CSS.to_string()],
        })
    }
}

impl NotebookRenderer for HtmlExporter {
    #[instrument(skip_all, fields(cells = notebook.cells.len()))]
    fn render(&self, notebook: &Notebook) -> Result<RenderedNotebook> {
        let language = notebook.language();
        let mut body = String::new();

        for cell in &notebook.cells {
            write_cell(&mut body, cell, language)
                .map_err(|_| GalleryError::Render("failed to write cell markup".into()))?;
        }

        debug!(body_len = body.len(), ?language, "notebook rendered");

        Ok(RenderedNotebook {
            body,
            stylesheets: self.stylesheets.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

fn write_cell(out: &mut String, cell: &Cell, language: Option<&str>) -> fmt::Result {
    match cell {
        Cell::Markdown {
            source,
            attachments,
        } => {
            out.push_str("<div class=\"cell border-box-sizing text_cell rendered\">\n");
            out.push_str("<div class=\"prompt input_prompt\">\n</div>\n");
            out.push_str("<div class=\"inner_cell\">\n");
            out.push_str("<div class=\"text_cell_render border-box-sizing rendered_html\">\n");
            out.push_str(&markdown_to_html(source.as_str(), |name| {
                attachments.get(name).and_then(attachment_data_uri)
            }));
            out.push_str("</div>\n</div>\n</div>\n");
        }
        Cell::Code {
            source,
            execution_count,
            outputs,
        } => {
            out.push_str("<div class=\"cell border-box-sizing code_cell rendered\">\n");
            out.push_str("<div class=\"input\">\n");
            write_prompt(out, "input_prompt", "In", *execution_count)?;
            out.push_str("<div class=\"inner_cell\">\n<div class=\"input_area\">\n");
            write_code(out, source.as_str(), language)?;
            out.push_str("</div>\n</div>\n</div>\n");

            if !outputs.is_empty() {
                out.push_str("<div class=\"output_wrapper\">\n<div class=\"output\">\n");
                for output in outputs {
                    write_output(out, output)?;
                }
                out.push_str("</div>\n</div>\n");
            }
            out.push_str("</div>\n");
        }
        Cell::Raw { source, metadata } => {
            // Only raw cells aimed at HTML survive an HTML export.
            if matches!(metadata.format.as_deref(), Some("text/html" | "html")) {
                out.push_str(source.as_str());
                out.push('\n');
            }
        }
    }
    Ok(())
}

fn write_prompt(out: &mut String, class: &str, label: &str, count: Option<u32>) -> fmt::Result {
    match count {
        Some(n) => writeln!(out, "<div class=\"prompt {class}\">{label}&nbsp;[{n}]:</div>"),
        None => writeln!(out, "<div class=\"prompt {class}\">{label}&nbsp;[&nbsp;]:</div>"),
    }
}

fn write_code(out: &mut String, code: &str, language: Option<&str>) -> fmt::Result {
    let lang = language.map(class_token).unwrap_or_default();
    let lang = if lang.is_empty() { "text" } else { lang.as_str() };
    write!(out, "<div class=\"highlight hl-{lang}\"><pre>")?;

    match language.and_then(|lang| highlight::highlight(code, lang)) {
        Some(highlighted) => out.push_str(&highlighted),
        None => escape(out, code)?,
    }

    out.push_str("</pre></div>\n");
    Ok(())
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

fn write_output(out: &mut String, output: &Output) -> fmt::Result {
    out.push_str("<div class=\"output_area\">\n");

    match output {
        Output::Stream { name, text } => {
            out.push_str("<div class=\"prompt\"></div>\n");
            write!(
                out,
                "<div class=\"output_subarea output_stream output_{name} output_text\"><pre>"
            )?;
            escape(out, &strip_ansi(text.as_str()))?;
            out.push_str("</pre></div>\n");
        }
        Output::DisplayData { data } => {
            out.push_str("<div class=\"prompt\"></div>\n");
            write_rich(out, data, "")?;
        }
        Output::ExecuteResult {
            execution_count,
            data,
        } => {
            write_prompt(out, "output_prompt", "Out", *execution_count)?;
            write_rich(out, data, " output_execute_result")?;
        }
        Output::Error {
            ename,
            evalue,
            traceback,
        } => {
            out.push_str("<div class=\"prompt\"></div>\n");
            out.push_str("<div class=\"output_subarea output_text output_error\"><pre>");
            if traceback.is_empty() {
                escape(out, &format!("{ename}: {evalue}"))?;
            } else {
                escape(out, &strip_ansi(&traceback.join("\n")))?;
            }
            out.push_str("</pre></div>\n");
        }
    }

    out.push_str("</div>\n");
    Ok(())
}

fn write_rich(out: &mut String, data: &MimeBundle, extra_class: &str) -> fmt::Result {
    let Some((mime, payload)) = data.preferred(RICH_MIME_ORDER) else {
        debug!(mimes = ?data.0.keys().collect::<Vec<_>>(), "no renderable output mime");
        return Ok(());
    };

    match mime {
        "text/html" => {
            writeln!(
                out,
                "<div class=\"output_html rendered_html output_subarea{extra_class}\">"
            )?;
            out.push_str(&payload);
            out.push_str("\n</div>\n");
        }
        "image/svg+xml" => {
            writeln!(out, "<div class=\"output_svg output_subarea{extra_class}\">")?;
            out.push_str(&payload);
            out.push_str("\n</div>\n");
        }
        "image/png" | "image/jpeg" => {
            let class = if mime == "image/png" { "output_png" } else { "output_jpeg" };
            writeln!(
                out,
                "<div class=\"{class} output_subarea{extra_class}\">\n<img src=\"{}\">\n</div>",
                data_uri(mime, &payload)
            )?;
        }
        "text/markdown" => {
            writeln!(
                out,
                "<div class=\"output_markdown rendered_html output_subarea{extra_class}\">"
            )?;
            out.push_str(&markdown_to_html(&payload, |_| None));
            out.push_str("</div>\n");
        }
        _ => {
            write!(out, "<div class=\"output_text output_subarea{extra_class}\"><pre>")?;
            escape(out, &strip_ansi(&payload))?;
            out.push_str("</pre></div>\n");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_MATH);
    options
}

/// Render Markdown, resolving `attachment:<name>` image targets through `attachment`.
fn markdown_to_html<F>(source: &str, attachment: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let parser = Parser::new_ext(source, markdown_options()).map(|event| match event {
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => {
            let dest_url = dest_url
                .strip_prefix("attachment:")
                .and_then(&attachment)
                .map(CowStr::from)
                .unwrap_or(dest_url);
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            })
        }
        // Math goes back out with its delimiters for the client-side renderer.
        Event::InlineMath(math) => Event::Text(format!("${math}$").into()),
        Event::DisplayMath(math) => Event::Text(format!("$${math}$$").into()),
        other => other,
    });

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

fn attachment_data_uri(bundle: &MimeBundle) -> Option<String> {
    bundle
        .preferred(ATTACHMENT_MIMES)
        .map(|(mime, payload)| data_uri(mime, &payload))
}

fn data_uri(mime: &str, base64_payload: &str) -> String {
    let payload: String = base64_payload.split_whitespace().collect();
    format!("data:{mime};base64,{payload}")
}

/// Kernel language name reduced to characters safe in a class attribute.
fn class_token(language: &str) -> String {
    language
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '-'))
        .collect()
}

fn strip_ansi(text: &str) -> String {
    ANSI_RE.replace_all(text, "").into_owned()
}

fn escape(out: &mut String, text: &str) -> fmt::Result {
    escape_html(FmtWriter(out), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notebook(cells: &str) -> Notebook {
        let raw = format!(
            r#"{{"nbformat": 4, "nbformat_minor": 4,
                "metadata": {{"language_info": {{"name": "python"}}}},
                "cells": {cells}}}"#
        );
        Notebook::from_slice(raw.as_bytes()).expect("fixture notebook")
    }

    fn render(cells: &str) -> RenderedNotebook {
        HtmlExporter::new()
            .unwrap()
            .render(&notebook(cells))
            .unwrap()
    }

    #[test]
    fn markdown_cell_becomes_html() {
        let out = render(r##"[{"cell_type": "markdown", "source": "# Hello\n\n| a |\n|---|\n| 1 |"}]"##);
        assert!(out.body.contains("text_cell_render"));
        assert!(out.body.contains("<h1>Hello</h1>"));
        assert!(out.body.contains("<table>"));
    }

    #[test]
    fn math_keeps_its_backslashes() {
        let html = markdown_to_html(
            r"$$\begin{matrix} a & b \\ c & d \end{matrix}$$ and $x_1 \\ y$",
            |_| None,
        );
        assert!(html.contains(r"$$\begin{matrix} a &amp; b \\ c &amp; d \end{matrix}$$"));
        assert!(html.contains(r"$x_1 \\ y$"));
        assert!(!html.contains("math-inline"));
    }

    #[test]
    fn language_class_is_sanitized() {
        let mut out = String::new();
        write_code(&mut out, "x", Some(r#"py" onclick="x"#)).unwrap();
        assert!(out.starts_with(r#"<div class="highlight hl-pyonclickx"><pre>"#));

        out.clear();
        write_code(&mut out, "x", Some("c++")).unwrap();
        assert!(out.starts_with(r#"<div class="highlight hl-c++"><pre>"#));
    }

    #[test]
    fn code_cell_has_prompt_and_escaped_source() {
        let out = render(
            r#"[{"cell_type": "code", "execution_count": 7, "source": "x = 1 < 2", "outputs": []}]"#,
        );
        assert!(out.body.contains("In&nbsp;[7]:"));
        assert!(out.body.contains("&lt;"));
        assert!(!out.body.contains("1 < 2"));
        assert!(!out.body.contains("output_wrapper"));
    }

    #[test]
    fn outputs_are_rendered_by_preference() {
        let out = render(
            r#"[{"cell_type": "code", "execution_count": 1, "source": "df", "outputs": [
                {"output_type": "stream", "name": "stderr", "text": "warn <x>\n"},
                {"output_type": "execute_result", "execution_count": 1,
                 "data": {"text/html": "<table class=\"df\"></table>", "text/plain": "df"}},
                {"output_type": "display_data", "data": {"image/png": "AAAA\nBBBB\n"}}
            ]}]"#,
        );
        assert!(out.body.contains("output_stderr"));
        assert!(out.body.contains("warn &lt;x&gt;"));
        assert!(out.body.contains("Out&nbsp;[1]:"));
        assert!(out.body.contains("<table class=\"df\"></table>"));
        assert!(out.body.contains("data:image/png;base64,AAAABBBB"));
    }

    #[test]
    fn error_traceback_loses_ansi_codes() {
        let out = render(
            r#"[{"cell_type": "code", "execution_count": 2, "source": "1/0", "outputs": [
                {"output_type": "error", "ename": "ZeroDivisionError", "evalue": "division by zero",
                 "traceback": ["\u001b[0;31mZeroDivisionError\u001b[0m: division by zero"]}
            ]}]"#,
        );
        assert!(out.body.contains("output_error"));
        assert!(out.body.contains("ZeroDivisionError: division by zero"));
        assert!(!out.body.contains('\u{1b}'));
    }

    #[test]
    fn markdown_attachments_are_inlined() {
        let out = render(
            r#"[{"cell_type": "markdown", "source": "![plot](attachment:plot.png)",
                 "attachments": {"plot.png": {"image/png": "QUJD"}}}]"#,
        );
        assert!(out.body.contains("data:image/png;base64,QUJD"));
    }

    #[test]
    fn raw_cells_only_pass_through_for_html() {
        let out = render(
            r#"[{"cell_type": "raw", "metadata": {"format": "text/html"}, "source": "<b>kept</b>"},
                {"cell_type": "raw", "metadata": {"format": "text/latex"}, "source": "\\dropped"}]"#,
        );
        assert!(out.body.contains("<b>kept</b>"));
        assert!(!out.body.contains("dropped"));
    }

    #[test]
    fn exporter_provides_three_stylesheets() {
        let out = render("[]");
        assert_eq!(out.stylesheets.len(), 3);
        assert!(out.stylesheets[1].contains(".hl-"));
        assert!(out.body.is_empty());
    }
}
