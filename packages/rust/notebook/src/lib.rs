//! Notebook page rendering.
//!
//! Turns an `.ipynb` document into the staged Markdown page the site builder
//! picks up: a front-matter header, an embedded stylesheet, the rendered cell
//! markup, and the marker the gallery rewriter uses to leave such pages alone.

mod exporter;
pub mod format;
mod highlight;

use std::path::Path;

use tracing::{debug, instrument};

use swangallery_shared::{
    GalleryError, NotebookLayout, OutputKind, RENDERED_MARKER, Result,
};

pub use exporter::{DEFAULT_THEME, HtmlExporter, NotebookRenderer, RenderedNotebook};
pub use format::Notebook;

/// Page template selected in the front-matter of every rendered notebook.
pub const PAGE_TEMPLATE: &str = "notebook.html";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Front-matter values of a rendered notebook page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    /// Notebook file name, shown as the page title.
    pub notebook_name: String,
    /// Site URL of the downloadable notebook or zip.
    pub notebook_url: String,
}

impl PageMeta {
    /// Front-matter for a notebook materialized under `notebook_dir`.
    pub fn for_layout(layout: &NotebookLayout, notebook_dir: &str) -> Self {
        let ext = if layout.clone_folder { "zip" } else { "ipynb" };
        Self {
            notebook_name: layout.file_name.clone(),
            notebook_url: layout.site_url(notebook_dir, ext),
        }
    }

    fn frontmatter(&self) -> String {
        format!(
            "---\ntemplate: {PAGE_TEMPLATE}\nnotebook_name: {}\nnotebook_url: {}\n---\n",
            self.notebook_name, self.notebook_url
        )
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render raw notebook bytes into a complete staged page.
///
/// Every stylesheet fragment but the first is inlined into one `<style>`
/// block; the first is the base notebook layout the site theme provides.
pub fn render_page(raw: &[u8], meta: &PageMeta, renderer: &dyn NotebookRenderer) -> Result<String> {
    let notebook = Notebook::from_slice(raw)?;
    let rendered = renderer.render(&notebook)?;

    let mut page = meta.frontmatter();
    page.push_str("<style>\n");
    for style in rendered.stylesheets.iter().skip(1) {
        page.push_str(style);
    }
    page.push_str("</style>\n");
    page.push_str(&rendered.body);
    page.push_str("<div ");
    page.push_str(RENDERED_MARKER);
    page.push_str("></div>");

    Ok(page)
}

/// Render the notebook at `source` and write the page to `dest`.
///
/// Parent directories are created as needed and an existing page is
/// overwritten, so staging the same notebook twice yields the same bytes.
#[instrument(skip(meta, renderer), fields(source = %source.display()))]
pub fn stage_page(
    source: &Path,
    dest: &Path,
    meta: &PageMeta,
    renderer: &dyn NotebookRenderer,
) -> Result<()> {
    if !source.is_file() {
        return Err(GalleryError::missing(OutputKind::Notebook, source));
    }

    let raw = std::fs::read(source).map_err(|e| GalleryError::io(source, e))?;
    let page = render_page(&raw, meta, renderer).map_err(|e| match e {
        GalleryError::Parse { message } => {
            GalleryError::parse(format!("{}: {message}", source.display()))
        }
        other => other,
    })?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GalleryError::io(parent, e))?;
    }
    std::fs::write(dest, &page).map_err(|e| GalleryError::io(dest, e))?;

    debug!(dest = %dest.display(), len = page.len(), "staged notebook page");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use swangallery_shared::NotebookRef;

    const MINIMAL: &str = r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
        "cells": [{"cell_type": "markdown", "source": "Hello"}]}"#;

    /// Renderer with fixed output, so page composition is tested on its own.
    struct FixedRenderer;

    impl NotebookRenderer for FixedRenderer {
        fn render(&self, _notebook: &Notebook) -> Result<RenderedNotebook> {
            Ok(RenderedNotebook {
                body: "<p>body</p>".into(),
                stylesheets: vec!["BASE".into(), ".a{}".into(), ".b{}".into()],
            })
        }
    }

    fn meta(reference: &str) -> PageMeta {
        let layout = NotebookRef::parse(reference).layout().unwrap();
        PageMeta::for_layout(&layout, "notebooks")
    }

    #[test]
    fn page_composition() {
        let page = render_page(MINIMAL.as_bytes(), &meta("a/b/nb.ipynb"), &FixedRenderer).unwrap();
        assert_eq!(
            page,
            "---\ntemplate: notebook.html\nnotebook_name: nb.ipynb\nnotebook_url: /notebooks/a/b/nb.ipynb\n---\n\
             <style>\n.a{}.b{}</style>\n<p>body</p><div id='rendered_gallery_notebook'></div>"
        );
    }

    #[test]
    fn clone_folder_page_points_at_zip() {
        let m = meta("a/b/nb/nb.ipynb?clone_folder=True");
        assert_eq!(m.notebook_name, "nb.ipynb");
        assert_eq!(m.notebook_url, "/notebooks/a/b/nb.zip");
    }

    #[test]
    fn first_stylesheet_is_skipped() {
        let page = render_page(MINIMAL.as_bytes(), &meta("nb.ipynb"), &FixedRenderer).unwrap();
        assert!(!page.contains("BASE"));
    }

    #[test]
    fn real_exporter_page_carries_marker() {
        let exporter = HtmlExporter::new().unwrap();
        let page = render_page(MINIMAL.as_bytes(), &meta("nb.ipynb"), &exporter).unwrap();
        assert!(page.starts_with("---\ntemplate: notebook.html\n"));
        assert!(page.contains("<p>Hello</p>"));
        assert!(page.ends_with("<div id='rendered_gallery_notebook'></div>"));
    }

    #[test]
    fn stage_page_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("nb.ipynb");
        let dest = tmp.path().join("out/notebooks/nb.md");
        std::fs::write(&source, MINIMAL).unwrap();
        let exporter = HtmlExporter::new().unwrap();

        stage_page(&source, &dest, &meta("nb.ipynb"), &exporter).unwrap();
        let first = std::fs::read(&dest).unwrap();
        stage_page(&source, &dest, &meta("nb.ipynb"), &exporter).unwrap();
        let second = std::fs::read(&dest).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn stage_page_missing_notebook() {
        let tmp = tempfile::tempdir().unwrap();
        let err = stage_page(
            &tmp.path().join("absent.ipynb"),
            &tmp.path().join("absent.md"),
            &meta("absent.ipynb"),
            &FixedRenderer,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GalleryError::MissingSource {
                kind: OutputKind::Notebook,
                ..
            }
        ));
    }

    #[test]
    fn stage_page_reports_malformed_notebook_path() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("broken.ipynb");
        std::fs::write(&source, "{").unwrap();
        let err = stage_page(&source, &tmp.path().join("b.md"), &meta("broken.ipynb"), &FixedRenderer)
            .unwrap_err();
        assert!(err.to_string().contains("broken.ipynb"));
    }
}
