//! End-to-end `build` pipeline:
//! config → scan pages → materialize notebooks → emit → rewrite galleries.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use swangallery_discovery::{collect_pages, scan_pages};
use swangallery_gallery::{CardTemplate, rewrite_page};
use swangallery_notebook::HtmlExporter;
use swangallery_shared::{
    AppConfig, GalleryConfig, GalleryError, NotebookRef, OutputFile, Result, load_config_from,
};

use crate::context::BuildContext;
use crate::materializer::materialize;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Values handed to the page-template layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateVars {
    pub notebook_dir: String,
    pub open_in_swan_url: String,
    pub gallery_url: String,
}

impl TemplateVars {
    fn from_config(config: &GalleryConfig) -> Self {
        Self {
            notebook_dir: config.notebook_dir.clone(),
            open_in_swan_url: config.open_in_swan_url.clone(),
            gallery_url: config.gallery_url.clone(),
        }
    }
}

/// Totals from rewriting the built pages of a site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteSummary {
    /// HTML pages inspected.
    pub pages: usize,
    /// Pages that gained at least one card.
    pub rewritten: usize,
    /// Cards produced across all pages.
    pub cards: usize,
    /// Notebook links left unchanged.
    pub skipped_links: usize,
}

/// Result of the `build` pipeline, also written out as the build manifest.
#[derive(Debug, Serialize)]
pub struct BuildResult {
    /// Documentation pages scanned for references.
    pub pages_scanned: usize,
    /// Unique references, in materialization order.
    pub notebooks: Vec<NotebookRef>,
    /// Files copied into the site directory.
    pub files: Vec<OutputFile>,
    pub rewrite: RewriteSummary,
    pub template: TemplateVars,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each notebook's assets are materialized.
    fn notebook_rendered(&self, reference: &str, current: usize, total: usize);
    /// Called for every page that gained gallery cards.
    fn page_rewritten(&self, path: &str, cards: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn notebook_rendered(&self, _reference: &str, _current: usize, _total: usize) {}
    fn page_rewritten(&self, _path: &str, _cards: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Load `swangallery.toml` and validate it, resolving paths against the
/// directory that holds the file.
pub fn load_config(path: &Path) -> Result<GalleryConfig> {
    let app: AppConfig = load_config_from(path)?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    GalleryConfig::resolve(&app, base_dir)
}

/// Copy every output file to `<site_dir>/<dest_path>`, overwriting what is
/// there.
#[instrument(skip_all, fields(site_dir = %site_dir.display(), files = files.len()))]
pub fn emit(files: &[OutputFile], site_dir: &Path) -> Result<()> {
    for file in files {
        let target = site_dir.join(&file.dest_path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GalleryError::io(parent, e))?;
        }
        std::fs::copy(&file.src_path, &target).map_err(|e| GalleryError::io(&file.src_path, e))?;
        debug!(kind = %file.kind, dest = %target.display(), "emitted file");
    }
    Ok(())
}

/// Apply the gallery rewrite to every `.html` page under `site_dir`.
///
/// Pages are rewritten in place; pages without convertible links are left
/// byte-for-byte untouched.
#[instrument(skip_all, fields(site_dir = %site_dir.display()))]
pub fn rewrite_site(
    site_dir: &Path,
    template: &CardTemplate,
    notebook_dir: &str,
    progress: &dyn ProgressReporter,
) -> Result<RewriteSummary> {
    let mut summary = RewriteSummary::default();
    if !site_dir.is_dir() {
        return Ok(summary);
    }

    for page in html_pages(site_dir)? {
        let html = std::fs::read_to_string(&page).map_err(|e| GalleryError::io(&page, e))?;
        let rewrite = rewrite_page(&html, template, notebook_dir);

        summary.pages += 1;
        summary.skipped_links += rewrite.skipped.len();
        if !rewrite.is_rewritten() {
            continue;
        }

        std::fs::write(&page, rewrite.html.as_bytes()).map_err(|e| GalleryError::io(&page, e))?;
        summary.rewritten += 1;
        summary.cards += rewrite.cards;

        let relative = page.strip_prefix(site_dir).unwrap_or(&page);
        progress.page_rewritten(&relative.display().to_string(), rewrite.cards);
    }

    info!(
        pages = summary.pages,
        rewritten = summary.rewritten,
        cards = summary.cards,
        "gallery rewrite complete"
    );
    Ok(summary)
}

/// `.html` files under `dir`, in path order.
fn html_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            GalleryError::io(path, e.into())
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "html")
        {
            pages.push(entry.into_path());
        }
    }
    Ok(pages)
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full `build` pipeline.
///
/// 1. Set up the build context (scratch directory)
/// 2. Scan documentation pages for notebook references
/// 3. Materialize each unique reference
/// 4. Emit the output files into the site directory
/// 5. Rewrite notebook link lists on the site's HTML pages
///
/// Rendered notebooks are emitted as staged `<notebook_dir>/**/*.md` pages.
/// Gallery cards link to the matching `.html`, so the host site generator
/// has to render those pages after [`emit`] for the links to resolve.
#[instrument(skip_all, fields(docs_dir = %config.docs_dir.display()))]
pub fn run_build(config: GalleryConfig, progress: &dyn ProgressReporter) -> Result<BuildResult> {
    let start = Instant::now();
    let ctx = BuildContext::new(config)?;
    let config = ctx.config();

    info!(
        docs_dir = %config.docs_dir.display(),
        site_dir = %config.site_dir.display(),
        "starting build pipeline"
    );

    // --- Phase 1: Scan ---
    progress.phase("Scanning pages");
    let pages = collect_pages(&config.docs_dir)?;
    let refs: BTreeSet<NotebookRef> = scan_pages(&pages)?;

    // --- Phase 2: Materialize ---
    progress.phase("Rendering notebooks");
    let renderer = HtmlExporter::new()?;
    let files = materialize(&ctx, &refs, &renderer, progress)?;

    // --- Phase 3: Emit ---
    progress.phase("Copying notebook assets");
    emit(&files, &config.site_dir)?;

    // --- Phase 4: Rewrite ---
    progress.phase("Building galleries");
    let template = CardTemplate::new();
    let rewrite = rewrite_site(&config.site_dir, &template, &config.notebook_dir, progress)?;

    let result = BuildResult {
        pages_scanned: pages.len(),
        notebooks: refs.into_iter().collect(),
        files,
        rewrite,
        template: TemplateVars::from_config(config),
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        notebooks = result.notebooks.len(),
        files = result.files.len(),
        cards = result.rewrite.cards,
        elapsed_ms = result.elapsed.as_millis(),
        "build pipeline complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swangallery_shared::{CONFIG_FILE_NAME, OutputKind};

    use crate::context::tests::config_at;

    const NOTEBOOK: &str = r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
        "cells": [{"cell_type": "code", "execution_count": 1, "source": "1 + 1",
                   "outputs": [{"output_type": "execute_result", "execution_count": 1,
                                "metadata": {}, "data": {"text/plain": "2"}}]}]}"#;

    const INDEX_HTML: &str = r#"<h1>Gallery</h1><ul><li><a href="a/b/nb.ipynb">Plain</a></li><li><a href="c/nb2/nb2.ipynb?clone_folder=True">Zipped</a></li></ul>"#;

    /// A project with one page linking one plain and one clone-folder
    /// notebook, and a built `index.html` holding the same links.
    fn project(root: &Path) {
        std::fs::create_dir_all(root.join("docs")).unwrap();
        std::fs::write(
            root.join("docs/index.md"),
            "# Gallery\n\n- [Plain](a/b/nb.ipynb)\n- [Zipped](c/nb2/nb2.ipynb?clone_folder=True)\n",
        )
        .unwrap();

        std::fs::create_dir_all(root.join("a/b/nbSnapshots")).unwrap();
        std::fs::write(root.join("a/b/nb.ipynb"), NOTEBOOK).unwrap();
        std::fs::write(root.join("a/b/nbSnapshots/nb.png"), b"png1").unwrap();

        std::fs::create_dir_all(root.join("c/nb2")).unwrap();
        std::fs::create_dir_all(root.join("c/nbSnapshots")).unwrap();
        std::fs::write(root.join("c/nb2/nb2.ipynb"), NOTEBOOK).unwrap();
        std::fs::write(root.join("c/nb2/input.txt"), "data").unwrap();
        std::fs::write(root.join("c/nbSnapshots/nb2.png"), b"png2").unwrap();

        std::fs::create_dir_all(root.join("site")).unwrap();
        std::fs::write(root.join("site/index.html"), INDEX_HTML).unwrap();
    }

    #[test]
    fn build_emits_assets_and_rewrites_pages() {
        let tmp = tempfile::tempdir().unwrap();
        project(tmp.path());

        let result = run_build(config_at(tmp.path()), &SilentProgress).unwrap();
        let site = tmp.path().join("site/notebooks");

        assert_eq!(result.pages_scanned, 1);
        assert_eq!(result.notebooks.len(), 2);
        assert_eq!(result.files.len(), 6);

        assert!(site.join("a/b/nb.md").is_file());
        assert_eq!(std::fs::read(site.join("a/b/nb.png")).unwrap(), b"png1");
        assert!(site.join("a/b/nb.ipynb").is_file());
        assert!(site.join("c/nb2.md").is_file());
        assert!(site.join("c/nb2.png").is_file());
        assert!(site.join("c/nb2.zip").is_file());
        assert!(!site.join("c/nb2.ipynb").exists());

        let index = std::fs::read_to_string(tmp.path().join("site/index.html")).unwrap();
        assert!(index.contains(r#"<div class="gallery">"#));
        assert!(index.contains(r#"href="/notebooks/a/b/nb.html""#));
        assert!(index.contains(r#"href="/notebooks/c/nb2.html""#));
        assert_eq!(result.rewrite.cards, 2);
        assert_eq!(result.rewrite.rewritten, 1);
    }

    #[test]
    fn rewrite_site_keeps_document_shell() {
        let tmp = tempfile::tempdir().unwrap();
        let site = tmp.path().join("site");
        std::fs::create_dir_all(site.join("guide")).unwrap();
        let page = site.join("guide/index.html");
        std::fs::write(
            &page,
            concat!(
                "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Guide</title></head>\n",
                "<body><nav><a href=\"../index.html\">Home</a></nav>\n",
                "<ul><li><a href=\"a/b/nb.ipynb\">Plain</a></li></ul>\n</body>\n</html>\n",
            ),
        )
        .unwrap();

        let summary =
            rewrite_site(&site, &CardTemplate::new(), "notebooks", &SilentProgress).unwrap();
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.rewritten, 1);
        assert_eq!(summary.cards, 1);

        let html = std::fs::read_to_string(&page).unwrap();
        assert!(html.starts_with("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>Guide</title></head>"));
        assert!(html.contains(r#"<nav><a href="../index.html">Home</a></nav>"#));
        assert!(html.contains(r#"<div class="gallery"><article>"#));
        assert!(html.contains(r#"href="/notebooks/a/b/nb.html""#));
        assert!(html.contains("</body>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn staged_pages_are_identical_across_builds() {
        let tmp = tempfile::tempdir().unwrap();
        project(tmp.path());
        let page = tmp.path().join("site/notebooks/a/b/nb.md");

        run_build(config_at(tmp.path()), &SilentProgress).unwrap();
        let first = std::fs::read(&page).unwrap();
        run_build(config_at(tmp.path()), &SilentProgress).unwrap();
        let second = std::fs::read(&page).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn rendered_notebook_pages_are_not_rewritten() {
        let tmp = tempfile::tempdir().unwrap();
        project(tmp.path());
        let rendered = tmp.path().join("site/notebooks/a/b/nb.html");
        std::fs::create_dir_all(rendered.parent().unwrap()).unwrap();
        let html = r#"<ul><li><a href="x.ipynb">x</a></li></ul><div id='rendered_gallery_notebook'></div>"#;
        std::fs::write(&rendered, html).unwrap();

        run_build(config_at(tmp.path()), &SilentProgress).unwrap();
        assert_eq!(std::fs::read_to_string(&rendered).unwrap(), html);
    }

    #[test]
    fn missing_preview_aborts_build() {
        let tmp = tempfile::tempdir().unwrap();
        project(tmp.path());
        std::fs::remove_file(tmp.path().join("c/nbSnapshots/nb2.png")).unwrap();

        let err = run_build(config_at(tmp.path()), &SilentProgress).unwrap_err();
        assert!(matches!(
            err,
            GalleryError::MissingSource {
                kind: OutputKind::Snapshot,
                ..
            }
        ));
        assert!(!tmp.path().join("site/notebooks").exists());
    }

    #[test]
    fn load_config_resolves_against_file_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[gallery]\nopen_in_swan_url = \"https://swan.example/\"\ngallery_url = \"https://g.example/\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.docs_dir, tmp.path().join("docs"));
        assert_eq!(config.source_root, tmp.path());
    }

    #[test]
    fn load_config_requires_urls() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[gallery]\ngallery_url = \"https://g.example/\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, GalleryError::Config { .. }));
    }

    #[test]
    fn manifest_serializes() {
        let tmp = tempfile::tempdir().unwrap();
        project(tmp.path());
        let result = run_build(config_at(tmp.path()), &SilentProgress).unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["template"]["gallery_url"], "https://gallery.example/");
        assert_eq!(json["files"].as_array().unwrap().len(), 6);
        assert!(json.get("elapsed").is_none());
    }
}
