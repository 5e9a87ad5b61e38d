//! Notebook reference discovery.
//!
//! Before any notebook is rendered, every documentation page is scanned for
//! Markdown links pointing at `.ipynb` files. The union of those links, with
//! duplicates removed, is what the materializer works through.

mod parser;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use swangallery_shared::{GalleryError, NotebookRef, Result};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// File extension of documentation pages.
const PAGE_EXTENSION: &str = "md";

/// Notebook link targets in one page's source, exactly as written.
pub fn scan_page(source: &str) -> Vec<&str> {
    parser::find_notebook_links(source)
}

/// List every documentation page under `docs_dir`, sorted for stable output.
#[instrument(skip_all, fields(docs_dir = %docs_dir.display()))]
pub fn collect_pages(docs_dir: &Path) -> Result<Vec<PathBuf>> {
    if !docs_dir.is_dir() {
        return Err(GalleryError::config(format!(
            "docs directory {} does not exist",
            docs_dir.display()
        )));
    }

    let mut pages = Vec::new();
    for entry in WalkDir::new(docs_dir).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(docs_dir).to_path_buf();
            GalleryError::io(path, e.into())
        })?;
        let is_page = entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == PAGE_EXTENSION);
        if is_page {
            pages.push(entry.into_path());
        }
    }
    pages.sort();

    debug!(count = pages.len(), "collected documentation pages");
    Ok(pages)
}

/// Read each page and gather the unique notebook references across all of them.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn scan_pages(pages: &[PathBuf]) -> Result<BTreeSet<NotebookRef>> {
    let mut notebooks = BTreeSet::new();

    for page in pages {
        let source = std::fs::read_to_string(page).map_err(|e| GalleryError::io(page, e))?;
        let links = scan_page(&source);
        if !links.is_empty() {
            debug!(page = %page.display(), links = links.len(), "found notebook links");
        }
        notebooks.extend(links.into_iter().map(NotebookRef::parse));
    }

    info!(unique = notebooks.len(), "notebook references discovered");
    Ok(notebooks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_pages_deduplicates_across_pages() {
        let tmp = tempfile::tempdir().unwrap();
        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(docs.join("sub")).unwrap();
        std::fs::write(
            docs.join("index.md"),
            "- [One](a/one.ipynb)\n- [Two](b/two/two.ipynb?clone_folder=True)\n",
        )
        .unwrap();
        std::fs::write(docs.join("sub/more.md"), "[One again](a/one.ipynb)\n").unwrap();
        std::fs::write(docs.join("notes.txt"), "[Ignored](c/three.ipynb)\n").unwrap();

        let pages = collect_pages(&docs).unwrap();
        assert_eq!(pages.len(), 2);

        let refs = scan_pages(&pages).unwrap();
        let raw: Vec<String> = refs.iter().map(ToString::to_string).collect();
        assert_eq!(
            raw,
            vec!["a/one.ipynb", "b/two/two.ipynb?clone_folder=True"]
        );
    }

    #[test]
    fn missing_docs_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(collect_pages(&tmp.path().join("nope")).is_err());
    }

    #[test]
    fn unreadable_page_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let result = scan_pages(&[tmp.path().join("gone.md")]);
        assert!(matches!(result, Err(GalleryError::Io { .. })));
    }
}
