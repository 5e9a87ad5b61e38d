//! Core domain types: notebook references and the files they materialize into.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{GalleryError, Result};

/// Query suffix that turns a notebook link into a "clone the whole folder" link.
pub const CLONE_FOLDER_QUERY: &str = "?clone_folder=True";

/// Marker embedded in every rendered notebook page.
pub const RENDERED_MARKER: &str = "id='rendered_gallery_notebook'";

/// Folder, beside each notebook, holding its preview images.
pub const SNAPSHOT_DIR: &str = "nbSnapshots";

const NOTEBOOK_SUFFIX: &str = ".ipynb";

// ---------------------------------------------------------------------------
// NotebookRef
// ---------------------------------------------------------------------------

/// A notebook linked from a documentation page.
///
/// Identity is the normalized path plus the clone-folder flag, so the same
/// notebook linked both ways materializes twice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NotebookRef {
    path: String,
    clone_folder: bool,
}

impl NotebookRef {
    /// Build a reference from link text as written in a page, e.g.
    /// `a/b/nb.ipynb` or `a/b/nb/nb.ipynb?clone_folder=True`.
    pub fn parse(raw: &str) -> Self {
        let (path, clone_folder) = match raw.strip_suffix(CLONE_FOLDER_QUERY) {
            Some(stripped) => (stripped, true),
            None => (raw, false),
        };

        let path = path
            .split('/')
            .filter(|seg| !seg.is_empty() && *seg != ".")
            .collect::<Vec<_>>()
            .join("/");

        Self { path, clone_folder }
    }

    /// Normalized path without the query suffix.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the link asked for the zipped-folder variant.
    pub fn clone_folder(&self) -> bool {
        self.clone_folder
    }

    /// Resolve where this notebook lives and where its assets go.
    ///
    /// Clone-folder links nest the notebook one level inside the folder that
    /// gets zipped, so that level is dropped from the origin folder. A link
    /// with no folder level at all (`nb.ipynb?clone_folder=True`) keeps an
    /// empty origin and zips `<root>/nb/`.
    pub fn layout(&self) -> Result<NotebookLayout> {
        let mut segments: Vec<&str> = self.path.split('/').collect();
        let file_name = segments.pop().unwrap_or_default();

        if !file_name.ends_with(NOTEBOOK_SUFFIX) {
            return Err(GalleryError::validation(format!(
                "'{}' is not a notebook reference",
                self
            )));
        }

        if self.clone_folder {
            segments.pop();
        }

        Ok(NotebookLayout {
            origin_folder: segments.join("/"),
            file_name: file_name.to_string(),
            clone_folder: self.clone_folder,
        })
    }
}

impl fmt::Display for NotebookRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clone_folder {
            write!(f, "{}{CLONE_FOLDER_QUERY}", self.path)
        } else {
            f.write_str(&self.path)
        }
    }
}

// ---------------------------------------------------------------------------
// NotebookLayout
// ---------------------------------------------------------------------------

/// Source and destination paths derived from a [`NotebookRef`].
///
/// Everything here is a pure function of the reference, so two builds of the
/// same reference always agree on where things go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookLayout {
    /// Folder of the notebook relative to the source root (`/`-separated, may be empty).
    pub origin_folder: String,
    /// Notebook file name, e.g. `nb.ipynb`.
    pub file_name: String,
    /// Whether the notebook ships as a zipped folder.
    pub clone_folder: bool,
}

impl NotebookLayout {
    /// File name without the `.ipynb` extension.
    pub fn stem(&self) -> &str {
        self.file_name
            .strip_suffix(NOTEBOOK_SUFFIX)
            .unwrap_or(&self.file_name)
    }

    fn origin_segments(&self) -> impl Iterator<Item = &str> {
        self.origin_folder.split('/').filter(|seg| !seg.is_empty())
    }

    /// `<notebook_dir>/<origin>` relative to the site output directory.
    pub fn dest_dir(&self, notebook_dir: &str) -> PathBuf {
        let mut dir = PathBuf::from(notebook_dir);
        dir.extend(self.origin_segments());
        dir
    }

    /// `<notebook_dir>/<origin>/<stem>.<ext>` relative to the site output directory.
    pub fn dest_path(&self, notebook_dir: &str, ext: &str) -> PathBuf {
        self.dest_dir(notebook_dir)
            .join(format!("{}.{ext}", self.stem()))
    }

    /// Absolute-style site URL `/<notebook_dir>/<origin>/<stem>.<ext>`.
    pub fn site_url(&self, notebook_dir: &str, ext: &str) -> String {
        let mut url = String::from("/");
        url.push_str(notebook_dir.trim_matches('/'));
        for seg in self.origin_segments() {
            url.push('/');
            url.push_str(seg);
        }
        url.push('/');
        url.push_str(self.stem());
        url.push('.');
        url.push_str(ext);
        url
    }

    /// Folder holding the notebook's snapshot directory (and, for clone-folder
    /// references, the folder to zip).
    pub fn source_dir(&self, source_root: &Path) -> PathBuf {
        let mut dir = source_root.to_path_buf();
        dir.extend(self.origin_segments());
        dir
    }

    /// The `.ipynb` file that gets rendered.
    pub fn source_notebook(&self, source_root: &Path) -> PathBuf {
        if self.clone_folder {
            self.bundle_dir(source_root).join(&self.file_name)
        } else {
            self.source_dir(source_root).join(&self.file_name)
        }
    }

    /// Folder zipped for clone-folder references.
    pub fn bundle_dir(&self, source_root: &Path) -> PathBuf {
        self.source_dir(source_root).join(self.stem())
    }

    /// Pre-rendered preview image.
    pub fn snapshot(&self, source_root: &Path) -> PathBuf {
        self.source_dir(source_root)
            .join(SNAPSHOT_DIR)
            .join(format!("{}.png", self.stem()))
    }
}

// ---------------------------------------------------------------------------
// OutputFile
// ---------------------------------------------------------------------------

/// What an [`OutputFile`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Staged markup page rendered from the notebook.
    RenderedPage,
    /// Preview image copied from `nbSnapshots/`.
    Snapshot,
    /// The original notebook file.
    Notebook,
    /// Zip of the notebook's folder.
    Archive,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RenderedPage => "rendered page",
            Self::Snapshot => "preview image",
            Self::Notebook => "notebook",
            Self::Archive => "archive folder",
        })
    }
}

/// A file registered for the site output, copied from `src_path` to
/// `<site_dir>/<dest_path>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub kind: OutputKind,
    /// Absolute (or config-relative) location of the file to copy.
    pub src_path: PathBuf,
    /// Destination relative to the site output directory.
    pub dest_path: PathBuf,
    /// Host directory-URL flag; notebook assets are always served verbatim.
    pub use_directory_urls: bool,
}

impl OutputFile {
    pub fn new(kind: OutputKind, src_path: PathBuf, dest_path: PathBuf) -> Self {
        Self {
            kind,
            src_path,
            dest_path,
            use_directory_urls: false,
        }
    }
}
