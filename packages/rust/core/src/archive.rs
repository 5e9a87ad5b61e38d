//! Zip bundles for clone-folder notebooks.

use std::fs::File;
use std::io;
use std::path::Path;

use tracing::{debug, instrument};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use swangallery_shared::{GalleryError, OutputKind, Result};

/// Zip the contents of `folder` into `dest`, returning the number of files
/// written.
///
/// Entry names are relative to `folder` and visited in file-name order with a
/// fixed timestamp, so zipping the same tree twice gives the same bytes.
#[instrument(skip_all, fields(folder = %folder.display()))]
pub fn zip_folder(folder: &Path, dest: &Path) -> Result<usize> {
    if !folder.is_dir() {
        return Err(GalleryError::missing(OutputKind::Archive, folder));
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GalleryError::io(parent, e))?;
    }
    let file = File::create(dest).map_err(|e| GalleryError::io(dest, e))?;

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut files = 0;
    for entry in WalkDir::new(folder).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            GalleryError::Archive(format!("walking {}: {e}", folder.display()))
        })?;
        let name = entry_name(folder, entry.path())?;

        if entry.file_type().is_dir() {
            zip.add_directory(name, options).map_err(archive_error)?;
            continue;
        }

        zip.start_file(name, options).map_err(archive_error)?;
        let mut src = File::open(entry.path()).map_err(|e| GalleryError::io(entry.path(), e))?;
        io::copy(&mut src, &mut zip).map_err(|e| GalleryError::io(entry.path(), e))?;
        files += 1;
    }

    zip.finish().map_err(archive_error)?;
    debug!(dest = %dest.display(), files, "wrote notebook archive");
    Ok(files)
}

/// `/`-separated path of `path` inside `root`.
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        GalleryError::Archive(format!("{} is outside {}", path.display(), root.display()))
    })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

fn archive_error(e: zip::result::ZipError) -> GalleryError {
    GalleryError::Archive(e.to_string())
}
