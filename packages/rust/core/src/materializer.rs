//! Turns notebook references into output files.
//!
//! Every reference yields exactly three files under
//! `<notebook_dir>/<origin_folder>/`: the rendered page, the preview image,
//! and either the notebook itself or a zip of its folder.

use std::collections::BTreeSet;

use tracing::{debug, info, instrument};

use swangallery_notebook::{NotebookRenderer, PageMeta, stage_page};
use swangallery_shared::{GalleryError, NotebookRef, OutputFile, OutputKind, Result};

use crate::archive;
use crate::context::BuildContext;
use crate::pipeline::ProgressReporter;

/// Materialize every reference in order. The first failure aborts the build.
#[instrument(skip_all, fields(notebooks = refs.len()))]
pub fn materialize(
    ctx: &BuildContext,
    refs: &BTreeSet<NotebookRef>,
    renderer: &dyn NotebookRenderer,
    progress: &dyn ProgressReporter,
) -> Result<Vec<OutputFile>> {
    let mut files = Vec::with_capacity(refs.len() * 3);
    let total = refs.len();

    for (i, reference) in refs.iter().enumerate() {
        files.extend(materialize_one(ctx, reference, renderer)?);
        progress.notebook_rendered(&reference.to_string(), i + 1, total);
    }

    info!(notebooks = total, files = files.len(), "materialized notebook assets");
    Ok(files)
}

/// Stage and register the three files of a single reference.
#[instrument(skip_all, fields(reference = %reference))]
pub fn materialize_one(
    ctx: &BuildContext,
    reference: &NotebookRef,
    renderer: &dyn NotebookRenderer,
) -> Result<[OutputFile; 3]> {
    let layout = reference.layout()?;
    let config = ctx.config();
    let notebook_dir = config.notebook_dir.as_str();
    let root = config.source_root.as_path();

    // Rendered page, staged in scratch.
    let page_dest = layout.dest_path(notebook_dir, "md");
    let staged_page = ctx.scratch_dir().join(&page_dest);
    stage_page(
        &layout.source_notebook(root),
        &staged_page,
        &PageMeta::for_layout(&layout, notebook_dir),
        renderer,
    )?;
    let page = OutputFile::new(OutputKind::RenderedPage, staged_page, page_dest);

    let snapshot_src = layout.snapshot(root);
    if !snapshot_src.is_file() {
        return Err(GalleryError::missing(OutputKind::Snapshot, snapshot_src));
    }
    let snapshot = OutputFile::new(
        OutputKind::Snapshot,
        snapshot_src,
        layout.dest_path(notebook_dir, "png"),
    );

    let download = if layout.clone_folder {
        let dest = layout.dest_path(notebook_dir, "zip");
        let staged_zip = ctx.scratch_dir().join(&dest);
        archive::zip_folder(&layout.bundle_dir(root), &staged_zip)?;
        OutputFile::new(OutputKind::Archive, staged_zip, dest)
    } else {
        OutputFile::new(
            OutputKind::Notebook,
            layout.source_notebook(root),
            layout.dest_path(notebook_dir, "ipynb"),
        )
    };

    debug!(dest = %download.dest_path.display(), kind = %download.kind, "registered notebook assets");
    Ok([page, snapshot, download])
}
