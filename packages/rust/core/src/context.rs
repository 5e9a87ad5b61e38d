//! Per-build state shared by the pipeline stages.

use std::path::Path;

use tempfile::TempDir;
use tracing::debug;

use swangallery_shared::{GalleryConfig, GalleryError, Result};

/// Validated configuration plus the scratch directory generated files are
/// staged in.
///
/// The scratch directory is removed when the context is dropped, on success
/// and on error alike.
#[derive(Debug)]
pub struct BuildContext {
    config: GalleryConfig,
    scratch: TempDir,
}

impl BuildContext {
    pub fn new(config: GalleryConfig) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("swangallery-")
            .tempdir()
            .map_err(|e| GalleryError::io(std::env::temp_dir(), e))?;

        debug!(scratch = %scratch.path().display(), "created build scratch directory");
        Ok(Self { config, scratch })
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    /// Root that staged pages and archives are written under.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}
