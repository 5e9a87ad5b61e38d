//! Build pipeline for SWAN Gallery.
//!
//! This crate ties together reference scanning, notebook rendering, asset
//! packaging and gallery rewriting into one end-to-end `build`.

pub mod archive;
pub mod context;
pub mod materializer;
pub mod pipeline;

pub use context::BuildContext;
pub use pipeline::{
    BuildResult, ProgressReporter, RewriteSummary, SilentProgress, TemplateVars, emit,
    load_config, rewrite_site, run_build,
};
