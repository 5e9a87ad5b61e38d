//! Shared types, error model, and configuration for SWAN Gallery.
//!
//! This crate is the foundation depended on by all other SWAN Gallery crates.
//! It provides:
//! - [`GalleryError`], the unified error type
//! - Domain types ([`NotebookRef`], [`NotebookLayout`], [`OutputFile`])
//! - Configuration ([`AppConfig`], [`GalleryConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildSection, CONFIG_FILE_NAME, GallerySection, GalleryConfig, init_config,
    load_config_from,
};
pub use error::{GalleryError, Result};
pub use types::{
    CLONE_FOLDER_QUERY, NotebookLayout, NotebookRef, OutputFile, OutputKind, RENDERED_MARKER,
    SNAPSHOT_DIR,
};
