//! Configuration for SWAN Gallery.
//!
//! Config lives in `swangallery.toml` next to the documentation sources.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GalleryError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "swangallery.toml";

// ---------------------------------------------------------------------------
// Config structs (matching swangallery.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where pages are read from and the site is written to.
    #[serde(default)]
    pub build: BuildSection,

    /// Gallery plugin options.
    #[serde(default)]
    pub gallery: GallerySection,
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Documentation pages scanned for notebook links.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: String,

    /// Site output directory.
    #[serde(default = "default_site_dir")]
    pub site_dir: String,

    /// Root that notebook links resolve against. Defaults to the directory
    /// holding the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            site_dir: default_site_dir(),
            source_root: None,
        }
    }
}

fn default_docs_dir() -> String {
    "docs".into()
}
fn default_site_dir() -> String {
    "site".into()
}

/// `[gallery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GallerySection {
    /// Output subdirectory for every materialized notebook asset.
    #[serde(default = "default_notebook_dir")]
    pub notebook_dir: String,

    /// Base URL for the "open in SWAN" button, consumed by page templates.
    #[serde(default)]
    pub open_in_swan_url: Option<String>,

    /// Gallery landing URL, consumed by page templates.
    #[serde(default)]
    pub gallery_url: Option<String>,
}

impl Default for GallerySection {
    fn default() -> Self {
        Self {
            notebook_dir: default_notebook_dir(),
            open_in_swan_url: None,
            gallery_url: None,
        }
    }
}

fn default_notebook_dir() -> String {
    "notebooks".into()
}

// ---------------------------------------------------------------------------
// Gallery config (runtime, validated and resolved against the config dir)
// ---------------------------------------------------------------------------

/// Runtime configuration, validated from [`AppConfig`] and resolved against
/// the directory holding the config file.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryConfig {
    /// Pages scanned for notebook links.
    pub docs_dir: PathBuf,
    /// Site output directory.
    pub site_dir: PathBuf,
    /// Root that notebook links resolve against.
    pub source_root: PathBuf,
    /// Output subdirectory for notebook assets.
    pub notebook_dir: String,
    /// Passed through to page templates.
    pub open_in_swan_url: String,
    /// Passed through to page templates.
    pub gallery_url: String,
}

impl GalleryConfig {
    /// Validate required options and resolve relative paths against `base_dir`.
    pub fn resolve(config: &AppConfig, base_dir: &Path) -> Result<Self> {
        let open_in_swan_url = required(&config.gallery.open_in_swan_url, "open_in_swan_url")?;
        let gallery_url = required(&config.gallery.gallery_url, "gallery_url")?;

        let notebook_dir = config.gallery.notebook_dir.trim_matches('/').to_string();
        if notebook_dir.is_empty() {
            return Err(GalleryError::config("notebook_dir must not be empty"));
        }

        let source_root = match &config.build.source_root {
            Some(root) => base_dir.join(root),
            None => base_dir.to_path_buf(),
        };

        Ok(Self {
            docs_dir: base_dir.join(&config.build.docs_dir),
            site_dir: base_dir.join(&config.build.site_dir),
            source_root,
            notebook_dir,
            open_in_swan_url,
            gallery_url,
        })
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(GalleryError::config(format!("Configuration {name} missing"))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| GalleryError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| GalleryError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a starter config file to `path`. Refuses to overwrite an existing one.
pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(GalleryError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let mut config = AppConfig::default();
    config.gallery.open_in_swan_url =
        Some("https://cern.ch/swanserver/cgi-bin/go?projurl=".into());
    config.gallery.gallery_url = Some("https://swan-gallery.web.cern.ch/".into());

    let content =
        toml::to_string_pretty(&config).map_err(|e| GalleryError::config(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| GalleryError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| GalleryError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> AppConfig {
        toml::from_str(
            r#"
[build]
docs_dir = "content"

[gallery]
open_in_swan_url = "https://swan.example/open?projurl="
gallery_url = "https://gallery.example/"
"#,
        )
        .expect("parse")
    }

    #[test]
    fn defaults_apply() {
        let config = full_config();
        assert_eq!(config.build.docs_dir, "content");
        assert_eq!(config.build.site_dir, "site");
        assert_eq!(config.gallery.notebook_dir, "notebooks");
    }

    #[test]
    fn resolve_against_config_dir() {
        let resolved = GalleryConfig::resolve(&full_config(), Path::new("/proj")).unwrap();
        assert_eq!(resolved.docs_dir, PathBuf::from("/proj/content"));
        assert_eq!(resolved.site_dir, PathBuf::from("/proj/site"));
        assert_eq!(resolved.source_root, PathBuf::from("/proj"));
        assert_eq!(resolved.notebook_dir, "notebooks");
    }

    #[test]
    fn missing_open_in_swan_url_is_fatal() {
        let mut config = full_config();
        config.gallery.open_in_swan_url = None;
        let err = GalleryConfig::resolve(&config, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("open_in_swan_url missing"));
    }

    #[test]
    fn blank_gallery_url_is_fatal() {
        let mut config = full_config();
        config.gallery.gallery_url = Some("  ".into());
        let err = GalleryConfig::resolve(&config, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("gallery_url missing"));
    }

    #[test]
    fn explicit_source_root() {
        let mut config = full_config();
        config.build.source_root = Some("src".into());
        config.gallery.notebook_dir = "/nbs/".into();
        let resolved = GalleryConfig::resolve(&config, Path::new("/proj")).unwrap();
        assert_eq!(resolved.source_root, PathBuf::from("/proj/src"));
        assert_eq!(resolved.notebook_dir, "nbs");
    }

    #[test]
    fn init_config_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);

        init_config(&path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert!(GalleryConfig::resolve(&loaded, tmp.path()).is_ok());

        // Second init must not clobber the file.
        assert!(init_config(&path).is_err());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[gallery\nnotebook_dir = 1").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, GalleryError::Config { .. }));
    }
}
