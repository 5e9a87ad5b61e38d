//! In-memory model of an nbformat v4 notebook document.
//!
//! Only the fields the exporter reads are modelled; everything else in the
//! JSON (cell ids, widget state, arbitrary metadata) is ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use swangallery_shared::{GalleryError, Result};

/// Oldest major nbformat version the exporter understands.
const MIN_NBFORMAT: u32 = 4;

/// A parsed notebook.
#[derive(Debug, Clone, Deserialize)]
pub struct Notebook {
    pub nbformat: u32,
    #[serde(default)]
    pub nbformat_minor: u32,
    #[serde(default)]
    pub metadata: NotebookMetadata,
    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl Notebook {
    /// Parse raw `.ipynb` bytes, rejecting pre-v4 documents.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let notebook: Notebook = serde_json::from_slice(raw)
            .map_err(|e| GalleryError::parse(format!("invalid notebook JSON: {e}")))?;

        if notebook.nbformat < MIN_NBFORMAT {
            return Err(GalleryError::validation(format!(
                "nbformat {} is not supported (need {MIN_NBFORMAT} or newer)",
                notebook.nbformat
            )));
        }

        Ok(notebook)
    }

    /// Kernel language, used to pick a syntax for code cells.
    pub fn language(&self) -> Option<&str> {
        self.metadata
            .language_info
            .as_ref()
            .map(|info| info.name.as_str())
            .or_else(|| {
                self.metadata
                    .kernelspec
                    .as_ref()
                    .and_then(|k| k.language.as_deref())
            })
            .filter(|lang| !lang.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotebookMetadata {
    #[serde(default)]
    pub kernelspec: Option<KernelSpec>,
    #[serde(default)]
    pub language_info: Option<LanguageInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KernelSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageInfo {
    #[serde(default)]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cell_type", rename_all = "snake_case")]
pub enum Cell {
    Markdown {
        source: MultilineString,
        /// Inline images referenced as `attachment:<name>`.
        #[serde(default)]
        attachments: BTreeMap<String, MimeBundle>,
    },
    Code {
        source: MultilineString,
        #[serde(default)]
        execution_count: Option<u32>,
        #[serde(default)]
        outputs: Vec<Output>,
    },
    Raw {
        source: MultilineString,
        #[serde(default)]
        metadata: RawCellMetadata,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCellMetadata {
    /// MIME type the raw cell targets, e.g. `text/html`.
    #[serde(default)]
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    Stream {
        #[serde(default)]
        name: String,
        text: MultilineString,
    },
    DisplayData {
        #[serde(default)]
        data: MimeBundle,
    },
    ExecuteResult {
        #[serde(default)]
        execution_count: Option<u32>,
        #[serde(default)]
        data: MimeBundle,
    },
    Error {
        #[serde(default)]
        ename: String,
        #[serde(default)]
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

/// MIME type → payload. Text payloads are either a string or a list of lines.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MimeBundle(pub BTreeMap<String, Value>);

impl MimeBundle {
    /// Text payload for `mime`, joining multi-line payloads.
    pub fn text(&self, mime: &str) -> Option<String> {
        match self.0.get(mime)? {
            Value::String(s) => Some(s.clone()),
            Value::Array(lines) => Some(
                lines
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<String>(),
            ),
            _ => None,
        }
    }

    /// First of `mimes` present in the bundle, with its text payload.
    pub fn preferred<'m>(&self, mimes: &[&'m str]) -> Option<(&'m str, String)> {
        mimes
            .iter()
            .find_map(|mime| self.text(mime).map(|text| (*mime, text)))
    }
}

// ---------------------------------------------------------------------------
// MultilineString
// ---------------------------------------------------------------------------

/// nbformat stores text either as one string or as a list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultilineString(pub String);

impl MultilineString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for MultilineString {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(s) => Self(s),
            Repr::Many(lines) => Self(lines.concat()),
        })
    }
}
