//! Loading paired samples from disk
//!
//! Each view (`X` or `Y`) is a table of `N` rows with a fixed width. Views
//! can come from two files, or from one JSON file holding both.
//!
//! # Supported Formats
//!
//! - **JSON**: array of rows, `{"samples": ...}`, vector objects, or a
//!   paired `{"x": ..., "y": ...}` document
//! - **CSV**: numeric rows with optional header and id column
//!
//! # Example
//!
//! ```rust,ignore
//! use latentmi_core::loader::{load_auto, load_pair};
//!
//! let x = load_auto("x.csv")?;
//! let pair = load_pair("x.csv", Some("y.csv"))?;
//! println!("{} samples, {}D / {}D", pair.len(), pair.x.dimension(), pair.y.dimension());
//! ```

mod csv;
mod json;

pub use self::csv::{detect_header, detect_id_column, CsvLoader};
pub use self::json::JsonLoader;

use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during data loading
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Dimension mismatch at row {row}: expected {expected}, got {got}")]
    DimensionMismatch { row: usize, expected: usize, got: usize },

    #[error("Length mismatch: X has {x_len} rows, Y has {y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },

    #[error("Empty data")]
    EmptyData,
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON text format
    Json,
    /// CSV / TSV tabular format
    Csv,
}

impl Format {
    /// Detect format from file extension, then content
    pub fn detect(path: &Path) -> Result<Self, LoaderError> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
            Some("json") => return Ok(Format::Json),
            Some("csv") | Some("tsv") | Some("txt") => return Ok(Format::Csv),
            _ => {}
        }

        let mut file = File::open(path)?;
        let mut head = [0u8; 64];
        let read = file.read(&mut head)?;
        match head[..read].iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'[') | Some(b'{') => Ok(Format::Json),
            Some(b) if b.is_ascii_digit() || *b == b'-' || *b == b'+' || *b == b'.' => Ok(Format::Csv),
            _ => Err(LoaderError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// One view of the data: `N` rows of equal width
#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    pub rows: Vec<Vec<f32>>,
    /// Optional per-row identifiers
    pub ids: Option<Vec<String>>,
}

impl SampleData {
    pub fn new(rows: Vec<Vec<f32>>) -> Self {
        Self { rows, ids: None }
    }

    pub fn with_ids(rows: Vec<Vec<f32>>, ids: Vec<String>) -> Self {
        Self { rows, ids: Some(ids) }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[Vec<f32>] {
        &self.rows
    }

    /// Check that every row has the width of the first one
    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.rows.is_empty() {
            return Err(LoaderError::EmptyData);
        }
        let expected = self.dimension();
        for (row, values) in self.rows.iter().enumerate() {
            if values.len() != expected {
                return Err(LoaderError::DimensionMismatch { row, expected, got: values.len() });
            }
        }
        Ok(())
    }
}

/// Aligned `X` and `Y` views
#[derive(Debug, Clone, PartialEq)]
pub struct PairedData {
    pub x: SampleData,
    pub y: SampleData,
}

impl PairedData {
    pub fn new(x: SampleData, y: SampleData) -> Result<Self, LoaderError> {
        if x.len() != y.len() {
            return Err(LoaderError::LengthMismatch { x_len: x.len(), y_len: y.len() });
        }
        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Trait for data loaders
pub trait DataLoader: Send + Sync {
    /// Load one view from a path
    fn load(&self, path: &Path) -> Result<SampleData, LoaderError>;

    /// Check if this loader supports the given path
    fn supports(&self, path: &Path) -> bool;

    /// Format name
    fn format_name(&self) -> &'static str;
}

/// Auto-detect format and load one view
pub fn load_auto<P: AsRef<Path>>(path: P) -> Result<SampleData, LoaderError> {
    let path = path.as_ref();
    let data = match Format::detect(path)? {
        Format::Json => JsonLoader.load(path)?,
        Format::Csv => CsvLoader::default().load(path)?,
    };
    data.validate()?;
    Ok(data)
}

/// Load both views.
///
/// With `y_path`, `x_path` and `y_path` each hold one view. Without it,
/// `x_path` must be a paired JSON document.
pub fn load_pair<P: AsRef<Path>, Q: AsRef<Path>>(
    x_path: P,
    y_path: Option<Q>,
) -> Result<PairedData, LoaderError> {
    match y_path {
        Some(y_path) => PairedData::new(load_auto(x_path)?, load_auto(y_path)?),
        None => {
            let pair = JsonLoader::load_paired(x_path.as_ref())?;
            pair.x.validate()?;
            pair.y.validate()?;
            Ok(pair)
        }
    }
}
