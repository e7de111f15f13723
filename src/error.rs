//! Error types shared by the discover and fill stages.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can stop a document or a whole run.
#[derive(Debug, Error)]
pub enum FormError {
    // === File System Errors ===
    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file or create a directory.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === PDF Errors ===
    /// The file is not a PDF lopdf can parse.
    #[error("failed to parse PDF {}: {source}", path.display())]
    PdfLoad {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// Serialising a document to disk failed.
    #[error("failed to save PDF {}: {message}", path.display())]
    PdfSave { path: PathBuf, message: String },

    /// An object the form or page tree depends on is missing or has the wrong type.
    #[error("malformed PDF structure: {0}")]
    Pdf(#[from] lopdf::Error),

    // === Artifact Errors ===
    /// `mapping.json` or `data.json` is not where the filler expects it.
    #[error("{} not found; run `formfill discover` first", path.display())]
    MissingArtifact { path: PathBuf },

    /// A JSON artifact exists but does not match the expected schema.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The TOML configuration file is malformed.
    #[error("invalid configuration {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl FormError {
    pub fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn pdf_save(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::PdfSave {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FormError>;
