use crate::error::{FormError, Result};
use crate::model::{DATA_FILE, MAPPING_FILE};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "formfill.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Explicit source file names inside `input_dir`; empty means "every PDF there".
    #[serde(default)]
    pub documents: Vec<String>,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("samples/input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            documents: Vec::new(),
        }
    }
}

/// A source PDF to process, keyed by its document identifier (file name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub name: String,
    pub path: PathBuf,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| FormError::read(path, e))?;
        toml::from_str(&content).map_err(|source| FormError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the explicit config file, or the default one if it exists, or fall back to defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!(path = %path.display(), "Loading configuration");
            return Self::load(path);
        }
        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            info!(path = %default.display(), "Loading configuration");
            Self::load(default)
        } else {
            Ok(Self::default())
        }
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.output_dir.join(MAPPING_FILE)
    }

    pub fn data_path(&self) -> PathBuf {
        self.output_dir.join(DATA_FILE)
    }

    pub fn individual_dir(&self) -> PathBuf {
        self.output_dir.join("individual")
    }

    pub fn merged_path(&self) -> PathBuf {
        self.output_dir.join("merged.pdf")
    }

    /// The configured source documents, or every `*.pdf` in `input_dir` sorted by name.
    ///
    /// Configured documents are returned even when the file is missing so the
    /// discoverer can still emit an empty entry for them.
    pub fn source_documents(&self) -> Result<Vec<SourceDocument>> {
        if !self.documents.is_empty() {
            return Ok(self
                .documents
                .iter()
                .map(|name| SourceDocument {
                    name: document_name(Path::new(name)),
                    path: self.input_dir.join(name),
                })
                .collect());
        }

        if !self.input_dir.is_dir() {
            warn!(dir = %self.input_dir.display(), "Input directory not found");
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&self.input_dir).map_err(|e| FormError::read(&self.input_dir, e))?;
        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| FormError::read(&self.input_dir, e))?.path();
            let is_pdf = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
            if is_pdf && path.is_file() {
                found.push(SourceDocument {
                    name: document_name(&path),
                    path,
                });
            }
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
