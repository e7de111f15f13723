// src/fill/mod.rs

mod appearance;
mod assign;

pub use assign::{FillOutcome, assign};

use crate::acroform;
use crate::config::Config;
use crate::error::{FormError, Result};
use crate::flatten::flatten;
use crate::merge::{PageMerger, save_pdf};
use crate::model::{DataFile, DocumentData, DocumentMapping, MappingFile, coerce_value, read_json};
use appearance::AppearanceWriter;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Where flattened documents end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Append every document to one `merged.pdf`.
    Merge,
    /// Save each document under `individual/`.
    Individual,
}

/// Per-document fill tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub written: usize,
    pub skipped: usize,
    /// Mapped fields the document no longer has.
    pub missing: usize,
}

#[derive(Debug, Default)]
pub struct FillSummary {
    pub documents: Vec<(String, FillReport)>,
    pub outputs: Vec<PathBuf>,
}

/// Write every mapped value that `data` provides into `doc`.
///
/// A document without an AcroForm fills zero fields.
pub fn fill_document(
    doc: &mut Document,
    mapping: &DocumentMapping,
    data: Option<&DocumentData>,
) -> Result<FillReport> {
    let mut report = FillReport::default();
    let Some(fields) = acroform::read_form(doc)? else {
        info!("No AcroForm; nothing to fill");
        return Ok(report);
    };
    if let Some(form) = acroform::acroform_mut(doc)? {
        form.set("NeedAppearances", true);
    }
    let Some(data) = data else {
        return Ok(report);
    };

    let mut appearance = AppearanceWriter::default();
    for name in mapping.fields.keys() {
        let Some(sample) = data.fields.get(name) else {
            continue;
        };
        let Some(field) = fields.get(name) else {
            debug!(field = %name, "Mapped field not present in document");
            report.missing += 1;
            continue;
        };

        let value = coerce_value(&sample.value);
        match assign(doc, &mut appearance, field, &value) {
            Ok(FillOutcome::Written) => report.written += 1,
            Ok(FillOutcome::Skipped(reason)) => {
                debug!(field = %field.name, %reason, "Value not assigned");
                report.skipped += 1;
            }
            Err(e) => {
                warn!(field = %field.name, error = %e, "Failed to assign value");
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

fn individual_output(config: &Config, document: &str) -> PathBuf {
    let file = Path::new(document)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(document));
    config.individual_dir().join(file)
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| FormError::write(path, e))
}

/// Fill every mapped document, flatten it, and save it individually or merged.
///
/// Aborts before writing anything when either JSON artifact is missing.
pub fn run_fill(config: &Config, mode: OutputMode) -> Result<FillSummary> {
    let mapping_path = config.mapping_path();
    let data_path = config.data_path();
    for path in [&mapping_path, &data_path] {
        if !path.is_file() {
            return Err(FormError::MissingArtifact { path: path.clone() });
        }
    }

    let mapping: MappingFile = read_json(&mapping_path)?;
    let data: DataFile = read_json(&data_path)?;
    info!(documents = mapping.documents.len(), ?mode, "Loaded mapping and data");

    ensure_dir(&config.output_dir)?;
    if mode == OutputMode::Individual {
        ensure_dir(&config.individual_dir())?;
        println!(
            "Will save each filled PDF individually under {} (flattened)",
            config.individual_dir().display()
        );
    }

    let mut merger = (mode == OutputMode::Merge).then(PageMerger::new);
    let mut summary = FillSummary::default();

    for (name, doc_mapping) in &mapping.documents {
        let span = tracing::info_span!("fill", document = %name);
        let _guard = span.enter();

        let source = Path::new(&doc_mapping.source);
        if !source.is_file() {
            warn!(path = %source.display(), "Source PDF not found");
            println!("Source PDF not found: {}", source.display());
            continue;
        }

        let mut pdf = match Document::load(source) {
            Ok(pdf) => pdf,
            Err(e) => {
                error!(error = %e, "Failed to parse PDF");
                println!("Error reading {name}: {e}");
                continue;
            }
        };

        let report = fill_document(&mut pdf, doc_mapping, data.documents.get(name))
            .unwrap_or_else(|e| {
                error!(error = %e, "Form structure unreadable; nothing filled");
                FillReport::default()
            });
        info!(
            written = report.written,
            skipped = report.skipped,
            missing = report.missing,
            "Fill result"
        );
        println!("{name}: filled {} fields from data", report.written);

        match flatten(&mut pdf) {
            Ok(flat) => info!(baked = flat.baked, removed = flat.removed, "Flattened"),
            Err(e) => {
                error!(error = %e, "Failed to flatten; document skipped");
                continue;
            }
        }

        match merger.as_mut() {
            Some(merger) => {
                if let Err(e) = merger.append(pdf) {
                    error!(error = %e, "Failed to append pages; document skipped");
                    continue;
                }
            }
            None => {
                let out = individual_output(config, name);
                if let Err(e) = save_pdf(&mut pdf, &out) {
                    error!(error = %e, "Failed to save");
                    continue;
                }
                info!(path = %out.display(), "Saved");
                summary.outputs.push(out);
            }
        }
        summary.documents.push((name.clone(), report));
    }

    match merger {
        Some(merger) => {
            let merged_path = config.merged_path();
            let pages = merger.page_count();
            merger.save(&merged_path)?;
            info!(pages, path = %merged_path.display(), "Merged output written");
            println!("Flattened merged PDF saved to {}", merged_path.display());
            summary.outputs.push(merged_path);
        }
        None => println!(
            "Each filled PDF has been flattened and saved under {}; no merged file was created.",
            config.individual_dir().display()
        ),
    }
    Ok(summary)
}
