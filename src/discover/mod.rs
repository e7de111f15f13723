// src/discover/mod.rs

mod classify;

pub use classify::{classify, field_options};

use crate::acroform::{self, FormFields};
use crate::config::{Config, SourceDocument};
use crate::error::{FormError, Result};
use crate::model::{
    DataFile, DocumentData, DocumentMapping, FieldMapping, FieldType, MappingFile, SampleField,
    json_path, sample_value, write_json,
};
use lopdf::Document;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Per-type field tally printed after each document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeCounts {
    pub text: usize,
    pub checkbox: usize,
    pub picklist: usize,
    pub radio: usize,
    pub unknown: usize,
}

impl TypeCounts {
    pub fn record(&mut self, field_type: FieldType) {
        match field_type {
            FieldType::Text => self.text += 1,
            FieldType::Checkbox => self.checkbox += 1,
            FieldType::Picklist => self.picklist += 1,
            FieldType::Radio => self.radio += 1,
            FieldType::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.text + self.checkbox + self.picklist + self.radio + self.unknown
    }
}

impl fmt::Display for TypeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "text:{} checkbox:{} picklist:{} radio:{} unknown:{}",
            self.text, self.checkbox, self.picklist, self.radio, self.unknown
        )
    }
}

/// Mapping and sample data generated for one source document.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDocument {
    pub mapping: DocumentMapping,
    pub data: DocumentData,
}

impl DiscoveredDocument {
    fn empty(source: String) -> Self {
        Self {
            mapping: DocumentMapping {
                source,
                fields: Default::default(),
            },
            data: DocumentData::default(),
        }
    }

    pub fn counts(&self) -> TypeCounts {
        let mut counts = TypeCounts::default();
        for field in self.mapping.fields.values() {
            counts.record(field.field_type);
        }
        counts
    }
}

/// Paths of the artifacts written by [`run_discover`].
#[derive(Debug)]
pub struct DiscoverySummary {
    pub mapping_path: PathBuf,
    pub data_path: PathBuf,
    pub documents: usize,
}

/// Build mapping and sample data from an already-enumerated form.
pub fn build_document(name: &str, source: String, fields: &FormFields) -> DiscoveredDocument {
    let mut doc = DiscoveredDocument::empty(source);

    for (field_name, field) in fields {
        let kind = field.kind.as_ref();
        let field_type = classify(kind);
        let options = field_options(field_type, kind);
        debug!(field = %field_name, %field_type, "Field classified");

        doc.mapping.fields.insert(
            field_name.clone(),
            FieldMapping {
                field_type,
                path: json_path(name, field_name),
                options: options.clone(),
            },
        );
        doc.data.fields.insert(
            field_name.clone(),
            SampleField {
                field_type,
                value: sample_value(field_type, field_name, options.as_deref()),
                options,
            },
        );
    }
    doc
}

fn load_fields(path: &Path) -> Result<Option<FormFields>> {
    let pdf = Document::load(path).map_err(|source| FormError::PdfLoad {
        path: path.to_path_buf(),
        source,
    })?;
    acroform::read_form(&pdf)
}

/// Discover the fields of one source document.
///
/// Missing or unreadable files are reported and produce an empty entry.
pub fn discover_document(source: &SourceDocument) -> DiscoveredDocument {
    let source_str = source.path.to_string_lossy().into_owned();

    if !source.path.is_file() {
        warn!(path = %source.path.display(), "Source PDF not found");
        println!("Warning: sample file not found: {}", source.path.display());
        return DiscoveredDocument::empty(source_str);
    }

    match load_fields(&source.path) {
        Ok(Some(fields)) => {
            info!(fields = fields.len(), "AcroForm enumerated");
            build_document(&source.name, source_str, &fields)
        }
        Ok(None) => {
            println!("No AcroForm found in {}", source.name);
            DiscoveredDocument::empty(source_str)
        }
        Err(e) => {
            error!(error = %e, "Failed to read form");
            println!("Error reading {}: {e}", source.name);
            DiscoveredDocument::empty(source_str)
        }
    }
}

/// Discover every configured document and write `mapping.json` and `data.json`.
pub fn run_discover(config: &Config) -> Result<DiscoverySummary> {
    let sources = config.source_documents()?;
    info!(count = sources.len(), "Source documents to inspect");

    let mut mapping = MappingFile::default();
    let mut data = DataFile::default();

    for source in &sources {
        let span = tracing::info_span!("discover", document = %source.name);
        let _guard = span.enter();

        let discovered = discover_document(source);
        let counts = discovered.counts();
        println!(
            "{}: extracted {} fields ({counts})",
            source.name,
            counts.total()
        );

        mapping
            .documents
            .insert(source.name.clone(), discovered.mapping);
        data.documents.insert(source.name.clone(), discovered.data);
    }

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| FormError::write(&config.output_dir, e))?;
    let mapping_path = config.mapping_path();
    let data_path = config.data_path();
    write_json(&mapping_path, &mapping)?;
    write_json(&data_path, &data)?;

    println!();
    println!("Wrote mapping: {}", mapping_path.display());
    println!("Wrote data:    {}", data_path.display());

    Ok(DiscoverySummary {
        mapping_path,
        data_path,
        documents: sources.len(),
    })
}

/// Print the field names of every configured document.
pub fn run_list(config: &Config) -> Result<()> {
    for source in config.source_documents()? {
        match load_fields(&source.path) {
            Ok(Some(fields)) if !fields.is_empty() => {
                let names: Vec<&str> = fields.keys().map(String::as_str).collect();
                println!("{} => {names:?}", source.name);
            }
            Ok(_) => println!("{} => no fields", source.name),
            Err(e) => {
                warn!(document = %source.name, error = %e, "Failed to read form");
                println!("error {} {e}", source.name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataFile, MappingFile, read_json};
    use crate::testutil::{Fixture, field, form_document, save_fixture};
    use serde_json::json;

    fn config_for(dir: &Path, documents: &[&str]) -> Config {
        Config {
            input_dir: dir.join("input"),
            output_dir: dir.join("output"),
            documents: documents.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn round_trip_fixture(dir: &Path) {
        std::fs::create_dir_all(dir.join("input")).unwrap();
        let doc = form_document(
            &[612],
            &[
                field("A", Fixture::Text),
                field("B", Fixture::CheckBox),
                field("C", Fixture::Combo(&["opt1", "opt2"])),
            ],
        );
        save_fixture(&dir.join("input"), "form.pdf", doc);
    }

    #[test]
    fn test_round_trip_sample_values() {
        let dir = tempfile::tempdir().unwrap();
        round_trip_fixture(dir.path());
        let cfg = config_for(dir.path(), &["form.pdf"]);

        let summary = run_discover(&cfg).unwrap();
        assert_eq!(summary.documents, 1);

        let data: DataFile = read_json(&summary.data_path).unwrap();
        let fields = &data.documents["form.pdf"].fields;
        assert_eq!(fields["A"].value, json!("TEST_A"));
        assert_eq!(fields["B"].value, json!(true));
        assert_eq!(fields["C"].value, json!("opt1"));
        assert_eq!(
            fields["C"].options.as_deref(),
            Some(&["opt1".to_string(), "opt2".to_string()][..])
        );

        let mapping: MappingFile = read_json(&summary.mapping_path).unwrap();
        let doc = &mapping.documents["form.pdf"];
        assert!(doc.source.ends_with("form.pdf"));
        assert_eq!(doc.fields["B"].field_type, FieldType::Checkbox);
        assert_eq!(
            doc.fields["A"].path,
            "$.documents['form.pdf'].fields['A'].value"
        );
    }

    #[test]
    fn test_discovery_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        round_trip_fixture(dir.path());
        let cfg = config_for(dir.path(), &[]);

        let first = run_discover(&cfg).unwrap();
        let mapping_1 = std::fs::read(&first.mapping_path).unwrap();
        let data_1 = std::fs::read(&first.data_path).unwrap();

        let second = run_discover(&cfg).unwrap();
        assert_eq!(std::fs::read(&second.mapping_path).unwrap(), mapping_1);
        assert_eq!(std::fs::read(&second.data_path).unwrap(), data_1);
    }

    #[test]
    fn test_missing_and_broken_sources_yield_empty_entries() {
        let dir = tempfile::tempdir().unwrap();
        round_trip_fixture(dir.path());
        std::fs::write(dir.path().join("input/garbage.pdf"), b"this is not a pdf").unwrap();
        let cfg = config_for(dir.path(), &["missing.pdf", "garbage.pdf", "form.pdf"]);

        let summary = run_discover(&cfg).unwrap();
        let mapping: MappingFile = read_json(&summary.mapping_path).unwrap();
        let data: DataFile = read_json(&summary.data_path).unwrap();

        let docs: Vec<&str> = mapping.documents.keys().map(String::as_str).collect();
        assert_eq!(docs, ["missing.pdf", "garbage.pdf", "form.pdf"]);
        assert!(mapping.documents["missing.pdf"].fields.is_empty());
        assert!(data.documents["garbage.pdf"].fields.is_empty());
        assert_eq!(mapping.documents["form.pdf"].fields.len(), 3);
    }

    #[test]
    fn test_counts_and_unknown_kind() {
        let pdf = form_document(
            &[612],
            &[
                field("Name", Fixture::Text),
                field("Colour", Fixture::Radio(&["Red", "Green"])),
                field("Broken", Fixture::Broken),
            ],
        );
        let fields = acroform::read_form(&pdf).unwrap().unwrap();
        let doc = build_document("f.pdf", "in/f.pdf".into(), &fields);

        let counts = doc.counts();
        assert_eq!(counts.to_string(), "text:1 checkbox:0 picklist:0 radio:1 unknown:1");
        assert_eq!(doc.data.fields["Colour"].value, json!("Red"));
        assert_eq!(doc.data.fields["Broken"].value, json!("TEST_Broken"));
        assert!(doc.mapping.fields["Broken"].options.is_none());
    }
}
