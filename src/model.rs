// src/model.rs

//! The two JSON artifacts that connect `discover` and `fill`.

use crate::error::{FormError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

pub const MAPPING_FILE: &str = "mapping.json";
pub const DATA_FILE: &str = "data.json";

/// Inferred field type recorded in both artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Checkbox,
    Radio,
    Picklist,
    #[default]
    Unknown,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Picklist => "picklist",
            FieldType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a document mapping. The field name is the map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Locator of the field's value inside `data.json`.
    #[serde(rename = "jsonPath", alias = "path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMapping {
    /// Source PDF path as configured when the mapping was generated.
    pub source: String,
    #[serde(default)]
    pub fields: IndexMap<String, FieldMapping>,
}

/// `mapping.json`: document identifier → mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingFile {
    pub documents: IndexMap<String, DocumentMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleField {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Generated as a string or boolean; hand edits may put any JSON here.
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentData {
    #[serde(default)]
    pub fields: IndexMap<String, SampleField>,
}

/// `data.json`: `{ "documents": { <document>: { "fields": ... } } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    #[serde(default)]
    pub documents: IndexMap<String, DocumentData>,
}

/// Locator written into every mapping entry.
pub fn json_path(document: &str, field: &str) -> String {
    format!("$.documents['{document}'].fields['{field}'].value")
}

/// Deterministic placeholder value for a field of the given type.
pub fn sample_value(field_type: FieldType, name: &str, options: Option<&[String]>) -> Value {
    let first = options.and_then(|o| o.first()).cloned();
    match field_type {
        FieldType::Text | FieldType::Unknown => Value::String(format!("TEST_{name}")),
        FieldType::Checkbox => Value::Bool(true),
        FieldType::Picklist => Value::String(first.unwrap_or_else(|| "OPTION_1".to_string())),
        FieldType::Radio => Value::String(first.unwrap_or_else(|| "CHOICE_1".to_string())),
    }
}

/// Render a JSON value as the string written into a PDF field.
pub fn coerce_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| FormError::read(path, e))?;
    serde_json::from_str(&content).map_err(|source| FormError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value).map_err(|source| FormError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    content.push('\n');
    std::fs::write(path, content).map_err(|e| FormError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sample_values() {
        let opts = vec!["opt1".to_string(), "opt2".to_string()];
        assert_eq!(sample_value(FieldType::Text, "A", None), json!("TEST_A"));
        assert_eq!(sample_value(FieldType::Unknown, "Z", None), json!("TEST_Z"));
        assert_eq!(sample_value(FieldType::Checkbox, "B", None), json!(true));
        assert_eq!(
            sample_value(FieldType::Picklist, "C", Some(opts.as_slice())),
            json!("opt1")
        );
        assert_eq!(sample_value(FieldType::Picklist, "C", None), json!("OPTION_1"));
        assert_eq!(sample_value(FieldType::Radio, "R", None), json!("CHOICE_1"));
    }

    #[test]
    fn test_field_type_display_matches_wire_name() {
        for field_type in [
            FieldType::Text,
            FieldType::Checkbox,
            FieldType::Radio,
            FieldType::Picklist,
            FieldType::Unknown,
        ] {
            assert_eq!(
                serde_json::to_value(field_type).unwrap(),
                json!(field_type.to_string())
            );
        }
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value(&json!("x")), "x");
        assert_eq!(coerce_value(&json!(42)), "42");
        assert_eq!(coerce_value(&json!(1.5)), "1.5");
        assert_eq!(coerce_value(&json!(true)), "true");
        assert_eq!(coerce_value(&json!(false)), "false");
        assert_eq!(coerce_value(&Value::Null), "");
        assert_eq!(coerce_value(&json!(["a", 1])), r#"["a",1]"#);
    }

    #[test]
    fn test_mapping_wire_format() {
        let raw = r#"{
          "b.pdf": { "source": "in/b.pdf", "fields": {
              "Z": { "type": "text", "jsonPath": "$.documents['b.pdf'].fields['Z'].value" },
              "A": { "type": "picklist", "path": "p", "options": ["x"] } } },
          "a.pdf": { "source": "in/a.pdf", "fields": {} }
        }"#;
        let mapping: MappingFile = serde_json::from_str(raw).unwrap();

        // Document and field order follow the file, not the alphabet.
        let docs: Vec<&str> = mapping.documents.keys().map(String::as_str).collect();
        assert_eq!(docs, ["b.pdf", "a.pdf"]);
        let fields: Vec<&str> = mapping.documents["b.pdf"]
            .fields
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(fields, ["Z", "A"]);
        assert_eq!(mapping.documents["b.pdf"].fields["A"].path, "p");

        let out = serde_json::to_value(&mapping).unwrap();
        assert_eq!(out["b.pdf"]["fields"]["A"]["jsonPath"], "p");
        assert!(out["b.pdf"]["fields"]["Z"].get("options").is_none());
    }

    #[test]
    fn test_data_defaults_for_hand_edits() {
        let raw = r#"{ "documents": { "a.pdf": { "fields": {
            "X": {},
            "Y": { "value": 3 } } } } }"#;
        let data: DataFile = serde_json::from_str(raw).unwrap();
        let fields = &data.documents["a.pdf"].fields;
        assert_eq!(fields["X"].field_type, FieldType::Unknown);
        assert_eq!(fields["X"].value, Value::Null);
        assert_eq!(coerce_value(&fields["Y"].value), "3");
    }
}
