use crate::acroform::FieldKind;
use crate::model::FieldType;

/// Substrings of a declared kind name and the type they imply, checked in order.
const KIND_NAME_RULES: &[(&str, FieldType)] = &[
    ("text", FieldType::Text),
    ("checkbox", FieldType::Checkbox),
    ("radio", FieldType::Radio),
    ("choice", FieldType::Picklist),
    ("combobox", FieldType::Picklist),
    ("listbox", FieldType::Picklist),
];

/// Infer the mapping type of a field; `None` means the field could not be inspected.
pub fn classify(kind: Option<&FieldKind>) -> FieldType {
    let Some(kind) = kind else {
        return FieldType::Unknown;
    };

    let name = kind.kind_name().to_ascii_lowercase();
    if let Some((_, field_type)) = KIND_NAME_RULES
        .iter()
        .find(|(needle, _)| name.contains(needle))
    {
        return *field_type;
    }

    // Radio groups without the radio flag cannot be told apart from checkboxes here.
    match kind.indicator() {
        Some("Btn") => FieldType::Checkbox,
        Some("Ch") => FieldType::Picklist,
        _ => FieldType::Text,
    }
}

/// Options recorded in the artifacts; only choice and radio fields carry them.
pub fn field_options(field_type: FieldType, kind: Option<&FieldKind>) -> Option<Vec<String>> {
    match field_type {
        FieldType::Picklist | FieldType::Radio => kind?.options(),
        _ => None,
    }
}
