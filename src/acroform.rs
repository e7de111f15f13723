// src/acroform.rs

use crate::error::Result;
use indexmap::IndexMap;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::HashSet;
use tracing::debug;

/// `/Ff` bit 16: the button group behaves as radio buttons.
const FLAG_RADIO: i64 = 1 << 15;
/// `/Ff` bit 17: the button has no value (push button).
const FLAG_PUSHBUTTON: i64 = 1 << 16;
/// `/Ff` bit 18: the choice field is a drop-down combo box.
const FLAG_COMBO: i64 = 1 << 17;

/// Guard against cyclic `/Parent` or `/Kids` chains in broken files.
const MAX_DEPTH: usize = 32;

/// The closed set of field kinds an AcroForm can declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// `on_states` are the widget appearance states other than `Off`.
    CheckBox { on_states: Vec<String> },
    /// `labels` are the `/Opt` export values, one per widget in `/Kids` order.
    RadioButton {
        states: Vec<String>,
        labels: Vec<String>,
    },
    ComboBox { options: Vec<String> },
    ListBox { options: Vec<String> },
    PushButton,
    Signature,
    /// `/FT` missing or not one of the standard types.
    Generic { indicator: Option<String> },
}

impl FieldKind {
    /// Declared kind name, in the shape PDF form libraries name their field classes.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "TextField",
            FieldKind::CheckBox { .. } => "CheckBoxField",
            FieldKind::RadioButton { .. } => "RadioButtonField",
            FieldKind::ComboBox { .. } => "ComboBoxField",
            FieldKind::ListBox { .. } => "ListBoxField",
            FieldKind::PushButton => "PushButtonField",
            FieldKind::Signature => "SignatureField",
            FieldKind::Generic { .. } => "GenericField",
        }
    }

    /// The raw `/FT` value behind this kind.
    pub fn indicator(&self) -> Option<&str> {
        match self {
            FieldKind::Text => Some("Tx"),
            FieldKind::CheckBox { .. } | FieldKind::RadioButton { .. } | FieldKind::PushButton => {
                Some("Btn")
            }
            FieldKind::ComboBox { .. } | FieldKind::ListBox { .. } => Some("Ch"),
            FieldKind::Signature => Some("Sig"),
            FieldKind::Generic { indicator } => indicator.as_deref(),
        }
    }

    /// Enumerable values a user can pick from, if this kind has any.
    ///
    /// Radio groups offer their `/Opt` labels when present, else their states.
    pub fn options(&self) -> Option<Vec<String>> {
        let list = match self {
            FieldKind::ComboBox { options } | FieldKind::ListBox { options } => options,
            FieldKind::RadioButton { labels, .. } if !labels.is_empty() => labels,
            FieldKind::RadioButton { states, .. } => states,
            _ => return None,
        };
        let mut distinct = Vec::new();
        for item in list {
            push_distinct(&mut distinct, item.clone());
        }
        (!distinct.is_empty()).then_some(distinct)
    }
}

/// A terminal field of the form tree.
#[derive(Debug, Clone)]
pub struct FormField {
    /// Fully-qualified name (`parent.child`).
    pub name: String,
    pub id: ObjectId,
    /// `None` when the field dictionary could not be inspected.
    pub kind: Option<FieldKind>,
    /// Widget annotations that render this field; may include `id` itself.
    pub widgets: Vec<ObjectId>,
}

/// Terminal fields keyed by fully-qualified name, in form order.
pub type FormFields = IndexMap<String, FormField>;

pub fn root_id(doc: &Document) -> Result<ObjectId> {
    Ok(doc.trailer.get(b"Root")?.as_reference()?)
}

/// Follow a reference (if any) to the object it points at.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    doc.dereference(obj).ok().map(|(_, resolved)| resolved)
}

pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

pub fn integer(obj: &Object) -> Option<i64> {
    match obj {
        Object::Integer(i) => Some(*i),
        Object::Real(r) => Some(*r as i64),
        _ => None,
    }
}

pub fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Read a fixed-size numeric array such as `/Rect`, `/BBox` or `/Matrix`.
pub fn numbers<const N: usize>(doc: &Document, obj: &Object) -> Option<[f32; N]> {
    let Object::Array(items) = resolve(doc, obj)? else {
        return None;
    };
    if items.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = number(resolve(doc, item)?)?;
    }
    Some(out)
}

/// The interactive form dictionary, if the catalog has one.
pub fn acroform(doc: &Document) -> Result<Option<&Dictionary>> {
    let catalog = doc.get_dictionary(root_id(doc)?)?;
    Ok(catalog
        .get(b"AcroForm")
        .ok()
        .and_then(|form| resolve_dict(doc, form)))
}

/// Mutable access to the interactive form dictionary, wherever it is stored.
pub fn acroform_mut(doc: &mut Document) -> Result<Option<&mut Dictionary>> {
    let root = root_id(doc)?;
    let location = doc
        .get_dictionary(root)?
        .get(b"AcroForm")
        .ok()
        .map(|form| form.as_reference().ok());
    match location {
        None => Ok(None),
        Some(Some(id)) => Ok(doc.get_dictionary_mut(id).ok()),
        Some(None) => Ok(doc
            .get_dictionary_mut(root)?
            .get_mut(b"AcroForm")?
            .as_dict_mut()
            .ok()),
    }
}

/// Enumerate the terminal fields of the document's form.
///
/// Returns `Ok(None)` when the document has no `/AcroForm` at all, and an
/// empty map when the form exists but declares no fields.
pub fn read_form(doc: &Document) -> Result<Option<FormFields>> {
    let Some(form) = acroform(doc)? else {
        return Ok(None);
    };

    let mut fields = FormFields::new();
    let Some(Object::Array(roots)) = form.get(b"Fields").ok().and_then(|f| resolve(doc, f)) else {
        return Ok(Some(fields));
    };

    let mut visited = HashSet::new();
    for root in roots {
        match root.as_reference() {
            Ok(id) => walk(doc, id, None, 0, &mut fields, &mut visited),
            Err(_) => debug!("Skipping inline field dictionary"),
        }
    }
    Ok(Some(fields))
}

fn walk(
    doc: &Document,
    id: ObjectId,
    parent: Option<&str>,
    depth: usize,
    fields: &mut FormFields,
    visited: &mut HashSet<ObjectId>,
) {
    if depth > MAX_DEPTH || !visited.insert(id) {
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        debug!(?id, "Field object is not a dictionary");
        return;
    };

    let partial = dict
        .get(b"T")
        .ok()
        .and_then(|t| resolve(doc, t))
        .and_then(decode_text_object);
    let name = match (parent, partial) {
        (Some(p), Some(t)) => Some(format!("{p}.{t}")),
        (None, Some(t)) => Some(t),
        (p, None) => p.map(str::to_string),
    };

    let kids = kid_ids(doc, dict);
    let (named, widgets): (Vec<ObjectId>, Vec<ObjectId>) =
        kids.iter().partition(|&&kid| has_title(doc, kid));

    // Kids with a /T are sub-fields; kids without one are widgets.
    if !named.is_empty() {
        for kid in named {
            walk(doc, kid, name.as_deref(), depth + 1, fields, visited);
        }
        return;
    }

    let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
        return;
    };

    let widgets = if kids.is_empty() {
        if dict.has(b"Rect") {
            vec![id]
        } else {
            Vec::new()
        }
    } else {
        widgets
    };

    let kind = inspect(doc, id, &widgets);
    fields.insert(
        name.clone(),
        FormField {
            name,
            id,
            kind,
            widgets,
        },
    );
}

fn kid_ids(doc: &Document, dict: &Dictionary) -> Vec<ObjectId> {
    match dict.get(b"Kids").ok().and_then(|k| resolve(doc, k)) {
        Some(Object::Array(kids)) => kids.iter().filter_map(|k| k.as_reference().ok()).collect(),
        _ => Vec::new(),
    }
}

fn has_title(doc: &Document, id: ObjectId) -> bool {
    doc.get_dictionary(id).is_ok_and(|d| d.has(b"T"))
}

/// Resolve an inheritable field attribute by walking up `/Parent`.
pub fn inherited<'a>(doc: &'a Document, id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = id;
    for _ in 0..MAX_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn inspect(doc: &Document, id: ObjectId, widgets: &[ObjectId]) -> Option<FieldKind> {
    doc.get_dictionary(id).ok()?;

    let ft = match inherited(doc, id, b"FT") {
        None => return Some(FieldKind::Generic { indicator: None }),
        Some(Object::Name(name)) => name.as_slice(),
        Some(_) => return None,
    };
    let flags = inherited(doc, id, b"Ff").and_then(integer).unwrap_or(0);

    let kind = match ft {
        b"Tx" => FieldKind::Text,
        b"Btn" if flags & FLAG_PUSHBUTTON != 0 => FieldKind::PushButton,
        b"Btn" if flags & FLAG_RADIO != 0 => FieldKind::RadioButton {
            states: appearance_states(doc, widgets),
            labels: opt_values(doc, id),
        },
        b"Btn" => FieldKind::CheckBox {
            on_states: appearance_states(doc, widgets),
        },
        b"Ch" => {
            let options = choice_options(doc, id);
            if flags & FLAG_COMBO != 0 {
                FieldKind::ComboBox { options }
            } else {
                FieldKind::ListBox { options }
            }
        }
        b"Sig" => FieldKind::Signature,
        other => FieldKind::Generic {
            indicator: Some(String::from_utf8_lossy(other).into_owned()),
        },
    };
    Some(kind)
}

fn push_distinct(list: &mut Vec<String>, value: String) {
    if !value.is_empty() && !list.contains(&value) {
        list.push(value);
    }
}

fn appearance_states(doc: &Document, widgets: &[ObjectId]) -> Vec<String> {
    let mut states = Vec::new();
    for &widget in widgets {
        for state in widget_states(doc, widget) {
            push_distinct(&mut states, state);
        }
    }
    states
}

/// Names of a widget's normal appearance states, excluding `Off`.
pub fn widget_states(doc: &Document, widget: ObjectId) -> Vec<String> {
    let normal = doc
        .get_dictionary(widget)
        .ok()
        .and_then(|w| w.get(b"AP").ok())
        .and_then(|ap| resolve_dict(doc, ap))
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|n| resolve(doc, n));

    let Some(Object::Dictionary(states)) = normal else {
        return Vec::new();
    };
    states
        .iter()
        .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
        .filter(|state| state != "Off")
        .collect()
}

/// Export values of the inherited `/Opt` array, position for position.
///
/// Entries that cannot be decoded become empty strings.
fn opt_values(doc: &Document, id: ObjectId) -> Vec<String> {
    let Some(Object::Array(items)) = inherited(doc, id, b"Opt") else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            // Either a plain string or an [export display] pair.
            let text = match resolve(doc, item) {
                Some(Object::Array(pair)) => pair
                    .first()
                    .and_then(|export| resolve(doc, export))
                    .and_then(decode_text_object),
                Some(other) => decode_text_object(other),
                None => None,
            };
            text.unwrap_or_default()
        })
        .collect()
}

fn choice_options(doc: &Document, id: ObjectId) -> Vec<String> {
    let mut options = Vec::new();
    for text in opt_values(doc, id) {
        push_distinct(&mut options, text);
    }
    options
}

pub fn decode_text_object(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE or UTF-8 with BOM, else PDFDocEncoding.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    // PDFDocEncoding agrees with Latin-1 for everything a form value realistically holds.
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode a text string as a Latin-1 literal when possible, else UTF-16BE.
pub fn encode_text_string(text: &str) -> Object {
    if text.chars().all(|c| u32::from(c) <= 0xFF) {
        let bytes = text.chars().map(|c| u32::from(c) as u8).collect();
        return Object::String(bytes, StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
