//! Small in-memory AcroForm documents for the test modules.

use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use std::path::{Path, PathBuf};

pub enum Fixture {
    Text,
    CheckBox,
    Radio(&'static [&'static str]),
    Combo(&'static [&'static str]),
    /// Options are written as `[export display]` pairs.
    List(&'static [&'static str]),
    PushButton,
    /// `/FT` is not a name, so the field cannot be inspected.
    Broken,
    /// A named parent with text-field children.
    Group(&'static [&'static str]),
}

pub struct FixtureField {
    pub name: &'static str,
    pub kind: Fixture,
}

pub fn field(name: &'static str, kind: Fixture) -> FixtureField {
    FixtureField { name, kind }
}

fn ints(values: &[i64]) -> Vec<Object> {
    values.iter().map(|&v| Object::Integer(v)).collect()
}

fn refs(ids: &[ObjectId]) -> Vec<Object> {
    ids.iter().map(|&id| Object::Reference(id)).collect()
}

fn state_stream(doc: &mut Document, ops: &[u8]) -> ObjectId {
    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => ints(&[0, 0, 20, 20]),
        },
        ops.to_vec(),
    ))
}

fn state_appearance(doc: &mut Document, on: &str) -> Object {
    let on_id = state_stream(doc, b"0 0 20 20 re f");
    let off_id = state_stream(doc, b"");
    let mut normal = lopdf::Dictionary::new();
    normal.set(on, on_id);
    normal.set("Off", off_id);
    Object::Dictionary(dictionary! { "N" => normal })
}

/// Build a document with one page per entry of `page_widths` and the given
/// fields placed as widgets on the first page.
pub fn form_document(page_widths: &[i64], fields: &[FixtureField]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut page_ids = Vec::new();
    for &width in page_widths {
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            b"BT /F1 12 Tf 72 720 Td (page) Tj ET".to_vec(),
        ));
        page_ids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => ints(&[0, 0, width, 792]),
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        }));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => refs(&page_ids),
            "Count" => page_ids.len() as i64,
        }),
    );

    let first_page = page_ids[0];
    let mut roots = Vec::new();
    let mut annots = Vec::new();

    for (i, fixture) in fields.iter().enumerate() {
        let y = 700 - 30 * i as i64;
        let widget = |x: i64| {
            dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "Rect" => ints(&[x, y, x + 100, y + 20]),
                "P" => first_page,
            }
        };
        let title = Object::string_literal(fixture.name);

        match fixture.kind {
            Fixture::Radio(states) => {
                let parent_id = doc.new_object_id();
                let mut kids = Vec::new();
                for (k, state) in states.iter().enumerate() {
                    let mut kid = widget(72 + 120 * k as i64);
                    kid.set("Parent", parent_id);
                    kid.set("AP", state_appearance(&mut doc, state));
                    kid.set("AS", "Off");
                    kids.push(doc.add_object(kid));
                }
                doc.objects.insert(
                    parent_id,
                    Object::Dictionary(dictionary! {
                        "FT" => "Btn",
                        "Ff" => 1i64 << 15,
                        "T" => title,
                        "V" => "Off",
                        "Kids" => refs(&kids),
                    }),
                );
                annots.extend(kids);
                roots.push(parent_id);
            }
            Fixture::Group(children) => {
                let parent_id = doc.new_object_id();
                let mut kids = Vec::new();
                for (k, child) in children.iter().enumerate() {
                    let mut kid = widget(72 + 120 * k as i64);
                    kid.set("Parent", parent_id);
                    kid.set("T", Object::string_literal(*child));
                    kids.push(doc.add_object(kid));
                }
                doc.objects.insert(
                    parent_id,
                    Object::Dictionary(dictionary! {
                        "FT" => "Tx",
                        "T" => title,
                        "Kids" => refs(&kids),
                    }),
                );
                annots.extend(kids);
                roots.push(parent_id);
            }
            ref kind => {
                let mut dict = widget(72);
                dict.set("T", title);
                match kind {
                    Fixture::Text => {
                        dict.set("FT", "Tx");
                        dict.set("DA", Object::string_literal("/Helv 0 Tf 0 g"));
                    }
                    Fixture::CheckBox => {
                        dict.set("FT", "Btn");
                        dict.set("AP", state_appearance(&mut doc, "Yes"));
                        dict.set("AS", "Off");
                        dict.set("V", "Off");
                    }
                    Fixture::Combo(options) => {
                        dict.set("FT", "Ch");
                        dict.set("Ff", 1i64 << 17);
                        dict.set(
                            "Opt",
                            options
                                .iter()
                                .map(|o| Object::string_literal(*o))
                                .collect::<Vec<_>>(),
                        );
                    }
                    Fixture::List(options) => {
                        dict.set("FT", "Ch");
                        dict.set(
                            "Opt",
                            options
                                .iter()
                                .map(|o| {
                                    Object::Array(vec![
                                        Object::string_literal(*o),
                                        Object::string_literal(format!("Size {o}")),
                                    ])
                                })
                                .collect::<Vec<_>>(),
                        );
                    }
                    Fixture::PushButton => {
                        dict.set("FT", "Btn");
                        dict.set("Ff", 1i64 << 16);
                    }
                    Fixture::Broken => dict.set("FT", 7i64),
                    Fixture::Radio(_) | Fixture::Group(_) => unreachable!(),
                }
                let id = doc.add_object(dict);
                annots.push(id);
                roots.push(id);
            }
        }
    }

    if !annots.is_empty() {
        doc.get_dictionary_mut(first_page)
            .unwrap()
            .set("Annots", refs(&annots));
    }

    let acroform_id = doc.add_object(dictionary! {
        "Fields" => refs(&roots),
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
        "DR" => dictionary! { "Font" => dictionary! { "Helv" => font_id } },
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn save_fixture(dir: &Path, file: &str, mut doc: Document) -> PathBuf {
    let path = dir.join(file);
    doc.save(&path).unwrap();
    path
}
