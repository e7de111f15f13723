// src/flatten.rs

use crate::acroform::{self, integer, numbers, resolve, resolve_dict};
use crate::error::Result;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Annotation flag bits that keep an annotation off screen.
const FLAG_HIDDEN: i64 = 1 << 1;
const FLAG_NO_VIEW: i64 = 1 << 5;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlattenReport {
    /// Appearances painted into page content.
    pub baked: usize,
    /// Annotations removed from pages.
    pub removed: usize,
}

/// Where an annotation's appearance stream lives.
enum Appearance {
    Existing(ObjectId),
    Inline(Stream),
}

/// An appearance and the `cm` matrix that places it on the page.
struct Placement {
    appearance: Appearance,
    matrix: [f32; 6],
}

/// Bake every visible annotation appearance into its page, then drop all
/// annotations and the interactive form.
pub fn flatten(doc: &mut Document) -> Result<FlattenReport> {
    let mut report = FlattenReport::default();
    let mut counter = 0;
    // Appearances without their own resources draw with the form's /DR.
    let form_resources = acroform::acroform(doc)
        .ok()
        .flatten()
        .and_then(|form| form.get(b"DR").ok())
        .and_then(|dr| resolve_dict(doc, dr))
        .cloned();

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in pages {
        let Some(annotations) = page_annotations(doc, page_id) else {
            continue;
        };
        let placements: Vec<Placement> = annotations
            .iter()
            .filter_map(|annot| placement(doc, annot))
            .collect();
        report.removed += annotations.len();

        if !placements.is_empty() {
            report.baked += placements.len();
            bake(
                doc,
                page_id,
                placements,
                form_resources.as_ref(),
                &mut counter,
            )?;
        }
        doc.get_dictionary_mut(page_id)?.remove(b"Annots");
    }

    let root = acroform::root_id(doc)?;
    doc.get_dictionary_mut(root)?.remove(b"AcroForm");
    debug!(baked = report.baked, removed = report.removed, "Form flattened");
    Ok(report)
}

fn page_annotations(doc: &Document, page_id: ObjectId) -> Option<Vec<Object>> {
    let annots = doc.get_dictionary(page_id).ok()?.get(b"Annots").ok()?;
    match resolve(doc, annots) {
        Some(Object::Array(items)) => Some(items.clone()),
        _ => Some(Vec::new()),
    }
}

fn normal_appearance(doc: &Document, annot: &Dictionary) -> Option<Appearance> {
    let normal = annot
        .get(b"AP")
        .ok()
        .and_then(|ap| resolve_dict(doc, ap))?
        .get(b"N")
        .ok()?;

    // State-dependent appearances are picked by /AS.
    let chosen = match resolve(doc, normal)? {
        Object::Dictionary(states) => {
            let state = match annot.get(b"AS").ok().and_then(|s| resolve(doc, s))? {
                Object::Name(name) => name.as_slice(),
                _ => return None,
            };
            states.get(state).ok()?
        }
        _ => normal,
    };

    match chosen {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Stream(_)) => Some(Appearance::Existing(*id)),
            _ => None,
        },
        Object::Stream(stream) => Some(Appearance::Inline(stream.clone())),
        _ => None,
    }
}

fn apply(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Matrix mapping the appearance's transformed `/BBox` onto `rect`.
fn placement_matrix(bbox: [f32; 4], form_matrix: [f32; 6], rect: [f32; 4]) -> Option<[f32; 6]> {
    let corners = [
        apply(&form_matrix, bbox[0], bbox[1]),
        apply(&form_matrix, bbox[2], bbox[1]),
        apply(&form_matrix, bbox[0], bbox[3]),
        apply(&form_matrix, bbox[2], bbox[3]),
    ];
    let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
    let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
    let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
    let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);

    let (rx1, rx2) = (rect[0].min(rect[2]), rect[0].max(rect[2]));
    let (ry1, ry2) = (rect[1].min(rect[3]), rect[1].max(rect[3]));

    let (bw, bh) = (max_x - min_x, max_y - min_y);
    if bw.abs() < f32::EPSILON || bh.abs() < f32::EPSILON {
        return None;
    }
    let sx = (rx2 - rx1) / bw;
    let sy = (ry2 - ry1) / bh;
    Some([sx, 0.0, 0.0, sy, rx1 - sx * min_x, ry1 - sy * min_y])
}

fn placement(doc: &Document, annot: &Object) -> Option<Placement> {
    let dict = resolve_dict(doc, annot)?;
    let flags = dict.get(b"F").ok().and_then(integer).unwrap_or(0);
    if flags & (FLAG_HIDDEN | FLAG_NO_VIEW) != 0 {
        return None;
    }
    let rect = numbers::<4>(doc, dict.get(b"Rect").ok()?)?;
    let appearance = normal_appearance(doc, dict)?;

    let stream_dict = match &appearance {
        Appearance::Existing(id) => &doc.get_object(*id).ok()?.as_stream().ok()?.dict,
        Appearance::Inline(stream) => &stream.dict,
    };
    let bbox = numbers::<4>(doc, stream_dict.get(b"BBox").ok()?)?;
    let form_matrix = stream_dict
        .get(b"Matrix")
        .ok()
        .and_then(|m| numbers::<6>(doc, m))
        .unwrap_or(IDENTITY);

    let matrix = placement_matrix(bbox, form_matrix, rect)?;
    Some(Placement { appearance, matrix })
}

fn mark_form_xobject(dict: &mut Dictionary, form_resources: Option<&Dictionary>) {
    dict.set("Type", "XObject");
    dict.set("Subtype", "Form");
    if let Some(resources) = form_resources.filter(|_| !dict.has(b"Resources")) {
        dict.set("Resources", resources.clone());
    }
}

fn bake(
    doc: &mut Document,
    page_id: ObjectId,
    placements: Vec<Placement>,
    form_resources: Option<&Dictionary>,
    counter: &mut usize,
) -> Result<()> {
    let mut operations = Vec::new();
    let mut xobjects = Vec::new();

    for placement in placements {
        let id = match placement.appearance {
            Appearance::Existing(id) => {
                if let Ok(Object::Stream(stream)) = doc.get_object_mut(id) {
                    mark_form_xobject(&mut stream.dict, form_resources);
                }
                id
            }
            Appearance::Inline(mut stream) => {
                mark_form_xobject(&mut stream.dict, form_resources);
                doc.add_object(stream)
            }
        };
        xobjects.push((id, placement.matrix));
    }

    let names = register_xobjects(doc, page_id, &xobjects, counter)?;
    for (name, (_, m)) in names.iter().zip(&xobjects) {
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new(
            "cm",
            m.iter().map(|&v| Object::Real(v)).collect(),
        ));
        operations.push(Operation::new(
            "Do",
            vec![Object::Name(name.as_bytes().to_vec())],
        ));
        operations.push(Operation::new("Q", vec![]));
    }

    let mut tail = b"Q\n".to_vec();
    tail.extend(Content { operations }.encode()?);
    wrap_contents(doc, page_id, tail)
}

/// Add the appearance streams to the page's `/XObject` resources under fresh names.
fn register_xobjects(
    doc: &mut Document,
    page_id: ObjectId,
    xobjects: &[(ObjectId, [f32; 6])],
    counter: &mut usize,
) -> Result<Vec<String>> {
    let page = doc.get_dictionary(page_id)?;
    let resources_ref = page
        .get(b"Resources")
        .ok()
        .and_then(|r| r.as_reference().ok());
    let mut resources = match page.get(b"Resources") {
        Ok(r) => resolve_dict(doc, r).cloned(),
        // Inherited from the page tree; copied onto the page.
        Err(_) => match acroform::inherited(doc, page_id, b"Resources") {
            Some(Object::Dictionary(d)) => Some(d.clone()),
            _ => None,
        },
    }
    .unwrap_or_default();

    let xobject_ref = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| x.as_reference().ok());
    let mut registry = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve_dict(doc, x))
        .cloned()
        .unwrap_or_default();

    let mut names = Vec::with_capacity(xobjects.len());
    for (id, _) in xobjects {
        let name = loop {
            *counter += 1;
            let candidate = format!("FlatAp{counter}");
            if !registry.has(candidate.as_bytes()) {
                break candidate;
            }
        };
        registry.set(name.clone(), *id);
        names.push(name);
    }

    match xobject_ref {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(registry));
        }
        None => resources.set("XObject", registry),
    }
    match resources_ref {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(resources));
        }
        None => doc.get_dictionary_mut(page_id)?.set("Resources", resources),
    }
    Ok(names)
}

/// Wrap the existing content in `q`/`Q` and append `tail` after it.
fn wrap_contents(doc: &mut Document, page_id: ObjectId, tail: Vec<u8>) -> Result<()> {
    let current = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();
    let existing = match current {
        Some(Object::Array(items)) => items,
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(Object::Stream(stream)) => vec![Object::Reference(doc.add_object(stream))],
        _ => Vec::new(),
    };

    let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let close = doc.add_object(Stream::new(Dictionary::new(), tail));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open));
    contents.extend(existing);
    contents.push(Object::Reference(close));
    doc.get_dictionary_mut(page_id)?.set("Contents", contents);
    Ok(())
}
