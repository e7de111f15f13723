use crate::acroform::{self, FormField, numbers};
use crate::error::Result;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::debug;

const FALLBACK_FONT: &str = "Helv";
const MAX_AUTO_FONT_SIZE: f32 = 12.0;
const MIN_AUTO_FONT_SIZE: f32 = 4.0;
const PADDING: f32 = 2.0;

/// Font, size and colour parsed from a `/DA` default-appearance string.
#[derive(Debug, Clone)]
struct DefaultAppearance {
    font: Option<String>,
    /// Zero means "fit to the widget".
    size: f32,
    color: Vec<Operation>,
}

fn parse_default_appearance(da: &str) -> DefaultAppearance {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let mut parsed = DefaultAppearance {
        font: None,
        size: 0.0,
        color: Vec::new(),
    };

    for (i, token) in tokens.iter().enumerate() {
        let arity = match *token {
            "Tf" => {
                if i >= 2 {
                    parsed.font = tokens[i - 2].strip_prefix('/').map(str::to_string);
                    parsed.size = tokens[i - 1].parse().unwrap_or(0.0);
                }
                continue;
            }
            "g" => 1,
            "rg" => 3,
            "k" => 4,
            _ => continue,
        };
        if i < arity {
            continue;
        }
        let operands: Option<Vec<Object>> = tokens[i - arity..i]
            .iter()
            .map(|t| t.parse::<f32>().ok().map(Object::Real))
            .collect();
        if let Some(operands) = operands {
            parsed.color.push(Operation::new(token, operands));
        }
    }
    parsed
}

fn auto_font_size(height: f32) -> f32 {
    ((height - 2.0 * PADDING) * 0.75).clamp(MIN_AUTO_FONT_SIZE, MAX_AUTO_FONT_SIZE)
}

/// Latin-1 bytes for a simple-font `Tj` operand; other characters become `?`.
fn show_text_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Characters of `text` that a simple font cannot show.
fn unencodable(text: &str) -> usize {
    text.chars().filter(|&c| u32::from(c) > 0xFF).count()
}

fn real(v: f32) -> Object {
    Object::Real(v)
}

fn text_content(
    font: &str,
    size: f32,
    color: &[Operation],
    width: f32,
    height: f32,
    text: &str,
) -> Content {
    let baseline = ((height - size) / 2.0 + size * 0.22).max(PADDING);
    let mut operations = vec![
        Operation::new("BMC", vec![Object::Name(b"Tx".to_vec())]),
        Operation::new("q", vec![]),
        Operation::new(
            "re",
            vec![
                real(1.0),
                real(1.0),
                real((width - 2.0).max(0.0)),
                real((height - 2.0).max(0.0)),
            ],
        ),
        Operation::new("W", vec![]),
        Operation::new("n", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), real(size)]),
    ];
    operations.extend(color.iter().cloned());
    operations.extend([
        Operation::new("Td", vec![real(PADDING), real(baseline)]),
        Operation::new(
            "Tj",
            vec![Object::String(show_text_bytes(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
        Operation::new("EMC", vec![]),
    ]);
    Content { operations }
}

/// Regenerates normal appearances for written text and choice values.
#[derive(Debug, Default)]
pub struct AppearanceWriter {
    fallback_font: Option<ObjectId>,
}

impl AppearanceWriter {
    fn fallback_font(&mut self, doc: &mut Document) -> ObjectId {
        *self.fallback_font.get_or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })
        })
    }

    /// Replace the normal appearance of every widget of `field` with one showing `text`.
    pub fn write_text(&mut self, doc: &mut Document, field: &FormField, text: &str) -> Result<()> {
        let da = acroform::inherited(doc, field.id, b"DA")
            .or_else(|| {
                acroform::acroform(doc)
                    .ok()
                    .flatten()
                    .and_then(|form| form.get(b"DA").ok())
            })
            .and_then(acroform::decode_text_object)
            .unwrap_or_default();
        let appearance = parse_default_appearance(&da);

        let replaced = unencodable(text);
        if replaced > 0 {
            debug!(
                field = %field.name,
                replaced,
                "Characters outside Latin-1 drawn as '?'; the value itself is kept"
            );
        }

        let resource_font = appearance.font.as_ref().and_then(|name| {
            let fonts = acroform::acroform(doc)
                .ok()
                .flatten()
                .and_then(|form| form.get(b"DR").ok())
                .and_then(|dr| acroform::resolve_dict(doc, dr))
                .and_then(|dr| dr.get(b"Font").ok())
                .and_then(|f| acroform::resolve_dict(doc, f))?;
            fonts
                .get(name.as_bytes())
                .ok()
                .map(|font| (name.clone(), font.clone()))
        });
        let (font_name, font) = match resource_font {
            Some(found) => found,
            None => (
                FALLBACK_FONT.to_string(),
                Object::Reference(self.fallback_font(doc)),
            ),
        };

        for &widget in &field.widgets {
            let rect = doc
                .get_dictionary(widget)
                .ok()
                .and_then(|w| w.get(b"Rect").ok())
                .and_then(|r| numbers::<4>(doc, r));
            let Some([x1, y1, x2, y2]) = rect else {
                continue;
            };
            let width = (x2 - x1).abs();
            let height = (y2 - y1).abs();
            let size = if appearance.size > 0.0 {
                appearance.size
            } else {
                auto_font_size(height)
            };

            let content =
                text_content(&font_name, size, &appearance.color, width, height, text).encode()?;
            let mut fonts = Dictionary::new();
            fonts.set(font_name.clone(), font.clone());
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![real(0.0), real(0.0), real(width), real(height)],
                    "Resources" => dictionary! { "Font" => fonts },
                },
                content,
            );
            let stream_id = doc.add_object(stream);
            doc.get_dictionary_mut(widget)?
                .set("AP", dictionary! { "N" => stream_id });
        }
        Ok(())
    }
}
