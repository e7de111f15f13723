use super::appearance::AppearanceWriter;
use crate::acroform::{self, FieldKind, FormField, encode_text_string};
use crate::error::Result;
use lopdf::{Document, Object};
use std::fmt;

const OFF: &str = "Off";
/// On-state used when a checkbox carries no appearance states to pick from.
const DEFAULT_ON: &str = "Yes";

/// What happened when a value was assigned to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    Written,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A button was given an empty state token.
    EmptyToken,
    /// A button was given a state none of its widgets can show.
    UnknownState(String),
    /// The field kind holds no value (push buttons, signatures).
    NotWritable(&'static str),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyToken => f.write_str("empty state token"),
            SkipReason::UnknownState(state) => write!(f, "unknown state /{state}"),
            SkipReason::NotWritable(kind) => write!(f, "{kind} fields hold no value"),
        }
    }
}

/// Parse a boolean the lenient way hand-edited data spells it.
fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Strip the `/` name marker a state token may carry.
fn state_token(value: &str) -> Option<&str> {
    let token = value.strip_prefix('/').unwrap_or(value);
    (!token.is_empty()).then_some(token)
}

/// Write `value` into `field`, adapting it to the field's kind.
pub fn assign(
    doc: &mut Document,
    appearance: &mut AppearanceWriter,
    field: &FormField,
    value: &str,
) -> Result<FillOutcome> {
    match &field.kind {
        Some(FieldKind::Text | FieldKind::ComboBox { .. } | FieldKind::ListBox { .. }) => {
            set_value(doc, field, value)?;
            appearance.write_text(doc, field, value)?;
            Ok(FillOutcome::Written)
        }
        Some(FieldKind::CheckBox { on_states }) => match parse_bool(value) {
            Some(true) => {
                let on = on_states.first().map_or(DEFAULT_ON, String::as_str);
                set_state(doc, field, on)
            }
            Some(false) => set_state(doc, field, OFF),
            None => assign_token(doc, field, on_states, value),
        },
        Some(FieldKind::RadioButton { states, labels }) => {
            let token = radio_token(doc, field, states, labels, value);
            assign_token(doc, field, states, &token)
        }
        Some(FieldKind::PushButton) => {
            Ok(FillOutcome::Skipped(SkipReason::NotWritable("push button")))
        }
        Some(FieldKind::Signature) => {
            Ok(FillOutcome::Skipped(SkipReason::NotWritable("signature")))
        }
        Some(FieldKind::Generic { .. }) | None => {
            set_value(doc, field, value)?;
            Ok(FillOutcome::Written)
        }
    }
}

/// Translate an `/Opt` label into the on-state of the widget at the same position.
fn radio_token(
    doc: &Document,
    field: &FormField,
    states: &[String],
    labels: &[String],
    value: &str,
) -> String {
    let Some(token) = state_token(value) else {
        return value.to_string();
    };
    if states.iter().any(|s| s == token) {
        return token.to_string();
    }
    labels
        .iter()
        .position(|label| label == token)
        .and_then(|i| field.widgets.get(i))
        .and_then(|&widget| acroform::widget_states(doc, widget).into_iter().next())
        .unwrap_or_else(|| token.to_string())
}

fn set_value(doc: &mut Document, field: &FormField, value: &str) -> Result<()> {
    doc.get_dictionary_mut(field.id)?
        .set("V", encode_text_string(value));
    Ok(())
}

fn assign_token(
    doc: &mut Document,
    field: &FormField,
    states: &[String],
    value: &str,
) -> Result<FillOutcome> {
    let Some(token) = state_token(value) else {
        return Ok(FillOutcome::Skipped(SkipReason::EmptyToken));
    };
    // Without appearance states there is nothing to validate against.
    if token != OFF && !states.is_empty() && !states.iter().any(|s| s == token) {
        return Ok(FillOutcome::Skipped(SkipReason::UnknownState(token.to_string())));
    }
    set_state(doc, field, token)
}

/// Set `/V` on the field and `/AS` on each widget; widgets that cannot show
/// `state` are switched off.
fn set_state(doc: &mut Document, field: &FormField, state: &str) -> Result<FillOutcome> {
    let name = |s: &str| Object::Name(s.as_bytes().to_vec());
    doc.get_dictionary_mut(field.id)?.set("V", name(state));

    for &widget in &field.widgets {
        let states = acroform::widget_states(doc, widget);
        let shown = if state != OFF && (states.is_empty() || states.iter().any(|s| s == state)) {
            state
        } else {
            OFF
        };
        doc.get_dictionary_mut(widget)?.set("AS", name(shown));
    }
    Ok(FillOutcome::Written)
}
