//! Binding splitter for legacy template strings.
//!
//! Attribute values and text nodes mix literal text with `[[expr]]` (one-way)
//! and `{{expr}}` (two-way) bindings. The splitter lexes them left to right;
//! delimiters do not nest and the first matching close ends a binding.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Text,
    OneWay,
    TwoWay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingOrText {
    pub kind: SegmentKind,
    pub value: String,
}

impl BindingOrText {
    fn new(kind: SegmentKind) -> Self {
        BindingOrText {
            kind,
            value: String::new(),
        }
    }

    pub fn is_binding(&self) -> bool {
        self.kind != SegmentKind::Text
    }
}

/// Split a raw attribute value or text node into ordered segments.
///
/// An unterminated binding at the end of input is kept as a binding segment.
pub fn split_bindings(input: &str) -> Vec<BindingOrText> {
    let chars: Vec<char> = input.chars().collect();
    let mut result = Vec::new();
    let mut current: Option<BindingOrText> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let in_binding = current.as_ref().is_some_and(|s| s.is_binding());

        if !in_binding {
            let opening = match (c, next) {
                ('[', Some('[')) => Some(SegmentKind::OneWay),
                ('{', Some('{')) => Some(SegmentKind::TwoWay),
                _ => None,
            };
            if let Some(kind) = opening {
                if let Some(text) = current.take() {
                    result.push(text);
                }
                current = Some(BindingOrText::new(kind));
                i += 2;
                continue;
            }
            current
                .get_or_insert_with(|| BindingOrText::new(SegmentKind::Text))
                .value
                .push(c);
            i += 1;
            continue;
        }

        let Some(binding) = current.as_mut() else {
            break;
        };
        let closes = match binding.kind {
            SegmentKind::OneWay => c == ']' && next == Some(']'),
            SegmentKind::TwoWay => c == '}' && next == Some('}'),
            SegmentKind::Text => false,
        };
        if closes {
            if let Some(done) = current.take() {
                result.push(done);
            }
            i += 2;
        } else {
            binding.value.push(c);
            i += 1;
        }
    }

    if let Some(rest) = current {
        result.push(rest);
    }
    result
}

/// True when the string contains at least one complete `[[..]]` or `{{..}}` pair.
pub fn has_binding(input: &str) -> bool {
    (input.contains("[[") && input.contains("]]")) || (input.contains("{{") && input.contains("}}"))
}

/// The value of a lone binding segment, if `segments` is exactly one binding.
pub fn single_binding(segments: &[BindingOrText]) -> Option<&BindingOrText> {
    match segments {
        [only] if only.is_binding() => Some(only),
        _ => None,
    }
}

/// Target expression and explicit event of a two-way binding (`{{value::input}}`).
pub fn split_two_way_event(value: &str) -> (&str, Option<&str>) {
    match value.rsplit_once("::") {
        Some((target, event)) if !event.trim().is_empty() => (target.trim(), Some(event.trim())),
        _ => (value.trim(), None),
    }
}

/// Expression text of a directive attribute such as `if="[[cond]]"`.
///
/// Falls back to the raw trimmed value when no delimiters are present.
pub fn directive_expression(raw: &str) -> String {
    let segments = split_bindings(raw.trim());
    match single_binding(&segments) {
        Some(binding) => binding.value.trim().to_string(),
        None => raw.trim().to_string(),
    }
}
