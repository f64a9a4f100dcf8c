//! Tier 4: best-effort per-field extraction from text that never parsed.
//!
//! A field is found by a label-like occurrence of its name (or an alias) followed
//! by `:` or `=`. Only short scalar and list fields are eligible; free text and
//! structured kinds are left to their defaults.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::normalizer::schema::{number_value, ExpectedSchema, FieldKind, FieldSpec};

const MAX_STRING_CHARS: usize = 200;
const MAX_LIST_ITEMS: usize = 50;

static NUMBER_TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"^["']?\s*(-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)\s*(%|/\s*\d+(?:\.\d+)?)?"#).ok()
});

static BOOL_TOKEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)^["']?(true|yes|false|no)\b"#).ok());

/// Raw values for every salvageable field that could be located in `raw`.
/// Values are left for the coercion pass to clamp and clean.
pub(crate) fn salvage_fields(raw: &str, schema: &ExpectedSchema) -> Map<String, Value> {
    let mut found = Map::new();
    if raw.trim().is_empty() {
        return found;
    }

    for field in schema.fields.iter().filter(|f| f.salvageable()) {
        let value = labels(field)
            .iter()
            .filter_map(|label| label_pattern(label))
            .find_map(|pattern| {
                pattern
                    .captures_iter(raw)
                    .filter_map(|caps| caps.get(1))
                    .find_map(|rest| read_value(&field.kind, rest.as_str()))
            });
        if let Some(value) = value {
            found.insert(field.name.clone(), value);
        }
    }
    found
}

/// The canonical name followed by the last segment of each alias path.
fn labels(field: &FieldSpec) -> Vec<String> {
    let mut labels = vec![field.name.clone()];
    for alias in &field.aliases {
        let leaf = alias.rsplit('.').next().unwrap_or(alias).to_string();
        if !labels.contains(&leaf) {
            labels.push(leaf);
        }
    }
    labels
}

fn label_pattern(label: &str) -> Option<Regex> {
    let words: Vec<String> = label
        .split('_')
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    if words.is_empty() {
        return None;
    }
    let name = words.join(r"[_\s-]?");
    Regex::new(&format!(r#"(?i)["']?\b{name}\b["']?\s*[:=]\s*([^\n\r]+)"#)).ok()
}

fn read_value(kind: &FieldKind, rest: &str) -> Option<Value> {
    let rest = rest.trim();
    match kind {
        FieldKind::Number { .. } => read_number(rest),
        FieldKind::Bool => {
            let caps = BOOL_TOKEN.as_ref()?.captures(rest)?;
            let word = caps.get(1)?.as_str().to_ascii_lowercase();
            Some(Value::Bool(word == "true" || word == "yes"))
        }
        FieldKind::String => {
            let text = match rest.chars().next() {
                Some(quote @ ('"' | '\'')) => rest[1..]
                    .split(quote)
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                _ => clean_token(rest),
            };
            (!text.is_empty()).then(|| Value::String(text.chars().take(MAX_STRING_CHARS).collect()))
        }
        FieldKind::StringList => read_list(rest),
        _ => None,
    }
}

fn read_number(rest: &str) -> Option<Value> {
    let caps = NUMBER_TOKEN.as_ref()?.captures(rest)?;
    let digits = caps.get(1)?.as_str();
    match caps.get(2) {
        // "85%" and "7/10" are resolved against the field range during coercion.
        Some(suffix) => Some(Value::String(format!(
            "{digits}{}",
            suffix.as_str().replace(char::is_whitespace, "")
        ))),
        None => digits
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(number_value),
    }
}

fn read_list(rest: &str) -> Option<Value> {
    let body = match rest.strip_prefix('[') {
        Some(inner) => inner.split(']').next().unwrap_or(inner),
        None => rest,
    };
    let items: Vec<Value> = body
        .split([',', ';'])
        .map(clean_token)
        .filter(|item| !item.is_empty())
        .take(MAX_LIST_ITEMS)
        .map(Value::String)
        .collect();
    (!items.is_empty()).then_some(Value::Array(items))
}

fn clean_token(token: &str) -> String {
    token
        .trim()
        .trim_end_matches([',', '}', ']'])
        .trim()
        .trim_matches(['"', '\''])
        .trim()
        .to_string()
}
