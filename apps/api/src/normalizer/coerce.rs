//! The coercion pass: runs after every tier and turns a candidate mapping into a
//! record holding exactly the declared fields, each of its declared type.

use serde_json::{Map, Value};

use crate::normalizer::schema::{
    number_bounds, number_value, ExpectedSchema, FieldKind, FieldSpec, ItemKey, ItemKind,
};

/// Keys whose value stands in for a whole object when it appears in a string list.
const LABEL_KEYS: [&str; 7] = [
    "name",
    "skill",
    "suggestion",
    "recommendation",
    "text",
    "description",
    "area",
];

/// Coerces `candidate` against `schema`. Returns the record and one note per
/// adjustment that changed the data the model sent.
pub(crate) fn coerce(
    candidate: &Map<String, Value>,
    schema: &ExpectedSchema,
) -> (Map<String, Value>, Vec<String>) {
    let mut fields = Map::new();
    let mut adjustments = Vec::new();

    for field in &schema.fields {
        let value = match lookup(candidate, field) {
            None => {
                if field.required {
                    adjustments.push(format!("{}: missing, used default", field.name));
                }
                field.default_value()
            }
            Some((raw, source)) => {
                if let Some(alias) = source {
                    adjustments.push(format!("{}: read from `{alias}`", field.name));
                }
                let (value, note) = coerce_value(field, raw);
                if let Some(note) = note {
                    adjustments.push(format!("{}: {note}", field.name));
                }
                value
            }
        };
        fields.insert(field.name.clone(), value);
    }

    (fields, adjustments)
}

/// The canonical key first, then each alias in declaration order. Nulls count as absent.
fn lookup<'a>(
    candidate: &'a Map<String, Value>,
    field: &'a FieldSpec,
) -> Option<(&'a Value, Option<&'a str>)> {
    if let Some(value) = candidate.get(&field.name).filter(|v| !v.is_null()) {
        return Some((value, None));
    }
    field.aliases.iter().find_map(|alias| {
        resolve_path(candidate, alias)
            .filter(|v| !v.is_null())
            .map(|v| (v, Some(alias.as_str())))
    })
}

fn resolve_path<'a>(candidate: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = candidate.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn coerce_value(field: &FieldSpec, raw: &Value) -> (Value, Option<String>) {
    match &field.kind {
        FieldKind::Number {
            min,
            max,
            fraction_scale,
        } => coerce_number(field, raw, *min, *max, *fraction_scale),
        FieldKind::Bool => coerce_bool(field, raw),
        FieldKind::String | FieldKind::Text => match raw {
            Value::String(_) => (raw.clone(), None),
            other => (
                Value::String(stringify(other)),
                Some("converted to string".to_string()),
            ),
        },
        FieldKind::StringList => {
            let items = string_list(raw);
            let value = Value::Array(items.into_iter().map(Value::String).collect());
            let note = (value != *raw).then(|| "normalized list".to_string());
            (value, note)
        }
        FieldKind::ObjectList {
            keys,
            wrap_key,
            required_key,
        } => coerce_object_list(raw, keys, wrap_key.as_deref(), required_key.as_deref()),
        FieldKind::StringMap => match raw {
            Value::Object(map) => {
                let coerced: Map<String, Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(stringify(v))))
                    .collect();
                let value = Value::Object(coerced);
                let note = (value != *raw).then(|| "converted map values to strings".to_string());
                (value, note)
            }
            _ => (
                field.default_value(),
                Some("expected an object, used default".to_string()),
            ),
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Numbers and booleans
// ────────────────────────────────────────────────────────────────────────────

fn coerce_number(
    field: &FieldSpec,
    raw: &Value,
    min: f64,
    max: f64,
    fraction_scale: bool,
) -> (Value, Option<String>) {
    let (min, max) = number_bounds(min, max);
    let mut notes: Vec<&str> = Vec::new();

    let parsed = match raw {
        Value::Number(n) => n.as_f64().map(|n| (n, true)),
        Value::String(s) => {
            notes.push("parsed from text");
            number_from_text(s, min, max)
        }
        _ => None,
    };

    let Some((mut n, plain)) = parsed.filter(|(n, _)| n.is_finite()) else {
        return (
            field.default_value(),
            Some("not numeric, used default".to_string()),
        );
    };

    if fraction_scale && plain && n > 0.0 && n <= 1.0 && max > 1.0 {
        n = (n * max * 1e6).round() / 1e6;
        notes.push("scaled from fraction");
    }
    if n < min || n > max {
        n = n.clamp(min, max);
        notes.push("clamped to range");
    }

    if notes.is_empty() {
        (raw.clone(), None)
    } else {
        (number_value(n), Some(notes.join(", ")))
    }
}

/// Reads `"85"`, `"85%"` and `"7/10"`. A ratio is mapped onto the field range.
/// The flag is false when the text already carried its own scale.
fn number_from_text(text: &str, min: f64, max: f64) -> Option<(f64, bool)> {
    let text = text.trim();
    if let Some(percent) = text.strip_suffix('%') {
        return percent.trim().parse().ok().map(|n| (n, false));
    }
    if let Some((num, den)) = text.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        return Some((min + num * (max - min) / den, false));
    }
    text.parse().ok().map(|n| (n, true))
}

fn coerce_bool(field: &FieldSpec, raw: &Value) -> (Value, Option<String>) {
    let parsed = match raw {
        Value::Bool(_) => return (raw.clone(), None),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 0.0 => Some(false),
            Some(v) if v == 1.0 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    };
    match parsed {
        Some(b) => (Value::Bool(b), Some("converted to boolean".to_string())),
        None => (
            field.default_value(),
            Some("not a boolean, used default".to_string()),
        ),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Strings and lists
// ────────────────────────────────────────────────────────────────────────────

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(stringify)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Flattens any value into trimmed, non-empty, de-duplicated strings.
fn string_list(value: &Value) -> Vec<String> {
    let mut raw = Vec::new();
    collect_items(value, &mut raw);

    let mut items: Vec<String> = Vec::with_capacity(raw.len());
    for item in raw {
        let item = item.trim();
        if !item.is_empty() && !items.iter().any(|seen| seen == item) {
            items.push(item.to_string());
        }
    }
    items
}

fn collect_items(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::Array(items) => items.iter().for_each(|item| collect_items(item, out)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                if let Ok(Value::Array(inner)) = serde_json::from_str::<Value>(trimmed) {
                    inner.iter().for_each(|item| collect_items(item, out));
                    return;
                }
            }
            out.push(trimmed.to_string());
        }
        Value::Object(map) => {
            let label = LABEL_KEYS
                .iter()
                .filter_map(|key| map.get(*key).and_then(Value::as_str))
                .find(|s| !s.trim().is_empty());
            match label {
                Some(label) => out.push(label.to_string()),
                // {"Python": true, "Go": false} lists the keys that hold.
                None => out.extend(
                    map.iter()
                        .filter(|(_, v)| truthy(v))
                        .map(|(k, _)| k.clone()),
                ),
            }
        }
        other => out.push(other.to_string()),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn coerce_object_list(
    raw: &Value,
    keys: &[ItemKey],
    wrap_key: Option<&str>,
    required_key: Option<&str>,
) -> (Value, Option<String>) {
    let mut changed = false;
    let entries: Vec<&Value> = match raw {
        Value::Array(items) => items.iter().collect(),
        single @ (Value::Object(_) | Value::String(_)) => {
            changed = true;
            vec![single]
        }
        _ => {
            changed = true;
            Vec::new()
        }
    };

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let item = match entry {
            Value::Object(map) => {
                let mut item = Map::new();
                for key in keys {
                    let (value, key_changed) = coerce_item_key(key, map.get(&key.name));
                    changed |= key_changed;
                    item.insert(key.name.clone(), value);
                }
                item
            }
            Value::String(s) if wrap_key.is_some() => {
                changed = true;
                let mut item = Map::new();
                for key in keys {
                    let value = if Some(key.name.as_str()) == wrap_key {
                        Value::String(s.trim().to_string())
                    } else {
                        coerce_item_key(key, None).0
                    };
                    item.insert(key.name.clone(), value);
                }
                item
            }
            _ => {
                changed = true;
                continue;
            }
        };

        if let Some(required) = required_key {
            if item.get(required).map_or(true, |v| !truthy(v)) {
                changed = true;
                continue;
            }
        }
        out.push(Value::Object(item));
    }

    let note = changed.then(|| "normalized entries".to_string());
    (Value::Array(out), note)
}

/// A missing or null key takes its default without counting as a change.
fn coerce_item_key(key: &ItemKey, value: Option<&Value>) -> (Value, bool) {
    let value = value.filter(|v| !v.is_null());
    match key.kind {
        ItemKind::String => match value {
            None => (
                Value::String(key.default.clone().unwrap_or_default()),
                false,
            ),
            Some(v @ Value::String(_)) => (v.clone(), false),
            Some(other) => (Value::String(stringify(other)), true),
        },
        ItemKind::StringList => match value {
            None => (Value::Array(Vec::new()), false),
            Some(v) => {
                let list = Value::Array(string_list(v).into_iter().map(Value::String).collect());
                let changed = list != *v;
                (list, changed)
            }
        },
    }
}
