// Shared prompt fragments and prompt-building utilities.
// Each use case keeps its own templates in `prep::prompts`; this file holds the
// cross-cutting pieces.

use crate::normalizer::{ExpectedSchema, FieldKind, ItemKind, SchemaShape};

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON. \
    Do NOT use markdown code fences. \
    Do NOT include comments, explanations or apologies.";

/// Replaces every `{name}` placeholder in `template` with its value.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

/// Renders the JSON shape a schema expects, for appending to ad-hoc prompts.
pub fn describe_schema(schema: &ExpectedSchema) -> String {
    let fields: Vec<String> = schema
        .fields
        .iter()
        .map(|f| format!("  \"{}\": {}", f.name, describe_kind(&f.kind)))
        .collect();
    let object = format!("{{\n{}\n}}", fields.join(",\n"));

    match &schema.shape {
        SchemaShape::Object => format!("Return a JSON object with exactly these keys:\n{object}"),
        SchemaShape::ListRoot { field } => {
            let item = schema
                .field(field)
                .map(|f| describe_kind(&f.kind))
                .unwrap_or_else(|| "[...]".to_string());
            format!("Return a JSON array:\n{item}")
        }
        SchemaShape::Text { .. } => "Respond with plain text only.".to_string(),
    }
}

fn describe_kind(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Number { min, max, .. } => format!("<number {min}-{max}>"),
        FieldKind::Bool => "<true/false>".to_string(),
        FieldKind::String | FieldKind::Text => "\"text\"".to_string(),
        FieldKind::StringList => "[\"item\", ...]".to_string(),
        FieldKind::StringMap => "{\"key\": \"value\", ...}".to_string(),
        FieldKind::ObjectList { keys, .. } => {
            let keys: Vec<String> = keys
                .iter()
                .map(|k| match k.kind {
                    ItemKind::String => format!("\"{}\": \"text\"", k.name),
                    ItemKind::StringList => format!("\"{}\": [\"item\", ...]", k.name),
                })
                .collect();
            format!("[{{{}}}, ...]", keys.join(", "))
        }
    }
}
