//! Tier 1 and tier 2: direct parse, then fence/prose stripping.

use serde_json::{Map, Value};

use crate::normalizer::schema::SchemaShape;

/// Parses `text` and accepts it only if its top-level shape matches the schema.
/// A list where an object was expected (or vice versa) is a failure, not a guess.
pub(crate) fn parse_document(text: &str, shape: &SchemaShape) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => Some(map),
        Value::Array(items) => match shape {
            SchemaShape::ListRoot { field } => {
                let mut map = Map::new();
                map.insert(field.clone(), Value::Array(items));
                Some(map)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Strips ```json ... ``` (or any other one-word info string) code fences.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(mut body) = text.strip_prefix("```") else {
        return text;
    };
    if let Some((tag, rest)) = body.split_once('\n') {
        let tag = tag.trim();
        if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            body = rest;
        }
    } else if let Some(rest) = body.strip_prefix("json") {
        body = rest;
    }
    let body = body.trim();
    body.strip_suffix("```").map(str::trim_end).unwrap_or(body)
}

/// Candidate payloads between the first opener and the last matching closer,
/// ordered by where they start in the text.
pub(crate) fn bracketed_spans(text: &str) -> Vec<&str> {
    let mut spans: Vec<(usize, &str)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (start < end).then(|| (start, &text[start..=end]))
        })
        .collect();
    spans.sort_by_key(|(start, _)| *start);
    spans.into_iter().map(|(_, span)| span).collect()
}

/// Everything from the first opener to the end of the text. Used as the repair
/// base for truncated replies that never close their outer bracket.
pub(crate) fn open_tail(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    Some(&text[start..])
}

/// Tier 2: strip fences and surrounding prose, then re-attempt the parse.
pub(crate) fn parse_stripped(raw: &str, shape: &SchemaShape) -> Option<Map<String, Value>> {
    let unfenced = strip_json_fences(raw);
    bracketed_spans(unfenced)
        .into_iter()
        .find_map(|span| parse_document(span, shape))
}

/// The texts tier-3 repairs operate on, most complete first: the open tail (which
/// keeps a truncated reply whole), then each bracketed span, then the trimmed reply
/// when it holds no bracket at all.
pub(crate) fn repair_bases(raw: &str) -> Vec<&str> {
    let unfenced = strip_json_fences(raw);
    let mut bases: Vec<&str> = Vec::new();
    for base in open_tail(unfenced)
        .into_iter()
        .chain(bracketed_spans(unfenced))
    {
        if !bases.contains(&base) {
            bases.push(base);
        }
    }
    if bases.is_empty() && !unfenced.is_empty() {
        bases.push(unfenced);
    }
    bases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_other_info_string() {
        let input = "```markdown\nDear hiring manager,\n```";
        assert_eq!(strip_json_fences(input), "Dear hiring manager,");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parse_document_rejects_array_for_object_shape() {
        assert!(parse_document("[1, 2]", &SchemaShape::Object).is_none());
        assert!(parse_document("\"just a string\"", &SchemaShape::Object).is_none());
    }

    #[test]
    fn test_parse_document_binds_array_to_list_root_field() {
        let shape = SchemaShape::ListRoot {
            field: "questions".to_string(),
        };
        let map = parse_document(r#"[{"question": "Why?"}]"#, &shape).unwrap();
        assert!(map["questions"].is_array());
    }

    #[test]
    fn test_parse_stripped_removes_surrounding_prose() {
        let raw = "Sure! Here is the analysis:\n{\"score\": 70}\nLet me know if you need more.";
        let map = parse_stripped(raw, &SchemaShape::Object).unwrap();
        assert_eq!(map["score"], 70);
    }

    #[test]
    fn test_parse_stripped_skips_leading_array_for_object_shape() {
        let raw = "Tags [a] and then {\"score\": 5}";
        let map = parse_stripped(raw, &SchemaShape::Object).unwrap();
        assert_eq!(map["score"], 5);
    }

    #[test]
    fn test_repair_bases_use_open_tail_for_truncated_reply() {
        let raw = "Result: {\"score\": 85, \"skills\": [\"Rust\"";
        assert_eq!(
            repair_bases(raw),
            vec!["{\"score\": 85, \"skills\": [\"Rust\""]
        );
    }

    #[test]
    fn test_repair_bases_put_tail_before_span() {
        let raw = "Here: {'a': 1} hope this helps";
        assert_eq!(
            repair_bases(raw),
            vec!["{'a': 1} hope this helps", "{'a': 1}"]
        );
    }

    #[test]
    fn test_repair_bases_empty_for_blank_reply() {
        assert!(repair_bases("   ").is_empty());
    }

    #[test]
    fn test_bracketed_spans_empty_without_brackets() {
        assert!(bracketed_spans("no json here").is_empty());
        assert!(open_tail("no json here").is_none());
    }
}
