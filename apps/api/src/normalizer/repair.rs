//! Tier 3: a bounded set of textual repairs for malformed JSON.
//!
//! Each repair is tried on its own; the first one whose output parses wins.
//! After that, a single cumulative pass (every repair, fixed order) is tried
//! once per base. Repairs are never combined combinatorially.

use serde_json::{Map, Value};

use crate::normalizer::extract::parse_document;
use crate::normalizer::schema::SchemaShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Repair {
    StripComments,
    TrailingCommas,
    SingleQuotes,
    QuoteBareKeys,
    QuoteBareArrayItems,
    EscapeControlChars,
    CloseTruncated,
}

impl Repair {
    /// Order of the independent attempts.
    pub(crate) const INDEPENDENT: [Repair; 7] = [
        Repair::StripComments,
        Repair::TrailingCommas,
        Repair::SingleQuotes,
        Repair::QuoteBareKeys,
        Repair::QuoteBareArrayItems,
        Repair::EscapeControlChars,
        Repair::CloseTruncated,
    ];

    /// Order of the single cumulative pass. Quote conversion runs before anything
    /// that needs to know where strings are; bracket closing always runs last.
    pub(crate) const CUMULATIVE: [Repair; 7] = [
        Repair::StripComments,
        Repair::SingleQuotes,
        Repair::EscapeControlChars,
        Repair::QuoteBareKeys,
        Repair::QuoteBareArrayItems,
        Repair::TrailingCommas,
        Repair::CloseTruncated,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Repair::StripComments => "strip_comments",
            Repair::TrailingCommas => "trailing_commas",
            Repair::SingleQuotes => "single_quotes",
            Repair::QuoteBareKeys => "quote_bare_keys",
            Repair::QuoteBareArrayItems => "quote_bare_array_items",
            Repair::EscapeControlChars => "escape_control_chars",
            Repair::CloseTruncated => "close_truncated",
        }
    }

    pub(crate) fn apply(self, text: &str) -> String {
        match self {
            Repair::StripComments => strip_comments(text),
            Repair::TrailingCommas => remove_trailing_commas(text),
            Repair::SingleQuotes => convert_single_quotes(text),
            Repair::QuoteBareKeys => quote_bare_keys(text),
            Repair::QuoteBareArrayItems => quote_bare_array_items(text),
            Repair::EscapeControlChars => escape_control_chars(text),
            Repair::CloseTruncated => close_truncated(text),
        }
    }
}

/// Label recorded for the cumulative pass.
pub(crate) const CUMULATIVE_LABEL: &str = "cumulative";

/// Tries the independent repairs then the cumulative pass on each base in turn.
/// Returns the parsed document and the label of the repair that produced it.
pub(crate) fn repair_document(
    bases: &[&str],
    shape: &SchemaShape,
) -> Option<(Map<String, Value>, &'static str)> {
    for base in bases {
        for repair in Repair::INDEPENDENT {
            let repaired = repair.apply(base);
            if repaired == *base {
                continue;
            }
            if let Some(map) = parse_document(&repaired, shape) {
                return Some((map, repair.name()));
            }
        }

        let cumulative = Repair::CUMULATIVE
            .iter()
            .fold(base.to_string(), |acc, repair| repair.apply(&acc));
        if cumulative != *base {
            if let Some(map) = parse_document(&cumulative, shape) {
                return Some((map, CUMULATIVE_LABEL));
            }
        }
    }
    None
}

// ────────────────────────────────────────────────────────────────────────────
// Individual repairs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    Outside,
    Double,
    Single,
}

/// Next non-whitespace char at or after `from`.
fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}

/// Removes `//` line comments and `/* */` block comments outside strings.
fn strip_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 2;
                    continue;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match (c, chars.get(i + 1)) {
            ('"', _) => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ('/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Drops a comma that is directly followed by `}` or `]`.
fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut quote = Quote::Outside;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match quote {
            Quote::Double | Quote::Single => {
                out.push(c);
                if c == '\\' {
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 1;
                    }
                } else if (c == '"' && quote == Quote::Double)
                    || (c == '\'' && quote == Quote::Single)
                {
                    quote = Quote::Outside;
                }
            }
            Quote::Outside => match c {
                '"' => {
                    quote = Quote::Double;
                    out.push(c);
                }
                '\'' => {
                    quote = Quote::Single;
                    out.push(c);
                }
                ',' if matches!(next_significant(&chars, i + 1), Some('}') | Some(']')) => {}
                _ => out.push(c),
            },
        }
        i += 1;
    }
    out
}

/// Rewrites single-quoted strings as double-quoted ones. An apostrophe inside a
/// single-quoted string only closes it when followed by a JSON delimiter.
fn convert_single_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut quote = Quote::Outside;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match quote {
            Quote::Outside => match c {
                '"' => {
                    quote = Quote::Double;
                    out.push(c);
                }
                '\'' => {
                    quote = Quote::Single;
                    out.push('"');
                }
                _ => out.push(c),
            },
            Quote::Double => {
                out.push(c);
                if c == '\\' {
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 1;
                    }
                } else if c == '"' {
                    quote = Quote::Outside;
                }
            }
            Quote::Single => match c {
                '\\' => match chars.get(i + 1) {
                    Some('\'') => {
                        out.push('\'');
                        i += 1;
                    }
                    Some(&next) => {
                        out.push('\\');
                        out.push(next);
                        i += 1;
                    }
                    None => out.push('\\'),
                },
                '"' => out.push_str("\\\""),
                '\'' => {
                    let closes = matches!(
                        next_significant(&chars, i + 1),
                        None | Some(',') | Some('}') | Some(']') | Some(':')
                    );
                    if closes {
                        quote = Quote::Outside;
                        out.push('"');
                    } else {
                        out.push('\'');
                    }
                }
                _ => out.push(c),
            },
        }
        i += 1;
    }
    out
}

/// Quotes identifiers used as object keys: `{score: 85}` → `{"score": 85}`.
fn quote_bare_keys(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut quote = Quote::Outside;
    let mut last_significant: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match quote {
            Quote::Double | Quote::Single => {
                out.push(c);
                if c == '\\' {
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 1;
                    }
                } else if (c == '"' && quote == Quote::Double)
                    || (c == '\'' && quote == Quote::Single)
                {
                    quote = Quote::Outside;
                    last_significant = Some(c);
                }
                i += 1;
            }
            Quote::Outside => {
                let key_position = matches!(last_significant, Some('{') | Some(','));
                if key_position && (c.is_alphabetic() || c == '_' || c == '$') {
                    let start = i;
                    while i < chars.len()
                        && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '$' | '-'))
                    {
                        i += 1;
                    }
                    let ident: String = chars[start..i].iter().collect();
                    if next_significant(&chars, i) == Some(':') {
                        out.push('"');
                        out.push_str(&ident);
                        out.push('"');
                    } else {
                        out.push_str(&ident);
                    }
                    last_significant = chars.get(i - 1).copied();
                    continue;
                }
                match c {
                    '"' => quote = Quote::Double,
                    '\'' => quote = Quote::Single,
                    _ => {}
                }
                out.push(c);
                if !c.is_whitespace() {
                    last_significant = Some(c);
                }
                i += 1;
            }
        }
    }
    out
}

/// Quotes bare words inside arrays: `["Python", SQL, 3]` → `["Python", "SQL", 3]`.
fn quote_bare_array_items(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut quote = Quote::Outside;
    let mut stack: Vec<char> = Vec::new();
    let mut last_significant: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if quote != Quote::Outside {
            out.push(c);
            if c == '\\' {
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 1;
                }
            } else if (c == '"' && quote == Quote::Double) || (c == '\'' && quote == Quote::Single)
            {
                quote = Quote::Outside;
                last_significant = Some(c);
            }
            i += 1;
            continue;
        }

        let item_start =
            stack.last() == Some(&'[') && matches!(last_significant, Some('[') | Some(','));
        if item_start && !c.is_whitespace() && !matches!(c, '"' | '\'' | '{' | '[' | ']' | ',') {
            let start = i;
            while i < chars.len() && !matches!(chars[i], ',' | ']' | '}') {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            let token = token.trim();
            let is_literal = matches!(token, "true" | "false" | "null") || token.parse::<f64>().is_ok();
            if is_literal {
                out.push_str(token);
            } else {
                out.push('"');
                out.push_str(&token.replace('\\', "\\\\").replace('"', "\\\""));
                out.push('"');
            }
            last_significant = Some('"');
            continue;
        }

        match c {
            '"' => quote = Quote::Double,
            '\'' => quote = Quote::Single,
            '{' | '[' => stack.push(c),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
        out.push(c);
        if !c.is_whitespace() {
            last_significant = Some(c);
        }
        i += 1;
    }
    out
}

/// Escapes raw control characters inside strings and doubles backslashes that do
/// not start a valid JSON escape (e.g. Windows paths).
fn escape_control_chars(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            i += 1;
            continue;
        }

        match c {
            '\\' => match chars.get(i + 1) {
                Some(&next @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u')) => {
                    out.push('\\');
                    out.push(next);
                    i += 1;
                }
                _ => out.push_str("\\\\"),
            },
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// Closes an unterminated string and any open brackets. A dangling partial key is
/// dropped and a dangling `:` gets a `null` value.
fn close_truncated(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut string_start = 0;
    let mut string_is_key = false;
    let mut last_significant: Option<char> = None;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                last_significant = Some('"');
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                string_start = idx;
                string_is_key = stack.last() == Some(&'{')
                    && matches!(last_significant, Some('{') | Some(','));
            }
            '{' | '[' => stack.push(c),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
        if !c.is_whitespace() {
            last_significant = Some(c);
        }
    }

    let mut out = if in_string && string_is_key {
        text[..string_start].to_string()
    } else if in_string {
        let mut s = text.to_string();
        if escaped {
            s.pop();
        }
        s.push('"');
        s
    } else {
        text.to_string()
    };

    loop {
        let trimmed = out.trim_end();
        if let Some(rest) = trimmed.strip_suffix(',') {
            out = rest.to_string();
            continue;
        }
        if trimmed.ends_with(':') {
            out = format!("{trimmed} null");
        } else {
            out.truncate(trimmed.len());
        }
        break;
    }

    for open in stack.iter().rev() {
        out.push(if *open == '{' { '}' } else { ']' });
    }
    out
}
