//! Response normalization: turns an arbitrary model reply into a record that
//! holds every field a schema declares, with the declared types.
//!
//! Recovery is tiered and stops at the first tier that yields a candidate:
//!
//! 1. direct parse
//! 2. fence / prose strip
//! 3. syntax repair (independent repairs, then one cumulative pass)
//! 4. per-field regex salvage
//! 5. full default
//!
//! A coercion pass always runs on the candidate. `normalize` is total and
//! pure; logging the `repaired` flag is up to the caller.

mod coerce;
mod extract;
mod repair;
mod salvage;
pub mod schema;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use schema::{ExpectedSchema, FieldKind, FieldSpec, ItemKey, ItemKind, SchemaShape};

use extract::{parse_document, parse_stripped, repair_bases, strip_json_fences};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryTier {
    DirectParse,
    FenceStrip,
    SyntaxRepair,
    FieldSalvage,
    FullDefault,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedResult {
    pub fields: Map<String, Value>,
    /// Set when any recovery tier past the direct parse ran or coercion changed data.
    pub repaired: bool,
    /// The tier that produced the candidate mapping.
    pub tier: RecoveryTier,
    /// Every tier entered, in order.
    pub tiers_attempted: Vec<RecoveryTier>,
    pub adjustments: Vec<String>,
}

impl NormalizedResult {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Deserializes the fields into a typed view.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

/// Converts `raw_text` into a schema-conformant record. Never fails.
pub fn normalize(raw_text: &str, schema: &ExpectedSchema) -> NormalizedResult {
    if let SchemaShape::Text { field } = &schema.shape {
        return normalize_text(raw_text, field, schema);
    }

    let shape = &schema.shape;
    let mut tiers_attempted = Vec::new();
    let mut adjustments = Vec::new();

    let candidate = 'tiers: {
        tiers_attempted.push(RecoveryTier::DirectParse);
        if let Some(map) = parse_document(raw_text, shape) {
            break 'tiers Some((map, RecoveryTier::DirectParse));
        }

        tiers_attempted.push(RecoveryTier::FenceStrip);
        if let Some(map) = parse_stripped(raw_text, shape) {
            break 'tiers Some((map, RecoveryTier::FenceStrip));
        }

        tiers_attempted.push(RecoveryTier::SyntaxRepair);
        if let Some((map, label)) = repair::repair_document(&repair_bases(raw_text), shape) {
            adjustments.push(format!("syntax repair: {label}"));
            break 'tiers Some((map, RecoveryTier::SyntaxRepair));
        }

        tiers_attempted.push(RecoveryTier::FieldSalvage);
        let salvaged = salvage::salvage_fields(raw_text, schema);
        if !salvaged.is_empty() {
            adjustments.push(format!(
                "salvaged {} of {} fields",
                salvaged.len(),
                schema.fields.len()
            ));
            break 'tiers Some((salvaged, RecoveryTier::FieldSalvage));
        }

        tiers_attempted.push(RecoveryTier::FullDefault);
        None
    };

    let Some((map, tier)) = candidate else {
        adjustments.push("no usable content, every field defaulted".to_string());
        return NormalizedResult {
            fields: schema.defaults(),
            repaired: true,
            tier: RecoveryTier::FullDefault,
            tiers_attempted,
            adjustments,
        };
    };

    let (fields, notes) = coerce::coerce(&map, schema);
    adjustments.extend(notes);

    NormalizedResult {
        fields,
        repaired: tier != RecoveryTier::DirectParse || !adjustments.is_empty(),
        tier,
        tiers_attempted,
        adjustments,
    }
}

/// Free-text replies: the fence-stripped text becomes `field`.
fn normalize_text(raw_text: &str, field: &str, schema: &ExpectedSchema) -> NormalizedResult {
    let trimmed = raw_text.trim();
    let unfenced = strip_json_fences(trimmed);

    if unfenced.is_empty() {
        return NormalizedResult {
            fields: schema.defaults(),
            repaired: true,
            tier: RecoveryTier::FullDefault,
            tiers_attempted: vec![RecoveryTier::DirectParse, RecoveryTier::FullDefault],
            adjustments: vec!["no usable content, every field defaulted".to_string()],
        };
    }

    let (tier, tiers_attempted) = if unfenced == trimmed {
        (RecoveryTier::DirectParse, vec![RecoveryTier::DirectParse])
    } else {
        (
            RecoveryTier::FenceStrip,
            vec![RecoveryTier::DirectParse, RecoveryTier::FenceStrip],
        )
    };

    let mut candidate = Map::new();
    candidate.insert(field.to_string(), Value::String(unfenced.to_string()));
    let (fields, adjustments) = coerce::coerce(&candidate, schema);

    NormalizedResult {
        fields,
        repaired: tier != RecoveryTier::DirectParse || !adjustments.is_empty(),
        tier,
        tiers_attempted,
        adjustments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Score plus three skill lists, `suggestions` defaulting to `[]`.
    fn analysis_schema() -> ExpectedSchema {
        ExpectedSchema::object(
            "analysis",
            vec![
                FieldSpec::number("score", 0.0, 100.0).with_default(json!(0)),
                FieldSpec::string_list("matched_skills"),
                FieldSpec::string_list("missing_skills"),
                FieldSpec::string_list("suggestions").with_default(json!([])),
            ],
        )
    }

    fn assert_complete(result: &NormalizedResult, schema: &ExpectedSchema) {
        assert_eq!(result.fields.len(), schema.fields.len());
        for field in &schema.fields {
            let value = result
                .get(&field.name)
                .unwrap_or_else(|| panic!("{} missing", field.name));
            assert!(
                field.kind.accepts(value),
                "{} has wrong type: {value}",
                field.name
            );
        }
    }

    #[test]
    fn test_single_quoted_reply_with_prose_is_repaired() {
        let raw = "Here is the result: {'score': 85, 'matched_skills': ['Python', 'SQL'], 'missing_skills': []}";
        let result = normalize(raw, &analysis_schema());

        assert_eq!(
            Value::Object(result.fields.clone()),
            json!({
                "score": 85,
                "matched_skills": ["Python", "SQL"],
                "missing_skills": [],
                "suggestions": []
            })
        );
        assert!(result.repaired);
        assert_eq!(result.tier, RecoveryTier::SyntaxRepair);
    }

    #[test]
    fn test_empty_reply_is_fully_defaulted() {
        let result = normalize("", &analysis_schema());
        assert_eq!(
            Value::Object(result.fields.clone()),
            json!({
                "score": 0,
                "matched_skills": [],
                "missing_skills": [],
                "suggestions": []
            })
        );
        assert!(result.repaired);
        assert_eq!(result.tier, RecoveryTier::FullDefault);
    }

    #[test]
    fn test_valid_reply_is_returned_unchanged() {
        let raw = r#"{"score": 72.5, "matched_skills": ["Rust"], "missing_skills": ["Go"], "suggestions": ["Learn Go"]}"#;
        let direct: Value = serde_json::from_str(raw).unwrap();
        let result = normalize(raw, &analysis_schema());

        assert_eq!(Value::Object(result.fields.clone()), direct);
        assert!(!result.repaired);
        assert!(result.adjustments.is_empty());
        assert_eq!(result.tiers_attempted, vec![RecoveryTier::DirectParse]);
    }

    #[test]
    fn test_later_tiers_not_entered_after_success() {
        let fenced = "```json\n{\"score\": 60, \"matched_skills\": [], \"missing_skills\": [], \"suggestions\": []}\n```";
        let result = normalize(fenced, &analysis_schema());
        assert_eq!(result.tier, RecoveryTier::FenceStrip);
        assert_eq!(
            result.tiers_attempted,
            vec![RecoveryTier::DirectParse, RecoveryTier::FenceStrip]
        );
        assert!(result.repaired);

        let trailing = r#"{"score": 60, "matched_skills": ["Rust",],}"#;
        let result = normalize(trailing, &analysis_schema());
        assert_eq!(result.tier, RecoveryTier::SyntaxRepair);
        assert!(!result.tiers_attempted.contains(&RecoveryTier::FieldSalvage));
        assert!(result
            .adjustments
            .contains(&"syntax repair: trailing_commas".to_string()));
    }

    #[test]
    fn test_out_of_range_and_non_numeric_scores() {
        let schema = analysis_schema();
        assert_eq!(normalize(r#"{"score": 150}"#, &schema).fields["score"], json!(100));
        assert_eq!(normalize(r#"{"score": -20}"#, &schema).fields["score"], json!(0));

        let result = normalize(r#"{"score": "abc"}"#, &schema);
        assert_eq!(result.fields["score"], json!(0));
        assert!(result.repaired);
    }

    #[test]
    fn test_bare_string_list_is_wrapped() {
        let result = normalize(r#"{"score": 10, "matched_skills": "python"}"#, &analysis_schema());
        assert_eq!(result.fields["matched_skills"], json!(["python"]));
        assert_eq!(result.fields["missing_skills"], json!([]));
        assert!(result.repaired);
    }

    #[test]
    fn test_array_reply_for_object_schema_is_not_accepted_as_object() {
        let result = normalize(r#"["Python", "SQL"]"#, &analysis_schema());
        assert_ne!(result.tier, RecoveryTier::DirectParse);
        assert!(result.repaired);
        assert_complete(&result, &analysis_schema());
    }

    #[test]
    fn test_list_root_binds_top_level_array() {
        let schema = ExpectedSchema::object(
            "questions",
            vec![FieldSpec::object_list("questions", vec![ItemKey::string("question")])],
        )
        .with_shape(SchemaShape::ListRoot {
            field: "questions".to_string(),
        });
        let result = normalize(r#"[{"question": "Why Rust?"}]"#, &schema);
        assert_eq!(result.fields["questions"], json!([{"question": "Why Rust?"}]));
        assert!(!result.repaired);
    }

    #[test]
    fn test_truncated_reply_is_closed() {
        let raw = r#"{"score": 88, "matched_skills": ["Rust", "Tokio"], "missing_skills": ["Kafka"#;
        let result = normalize(raw, &analysis_schema());
        assert_eq!(result.tier, RecoveryTier::SyntaxRepair);
        assert_eq!(result.fields["score"], json!(88));
        assert_eq!(result.fields["missing_skills"], json!(["Kafka"]));
    }

    #[test]
    fn test_prose_reply_is_salvaged() {
        let raw = "I'd rate this candidate.\nScore: 64%\nMatched skills: Python, SQL\n";
        let result = normalize(raw, &analysis_schema());
        assert_eq!(result.tier, RecoveryTier::FieldSalvage);
        assert_eq!(result.fields["score"], json!(64));
        assert_eq!(result.fields["matched_skills"], json!(["Python", "SQL"]));
        assert_eq!(result.fields["suggestions"], json!([]));
        assert!(result.repaired);
    }

    #[test]
    fn test_normalize_is_total_and_complete() {
        let schema = analysis_schema();
        let inputs = [
            "",
            "   ",
            "no json at all",
            "{",
            "[",
            "}{",
            "{\"score\": }",
            "{'score': 85,}",
            "null",
            "42",
            "\"just a string\"",
            "```json\n```",
            "{\"matched_skills\": {\"nested\": [1, [2, [3]]]}}",
            "score: NaN",
            "{\"score\": 1e400}",
        ];
        for input in inputs {
            let result = normalize(input, &schema);
            assert_complete(&result, &schema);
        }
    }

    #[test]
    fn test_degenerate_caller_schemas_do_not_panic() {
        let schema: ExpectedSchema = serde_json::from_value(json!({
            "name": "degenerate",
            "fields": [
                {"name": "score", "kind": {"type": "number", "min": 100.0, "max": 0.0, "fraction_scale": true}},
                {"name": "level", "kind": {"type": "number", "min": 3.0, "max": 3.0}},
                {"name": "tags", "kind": {"type": "string_list"}},
                {"name": "tags", "kind": {"type": "bool"}}
            ]
        }))
        .unwrap();

        let inputs = [
            r#"{"score": 50, "level": 9, "tags": ["a"]}"#,
            r#"{"score": 150, "level": "7/10"}"#,
            r#"{"score": 0.4}"#,
            "score: -20\nlevel: 1",
            "",
        ];
        for input in inputs {
            let result = normalize(input, &schema);
            for field in &schema.fields {
                assert!(result.get(&field.name).is_some(), "{} missing", field.name);
            }
            assert!(schema.fields[0].kind.accepts(&result.fields["score"]));
            assert_eq!(result.fields["level"], json!(3));
        }

        let result = normalize(r#"{"score": 150}"#, &schema);
        assert_eq!(result.fields["score"], json!(100));
    }

    #[test]
    fn test_text_shape_keeps_plain_reply() {
        let schema = ExpectedSchema::object("advice", vec![FieldSpec::text("advice")])
            .with_shape(SchemaShape::Text {
                field: "advice".to_string(),
            });

        let result = normalize("Focus on impact metrics.", &schema);
        assert_eq!(result.fields["advice"], json!("Focus on impact metrics."));
        assert!(!result.repaired);

        let result = normalize("```\nUse the STAR method.\n```", &schema);
        assert_eq!(result.fields["advice"], json!("Use the STAR method."));
        assert_eq!(result.tier, RecoveryTier::FenceStrip);
        assert!(result.repaired);

        let result = normalize("  ", &schema);
        assert_eq!(result.fields["advice"], json!(""));
        assert_eq!(result.tier, RecoveryTier::FullDefault);
    }

    #[test]
    fn test_decode_into_typed_view() {
        #[derive(Deserialize)]
        struct View {
            score: f64,
            matched_skills: Vec<String>,
        }
        let result = normalize(r#"{"score": 70, "matched_skills": ["Rust"]}"#, &analysis_schema());
        let view: View = result.decode().unwrap();
        assert_eq!(view.score, 70.0);
        assert_eq!(view.matched_skills, vec!["Rust"]);
    }
}
