//! Per-use-case output contracts.
//!
//! Each function returns the `ExpectedSchema` a call site hands to the normalizer.
//! Aliases cover the key names and nestings models actually reply with.

use serde_json::json;

use crate::normalizer::{ExpectedSchema, FieldSpec, ItemKey, SchemaShape};

pub const COMPATIBILITY_ANALYSIS: &str = "compatibility_analysis";
pub const QUESTION_GENERATION: &str = "question_generation";
pub const PRACTICE_EVALUATION: &str = "practice_evaluation";
pub const COACHING_ADVICE: &str = "coaching_advice";
pub const DOCUMENT_GENERATION: &str = "document_generation";

/// Every named contract, in the order they are listed by the API.
pub const ALL: [&str; 5] = [
    COMPATIBILITY_ANALYSIS,
    QUESTION_GENERATION,
    PRACTICE_EVALUATION,
    COACHING_ADVICE,
    DOCUMENT_GENERATION,
];

pub fn by_name(name: &str) -> Option<ExpectedSchema> {
    match name {
        COMPATIBILITY_ANALYSIS => Some(compatibility_analysis()),
        QUESTION_GENERATION => Some(question_generation()),
        PRACTICE_EVALUATION => Some(practice_evaluation()),
        COACHING_ADVICE => Some(coaching_advice()),
        DOCUMENT_GENERATION => Some(document_generation()),
        _ => None,
    }
}

/// Resume vs. job description: score, skill overlap, strengths, suggestions.
pub fn compatibility_analysis() -> ExpectedSchema {
    ExpectedSchema::object(
        COMPATIBILITY_ANALYSIS,
        vec![
            FieldSpec::number("compatibility_score", 0.0, 100.0)
                .fraction_scaled()
                .required()
                .with_default(json!(0))
                .with_aliases(&[
                    "score",
                    "compatibility",
                    "match_score",
                    "overall_score",
                    "fit_score",
                    "match_percentage",
                    "relevance_score",
                    "alignment_score",
                    "summary.compatibility_score",
                    "summary.score",
                    "feedback.score",
                    "feedback.compatibility_score",
                    "overallFit.score",
                    "overallFit.fitScore",
                ]),
            FieldSpec::string_list("matched_skills").with_aliases(&[
                "matching_skills",
                "feedback.matching_skills",
                "feedback.matched_skills",
                "feedback.skills_match",
                "analysis.matched_skills",
                "feedback.job_requirements_alignment.matching_skills",
            ]),
            FieldSpec::string_list("missing_skills").with_aliases(&[
                "unmatched_skills",
                "feedback.missing_skills",
                "feedback.missing_required_skills",
            ]),
            FieldSpec::string_list("missing_qualifications"),
            FieldSpec::object_list(
                "strengths",
                vec![
                    ItemKey::string("area").with_default("Strength"),
                    ItemKey::string("description"),
                ],
            )
            .wrapping_strings_as("description")
            .dropping_entries_without("description")
            .with_aliases(&["summary.strengths", "feedback.strengths"]),
            FieldSpec::string_list("suggestions").with_aliases(&[
                "improvement_suggestions",
                "recommendations",
                "actionable_recommendations",
                "feedback.actionable_recommendations",
            ]),
        ],
    )
}

/// Interview questions. Models frequently reply with a bare array.
pub fn question_generation() -> ExpectedSchema {
    ExpectedSchema::object(
        QUESTION_GENERATION,
        vec![FieldSpec::object_list(
            "questions",
            vec![
                ItemKey::string("question"),
                ItemKey::string_list("ideal_answer_points"),
                ItemKey::string_list("evaluation_criteria"),
            ],
        )
        .wrapping_strings_as("question")
        .dropping_entries_without("question")
        .required()
        .with_aliases(&["interview_questions", "data"])],
    )
    .with_shape(SchemaShape::ListRoot {
        field: "questions".to_string(),
    })
}

/// Feedback on a practice answer, including STAR breakdown.
pub fn practice_evaluation() -> ExpectedSchema {
    ExpectedSchema::object(
        PRACTICE_EVALUATION,
        vec![
            FieldSpec::number("score", 0.0, 100.0)
                .fraction_scaled()
                .required()
                .with_aliases(&["overall_score", "rating"]),
            FieldSpec::string_list("strengths"),
            FieldSpec::string_list("weaknesses").with_aliases(&["areas_for_improvement"]),
            FieldSpec::string_list("suggestions").with_aliases(&["recommendations"]),
            FieldSpec::boolean("star_method_used").with_aliases(&["uses_star"]),
            FieldSpec::string_map("star_analysis").with_aliases(&["star"]),
        ],
    )
}

pub fn coaching_advice() -> ExpectedSchema {
    ExpectedSchema::object(COACHING_ADVICE, vec![FieldSpec::text("advice")]).with_shape(
        SchemaShape::Text {
            field: "advice".to_string(),
        },
    )
}

pub fn document_generation() -> ExpectedSchema {
    ExpectedSchema::object(DOCUMENT_GENERATION, vec![FieldSpec::text("content")]).with_shape(
        SchemaShape::Text {
            field: "content".to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::CompatibilityAnalysis;
    use crate::models::practice::PracticeEvaluation;
    use crate::models::questions::QuestionSet;
    use crate::normalizer::{normalize, RecoveryTier};

    #[test]
    fn test_by_name_covers_every_contract() {
        for name in ALL {
            let schema = by_name(name).unwrap();
            assert_eq!(schema.name, name);
        }
        assert!(by_name("unknown").is_none());
    }

    #[test]
    fn test_compatibility_reads_nested_phi3_layout() {
        let raw = r#"{
            "feedback": {
                "score": 0.82,
                "matching_skills": [{"skill": "Python"}, {"skill": "SQL"}],
                "missing_skills": "Kubernetes",
                "strengths": ["Strong data background"],
                "actionable_recommendations": ["Highlight cloud work"]
            }
        }"#;
        let result = normalize(raw, &compatibility_analysis());
        let analysis: CompatibilityAnalysis = result.decode().unwrap();

        assert_eq!(analysis.compatibility_score, 82.0);
        assert_eq!(analysis.matched_skills, vec!["Python", "SQL"]);
        assert_eq!(analysis.missing_skills, vec!["Kubernetes"]);
        assert_eq!(analysis.strengths.len(), 1);
        assert_eq!(analysis.strengths[0].area, "Strength");
        assert_eq!(analysis.suggestions, vec!["Highlight cloud work"]);
        assert!(result.repaired);
    }

    #[test]
    fn test_compatibility_conforming_reply_is_not_repaired() {
        let raw = r#"{
            "compatibility_score": 75,
            "matched_skills": ["Rust"],
            "missing_skills": [],
            "missing_qualifications": [],
            "strengths": [{"area": "Systems", "description": "Wrote a storage engine"}],
            "suggestions": []
        }"#;
        let result = normalize(raw, &compatibility_analysis());
        assert!(!result.repaired, "{:?}", result.adjustments);
    }

    #[test]
    fn test_questions_from_bare_array() {
        let raw = r#"```json
[
  {"question": "Tell me about a conflict.", "ideal_answer_points": ["context", "resolution"]},
  "Why this company?",
  {"ideal_answer_points": ["orphan"]}
]
```"#;
        let result = normalize(raw, &question_generation());
        assert_eq!(result.tier, RecoveryTier::FenceStrip);

        let set: QuestionSet = result.decode().unwrap();
        assert_eq!(set.questions.len(), 2);
        assert_eq!(set.questions[1].question, "Why this company?");
        assert!(set.questions[1].evaluation_criteria.is_empty());
    }

    #[test]
    fn test_practice_evaluation_defaults() {
        let result = normalize("The answer was fine.", &practice_evaluation());
        let evaluation: PracticeEvaluation = result.decode().unwrap();
        assert_eq!(evaluation.score, 0.0);
        assert!(!evaluation.star_method_used);
        assert!(evaluation.star_analysis.is_empty());
        assert!(result.repaired);
    }
}
