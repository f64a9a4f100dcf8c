//! Compatibility analysis: scores a resume against a job description.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::contracts;
use crate::errors::AppError;
use crate::llm_client::prompts::fill;
use crate::llm_client::{LlmProvider, ProviderKind};
use crate::models::analysis::CompatibilityAnalysis;
use crate::prep::prompts::{COMPATIBILITY_PROMPT, COMPATIBILITY_SYSTEM};
use crate::prep::require_text;

/// Per-document budget. Small local models lose the output format on long prompts.
pub const MAX_DOCUMENT_CHARS: usize = 500;
const TRUNCATION_MARKER: &str = "\n\n[... content truncated for length ...]\n\n";
/// Room reserved for the marker when splitting the budget.
const MARKER_RESERVE: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct CompatibilityRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityReport {
    pub analysis_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub analysis: CompatibilityAnalysis,
    pub fit_band: &'static str,
    /// True when the model reply needed recovery or coercion.
    pub repaired: bool,
    pub provider: ProviderKind,
    pub model: String,
}

/// Keeps the first 60% and the tail of `text` when it exceeds `max_chars`.
pub fn truncate_middle(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }
    let head = max_chars * 6 / 10;
    let tail = max_chars.saturating_sub(head + MARKER_RESERVE);

    let mut out: String = chars[..head].iter().collect();
    out.push_str(TRUNCATION_MARKER);
    out.extend(&chars[chars.len() - tail..]);
    out
}

pub async fn analyze(
    llm: &dyn LlmProvider,
    request: &CompatibilityRequest,
) -> Result<CompatibilityReport, AppError> {
    require_text("resume_text", &request.resume_text)?;
    require_text("job_description", &request.job_description)?;

    let resume = truncate_middle(&request.resume_text, MAX_DOCUMENT_CHARS);
    let job_description = truncate_middle(&request.job_description, MAX_DOCUMENT_CHARS);
    let prompt = fill(
        COMPATIBILITY_PROMPT,
        &[
            ("resume_text", resume.as_str()),
            ("job_description", job_description.as_str()),
        ],
    );

    let result = llm
        .generate_structured(
            &prompt,
            Some(COMPATIBILITY_SYSTEM),
            &contracts::compatibility_analysis(),
        )
        .await?;
    let analysis: CompatibilityAnalysis = result
        .decode()
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(
        "Compatibility analysis complete: score={}, matched={}, missing={}",
        analysis.compatibility_score,
        analysis.matched_skills.len(),
        analysis.missing_skills.len()
    );

    Ok(CompatibilityReport {
        analysis_id: Uuid::new_v4(),
        analyzed_at: Utc::now(),
        fit_band: analysis.fit_band(),
        analysis,
        repaired: result.repaired,
        provider: llm.kind(),
        model: llm.model().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::StubProvider;

    fn request(resume: &str, jd: &str) -> CompatibilityRequest {
        CompatibilityRequest {
            resume_text: resume.to_string(),
            job_description: jd.to_string(),
        }
    }

    #[test]
    fn test_truncate_middle_short_text_unchanged() {
        assert_eq!(truncate_middle("short", 500), "short");
    }

    #[test]
    fn test_truncate_middle_keeps_head_and_tail() {
        let text = format!("{}{}", "a".repeat(600), "z".repeat(400));
        let out = truncate_middle(&text, 500);

        assert!(out.starts_with(&"a".repeat(300)));
        assert!(out.ends_with(&"z".repeat(150)));
        assert!(out.contains("[... content truncated for length ...]"));
        assert_eq!(out.chars().count(), 300 + TRUNCATION_MARKER.len() + 150);
    }

    #[test]
    fn test_truncate_middle_respects_char_boundaries() {
        let text = "é".repeat(1000);
        let out = truncate_middle(&text, 500);
        assert!(out.starts_with("é"));
    }

    #[tokio::test]
    async fn test_analyze_repairs_single_quoted_reply() {
        let stub = StubProvider::replying(
            "Here is the result: {'score': 85, 'matched_skills': ['Python', 'SQL'], 'missing_skills': []}",
        );
        let report = analyze(stub.as_ref(), &request("Python dev", "Need Python and SQL"))
            .await
            .unwrap();

        assert_eq!(report.analysis.compatibility_score, 85.0);
        assert_eq!(report.analysis.matched_skills, vec!["Python", "SQL"]);
        assert!(report.analysis.suggestions.is_empty());
        assert_eq!(report.fit_band, "strong");
        assert!(report.repaired);
        assert_eq!(report.model, "stub");
        assert!(stub.last_prompt().contains("Need Python and SQL"));
    }

    #[tokio::test]
    async fn test_analyze_empty_reply_still_returns_report() {
        let stub = StubProvider::replying("   ");
        let report = analyze(stub.as_ref(), &request("r", "j")).await.unwrap();
        assert_eq!(report.analysis.compatibility_score, 0.0);
        assert_eq!(report.fit_band, "poor");
        assert!(report.repaired);
    }

    #[tokio::test]
    async fn test_analyze_rejects_blank_resume() {
        let stub = StubProvider::replying("{}");
        let err = analyze(stub.as_ref(), &request("  ", "jd")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_analyze_surfaces_provider_failure() {
        let stub = StubProvider::failing(500);
        let err = analyze(stub.as_ref(), &request("r", "j")).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }
}
