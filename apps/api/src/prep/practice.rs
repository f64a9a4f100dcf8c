//! Practice answer evaluation.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::contracts;
use crate::errors::AppError;
use crate::llm_client::prompts::{fill, JSON_ONLY_SYSTEM};
use crate::llm_client::LlmProvider;
use crate::models::practice::PracticeEvaluation;
use crate::prep::prompts::PRACTICE_EVALUATION_PROMPT;
use crate::prep::require_text;

#[derive(Debug, Clone, Deserialize)]
pub struct PracticeRequest {
    pub question: String,
    pub response: String,
    #[serde(default)]
    pub ideal_answer_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticeFeedback {
    pub session_id: Uuid,
    pub evaluation: PracticeEvaluation,
    pub repaired: bool,
}

pub async fn evaluate(
    llm: &dyn LlmProvider,
    request: &PracticeRequest,
) -> Result<PracticeFeedback, AppError> {
    require_text("question", &request.question)?;
    require_text("response", &request.response)?;

    let ideal_points = serde_json::to_string(&request.ideal_answer_points)
        .map_err(|e| AppError::Internal(e.into()))?;
    let prompt = fill(
        PRACTICE_EVALUATION_PROMPT,
        &[
            ("question", request.question.as_str()),
            ("response", request.response.as_str()),
            ("ideal_points", ideal_points.as_str()),
        ],
    );

    let result = llm
        .generate_structured(
            &prompt,
            Some(JSON_ONLY_SYSTEM),
            &contracts::practice_evaluation(),
        )
        .await?;
    let evaluation: PracticeEvaluation = result
        .decode()
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(
        "Practice evaluation complete: score={}, star_method_used={}",
        evaluation.score, evaluation.star_method_used
    );

    Ok(PracticeFeedback {
        session_id: Uuid::new_v4(),
        evaluation,
        repaired: result.repaired,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::StubProvider;

    fn request() -> PracticeRequest {
        PracticeRequest {
            question: "Tell me about a time you failed.".to_string(),
            response: "We missed a deadline, I re-planned and we shipped a week later.".to_string(),
            ideal_answer_points: vec!["ownership".to_string(), "learning".to_string()],
        }
    }

    #[tokio::test]
    async fn test_evaluate_coerces_loose_reply() {
        let stub = StubProvider::replying(
            r#"```json
{
  "score": "7/10",
  "strengths": "Clear timeline",
  "weaknesses": ["No metrics", "No metrics"],
  "star_method_used": "yes",
  "star_analysis": {"situation": "present", "result": "weak"},
}
```"#,
        );
        let feedback = evaluate(stub.as_ref(), &request()).await.unwrap();
        let evaluation = feedback.evaluation;

        assert_eq!(evaluation.score, 70.0);
        assert_eq!(evaluation.strengths, vec!["Clear timeline"]);
        assert_eq!(evaluation.weaknesses, vec!["No metrics"]);
        assert!(evaluation.suggestions.is_empty());
        assert!(evaluation.star_method_used);
        assert_eq!(evaluation.star_analysis["result"], "weak");
        assert!(feedback.repaired);
        assert!(stub.last_prompt().contains(r#"["ownership","learning"]"#));
    }

    #[tokio::test]
    async fn test_evaluate_requires_response() {
        let stub = StubProvider::replying("{}");
        let mut req = request();
        req.response = String::new();
        assert!(matches!(
            evaluate(stub.as_ref(), &req).await,
            Err(AppError::Validation(_))
        ));
    }
}
