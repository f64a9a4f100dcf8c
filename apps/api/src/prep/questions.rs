//! Interview question generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::contracts;
use crate::errors::AppError;
use crate::llm_client::prompts::{fill, JSON_ONLY_SYSTEM};
use crate::llm_client::LlmProvider;
use crate::models::questions::{InterviewQuestion, QuestionSet};
use crate::prep::prompts::{
    BEHAVIORAL_GUIDANCE, QUESTION_GENERATION_PROMPT, SITUATIONAL_GUIDANCE, TECHNICAL_GUIDANCE,
};
use crate::prep::require_text;

pub const MAX_QUESTIONS: u32 = 20;
const MAX_CONTEXT_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    Behavioral,
    Technical,
    Situational,
}

impl QuestionType {
    fn as_str(self) -> &'static str {
        match self {
            QuestionType::Behavioral => "behavioral",
            QuestionType::Technical => "technical",
            QuestionType::Situational => "situational",
        }
    }

    fn guidance(self) -> &'static str {
        match self {
            QuestionType::Behavioral => BEHAVIORAL_GUIDANCE,
            QuestionType::Technical => TECHNICAL_GUIDANCE,
            QuestionType::Situational => SITUATIONAL_GUIDANCE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

fn default_count() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    pub resume_text: String,
    pub job_description: String,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_count")]
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuestions {
    pub set_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub questions: Vec<InterviewQuestion>,
    pub repaired: bool,
}

pub async fn generate(
    llm: &dyn LlmProvider,
    request: &QuestionRequest,
) -> Result<GeneratedQuestions, AppError> {
    require_text("resume_text", &request.resume_text)?;
    require_text("job_description", &request.job_description)?;
    if !(1..=MAX_QUESTIONS).contains(&request.count) {
        return Err(AppError::Validation(format!(
            "count must be between 1 and {MAX_QUESTIONS}"
        )));
    }

    let count = request.count.to_string();
    let resume: String = request.resume_text.chars().take(MAX_CONTEXT_CHARS).collect();
    let job_description: String = request
        .job_description
        .chars()
        .take(MAX_CONTEXT_CHARS)
        .collect();
    let prompt = fill(
        QUESTION_GENERATION_PROMPT,
        &[
            ("count", count.as_str()),
            ("difficulty", request.difficulty.as_str()),
            ("question_type", request.question_type.as_str()),
            ("type_guidance", request.question_type.guidance()),
            ("resume_summary", resume.as_str()),
            ("job_description", job_description.as_str()),
        ],
    );

    let result = llm
        .generate_structured(
            &prompt,
            Some(JSON_ONLY_SYSTEM),
            &contracts::question_generation(),
        )
        .await?;
    let mut set: QuestionSet = result
        .decode()
        .map_err(|e| AppError::Internal(e.into()))?;

    set.questions.truncate(request.count as usize);
    if set.questions.is_empty() {
        warn!("Question generation produced no usable questions");
    } else {
        info!(
            "Generated {} {} questions",
            set.questions.len(),
            request.question_type.as_str()
        );
    }

    Ok(GeneratedQuestions {
        set_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        question_type: request.question_type,
        difficulty: request.difficulty,
        questions: set.questions,
        repaired: result.repaired,
    })
}
