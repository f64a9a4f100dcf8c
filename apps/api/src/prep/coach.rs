//! Career coach: free-text advice grounded in the user's progress summary.
//!
//! The service is stateless. Clients send the recent conversation with each
//! message; only the last few turns are forwarded to the model.

use serde::{Deserialize, Serialize};

use crate::contracts;
use crate::errors::AppError;
use crate::llm_client::prompts::fill;
use crate::llm_client::LlmProvider;
use crate::prep::prompts::{CAREER_COACH_SYSTEM, QUICK_ADVICE};
use crate::prep::require_text;

/// Turns of history forwarded with each message.
pub const HISTORY_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    #[serde(alias = "assistant")]
    Coach,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Speaker,
    pub content: String,
}

/// Progress summary supplied by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserContext {
    pub resume_uploaded: bool,
    pub practice_sessions: u32,
    pub average_practice_score: f64,
    pub applications: u32,
    pub interview_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoachRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub user_context: UserContext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuickAdviceRequest {
    pub topic: String,
    pub target_role: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub user_context: UserContext,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoachReply {
    pub advice: String,
    pub repaired: bool,
}

pub fn render_context(context: &UserContext) -> String {
    format!(
        "- Resume: {}\n- Practice Sessions: {}\n- Average Practice Score: {:.0}%\n- Job Applications: {}\n- Interview Rate: {:.0}%",
        if context.resume_uploaded {
            "Uploaded"
        } else {
            "Not uploaded"
        },
        context.practice_sessions,
        context.average_practice_score,
        context.applications,
        context.interview_rate,
    )
}

/// The last `HISTORY_WINDOW` turns followed by the new message.
pub fn conversation_prompt(history: &[ChatTurn], message: &str) -> String {
    let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
    let mut prompt = String::from("CONVERSATION HISTORY:\n");
    for turn in recent {
        let speaker = match turn.role {
            Speaker::User => "User",
            Speaker::Coach => "Coach",
        };
        prompt.push_str(&format!("{speaker}: {}\n\n", turn.content));
    }
    prompt.push_str(&format!("User: {message}\n\nCoach:"));
    prompt
}

/// Builds the question for a quick-advice topic.
pub fn quick_advice(topic: &str, target_role: &str, industry: Option<&str>) -> Result<String, AppError> {
    let template = QUICK_ADVICE
        .iter()
        .find(|(name, _)| *name == topic)
        .map(|(_, template)| *template)
        .ok_or_else(|| {
            let topics: Vec<&str> = QUICK_ADVICE.iter().map(|(name, _)| *name).collect();
            AppError::Validation(format!(
                "unknown topic '{topic}', expected one of: {}",
                topics.join(", ")
            ))
        })?;
    Ok(fill(
        template,
        &[
            ("target_role", target_role),
            ("industry", industry.unwrap_or("my industry")),
        ],
    ))
}

pub async fn advise(llm: &dyn LlmProvider, request: &CoachRequest) -> Result<CoachReply, AppError> {
    require_text("message", &request.message)?;
    let prompt = conversation_prompt(&request.history, &request.message);
    ask(llm, &prompt, &request.user_context).await
}

pub async fn advise_on_topic(
    llm: &dyn LlmProvider,
    request: &QuickAdviceRequest,
) -> Result<CoachReply, AppError> {
    require_text("target_role", &request.target_role)?;
    let question = quick_advice(&request.topic, &request.target_role, request.industry.as_deref())?;
    let prompt = conversation_prompt(&[], &question);
    ask(llm, &prompt, &request.user_context).await
}

async fn ask(llm: &dyn LlmProvider, prompt: &str, context: &UserContext) -> Result<CoachReply, AppError> {
    let system = fill(
        CAREER_COACH_SYSTEM,
        &[("user_context", render_context(context).as_str())],
    );
    let result = llm
        .generate_structured(prompt, Some(&system), &contracts::coaching_advice())
        .await?;
    let advice = result
        .get("advice")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(CoachReply {
        advice,
        repaired: result.repaired,
    })
}
