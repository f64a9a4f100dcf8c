//! Axum route handlers for the interview-prep API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::contracts;
use crate::errors::AppError;
use crate::llm_client::prompts::describe_schema;
use crate::llm_client::ProviderKind;
use crate::normalizer::{normalize, ExpectedSchema, NormalizedResult};
use crate::prep::coach::{self, CoachReply, CoachRequest, QuickAdviceRequest};
use crate::prep::compatibility::{self, CompatibilityReport, CompatibilityRequest};
use crate::prep::documents::{self, DocumentRequest, GeneratedDocument};
use crate::prep::practice::{self, PracticeFeedback, PracticeRequest};
use crate::prep::questions::{self, GeneratedQuestions, QuestionRequest};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Either a built-in contract name or an inline schema.
#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub raw_text: String,
    #[serde(default)]
    pub contract: Option<String>,
    #[serde(default)]
    pub schema: Option<ExpectedSchema>,
}

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub provider: ProviderKind,
    pub default_model: &'static str,
    pub models: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub active_provider: ProviderKind,
    pub active_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub providers: Vec<ProviderInfo>,
}

#[derive(Debug, Serialize)]
pub struct ContractInfo {
    pub name: &'static str,
    /// The reply-format instruction a caller can append to its own prompt.
    pub reply_format: String,
    pub schema: ExpectedSchema,
}

#[derive(Debug, Serialize)]
pub struct ContractsResponse {
    pub contracts: Vec<ContractInfo>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/providers
pub async fn handle_list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    let providers = ProviderKind::ALL
        .iter()
        .map(|&kind| ProviderInfo {
            provider: kind,
            default_model: kind.default_model(),
            models: kind.available_models(),
        })
        .collect();

    Json(ProvidersResponse {
        active_provider: state.llm.kind(),
        active_model: state.llm.model().to_string(),
        temperature: state.config.llm.temperature,
        max_tokens: state.config.llm.max_tokens,
        providers,
    })
}

/// GET /api/v1/contracts
///
/// Lists the built-in contracts with their schemas, for use with `/normalize`.
pub async fn handle_list_contracts() -> Json<ContractsResponse> {
    let contracts = contracts::ALL
        .iter()
        .filter_map(|&name| {
            let schema = contracts::by_name(name)?;
            Some(ContractInfo {
                name,
                reply_format: describe_schema(&schema),
                schema,
            })
        })
        .collect();

    Json(ContractsResponse { contracts })
}

/// POST /api/v1/normalize
///
/// Runs the normalizer on text the caller already has. No model call is made.
/// An inline `schema` wins over `contract` when both are sent.
pub async fn handle_normalize(
    Json(request): Json<NormalizeRequest>,
) -> Result<Json<NormalizedResult>, AppError> {
    let schema = match (request.schema, request.contract) {
        (Some(schema), _) => schema,
        (None, Some(name)) => contracts::by_name(&name)
            .ok_or_else(|| AppError::NotFound(format!("unknown contract '{name}'")))?,
        (None, None) => {
            return Err(AppError::Validation(
                "either contract or schema is required".to_string(),
            ))
        }
    };

    Ok(Json(normalize(&request.raw_text, &schema)))
}

/// POST /api/v1/analyses/compatibility
pub async fn handle_compatibility(
    State(state): State<AppState>,
    Json(request): Json<CompatibilityRequest>,
) -> Result<Json<CompatibilityReport>, AppError> {
    let report = compatibility::analyze(state.llm.as_ref(), &request).await?;
    Ok(Json(report))
}

/// POST /api/v1/questions/generate
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<GeneratedQuestions>, AppError> {
    let generated = questions::generate(state.llm.as_ref(), &request).await?;
    Ok(Json(generated))
}

/// POST /api/v1/practice/evaluate
pub async fn handle_evaluate_practice(
    State(state): State<AppState>,
    Json(request): Json<PracticeRequest>,
) -> Result<Json<PracticeFeedback>, AppError> {
    let feedback = practice::evaluate(state.llm.as_ref(), &request).await?;
    Ok(Json(feedback))
}

/// POST /api/v1/coach/advice
pub async fn handle_coach_advice(
    State(state): State<AppState>,
    Json(request): Json<CoachRequest>,
) -> Result<Json<CoachReply>, AppError> {
    let reply = coach::advise(state.llm.as_ref(), &request).await?;
    Ok(Json(reply))
}

/// POST /api/v1/coach/quick-advice
pub async fn handle_quick_advice(
    State(state): State<AppState>,
    Json(request): Json<QuickAdviceRequest>,
) -> Result<Json<CoachReply>, AppError> {
    let reply = coach::advise_on_topic(state.llm.as_ref(), &request).await?;
    Ok(Json(reply))
}

/// POST /api/v1/documents/generate
pub async fn handle_generate_document(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<GeneratedDocument>, AppError> {
    let document = documents::generate(state.llm.as_ref(), &request).await?;
    Ok(Json(document))
}
