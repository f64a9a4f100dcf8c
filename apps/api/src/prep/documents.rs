//! Resume, cover letter and cold email drafting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::contracts;
use crate::errors::AppError;
use crate::llm_client::prompts::fill;
use crate::llm_client::LlmProvider;
use crate::prep::prompts::{COLD_EMAIL_PROMPT, COVER_LETTER_PROMPT, DOCUMENT_SYSTEM, RESUME_PROMPT};
use crate::prep::require_text;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl LetterLength {
    fn word_range(self) -> &'static str {
        match self {
            LetterLength::Short => "150-200 words",
            LetterLength::Medium => "250-350 words",
            LetterLength::Long => "400-500 words",
        }
    }
}

fn default_recipient() -> String {
    "recruiter".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentRequest {
    Resume {
        user_info: String,
        job_description: String,
    },
    CoverLetter {
        resume_summary: String,
        company_name: String,
        position: String,
        job_description: String,
        #[serde(default)]
        length: LetterLength,
    },
    ColdEmail {
        purpose: String,
        #[serde(default = "default_recipient")]
        recipient_type: String,
        company: String,
        resume_summary: String,
    },
}

impl DocumentRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentRequest::Resume { .. } => "resume",
            DocumentRequest::CoverLetter { .. } => "cover_letter",
            DocumentRequest::ColdEmail { .. } => "cold_email",
        }
    }

    /// Validates the request and renders its prompt.
    fn prompt(&self) -> Result<String, AppError> {
        match self {
            DocumentRequest::Resume {
                user_info,
                job_description,
            } => {
                require_text("user_info", user_info)?;
                require_text("job_description", job_description)?;
                Ok(fill(
                    RESUME_PROMPT,
                    &[
                        ("user_info", user_info.as_str()),
                        ("job_description", job_description.as_str()),
                    ],
                ))
            }
            DocumentRequest::CoverLetter {
                resume_summary,
                company_name,
                position,
                job_description,
                length,
            } => {
                require_text("resume_summary", resume_summary)?;
                require_text("company_name", company_name)?;
                require_text("position", position)?;
                Ok(fill(
                    COVER_LETTER_PROMPT,
                    &[
                        ("resume_summary", resume_summary.as_str()),
                        ("company_name", company_name.as_str()),
                        ("position", position.as_str()),
                        ("job_description", job_description.as_str()),
                        ("length", length.word_range()),
                    ],
                ))
            }
            DocumentRequest::ColdEmail {
                purpose,
                recipient_type,
                company,
                resume_summary,
            } => {
                require_text("purpose", purpose)?;
                require_text("company", company)?;
                Ok(fill(
                    COLD_EMAIL_PROMPT,
                    &[
                        ("purpose", purpose.as_str()),
                        ("recipient_type", recipient_type.as_str()),
                        ("company", company.as_str()),
                        ("resume_summary", resume_summary.as_str()),
                    ],
                ))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDocument {
    pub document_id: Uuid,
    pub kind: &'static str,
    pub content: String,
    pub repaired: bool,
    pub generated_at: DateTime<Utc>,
}

pub async fn generate(
    llm: &dyn LlmProvider,
    request: &DocumentRequest,
) -> Result<GeneratedDocument, AppError> {
    let prompt = request.prompt()?;
    let result = llm
        .generate_structured(&prompt, Some(DOCUMENT_SYSTEM), &contracts::document_generation())
        .await?;
    let content = result
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    info!(
        "Generated {} ({} chars)",
        request.kind(),
        content.chars().count()
    );

    Ok(GeneratedDocument {
        document_id: Uuid::new_v4(),
        kind: request.kind(),
        content,
        repaired: result.repaired,
        generated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::StubProvider;
    use serde_json::json;

    #[test]
    fn test_cover_letter_defaults_to_medium_length() {
        let request: DocumentRequest = serde_json::from_value(json!({
            "kind": "cover_letter",
            "resume_summary": "Rust engineer",
            "company_name": "Acme",
            "position": "Platform Engineer",
            "job_description": "Build infra"
        }))
        .unwrap();
        let prompt = request.prompt().unwrap();
        assert!(prompt.contains("Acme - Platform Engineer"));
        assert!(prompt.contains("Length: 250-350 words"));
    }

    #[test]
    fn test_cold_email_defaults_recipient() {
        let request: DocumentRequest = serde_json::from_value(json!({
            "kind": "cold_email",
            "purpose": "informational interview",
            "company": "Acme",
            "resume_summary": "Rust engineer"
        }))
        .unwrap();
        assert_eq!(request.kind(), "cold_email");
        assert!(request.prompt().unwrap().contains("Recipient: recruiter at Acme"));
    }

    #[tokio::test]
    async fn test_generate_resume_returns_plain_text() {
        let stub = StubProvider::replying("SUMMARY\nRust engineer with 5 years of experience.");
        let request = DocumentRequest::Resume {
            user_info: "Jane, Rust, 5 years".to_string(),
            job_description: "Senior Rust engineer".to_string(),
        };
        let document = generate(stub.as_ref(), &request).await.unwrap();

        assert_eq!(document.kind, "resume");
        assert!(document.content.starts_with("SUMMARY"));
        assert!(!document.repaired);
    }

    #[tokio::test]
    async fn test_generate_rejects_missing_company() {
        let stub = StubProvider::replying("unused");
        let request = DocumentRequest::ColdEmail {
            purpose: "referral".to_string(),
            recipient_type: default_recipient(),
            company: " ".to_string(),
            resume_summary: "x".to_string(),
        };
        assert!(matches!(
            generate(stub.as_ref(), &request).await,
            Err(AppError::Validation(_))
        ));
    }
}
