use serde::{Deserialize, Serialize};

/// Decoded from a `question_generation` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<InterviewQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub question: String,
    pub ideal_answer_points: Vec<String>,
    pub evaluation_criteria: Vec<String>,
}
