use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Decoded from a `practice_evaluation` result. `star_analysis` maps each STAR
/// component (situation, task, action, result) to the evaluator's note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeEvaluation {
    pub score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub star_method_used: bool,
    pub star_analysis: BTreeMap<String, String>,
}
