use serde::{Deserialize, Serialize};

/// Decoded from a `compatibility_analysis` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityAnalysis {
    pub compatibility_score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub missing_qualifications: Vec<String>,
    pub strengths: Vec<Strength>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strength {
    pub area: String,
    pub description: String,
}

impl CompatibilityAnalysis {
    /// Coarse band used by clients to colour the score.
    pub fn fit_band(&self) -> &'static str {
        match self.compatibility_score {
            s if s >= 80.0 => "strong",
            s if s >= 60.0 => "moderate",
            s if s >= 40.0 => "weak",
            _ => "poor",
        }
    }
}
