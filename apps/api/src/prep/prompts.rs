// All LLM prompt templates for the interview-prep use cases.
// Placeholders are `{name}` and are filled with `llm_client::prompts::fill`.

/// System prompt for compatibility analysis.
pub const COMPATIBILITY_SYSTEM: &str = "You are an expert career advisor and recruiter. \
    You assess how well a resume fits a job description. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences or comments.";

/// Replace: {resume_text}, {job_description}
pub const COMPATIBILITY_PROMPT: &str = r#"Analyze the compatibility between the provided resume and job description.

Resume:
{resume_text}

Job Description:
{job_description}

Return ONLY this JSON object:
{
  "compatibility_score": <0-100>,
  "matched_skills": ["skill1", "skill2"],
  "missing_skills": ["skill1", "skill2"],
  "missing_qualifications": ["qualification1"],
  "strengths": [{"area": "area", "description": "why it matters for this role"}],
  "suggestions": ["specific actionable suggestion"]
}

Be specific, actionable, and honest in your assessment."#;

/// Replace: {count}, {difficulty}, {question_type}, {type_guidance},
///          {resume_summary}, {job_description}
pub const QUESTION_GENERATION_PROMPT: &str = r#"You are an expert interviewer. Generate {count} {difficulty} {question_type} interview questions.

{type_guidance}

Resume Skills and Experience:
{resume_summary}

Job Requirements:
{job_description}

For each question provide the question text, the ideal answer points and the evaluation criteria.

Format as a JSON array:
[
  {
    "question": "question text",
    "ideal_answer_points": ["point1", "point2"],
    "evaluation_criteria": ["criteria1", "criteria2"]
  }
]"#;

pub const BEHAVIORAL_GUIDANCE: &str = "Use the STAR method framework. \
    Focus on past experiences and specific situations.";

pub const TECHNICAL_GUIDANCE: &str = "Test specific skills and knowledge. \
    Include both conceptual and practical questions.";

pub const SITUATIONAL_GUIDANCE: &str = "Pose realistic hypothetical scenarios from the role \
    and ask how the candidate would handle them.";

/// Replace: {question}, {response}, {ideal_points}
pub const PRACTICE_EVALUATION_PROMPT: &str = r#"You are an expert interview coach. Evaluate this interview response.

Question: {question}

Candidate Response: {response}

Ideal Answer Points: {ideal_points}

Provide the evaluation as JSON:
{
  "score": <0-100>,
  "strengths": ["strength1"],
  "weaknesses": ["weakness1"],
  "suggestions": ["specific improvement"],
  "star_method_used": <true/false>,
  "star_analysis": {
    "situation": "present/missing/weak",
    "task": "present/missing/weak",
    "action": "present/missing/weak",
    "result": "present/missing/weak"
  }
}"#;

/// Replace: {user_context}
pub const CAREER_COACH_SYSTEM: &str = r#"You are an expert AI career coach with deep knowledge of job searching, interviewing, resume writing, career development and professional growth.

Your role is to:
- Provide personalized, actionable career advice
- Help users prepare for interviews
- Guide job search strategy
- Offer resume and application feedback
- Suggest skills development paths
- Assist with salary negotiation

Be friendly, supportive, and specific. Use the user's data to give contextual advice.

User Context:
{user_context}"#;

/// Quick-advice topics and their templates. Replace: {target_role}, {industry}
pub const QUICK_ADVICE: [(&str, &str); 5] = [
    (
        "resume_tips",
        "Provide 5 specific tips to improve my resume for {target_role} positions.",
    ),
    (
        "interview_prep",
        "How should I prepare for interviews for {target_role}? Give me a structured plan.",
    ),
    (
        "job_search",
        "What's the best job search strategy for {target_role} in {industry}?",
    ),
    (
        "skills_development",
        "What skills should I develop to be competitive for {target_role}?",
    ),
    (
        "salary_negotiation",
        "How should I approach salary negotiation for {target_role}?",
    ),
];

pub const DOCUMENT_SYSTEM: &str = "You are an expert career writer. \
    Respond with the finished document only, in plain text. \
    Do NOT add commentary before or after it.";

/// Replace: {user_info}, {job_description}
pub const RESUME_PROMPT: &str = r#"Create an ATS-friendly, professional resume based on:

User Information:
{user_info}

Target Job:
{job_description}

The resume must:
1. Highlight relevant skills and experience
2. Use strong action verbs and quantifiable achievements
3. Be optimized for ATS systems
4. Match the job requirements

Format with clear sections: Summary, Experience, Education, Skills"#;

/// Replace: {resume_summary}, {company_name}, {position}, {job_description}, {length}
pub const COVER_LETTER_PROMPT: &str = r#"Write a compelling cover letter for:

Candidate Background:
{resume_summary}

Target Company and Position:
{company_name} - {position}

Job Description:
{job_description}

The letter must:
1. Show genuine interest in the company
2. Highlight relevant achievements
3. Explain why the candidate is a great fit
4. End with a strong call to action

Length: {length}"#;

/// Replace: {purpose}, {recipient_type}, {company}, {resume_summary}
pub const COLD_EMAIL_PROMPT: &str = r#"Write a cold email for:

Purpose: {purpose}
Recipient: {recipient_type} at {company}
Candidate Background: {resume_summary}

The email must:
1. Have a compelling subject line
2. Quickly establish credibility
3. Provide a clear value proposition
4. Have a specific call to action
5. Respect the recipient's time

Maximum length: 150 words"#;
