// Prompt text for applicant ranking.

pub const RANKING_SYSTEM: &str = "You are an expert hiring manager. \
    You evaluate applicants objectively against a job post. \
    You MUST respond with a valid JSON array only. \
    Do NOT include any text outside the JSON array.";

/// Replace `{job_post}` and `{applicants}` before sending.
pub const RANKING_PROMPT_TEMPLATE: &str = r#"Evaluate each applicant below against the job post.

Return a JSON array with one entry per applicant, using this EXACT schema:
[
  {
    "applicantID": "the applicant's id, copied from the input",
    "applicantName": "the applicant's name",
    "Score": 7.5,
    "Justification/Recommendation Note": "concise narrative explaining the score",
    "Key Strengths": ["3 to 5 role-relevant strengths"],
    "Development Areas": ["2 to 4 areas needing improvement"],
    "Hiring Recommendation": "Highly Recommend | Recommend | Consider | Do Not Recommend"
  }
]

Rules:
- Score is a number from 0 to 10 reflecting fit for the role.
- Every applicant in the input must appear exactly once.
- Copy applicantID exactly; never invent ids.
- Judge only on the material provided. Missing sections lower confidence, not the score by default.

Job Post:
{job_post}

Applicants:
{applicants}
"#;
