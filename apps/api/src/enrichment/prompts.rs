// Prompt text for resume parsing.

pub const RESUME_PARSE_SYSTEM: &str = "You are a professional resume parser. \
    You extract structured information from raw resume text. \
    You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object.";

/// Replace `{resume_text}` before sending.
pub const RESUME_PARSE_PROMPT_TEMPLATE: &str = r#"Extract the resume below into this EXACT JSON schema:
{
  "name": "",
  "email": "",
  "phone": "",
  "education": [
    {"degree": "", "institute": "", "marks_or_cgpa": "", "start": "", "end": "", "courses": []}
  ],
  "experience": [
    {"company": "", "role": "", "description": "", "start": "", "end": ""}
  ],
  "projects": [
    {"title": "", "tech": []}
  ],
  "skills": []
}

Rules:
- Dates use YYYY-MM ("June 2023" becomes "2023-06", "2020" becomes "2020-01"); current positions end with "Present".
- marks_or_cgpa is copied as written ("85%", "3.8/4.0").
- experience.description joins the bullet points into one text.
- projects.tech lists every technology named for that project.
- skills lists technical skills, languages, tools and certifications.
- Use "" for missing text and [] for missing lists. Never use null or omit a field.

Raw resume text:
{resume_text}
"#;
