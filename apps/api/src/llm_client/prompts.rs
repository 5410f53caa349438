// Cross-cutting prompt fragments. Each feature keeps its own prompts.rs.

/// System prompt that asks for JSON and nothing else.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT include explanations or apologies.";

/// Appended to every prompt that extracts facts from applicant material.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    Only use information present in the provided material. \
    When a field is not supported by the material, leave it empty rather than guessing.";
