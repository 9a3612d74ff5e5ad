// Prompt constants for roadmap generation.
// The system instruction pins the output schema; the user prompt carries the
// sanitized career query.

/// System instruction that pins the roadmap JSON shape.
pub const ROADMAP_SYSTEM: &str = r#"You are a career guidance assistant.
You MUST respond with a single valid JSON object only.
Do NOT include any text outside the JSON object.
Do NOT use markdown code fences.
Do NOT include explanations or apologies.

Return the data in the following JSON structure:
{
  "title": "The career path title",
  "explanation": "Detailed explanation of the career and the path into it",
  "average_salary": "Average salary of a skilled worker in that career",
  "job_openings": "Current demand and typical job openings",
  "youtube_video_recommendation": "URL of a recommended YouTube video for a visual explanation",
  "learning_resources": [
    {"title": "Resource name", "url": "https://...", "type": "article | course | youtube | book"}
  ]
}"#;

/// User prompt template. Replace `{query}` before sending.
pub const ROADMAP_PROMPT_TEMPLATE: &str = "Generate a comprehensive career roadmap for the following request.\n\nRequest:\n{query}";

pub fn build_roadmap_prompt(query: &str) -> String {
    ROADMAP_PROMPT_TEMPLATE.replace("{query}", query)
}
