//! Prompt text sent to the planning service

const PLAN_SCHEMA: &str = r#"{
  "planTitle": "string",
  "overview": "string",
  "days": [
    {
      "dayNumber": number,
      "dayLabel": "string",
      "theme": "string",
      "tasks": [
        { "description": "string", "videoLink": "string (optional)" }
      ]
    }
  ]
}"#;

const STEPS_SCHEMA: &str = r#"[
  {
    "description": "Step description",
    "videoLink": "https://www.youtube.com/results?search_query=... (optional, only when the step needs a tutorial)"
  }
]"#;

const YOUTUBE_SEARCH_PREFIX: &str = "https://www.youtube.com/results?search_query=";

/// Builds the prompt for generating a whole plan
pub fn generation_prompt(goal: &str, duration: &str) -> String {
    format!(
        "Goal: {goal}\n\
Duration: {duration}\n\
\n\
Act as an experienced productivity coach and produce a concrete, step-by-step plan.\n\
\n\
Reply with raw JSON only. No prose before or after it, no markdown code fences, \
no citation markers such as [1] or [Source]. Quote every key and string value, \
separate items with commas and leave no trailing commas.\n\
\n\
Use exactly this shape:\n\
{PLAN_SCHEMA}\n\
\n\
Requirements:\n\
- The plan must cover exactly {duration}.\n\
- Every task is a concrete action.\n\
- Use Google Search so the advice is current and accurate.\n\
- When a task involves learning a skill, concept or tool, set \"videoLink\" to a YouTube search URL: \
\"{YOUTUBE_SEARCH_PREFIX}\" followed by a few relevant search terms joined with +. \
Never link to a specific video id.\n"
    )
}

/// Builds the prompt for decomposing a single task
pub fn breakdown_prompt(description: &str) -> String {
    format!(
        "I have a task: \"{description}\".\n\
\n\
Split it into 2 to 5 smaller, specific, actionable steps.\n\
\n\
Reply with a JSON array only. No markdown, no conversational text.\n\
\n\
Shape:\n\
{STEPS_SCHEMA}\n"
    )
}
