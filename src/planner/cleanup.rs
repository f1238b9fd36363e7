//! Best-effort cleanup of model output before structural parsing

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::PlannerError;
use crate::models::{GeneratedPlan, GeneratedTask};

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"```(?:json)?\s*").expect("valid fence pattern");
    static ref CITATION: Regex = Regex::new(r"\[\d+\]").expect("valid citation pattern");
}

/// Strips code fences and citation markers and cuts the text down to the
/// outermost JSON object or array.
pub fn clean_json(text: &str) -> String {
    let mut cleaned = CODE_FENCE.replace_all(text, "").into_owned();

    let first_open = cleaned.find(|c| c == '{' || c == '[');
    let last_close = cleaned.rfind(|c| c == '}' || c == ']');
    if let (Some(start), Some(end)) = (first_open, last_close) {
        if start <= end {
            cleaned = cleaned[start..=end].to_string();
        }
    }

    let cleaned = CITATION.replace_all(&cleaned, "");
    cleaned.replace("[Source]", "")
}

/// Parses a plan generation response
pub fn parse_generated_plan(text: &str) -> Result<GeneratedPlan, PlannerError> {
    let cleaned = clean_json(text);
    serde_json::from_str(&cleaned).map_err(|e| {
        tracing::warn!("Unparseable plan response: {}", text);
        PlannerError::Malformed(e.to_string())
    })
}

/// Parses a decomposition response: a bare array of steps, or an object
/// wrapping the array under `tasks`.
pub fn parse_subtasks(text: &str) -> Result<Vec<GeneratedTask>, PlannerError> {
    let cleaned = clean_json(text);
    let value: Value =
        serde_json::from_str(&cleaned).map_err(|e| PlannerError::Malformed(e.to_string()))?;

    let steps = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("tasks") {
            Some(tasks @ Value::Array(_)) => tasks,
            _ => {
                return Err(PlannerError::Malformed(
                    "response was not a valid task list".to_string(),
                ))
            }
        },
        _ => {
            return Err(PlannerError::Malformed(
                "response was not a valid task list".to_string(),
            ))
        }
    };

    serde_json::from_value(steps).map_err(|e| PlannerError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_json_strips_fences_and_prose() {
        let raw = "Here is your plan:\n```json\n{\"a\": 1}\n```\nGood luck!";
        assert_eq!(clean_json(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_clean_json_strips_citations() {
        let raw = "{\"description\": \"Warm up [1] properly [Source]\"}[2]";
        assert_eq!(clean_json(raw), "{\"description\": \"Warm up  properly \"}");
    }

    #[test]
    fn test_clean_json_leaves_plain_text_alone() {
        assert_eq!(clean_json("no json here"), "no json here");
    }

    #[test]
    fn test_parse_generated_plan() {
        let raw = r#"```json
{
  "planTitle": "Learn to juggle",
  "overview": "Three balls in three days",
  "days": [
    {"dayNumber": 1, "dayLabel": "Day 1", "theme": "One ball",
     "tasks": [{"description": "Toss one ball", "videoLink": "https://www.youtube.com/results?search_query=juggling+one+ball"}]}
  ]
}
```"#;
        let plan = parse_generated_plan(raw).unwrap();
        assert_eq!(plan.plan_title, "Learn to juggle");
        assert_eq!(plan.days[0].tasks[0].description, "Toss one ball");
        assert!(plan.days[0].tasks[0].video_link.is_some());
    }

    #[test]
    fn test_parse_generated_plan_malformed() {
        assert!(matches!(
            parse_generated_plan("{\"planTitle\": \"x\""),
            Err(PlannerError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_subtasks_array_and_wrapped() {
        let bare = r#"[{"description": "Step one"}, {"description": "Step two", "videoLink": "https://example.com"}]"#;
        let steps = parse_subtasks(bare).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].video_link.as_deref(), Some("https://example.com"));

        let wrapped = r#"{"tasks": [{"description": "Only step"}]}"#;
        assert_eq!(parse_subtasks(wrapped).unwrap()[0].description, "Only step");
    }

    #[test]
    fn test_parse_subtasks_rejects_other_shapes() {
        assert!(matches!(
            parse_subtasks(r#"{"steps": []}"#),
            Err(PlannerError::Malformed(_))
        ));
        assert!(matches!(parse_subtasks("nothing"), Err(PlannerError::Malformed(_))));
    }
}
