//! Markdown export of a plan

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::models::{PlanState, Task};

/// A rendered markdown document and the name to save it under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownExport {
    pub file_name: String,
    pub content: String,
}

impl MarkdownExport {
    pub fn from_plan(plan: &PlanState) -> Self {
        Self {
            file_name: export_file_name(plan),
            content: format_plan_as_markdown(plan),
        }
    }
}

/// Renders the plan as a markdown checklist document
pub fn format_plan_as_markdown(plan: &PlanState) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "# {}\n", plan.plan_title);
    let _ = writeln!(out, "**Overview**: {}\n", plan.overview);
    let _ = writeln!(out, "**Total Progress**: {}%\n", plan.progress());
    out.push_str("---\n\n");

    for day in &plan.days {
        let _ = writeln!(out, "## Day {}: {}", day.day_number, day.day_label);
        let _ = writeln!(out, "**Focus**: {}\n", day.theme);
        write_tasks(&mut out, &day.tasks, 0);
        out.push_str("\n---\n\n");
    }

    out
}

fn write_tasks(out: &mut String, tasks: &[Task], depth: usize) {
    let indent = "  ".repeat(depth);
    for task in tasks {
        let checkbox = if task.is_completed() { "[x]" } else { "[ ]" };
        let _ = writeln!(out, "{}- {} {}", indent, checkbox, task.description());
        if let Some(link) = task.video_link() {
            let _ = writeln!(out, "{}  - Tutorial: {}", indent, link);
        }
        write_tasks(out, task.subtasks(), depth + 1);
    }
}

/// A filesystem-friendly name for the exported document
pub fn export_file_name(plan: &PlanState) -> String {
    let slug: String = plan
        .plan_title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "GoalArchitect-Plan.md".to_string()
    } else {
        format!("{}.md", slug)
    }
}
