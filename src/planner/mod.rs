//! Planner module
//!
//! The external language-model services the session depends on: full plan
//! generation and single-task decomposition. Only the request/response
//! contract lives here; the session decides what to do with the results.

mod cleanup;
mod gemini;
mod prompts;

pub use cleanup::{clean_json, parse_generated_plan, parse_subtasks};
pub use gemini::{GeminiConfig, GeminiPlanner, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use prompts::{breakdown_prompt, generation_prompt};

use crate::models::{GeneratedPlan, GeneratedTask};

/// Planner errors
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("No content generated")]
    EmptyResponse,

    #[error("Failed to parse the AI response: {0}")]
    Malformed(String),

    #[error("No API key configured for the planning service")]
    MissingApiKey,
}

/// Trait defining the planning service interface
#[async_trait::async_trait]
pub trait Planner: Send + Sync {
    /// Generates a multi-day plan for `goal` spread over `duration`
    async fn generate_plan(&self, goal: &str, duration: &str)
        -> Result<GeneratedPlan, PlannerError>;

    /// Splits one task into a handful of smaller steps
    async fn break_down_task(&self, description: &str) -> Result<Vec<GeneratedTask>, PlannerError>;
}
