//! Gemini-backed planner

use std::sync::Arc;

use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};

use super::cleanup::{parse_generated_plan, parse_subtasks};
use super::prompts::{breakdown_prompt, generation_prompt};
use super::{Planner, PlannerError};
use crate::models::{GeneratedPlan, GeneratedTask};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini planner configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<OutgoingPart<'a>>,
}

#[derive(Debug, Serialize)]
struct OutgoingPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

impl<'a> GenerateContentRequest<'a> {
    fn grounded(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![OutgoingPart { text: prompt }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<IncomingPart>,
}

#[derive(Debug, Deserialize)]
struct IncomingPart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Planner talking to the Gemini `generateContent` endpoint with search
/// grounding enabled
#[derive(Debug, Clone)]
pub struct GeminiPlanner {
    http_client: Arc<ReqwestClient>,
    config: GeminiConfig,
}

impl GeminiPlanner {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http_client: Arc::new(ReqwestClient::new()),
            config,
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, PlannerError> {
        if self.config.api_key.is_empty() {
            return Err(PlannerError::MissingApiKey);
        }

        let response = self
            .http_client
            .post(self.config.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&GenerateContentRequest::grounded(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!("Planning service returned {}: {}", status, message);
            return Err(PlannerError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        body.text().ok_or(PlannerError::EmptyResponse)
    }
}

#[async_trait::async_trait]
impl Planner for GeminiPlanner {
    async fn generate_plan(
        &self,
        goal: &str,
        duration: &str,
    ) -> Result<GeneratedPlan, PlannerError> {
        tracing::info!("Requesting plan for goal {:?} over {}", goal, duration);
        let text = self.generate_text(&generation_prompt(goal, duration)).await?;
        parse_generated_plan(&text)
    }

    async fn break_down_task(&self, description: &str) -> Result<Vec<GeneratedTask>, PlannerError> {
        tracing::info!("Requesting breakdown of {:?}", description);
        let text = self.generate_text(&breakdown_prompt(description)).await?;
        parse_subtasks(&text)
    }
}
