//! HTTP client implementation

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::{Client as ReqwestClient, Error as ReqwestError, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Client;
use crate::core::PlanResponse;
use crate::export::MarkdownExport;
use crate::models::{HistoryItem, PlanRequest, PlanState};
use crate::search::SearchView;
use crate::session::SessionView;

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Generic API response structure
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    #[error("API error: {0}")]
    Api(String),

    #[error("No active plan")]
    NoPlan,

    #[error("Missing data in response")]
    MissingData,
}

/// HTTP client for a running planning server
#[derive(Debug, Clone)]
pub struct HttpClientImpl {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl Default for HttpClientImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClientImpl {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http_client: Arc::new(ReqwestClient::new()),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let api_response: ApiResponse<T> = response.json().await?;

        if api_response.success {
            return api_response.data.ok_or(ClientError::MissingData);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NoPlan);
        }
        Err(ClientError::Api(
            api_response
                .error
                .unwrap_or_else(|| format!("Unknown API error ({})", status)),
        ))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.http_client.get(self.url(path))).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, ClientError> {
        self.send(self.http_client.post(self.url(path)).json(body)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.http_client.post(self.url(path))).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.http_client.delete(self.url(path))).await
    }
}

#[async_trait::async_trait]
impl Client for HttpClientImpl {
    async fn get_session(&self) -> Result<SessionView, ClientError> {
        self.get("/api/session").await
    }

    async fn get_plan(&self) -> Result<PlanResponse<Option<PlanState>>, ClientError> {
        self.get("/api/plan").await
    }

    async fn generate(
        &self,
        goal: String,
        duration: String,
    ) -> Result<PlanResponse<()>, ClientError> {
        self.post("/api/plan/generate", &PlanRequest { goal, duration })
            .await
    }

    async fn regenerate(&self) -> Result<PlanResponse<bool>, ClientError> {
        self.post_empty("/api/plan/regenerate").await
    }

    async fn discard(&self) -> Result<PlanResponse<()>, ClientError> {
        self.delete("/api/plan").await
    }

    async fn dismiss_error(&self) -> Result<PlanResponse<()>, ClientError> {
        self.delete("/api/error").await
    }

    async fn toggle_task(
        &self,
        day_index: usize,
        task_id: String,
    ) -> Result<PlanResponse<bool>, ClientError> {
        let body = json!({ "day_index": day_index, "task_id": task_id });
        self.post("/api/tasks/toggle", &body).await
    }

    async fn expand_task(
        &self,
        day_index: usize,
        task_id: String,
    ) -> Result<PlanResponse<bool>, ClientError> {
        let body = json!({ "day_index": day_index, "task_id": task_id });
        self.post("/api/tasks/expand", &body).await
    }

    async fn set_reminder(
        &self,
        day_index: usize,
        task_id: String,
        reminder: Option<DateTime<Utc>>,
    ) -> Result<PlanResponse<bool>, ClientError> {
        let body = json!({ "day_index": day_index, "task_id": task_id, "reminder": reminder });
        self.post("/api/tasks/reminder", &body).await
    }

    async fn break_down(
        &self,
        day_index: usize,
        task_id: String,
    ) -> Result<PlanResponse<bool>, ClientError> {
        let body = json!({ "day_index": day_index, "task_id": task_id });
        self.post("/api/tasks/breakdown", &body).await
    }

    async fn move_task(
        &self,
        from_day: usize,
        to_day: usize,
        task_id: String,
        target_index: Option<usize>,
    ) -> Result<PlanResponse<bool>, ClientError> {
        let body = json!({
            "from_day": from_day,
            "to_day": to_day,
            "task_id": task_id,
            "target_index": target_index,
        });
        self.post("/api/tasks/move", &body).await
    }

    async fn bulk_set_status(
        &self,
        task_ids: Vec<String>,
        completed: bool,
    ) -> Result<PlanResponse<bool>, ClientError> {
        let body = json!({ "task_ids": task_ids, "completed": completed });
        self.post("/api/tasks/bulk", &body).await
    }

    async fn undo(&self) -> Result<PlanResponse<bool>, ClientError> {
        self.post_empty("/api/undo").await
    }

    async fn redo(&self) -> Result<PlanResponse<bool>, ClientError> {
        self.post_empty("/api/redo").await
    }

    async fn search(&self, query: String) -> Result<SearchView, ClientError> {
        let request = self
            .http_client
            .get(self.url("/api/plan/search"))
            .query(&[("q", query)]);
        self.send(request).await
    }

    async fn export(&self) -> Result<MarkdownExport, ClientError> {
        self.get("/api/plan/export").await
    }

    async fn list_history(&self) -> Result<Vec<HistoryItem>, ClientError> {
        self.get("/api/history").await
    }

    async fn save_history(&self) -> Result<PlanResponse<String>, ClientError> {
        self.post_empty("/api/history").await
    }

    async fn load_history(&self, id: String) -> Result<PlanResponse<bool>, ClientError> {
        self.post_empty(&format!("/api/history/{}/load", id)).await
    }

    async fn load_last_session(&self) -> Result<PlanResponse<bool>, ClientError> {
        self.post_empty("/api/history/last").await
    }

    async fn rename_history(
        &self,
        id: String,
        name: String,
    ) -> Result<PlanResponse<bool>, ClientError> {
        let request = self
            .http_client
            .put(self.url(&format!("/api/history/{}", id)))
            .json(&json!({ "name": name }));
        self.send(request).await
    }

    async fn delete_history(&self, id: String) -> Result<PlanResponse<bool>, ClientError> {
        self.delete(&format!("/api/history/{}", id)).await
    }
}
