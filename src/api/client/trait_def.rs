//! Client trait definition
//!
//! This module defines the `Client` trait that abstracts over different client implementations.

use chrono::{DateTime, Utc};

use super::ClientError;
use crate::core::PlanResponse;
use crate::export::MarkdownExport;
use crate::models::{HistoryItem, PlanState};
use crate::search::SearchView;
use crate::session::SessionView;

/// Trait defining the API client interface for a planning session
#[async_trait::async_trait]
pub trait Client {
    /// Get the session flags and counts
    async fn get_session(&self) -> Result<SessionView, ClientError>;

    /// Get the current plan, if any
    async fn get_plan(&self) -> Result<PlanResponse<Option<PlanState>>, ClientError>;

    /// Generate a new plan for a goal
    async fn generate(
        &self,
        goal: String,
        duration: String,
    ) -> Result<PlanResponse<()>, ClientError>;

    /// Re-run the last generation request
    async fn regenerate(&self) -> Result<PlanResponse<bool>, ClientError>;

    /// Drop the current plan
    async fn discard(&self) -> Result<PlanResponse<()>, ClientError>;

    /// Clear the last error
    async fn dismiss_error(&self) -> Result<PlanResponse<()>, ClientError>;

    /// Flip a task's completion
    async fn toggle_task(
        &self,
        day_index: usize,
        task_id: String,
    ) -> Result<PlanResponse<bool>, ClientError>;

    /// Expand or collapse a task
    async fn expand_task(
        &self,
        day_index: usize,
        task_id: String,
    ) -> Result<PlanResponse<bool>, ClientError>;

    /// Set or clear a task's reminder
    async fn set_reminder(
        &self,
        day_index: usize,
        task_id: String,
        reminder: Option<DateTime<Utc>>,
    ) -> Result<PlanResponse<bool>, ClientError>;

    /// Split a leaf task into generated steps
    async fn break_down(
        &self,
        day_index: usize,
        task_id: String,
    ) -> Result<PlanResponse<bool>, ClientError>;

    /// Move a top-level task
    async fn move_task(
        &self,
        from_day: usize,
        to_day: usize,
        task_id: String,
        target_index: Option<usize>,
    ) -> Result<PlanResponse<bool>, ClientError>;

    /// Set completion on several tasks in one step
    async fn bulk_set_status(
        &self,
        task_ids: Vec<String>,
        completed: bool,
    ) -> Result<PlanResponse<bool>, ClientError>;

    async fn undo(&self) -> Result<PlanResponse<bool>, ClientError>;

    async fn redo(&self) -> Result<PlanResponse<bool>, ClientError>;

    /// Filter the plan by a query
    async fn search(&self, query: String) -> Result<SearchView, ClientError>;

    /// Render the plan as markdown
    async fn export(&self) -> Result<MarkdownExport, ClientError>;

    /// List archived plans, newest first
    async fn list_history(&self) -> Result<Vec<HistoryItem>, ClientError>;

    /// Save the current plan to the archive
    async fn save_history(&self) -> Result<PlanResponse<String>, ClientError>;

    /// Load an archived plan
    async fn load_history(&self, id: String) -> Result<PlanResponse<bool>, ClientError>;

    /// Load the most recently saved plan
    async fn load_last_session(&self) -> Result<PlanResponse<bool>, ClientError>;

    async fn rename_history(
        &self,
        id: String,
        name: String,
    ) -> Result<PlanResponse<bool>, ClientError>;

    async fn delete_history(&self, id: String) -> Result<PlanResponse<bool>, ClientError>;
}
