//! Core client implementation
//!
//! A client that wraps a `Core` directly, offering the same interface as
//! `HttpClientImpl` without the HTTP hop.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::{Client, ClientError};
use crate::core::{Core, PlanResponse};
use crate::export::MarkdownExport;
use crate::models::{HistoryItem, PlanRequest, PlanState};
use crate::search::SearchView;
use crate::session::{SessionError, SessionView};

/// A client implementation that wraps Core directly
#[derive(Clone)]
pub struct CoreClient {
    core: Core,
}

impl CoreClient {
    pub fn new(core: Core) -> Self {
        Self { core }
    }
}

impl From<SessionError> for ClientError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::NoPlan => ClientError::NoPlan,
            other => ClientError::Api(other.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl Client for CoreClient {
    async fn get_session(&self) -> Result<SessionView, ClientError> {
        Ok(self.core.view())
    }

    async fn get_plan(&self) -> Result<PlanResponse<Option<PlanState>>, ClientError> {
        Ok(self.core.get_plan())
    }

    async fn generate(
        &self,
        goal: String,
        duration: String,
    ) -> Result<PlanResponse<()>, ClientError> {
        Ok(self.core.generate(PlanRequest { goal, duration }).await?)
    }

    async fn regenerate(&self) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.regenerate().await?)
    }

    async fn discard(&self) -> Result<PlanResponse<()>, ClientError> {
        Ok(self.core.discard())
    }

    async fn dismiss_error(&self) -> Result<PlanResponse<()>, ClientError> {
        Ok(self.core.dismiss_error())
    }

    async fn toggle_task(
        &self,
        day_index: usize,
        task_id: String,
    ) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.toggle_completion(day_index, &task_id))
    }

    async fn expand_task(
        &self,
        day_index: usize,
        task_id: String,
    ) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.toggle_expanded(day_index, &task_id))
    }

    async fn set_reminder(
        &self,
        day_index: usize,
        task_id: String,
        reminder: Option<DateTime<Utc>>,
    ) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.set_reminder(day_index, &task_id, reminder))
    }

    async fn break_down(
        &self,
        day_index: usize,
        task_id: String,
    ) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.break_down(day_index, &task_id).await?)
    }

    async fn move_task(
        &self,
        from_day: usize,
        to_day: usize,
        task_id: String,
        target_index: Option<usize>,
    ) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self
            .core
            .move_task(from_day, to_day, &task_id, target_index))
    }

    async fn bulk_set_status(
        &self,
        task_ids: Vec<String>,
        completed: bool,
    ) -> Result<PlanResponse<bool>, ClientError> {
        let ids: HashSet<String> = task_ids.into_iter().collect();
        Ok(self.core.bulk_set_status(&ids, completed))
    }

    async fn undo(&self) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.undo())
    }

    async fn redo(&self) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.redo())
    }

    async fn search(&self, query: String) -> Result<SearchView, ClientError> {
        self.core.search(&query).ok_or(ClientError::NoPlan)
    }

    async fn export(&self) -> Result<MarkdownExport, ClientError> {
        self.core.export_markdown().ok_or(ClientError::NoPlan)
    }

    async fn list_history(&self) -> Result<Vec<HistoryItem>, ClientError> {
        Ok(self.core.history())
    }

    async fn save_history(&self) -> Result<PlanResponse<String>, ClientError> {
        Ok(self.core.save_to_history()?)
    }

    async fn load_history(&self, id: String) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.load_history(&id))
    }

    async fn load_last_session(&self) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.load_last_session())
    }

    async fn rename_history(
        &self,
        id: String,
        name: String,
    ) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.rename_history(&id, &name)?)
    }

    async fn delete_history(&self, id: String) -> Result<PlanResponse<bool>, ClientError> {
        Ok(self.core.delete_history(&id)?)
    }
}
