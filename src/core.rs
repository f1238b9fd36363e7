//! Shared session handle
//!
//! `Core` wraps a [`Session`] for concurrent front ends. Every operation
//! returns its result together with a fresh [`SessionView`] and notifies
//! subscribers that the state changed. Planner calls run without the lock
//! held.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::export::MarkdownExport;
use crate::models::{HistoryItem, PlanRequest, PlanState};
use crate::planner::Planner;
use crate::search::SearchView;
use crate::session::{Session, SessionError, SessionView};

/// An operation result paired with the session state after it ran
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse<T> {
    pub res: T,
    pub session: SessionView,
}

impl<T> PlanResponse<T> {
    pub fn new(res: T, session: SessionView) -> Self {
        Self { res, session }
    }

    pub fn inner(&self) -> &T {
        &self.res
    }

    pub fn into_inner(self) -> T {
        self.res
    }

    pub fn replace<B>(self, res: B) -> PlanResponse<B> {
        PlanResponse {
            res,
            session: self.session,
        }
    }
}

impl<T, E> PlanResponse<Result<T, E>> {
    /// Lifts an inner error out, keeping the view on success
    pub fn transpose(self) -> Result<PlanResponse<T>, E> {
        let PlanResponse { res, session } = self;
        res.map(|res| PlanResponse::new(res, session))
    }
}

#[derive(Clone)]
pub struct Core {
    inner: Arc<Mutex<Session>>,
    planner: Arc<dyn Planner>,
    update_tx: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl Core {
    pub fn new(session: Session, planner: Arc<dyn Planner>) -> Self {
        let (tx, _rx) = tokio::sync::broadcast::channel(100);

        Self {
            inner: Arc::new(Mutex::new(session)),
            planner,
            update_tx: Arc::new(tx),
        }
    }

    /// Runs `f` against the session and notifies subscribers
    fn with_session<F, R>(&self, f: F) -> PlanResponse<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut session = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let res = f(&mut session);
        let view = session.view();
        drop(session);

        let _ = self.update_tx.send(());

        PlanResponse::new(res, view)
    }

    /// Runs `f` against the session without notifying anyone
    fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Session) -> R,
    {
        let session = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&session)
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.update_tx.subscribe()
    }

    pub fn view(&self) -> SessionView {
        self.read(Session::view)
    }

    pub fn get_plan(&self) -> PlanResponse<Option<PlanState>> {
        self.read(|session| PlanResponse::new(session.current().cloned(), session.view()))
    }

    pub fn toggle_completion(&self, day_index: usize, task_id: &str) -> PlanResponse<bool> {
        self.with_session(|session| session.toggle_completion(day_index, task_id))
    }

    pub fn toggle_expanded(&self, day_index: usize, task_id: &str) -> PlanResponse<bool> {
        self.with_session(|session| session.toggle_expanded(day_index, task_id))
    }

    pub fn set_reminder(
        &self,
        day_index: usize,
        task_id: &str,
        reminder: Option<DateTime<Utc>>,
    ) -> PlanResponse<bool> {
        self.with_session(|session| session.set_reminder(day_index, task_id, reminder))
    }

    pub fn bulk_set_status(&self, ids: &HashSet<String>, completed: bool) -> PlanResponse<bool> {
        self.with_session(|session| session.bulk_set_status(ids, completed))
    }

    pub fn move_task(
        &self,
        from_day: usize,
        to_day: usize,
        task_id: &str,
        target_index: Option<usize>,
    ) -> PlanResponse<bool> {
        self.with_session(|session| session.move_task(from_day, to_day, task_id, target_index))
    }

    pub fn undo(&self) -> PlanResponse<bool> {
        self.with_session(Session::undo)
    }

    pub fn redo(&self) -> PlanResponse<bool> {
        self.with_session(Session::redo)
    }

    pub fn discard(&self) -> PlanResponse<()> {
        self.with_session(Session::discard)
    }

    pub fn dismiss_error(&self) -> PlanResponse<()> {
        self.with_session(Session::dismiss_error)
    }

    /// Generates a new plan and installs it as the session's plan
    pub async fn generate(
        &self,
        request: PlanRequest,
    ) -> Result<PlanResponse<()>, SessionError> {
        self.with_session(Session::begin_generation);

        let result = self
            .planner
            .generate_plan(&request.goal, &request.duration)
            .await;

        self.with_session(|session| session.finish_generation(request, result))
            .transpose()
    }

    /// Reissues the last generation request. Returns `false` when there is
    /// nothing to regenerate.
    pub async fn regenerate(&self) -> Result<PlanResponse<bool>, SessionError> {
        let request = self.read(|session| session.last_request().cloned());
        match request {
            Some(request) => Ok(self.generate(request).await?.replace(true)),
            None => Ok(PlanResponse::new(false, self.view())),
        }
    }

    /// Decomposes a leaf task into generated steps.
    ///
    /// Returns `false` when the task is not a leaf in that day, or a
    /// breakdown of it is already running.
    pub async fn break_down(
        &self,
        day_index: usize,
        task_id: &str,
    ) -> Result<PlanResponse<bool>, SessionError> {
        let PlanResponse { res: started, session } =
            self.with_session(|session| session.begin_breakdown(day_index, task_id));
        let Some(description) = started else {
            return Ok(PlanResponse::new(false, session));
        };

        let result = self.planner.break_down_task(&description).await;

        self.with_session(|session| session.finish_breakdown(day_index, task_id, result))
            .transpose()
    }

    pub fn save_to_history(&self) -> Result<PlanResponse<String>, SessionError> {
        self.with_session(Session::save_to_history).transpose()
    }

    pub fn load_history(&self, id: &str) -> PlanResponse<bool> {
        self.with_session(|session| session.load_history(id))
    }

    pub fn load_last_session(&self) -> PlanResponse<bool> {
        self.with_session(Session::load_last_session)
    }

    pub fn rename_history(&self, id: &str, name: &str) -> Result<PlanResponse<bool>, SessionError> {
        self.with_session(|session| session.rename_history(id, name))
            .transpose()
    }

    pub fn delete_history(&self, id: &str) -> Result<PlanResponse<bool>, SessionError> {
        self.with_session(|session| session.delete_history(id))
            .transpose()
    }

    pub fn history(&self) -> Vec<HistoryItem> {
        self.read(Session::history)
    }

    pub fn search(&self, query: &str) -> Option<SearchView> {
        self.read(|session| session.search(query))
    }

    pub fn export_markdown(&self) -> Option<MarkdownExport> {
        self.read(Session::export_markdown)
    }
}
