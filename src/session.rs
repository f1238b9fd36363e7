//! Planning session
//!
//! The explicit session object behind every front end. It owns the versioned
//! plan, the history archive and its durable store, and the transient state
//! the rendering layer needs (in-progress decompositions, the last error,
//! the generation flag and a short activity log).

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveStore, HistoryArchive, StorageError};
use crate::export::MarkdownExport;
use crate::models::{
    ActivityEntry, GeneratedPlan, GeneratedTask, HistoryItem, PlanRequest, PlanState, TaskCounts,
};
use crate::planner::PlannerError;
use crate::relocation::relocate_task;
use crate::search::{search, SearchView};
use crate::tree;
use crate::versioning::UndoRedo;

/// Maximum number of activity entries kept for display
pub const MAX_ACTIVITY_SIZE: usize = 20;

/// Message shown when a decomposition request fails
pub const BREAKDOWN_FAILED: &str = "Failed to break down task. Please try again.";

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error("Failed to persist history: {0}")]
    Storage(#[from] StorageError),

    #[error("No active plan")]
    NoPlan,

    #[error("{0}")]
    Breakdown(String),
}

/// Snapshot of session state for the rendering layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub has_plan: bool,
    pub plan_title: Option<String>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub can_regenerate: bool,
    pub active_history_id: Option<String>,
    pub progress: u8,
    pub counts: TaskCounts,
    pub breaking_down: Vec<String>,
    pub error: Option<String>,
    pub is_generating: bool,
    pub recent_activity: Vec<ActivityEntry>,
}

/// A planning session: current plan with undo/redo, archive and UI flags
pub struct Session {
    versions: UndoRedo<PlanState>,
    archive: HistoryArchive,
    store: Box<dyn ArchiveStore>,
    active_history_id: Option<String>,
    last_request: Option<PlanRequest>,
    breaking_down: HashSet<String>,
    error: Option<String>,
    is_generating: bool,
    rng: StdRng,
    activity: VecDeque<ActivityEntry>,
}

impl Session {
    /// Creates a session and hydrates the archive from `store`.
    ///
    /// An unreadable store is logged and treated as an empty archive.
    pub fn init(store: Box<dyn ArchiveStore>) -> Self {
        Self::init_with_rng(store, StdRng::from_entropy())
    }

    /// Like [`Session::init`] with a caller-provided id generator
    pub fn init_with_rng(store: Box<dyn ArchiveStore>, rng: StdRng) -> Self {
        let items = match store.load_all() {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Failed to load history, starting empty: {}", e);
                Vec::new()
            }
        };
        tracing::debug!("Loaded {} archived plans", items.len());

        Self {
            versions: UndoRedo::new(),
            archive: HistoryArchive::new(items),
            store,
            active_history_id: None,
            last_request: None,
            breaking_down: HashSet::new(),
            error: None,
            is_generating: false,
            rng,
            activity: VecDeque::with_capacity(MAX_ACTIVITY_SIZE),
        }
    }

    fn log_activity(&mut self, action: &str, details: Option<String>) {
        if self.activity.len() == MAX_ACTIVITY_SIZE {
            self.activity.pop_front();
        }
        self.activity
            .push_back(ActivityEntry::new(action.to_string(), details));
    }

    fn commit(&mut self, next: Option<PlanState>, action: &str, details: String) -> bool {
        let Some(next) = next else {
            return false;
        };
        let committed = self.versions.commit(next);
        if committed {
            tracing::debug!("{}: {}", action, details);
            self.log_activity(action, Some(details));
        }
        committed
    }

    pub fn current(&self) -> Option<&PlanState> {
        self.versions.current()
    }

    pub fn last_request(&self) -> Option<&PlanRequest> {
        self.last_request.as_ref()
    }

    pub fn active_history_id(&self) -> Option<&str> {
        self.active_history_id.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn is_breaking_down(&self, task_id: &str) -> bool {
        self.breaking_down.contains(task_id)
    }

    // Task edits

    /// Flips completion of one task. Returns whether a version was committed.
    pub fn toggle_completion(&mut self, day_index: usize, task_id: &str) -> bool {
        let next = self
            .current()
            .and_then(|plan| tree::apply_to_day(plan, day_index, |t| tree::toggle_completion(t, task_id)));
        self.commit(next, "toggle_completion", format!("day {} task {}", day_index, task_id))
    }

    /// Expands or collapses a task. Display state only, so nothing is committed.
    pub fn toggle_expanded(&mut self, day_index: usize, task_id: &str) -> bool {
        let next = self
            .current()
            .and_then(|plan| tree::apply_to_day(plan, day_index, |t| tree::toggle_expansion(t, task_id)));
        match next {
            Some(plan) => {
                self.versions.replace_current(plan);
                true
            }
            None => false,
        }
    }

    /// Sets or clears a reminder
    pub fn set_reminder(
        &mut self,
        day_index: usize,
        task_id: &str,
        reminder: Option<DateTime<Utc>>,
    ) -> bool {
        let next = self.current().and_then(|plan| {
            tree::apply_to_day(plan, day_index, |t| tree::set_reminder(t, task_id, reminder))
        });
        let details = match reminder {
            Some(at) => format!("task {} at {}", task_id, at.to_rfc3339()),
            None => format!("task {} cleared", task_id),
        };
        self.commit(next, "set_reminder", details)
    }

    /// Sets completion on every listed task across all days in one commit.
    ///
    /// Nothing is committed when no listed task changes.
    pub fn bulk_set_status(&mut self, ids: &HashSet<String>, completed: bool) -> bool {
        let next = self.current().and_then(|plan| {
            let days = tree::bulk_set_status(&plan.days, ids, completed);
            let changed = days
                .iter()
                .zip(&plan.days)
                .any(|(new, old)| !Arc::ptr_eq(&new.tasks, &old.tasks));
            changed.then(|| PlanState {
                days,
                ..plan.clone()
            })
        });
        self.commit(
            next,
            "bulk_set_status",
            format!("{} ids -> {}", ids.len(), completed),
        )
    }

    /// Moves a top-level task between (or within) days
    pub fn move_task(
        &mut self,
        from_day: usize,
        to_day: usize,
        task_id: &str,
        target_index: Option<usize>,
    ) -> bool {
        let next = self
            .current()
            .and_then(|plan| relocate_task(plan, from_day, to_day, task_id, target_index));
        self.commit(
            next,
            "move_task",
            format!("task {} day {} -> day {}", task_id, from_day, to_day),
        )
    }

    // Decomposition

    /// Marks a leaf task as being broken down and returns its description.
    ///
    /// Returns `None` when there is no such leaf in that day or a breakdown of
    /// the same task is already running.
    pub fn begin_breakdown(&mut self, day_index: usize, task_id: &str) -> Option<String> {
        if self.breaking_down.contains(task_id) {
            tracing::debug!("Breakdown of {} already in progress", task_id);
            return None;
        }
        let task = self.current()?.find_task(day_index, task_id)?;
        if !task.is_leaf() {
            return None;
        }
        let description = task.description().to_string();
        self.breaking_down.insert(task_id.to_string());
        Some(description)
    }

    /// Completes a breakdown started with [`Session::begin_breakdown`].
    ///
    /// The steps are spliced into whatever plan is current now, so edits made
    /// while the request was outstanding are kept. The task is looked up by id
    /// if it moved away from `day_index` in the meantime. Results for a
    /// breakdown that is no longer tracked (the session was replaced) are
    /// dropped. Returns whether a version was committed.
    pub fn finish_breakdown(
        &mut self,
        day_index: usize,
        task_id: &str,
        result: Result<Vec<GeneratedTask>, PlannerError>,
    ) -> Result<bool, SessionError> {
        if !self.breaking_down.remove(task_id) {
            tracing::debug!("Dropping stale breakdown result for {}", task_id);
            return Ok(false);
        }

        let steps = match result {
            Ok(steps) => steps,
            Err(e) => {
                tracing::error!("Breakdown of {} failed: {}", task_id, e);
                self.error = Some(BREAKDOWN_FAILED.to_string());
                return Err(SessionError::Breakdown(BREAKDOWN_FAILED.to_string()));
            }
        };

        let subtasks = tree::materialize_subtasks(&steps, &mut self.rng);
        let next = self.versions.current().and_then(|plan| {
            let day = plan
                .find_task(day_index, task_id)
                .map(|_| day_index)
                .or_else(|| plan.find_task_day(task_id))?;
            tree::apply_to_day(plan, day, |t| tree::attach_subtasks(t, task_id, subtasks))
        });
        Ok(self.commit(
            next,
            "break_down",
            format!("task {} into {} steps", task_id, steps.len()),
        ))
    }

    // Generation

    pub fn begin_generation(&mut self) {
        self.error = None;
        self.is_generating = true;
    }

    /// Completes a generation request. On failure the current plan is left
    /// as it was and the error is recorded.
    pub fn finish_generation(
        &mut self,
        request: PlanRequest,
        result: Result<GeneratedPlan, PlannerError>,
    ) -> Result<(), SessionError> {
        self.is_generating = false;
        match result {
            Ok(generated) => {
                self.install_generated(request, generated);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Plan generation failed: {}", e);
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Installs a freshly generated plan as a new session
    pub fn install_generated(&mut self, request: PlanRequest, generated: GeneratedPlan) {
        let plan = PlanState::materialize(generated, Utc::now(), &mut self.rng);
        tracing::info!("Installed plan {:?} with {} days", plan.plan_title, plan.days.len());

        self.versions.install(plan);
        self.breaking_down.clear();
        self.active_history_id = None;
        self.error = None;
        self.log_activity(
            "generate",
            Some(format!("{} ({})", request.goal, request.duration)),
        );
        self.last_request = Some(request);
    }

    // Versioning

    pub fn undo(&mut self) -> bool {
        let undone = self.versions.undo();
        if undone {
            self.log_activity("undo", None);
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.versions.redo();
        if redone {
            self.log_activity("redo", None);
        }
        redone
    }

    /// Drops the current plan and everything tied to it
    pub fn discard(&mut self) {
        self.versions.reset();
        self.breaking_down.clear();
        self.active_history_id = None;
        self.last_request = None;
        self.error = None;
        self.log_activity("discard", None);
    }

    // History archive

    fn flush(&mut self) -> Result<(), SessionError> {
        self.store.save_all(self.archive.items()).map_err(|e| {
            tracing::error!("Failed to write history: {}", e);
            SessionError::from(e)
        })
    }

    /// Saves the current plan, updating the active entry when there is one.
    ///
    /// Returns the id of the entry written.
    pub fn save_to_history(&mut self) -> Result<String, SessionError> {
        let plan = self.versions.current().ok_or(SessionError::NoPlan)?;
        let id = self.archive.save(
            plan,
            self.active_history_id.as_deref(),
            Utc::now(),
            &mut self.rng,
        );
        self.active_history_id = Some(id.clone());
        self.log_activity("save", Some(id.clone()));
        self.flush()?;
        Ok(id)
    }

    /// Replaces the session with an archived plan. Unknown ids are ignored.
    pub fn load_history(&mut self, id: &str) -> bool {
        let Some(plan) = self.archive.load(id) else {
            return false;
        };
        self.versions.install(plan);
        self.breaking_down.clear();
        self.active_history_id = Some(id.to_string());
        self.last_request = None;
        self.error = None;
        self.log_activity("load", Some(id.to_string()));
        true
    }

    /// Loads the most recently saved plan
    pub fn load_last_session(&mut self) -> bool {
        match self.archive.most_recent().map(|item| item.id.clone()) {
            Some(id) => self.load_history(&id),
            None => false,
        }
    }

    pub fn rename_history(&mut self, id: &str, name: &str) -> Result<bool, SessionError> {
        if !self.archive.rename(id, name) {
            return Ok(false);
        }
        self.log_activity("rename", Some(format!("{} -> {}", id, name.trim())));
        self.flush()?;
        Ok(true)
    }

    /// Deletes an archive entry, detaching the session from it if active
    pub fn delete_history(&mut self, id: &str) -> Result<bool, SessionError> {
        if !self.archive.delete(id) {
            return Ok(false);
        }
        if self.active_history_id.as_deref() == Some(id) {
            self.active_history_id = None;
        }
        self.log_activity("delete", Some(id.to_string()));
        self.flush()?;
        Ok(true)
    }

    /// Archive entries, newest first
    pub fn history(&self) -> Vec<HistoryItem> {
        self.archive.list().into_iter().cloned().collect()
    }

    // Projections

    pub fn search(&self, query: &str) -> Option<SearchView> {
        self.current().map(|plan| search(plan, query))
    }

    pub fn export_markdown(&self) -> Option<MarkdownExport> {
        self.current().map(MarkdownExport::from_plan)
    }

    pub fn view(&self) -> SessionView {
        let plan = self.current();
        let counts = plan.map(PlanState::counts).unwrap_or_default();
        let mut breaking_down: Vec<String> = self.breaking_down.iter().cloned().collect();
        breaking_down.sort();

        SessionView {
            has_plan: plan.is_some(),
            plan_title: plan.map(|p| p.plan_title.clone()),
            can_undo: self.versions.can_undo(),
            can_redo: self.versions.can_redo(),
            undo_depth: self.versions.undo_depth(),
            redo_depth: self.versions.redo_depth(),
            can_regenerate: self.last_request.is_some(),
            active_history_id: self.active_history_id.clone(),
            progress: counts.percent(),
            counts,
            breaking_down,
            error: self.error.clone(),
            is_generating: self.is_generating,
            recent_activity: self.activity.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryStore;
    use crate::models::GeneratedDay;
    use pretty_assertions::assert_eq;

    fn generated() -> GeneratedPlan {
        GeneratedPlan {
            plan_title: "Learn guitar".to_string(),
            overview: "Two days of basics".to_string(),
            days: vec![
                GeneratedDay {
                    day_number: 1,
                    day_label: "Day 1".to_string(),
                    theme: "Setup".to_string(),
                    tasks: vec![
                        GeneratedTask {
                            description: "Learn guitar basics".to_string(),
                            video_link: None,
                        },
                        GeneratedTask {
                            description: "Tune the guitar".to_string(),
                            video_link: None,
                        },
                    ],
                },
                GeneratedDay {
                    day_number: 2,
                    day_label: "Day 2".to_string(),
                    theme: "Chords".to_string(),
                    tasks: vec![GeneratedTask {
                        description: "Play G major".to_string(),
                        video_link: None,
                    }],
                },
            ],
        }
    }

    fn request() -> PlanRequest {
        PlanRequest {
            goal: "Learn guitar".to_string(),
            duration: "1 Week".to_string(),
        }
    }

    fn session_with_plan() -> (Session, MemoryStore) {
        let store = MemoryStore::new();
        let mut session =
            Session::init_with_rng(Box::new(store.clone()), StdRng::seed_from_u64(42));
        session.install_generated(request(), generated());
        (session, store)
    }

    fn task_id(session: &Session, day: usize, index: usize) -> String {
        session.current().unwrap().days[day].tasks[index].id().to_string()
    }

    #[test]
    fn test_install_materializes_plan() {
        let (session, _) = session_with_plan();
        let plan = session.current().unwrap();
        assert_eq!(plan.days.len(), 2);
        assert!(plan.start_date.is_some());
        assert!(plan.days[0].tasks.iter().all(|t| !t.is_completed()));

        let view = session.view();
        assert!(view.has_plan);
        assert!(view.can_regenerate);
        assert!(!view.can_undo);
        assert_eq!(view.counts.total, 3);
    }

    #[test]
    fn test_toggle_then_undo_redo() {
        let (mut session, _) = session_with_plan();
        let id = task_id(&session, 0, 0);

        assert!(session.toggle_completion(0, &id));
        assert!(session.current().unwrap().days[0].tasks[0].is_completed());

        assert!(session.undo());
        assert!(!session.current().unwrap().days[0].tasks[0].is_completed());
        assert!(session.view().can_redo);

        assert!(session.redo());
        assert!(session.current().unwrap().days[0].tasks[0].is_completed());
    }

    #[test]
    fn test_missing_targets_do_not_commit() {
        let (mut session, _) = session_with_plan();
        let id = task_id(&session, 0, 0);

        assert!(!session.toggle_completion(0, "missing"));
        assert!(!session.toggle_completion(9, &id));
        assert!(!session.move_task(0, 5, &id, None));
        assert!(!session.bulk_set_status(&HashSet::from(["nope".to_string()]), true));
        assert_eq!(session.view().undo_depth, 0);
    }

    #[test]
    fn test_expansion_is_not_versioned() {
        let (mut session, _) = session_with_plan();
        let id = task_id(&session, 0, 0);

        assert!(session.toggle_expanded(0, &id));
        assert!(session.current().unwrap().days[0].tasks[0].is_expanded());
        assert_eq!(session.view().undo_depth, 0);
    }

    #[test]
    fn test_breakdown_splices_into_latest_plan() {
        let (mut session, _) = session_with_plan();
        let parent = task_id(&session, 0, 0);
        let sibling = task_id(&session, 0, 1);

        let description = session.begin_breakdown(0, &parent).unwrap();
        assert_eq!(description, "Learn guitar basics");
        assert!(session.is_breaking_down(&parent));
        // Second request while the first is outstanding is ignored
        assert!(session.begin_breakdown(0, &parent).is_none());

        // An edit lands while the request is in flight
        assert!(session.toggle_completion(0, &sibling));

        let steps = vec![
            GeneratedTask {
                description: "Hold the pick".to_string(),
                video_link: None,
            },
            GeneratedTask {
                description: "Strum open strings".to_string(),
                video_link: Some("https://www.youtube.com/results?search_query=strumming".to_string()),
            },
        ];
        assert!(session.finish_breakdown(0, &parent, Ok(steps)).unwrap());
        assert!(!session.is_breaking_down(&parent));

        let plan = session.current().unwrap();
        let task = &plan.days[0].tasks[0];
        assert_eq!(task.subtasks().len(), 2);
        assert!(task.is_expanded());
        assert!(task.subtasks().iter().all(|t| !t.is_completed()));
        assert_ne!(task.subtasks()[0].id(), task.subtasks()[1].id());
        assert!(plan.days[0].tasks[1].is_completed());

        // Only leaves can be broken down
        assert!(session.begin_breakdown(0, &parent).is_none());
    }

    #[test]
    fn test_failed_breakdown_leaves_tree_unchanged() {
        let (mut session, _) = session_with_plan();
        let id = task_id(&session, 0, 0);
        let before = session.current().unwrap().clone();

        session.begin_breakdown(0, &id).unwrap();
        let result = session.finish_breakdown(0, &id, Err(PlannerError::EmptyResponse));

        assert!(matches!(result, Err(SessionError::Breakdown(_))));
        assert_eq!(session.error(), Some(BREAKDOWN_FAILED));
        assert_eq!(session.current().unwrap(), &before);
        assert!(!session.is_breaking_down(&id));
    }

    fn two_steps() -> Vec<GeneratedTask> {
        vec![
            GeneratedTask {
                description: "Hold the pick".to_string(),
                video_link: None,
            },
            GeneratedTask {
                description: "Strum open strings".to_string(),
                video_link: None,
            },
        ]
    }

    #[test]
    fn test_breakdown_follows_task_moved_to_another_day() {
        let (mut session, _) = session_with_plan();
        let id = task_id(&session, 0, 0);

        session.begin_breakdown(0, &id).unwrap();
        assert!(session.move_task(0, 1, &id, None));

        assert!(session.finish_breakdown(0, &id, Ok(two_steps())).unwrap());
        let plan = session.current().unwrap();
        assert_eq!(plan.find_task_day(&id), Some(1));
        let moved = plan.find_task(1, &id).unwrap();
        assert_eq!(moved.subtasks().len(), 2);
        assert!(moved.is_expanded());
        assert!(session.error().is_none());

        // The move and the breakdown are separate undo steps
        assert_eq!(session.view().undo_depth, 2);
    }

    #[test]
    fn test_discard_drops_pending_breakdowns() {
        let (mut session, _) = session_with_plan();
        let id = task_id(&session, 0, 0);

        session.begin_breakdown(0, &id).unwrap();
        session.discard();
        assert!(session.view().breaking_down.is_empty());

        // A late answer has nothing to land in
        assert!(!session.finish_breakdown(0, &id, Ok(two_steps())).unwrap());
        assert!(session.current().is_none());
    }

    #[test]
    fn test_loaded_plan_ignores_breakdown_from_previous_session() {
        let (mut session, _) = session_with_plan();
        let id = task_id(&session, 0, 0);
        let saved = session.save_to_history().unwrap();

        session.begin_breakdown(0, &id).unwrap();
        assert!(session.load_history(&saved));
        assert!(!session.is_breaking_down(&id));

        // The archived copy shares ids with the old session but stays untouched
        let result = session.finish_breakdown(0, &id, Err(PlannerError::EmptyResponse));
        assert!(!result.unwrap());
        assert!(session.error().is_none());
        assert!(session.current().unwrap().days[0].tasks[0].is_leaf());
        assert!(!session.view().can_undo);

        session.begin_breakdown(0, &id).unwrap();
        session.install_generated(request(), generated());
        assert!(session.view().breaking_down.is_empty());
    }

    #[test]
    fn test_repeated_bulk_and_reminder_do_not_commit() {
        let (mut session, _) = session_with_plan();
        let first = task_id(&session, 0, 0);
        let second = task_id(&session, 0, 1);
        let ids: HashSet<String> = [first.clone(), second].into_iter().collect();

        assert!(session.bulk_set_status(&ids, true));
        assert!(!session.bulk_set_status(&ids, true));
        assert_eq!(session.view().undo_depth, 1);

        let when = Utc::now();
        assert!(session.set_reminder(0, &first, Some(when)));
        assert!(!session.set_reminder(0, &first, Some(when)));
        assert_eq!(session.view().undo_depth, 2);

        assert!(session.set_reminder(0, &first, None));
        assert!(!session.set_reminder(0, &first, None));
        assert_eq!(session.view().undo_depth, 3);
    }

    #[test]
    fn test_failed_generation_keeps_current_plan() {
        let (mut session, _) = session_with_plan();
        let before = session.current().unwrap().clone();

        session.begin_generation();
        assert!(session.view().is_generating);
        let result = session.finish_generation(
            request(),
            Err(PlannerError::Malformed("bad".to_string())),
        );

        assert!(result.is_err());
        let view = session.view();
        assert!(!view.is_generating);
        assert!(view.error.is_some());
        assert_eq!(session.current().unwrap(), &before);
    }

    #[test]
    fn test_save_load_and_delete_history() {
        let (mut session, store) = session_with_plan();
        let id = session.save_to_history().unwrap();
        assert_eq!(store.snapshot().len(), 1);

        let again = session.save_to_history().unwrap();
        assert_eq!(again, id);
        assert_eq!(store.snapshot().len(), 1);

        let task = task_id(&session, 0, 0);
        session.toggle_completion(0, &task);
        assert!(session.load_history(&id));
        assert!(!session.current().unwrap().days[0].tasks[0].is_completed());
        assert!(!session.view().can_undo);
        assert!(!session.view().can_regenerate);
        assert_eq!(session.active_history_id(), Some(id.as_str()));

        assert!(session.rename_history(&id, "Guitar v1").unwrap());
        assert_eq!(store.snapshot()[0].name, "Guitar v1");

        assert!(session.delete_history(&id).unwrap());
        assert!(session.active_history_id().is_none());
        assert!(store.snapshot().is_empty());
        // The plan itself stays loaded
        assert!(session.current().is_some());

        // Next save creates a fresh entry
        let fresh = session.save_to_history().unwrap();
        assert_ne!(fresh, id);
    }

    #[test]
    fn test_save_without_plan_fails() {
        let mut session = Session::init(Box::new(MemoryStore::new()));
        assert!(matches!(session.save_to_history(), Err(SessionError::NoPlan)));
    }

    #[test]
    fn test_init_hydrates_and_loads_last_session() {
        let (mut first, store) = session_with_plan();
        first.save_to_history().unwrap();

        let mut second = Session::init(Box::new(store.clone()));
        assert!(second.current().is_none());
        assert_eq!(second.history().len(), 1);
        assert!(second.load_last_session());
        assert_eq!(second.current().unwrap().plan_title, "Learn guitar");
    }

    #[test]
    fn test_discard_clears_everything() {
        let (mut session, _) = session_with_plan();
        let id = task_id(&session, 0, 0);
        session.toggle_completion(0, &id);
        session.discard();

        let view = session.view();
        assert!(!view.has_plan);
        assert!(!view.can_undo);
        assert!(!view.can_regenerate);
        assert!(!session.undo());
    }

    #[test]
    fn test_activity_log_is_bounded() {
        let (mut session, _) = session_with_plan();
        let id = task_id(&session, 0, 0);
        for _ in 0..MAX_ACTIVITY_SIZE + 5 {
            session.toggle_completion(0, &id);
        }
        let view = session.view();
        assert_eq!(view.recent_activity.len(), MAX_ACTIVITY_SIZE);
        assert_eq!(
            view.recent_activity.last().map(|e| e.action.as_str()),
            Some("toggle_completion")
        );
    }
}
