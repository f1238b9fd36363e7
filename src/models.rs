//! Core models for the goal-architect library
//!
//! This module contains the plan data types: the recursive task tree, days,
//! the whole plan state, archived history entries and the shapes returned by
//! the plan generation service.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// An ordered, shareable sequence of tasks.
///
/// Sequences are reference counted so that a mutation only reallocates the
/// containers on the path to the changed task; untouched subtrees are shared
/// between plan versions.
pub type TaskList = Arc<Vec<Task>>;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 7;

/// Generates a short random identifier (7 base-36 characters)
pub fn generate_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// A single unit of work, possibly with nested subtasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: String,
    description: String,
    is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reminder: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    video_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub_tasks: Option<TaskList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_expanded: Option<bool>,
}

impl Task {
    /// Creates a new, incomplete leaf task
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            is_completed: false,
            reminder: None,
            video_link: None,
            sub_tasks: None,
            is_expanded: None,
        }
    }

    /// Materializes a generated step into a task with the given id
    pub fn from_generated(id: String, generated: &GeneratedTask) -> Self {
        Self {
            video_link: generated.video_link.clone(),
            ..Self::new(id, generated.description.clone())
        }
    }

    /// Sets the tutorial link
    pub fn with_video_link(mut self, link: impl Into<String>) -> Self {
        self.video_link = Some(link.into());
        self
    }

    /// Sets the children of this task
    pub fn with_subtasks(mut self, subtasks: Vec<Task>) -> Self {
        self.sub_tasks = Some(Arc::new(subtasks));
        self
    }

    /// Sets the completion flag
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.is_completed = completed;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn reminder(&self) -> Option<DateTime<Utc>> {
        self.reminder
    }

    pub fn video_link(&self) -> Option<&str> {
        self.video_link.as_deref()
    }

    /// Whether the children are shown; absent means collapsed
    pub fn is_expanded(&self) -> bool {
        self.is_expanded.unwrap_or(false)
    }

    /// Gets the subtasks of this task (empty for a leaf)
    pub fn subtasks(&self) -> &[Task] {
        self.sub_tasks.as_deref().map(Vec::as_slice).unwrap_or(&[])
    }

    /// The shared child sequence, if any
    pub(crate) fn subtask_list(&self) -> Option<&TaskList> {
        self.sub_tasks.as_ref()
    }

    /// A task without children (or with an empty child list) is a leaf.
    /// Only leaves are offered for decomposition.
    pub fn is_leaf(&self) -> bool {
        self.subtasks().is_empty()
    }

    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.is_completed = completed;
    }

    pub(crate) fn toggle_completed(&mut self) {
        self.is_completed = !self.is_completed;
    }

    pub(crate) fn toggle_expanded(&mut self) {
        self.is_expanded = Some(!self.is_expanded());
    }

    pub(crate) fn set_expanded(&mut self, expanded: bool) {
        self.is_expanded = Some(expanded);
    }

    pub(crate) fn set_reminder(&mut self, reminder: Option<DateTime<Utc>>) {
        self.reminder = reminder;
    }

    pub(crate) fn set_subtasks(&mut self, subtasks: TaskList) {
        self.sub_tasks = Some(subtasks);
    }

    /// Visits this task and every descendant, depth first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Task)) {
        visit(self);
        for subtask in self.subtasks() {
            subtask.walk(visit);
        }
    }
}

/// One planning unit of the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day_number: u32,
    pub day_label: String,
    pub theme: String,
    pub tasks: TaskList,
}

impl DayPlan {
    pub fn new(
        day_number: u32,
        day_label: impl Into<String>,
        theme: impl Into<String>,
        tasks: Vec<Task>,
    ) -> Self {
        Self {
            day_number,
            day_label: day_label.into(),
            theme: theme.into(),
            tasks: Arc::new(tasks),
        }
    }

    /// Recursive total/completed counts over this day's whole tree
    pub fn counts(&self) -> TaskCounts {
        count_tasks(&self.tasks)
    }
}

/// The whole committed plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanState {
    pub plan_title: String,
    pub overview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    pub days: Vec<DayPlan>,
}

impl PlanState {
    /// Turns a generated plan into stateful plan data: every generated task
    /// gets a fresh id and starts incomplete, and the plan starts at `now`.
    pub fn materialize<R: Rng + ?Sized>(
        generated: GeneratedPlan,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        let days = generated
            .days
            .into_iter()
            .map(|day| {
                let tasks = day
                    .tasks
                    .iter()
                    .map(|task| Task::from_generated(generate_id(rng), task))
                    .collect();
                DayPlan::new(day.day_number, day.day_label, day.theme, tasks)
            })
            .collect();

        Self {
            plan_title: generated.plan_title,
            overview: generated.overview,
            start_date: Some(now),
            days,
        }
    }

    /// Recursive counts over every day
    pub fn counts(&self) -> TaskCounts {
        self.days
            .iter()
            .map(DayPlan::counts)
            .fold(TaskCounts::default(), |acc, c| acc + c)
    }

    /// Overall completion percentage (0-100)
    pub fn progress(&self) -> u8 {
        self.counts().percent()
    }

    /// Calendar date of a day: `day N` is `start_date + (N - 1)` days.
    pub fn day_date(&self, day_number: u32) -> Option<NaiveDate> {
        let start = self.start_date?.date_naive();
        start.checked_add_days(Days::new(u64::from(day_number.saturating_sub(1))))
    }

    /// Looks up a task anywhere in the given day
    pub fn find_task(&self, day_index: usize, task_id: &str) -> Option<&Task> {
        self.days
            .get(day_index)
            .and_then(|day| crate::tree::find_task(&day.tasks, task_id))
    }

    /// Index of the day currently holding the task, at any depth
    pub fn find_task_day(&self, task_id: &str) -> Option<usize> {
        self.days
            .iter()
            .position(|day| crate::tree::find_task(&day.tasks, task_id).is_some())
    }
}

/// Total and completed task counts, including nested subtasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: usize,
    pub completed: usize,
}

impl TaskCounts {
    /// Completion percentage rounded to the nearest integer, 0 when empty
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u8
    }
}

impl std::ops::Add for TaskCounts {
    type Output = TaskCounts;

    fn add(self, other: TaskCounts) -> TaskCounts {
        TaskCounts {
            total: self.total + other.total,
            completed: self.completed + other.completed,
        }
    }
}

/// Counts tasks recursively
pub fn count_tasks(tasks: &[Task]) -> TaskCounts {
    let mut counts = TaskCounts::default();
    for task in tasks {
        task.walk(&mut |t| {
            counts.total += 1;
            if t.is_completed() {
                counts.completed += 1;
            }
        });
    }
    counts
}

/// A named, timestamped snapshot of a whole plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub plan: PlanState,
}

/// The parameters of a plan generation request, kept for "Regenerate"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub goal: String,
    pub duration: String,
}

/// A step as produced by the generation or decomposition service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTask {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_link: Option<String>,
}

/// A day as produced by the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDay {
    pub day_number: u32,
    pub day_label: String,
    pub theme: String,
    #[serde(default)]
    pub tasks: Vec<GeneratedTask>,
}

/// The full response of the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlan {
    pub plan_title: String,
    pub overview: String,
    pub days: Vec<GeneratedDay>,
}

/// Represents a single state transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub details: Option<String>,
}

impl ActivityEntry {
    pub fn new(action: String, details: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            details,
        }
    }
}
