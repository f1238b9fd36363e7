//! Tree mutation algorithms
//!
//! Pure, recursive operations over a day's task tree. Every operation locates
//! a task by id at any depth and returns a new tree in which only the
//! containers on the path to the changed task are rebuilt; untouched subtrees
//! are shared with the input. When the id is not present the input list is
//! returned as-is (pointer-identical), which callers use to skip committing.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::models::{generate_id, DayPlan, GeneratedTask, PlanState, Task, TaskList};

/// Finds the task with `task_id` at any depth
pub fn find_task<'a>(tasks: &'a [Task], task_id: &str) -> Option<&'a Task> {
    tasks.iter().find_map(|task| {
        if task.id() == task_id {
            Some(task)
        } else {
            find_task(task.subtasks(), task_id)
        }
    })
}

/// Applies `transform` to the task with `task_id`, wherever it is in `tasks`.
pub fn update_task<F>(tasks: &TaskList, task_id: &str, mut transform: F) -> TaskList
where
    F: FnMut(&mut Task),
{
    update_in(tasks, task_id, &mut transform).unwrap_or_else(|| Arc::clone(tasks))
}

fn update_in<F>(tasks: &TaskList, task_id: &str, transform: &mut F) -> Option<TaskList>
where
    F: FnMut(&mut Task),
{
    for (i, task) in tasks.iter().enumerate() {
        let updated = if task.id() == task_id {
            let mut updated = task.clone();
            transform(&mut updated);
            updated
        } else if let Some(children) = task
            .subtask_list()
            .and_then(|children| update_in(children, task_id, transform))
        {
            let mut updated = task.clone();
            updated.set_subtasks(children);
            updated
        } else {
            continue;
        };

        let mut next = tasks.as_ref().clone();
        next[i] = updated;
        return Some(Arc::new(next));
    }
    None
}

/// Flips `isCompleted` on the matched task only; no cascade in either direction.
pub fn toggle_completion(tasks: &TaskList, task_id: &str) -> TaskList {
    update_task(tasks, task_id, Task::toggle_completed)
}

/// Flips the display-only expansion flag on the matched task.
pub fn toggle_expansion(tasks: &TaskList, task_id: &str) -> TaskList {
    update_task(tasks, task_id, Task::toggle_expanded)
}

/// Replaces the reminder, or clears it when `reminder` is `None`. Setting the
/// value the task already has returns the input list.
pub fn set_reminder(tasks: &TaskList, task_id: &str, reminder: Option<DateTime<Utc>>) -> TaskList {
    match find_task(tasks, task_id) {
        Some(task) if task.reminder() != reminder => {
            update_task(tasks, task_id, |task| task.set_reminder(reminder))
        }
        _ => Arc::clone(tasks),
    }
}

/// Replaces the matched task's children and expands it so they are visible.
pub fn attach_subtasks(tasks: &TaskList, task_id: &str, subtasks: Vec<Task>) -> TaskList {
    let subtasks: TaskList = Arc::new(subtasks);
    update_task(tasks, task_id, |task| {
        task.set_subtasks(Arc::clone(&subtasks));
        task.set_expanded(true);
    })
}

/// Turns decomposition output into fresh, incomplete tasks
pub fn materialize_subtasks<R: Rng + ?Sized>(generated: &[GeneratedTask], rng: &mut R) -> Vec<Task> {
    generated
        .iter()
        .map(|step| Task::from_generated(generate_id(rng), step))
        .collect()
}

/// Sets `isCompleted` on every task whose id is in `ids`, across all days and
/// at any depth. Days where no task changes are shared with the input.
pub fn bulk_set_status(days: &[DayPlan], ids: &HashSet<String>, completed: bool) -> Vec<DayPlan> {
    days.iter()
        .map(|day| match set_status_in(&day.tasks, ids, completed) {
            Some(tasks) => DayPlan {
                tasks,
                ..day.clone()
            },
            None => day.clone(),
        })
        .collect()
}

fn set_status_in(tasks: &TaskList, ids: &HashSet<String>, completed: bool) -> Option<TaskList> {
    let mut next: Option<Vec<Task>> = None;

    for (i, task) in tasks.iter().enumerate() {
        let matched = ids.contains(task.id()) && task.is_completed() != completed;
        let children = task
            .subtask_list()
            .and_then(|children| set_status_in(children, ids, completed));

        if !matched && children.is_none() {
            continue;
        }

        let mut updated = task.clone();
        if matched {
            updated.set_completed(completed);
        }
        if let Some(children) = children {
            updated.set_subtasks(children);
        }
        next.get_or_insert_with(|| tasks.as_ref().clone())[i] = updated;
    }

    next.map(Arc::new)
}

/// Runs a day-level mutation against a plan.
///
/// Returns the new plan, or `None` when the day index is out of range or the
/// mutation left the day's tree untouched.
pub fn apply_to_day<F>(plan: &PlanState, day_index: usize, mutate: F) -> Option<PlanState>
where
    F: FnOnce(&TaskList) -> TaskList,
{
    let day = plan.days.get(day_index)?;
    let tasks = mutate(&day.tasks);
    if Arc::ptr_eq(&tasks, &day.tasks) {
        return None;
    }

    let mut next = plan.clone();
    next.days[day_index].tasks = tasks;
    Some(next)
}
