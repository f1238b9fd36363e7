//! Task relocation
//!
//! Moves a top-level task within a day or across days. Nested tasks are not
//! relocatable; asking to move one is ignored.

use std::sync::Arc;

use crate::models::PlanState;

/// Moves the top-level task `task_id` from `from_day` to `to_day`.
///
/// With a `target_index` the task is inserted at that position of the
/// destination day, compensating for the removal shift when moving forward
/// within the same day and clamping to the destination length. Without one
/// the task is appended.
///
/// Returns `None` (nothing to commit) when either day index is out of range
/// or the task is not at the top level of the source day.
pub fn relocate_task(
    plan: &PlanState,
    from_day: usize,
    to_day: usize,
    task_id: &str,
    target_index: Option<usize>,
) -> Option<PlanState> {
    if to_day >= plan.days.len() {
        return None;
    }
    let source = plan.days.get(from_day)?;
    let position = source.tasks.iter().position(|t| t.id() == task_id)?;

    let mut source_tasks = source.tasks.as_ref().clone();
    let task = source_tasks.remove(position);

    let mut next = plan.clone();

    let mut dest_tasks = if from_day == to_day {
        source_tasks
    } else {
        next.days[from_day].tasks = Arc::new(source_tasks);
        next.days[to_day].tasks.as_ref().clone()
    };

    match target_index {
        Some(index) => {
            let mut insert_at = index;
            if from_day == to_day && position < index {
                insert_at -= 1;
            }
            let insert_at = insert_at.min(dest_tasks.len());
            dest_tasks.insert(insert_at, task);
        }
        None => dest_tasks.push(task),
    }

    next.days[to_day].tasks = Arc::new(dest_tasks);
    Some(next)
}
